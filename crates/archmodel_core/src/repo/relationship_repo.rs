//! Relationship repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Endpoints are re-checked as active nodes inside the insert transaction.
//! - Deleting a relationship never touches its endpoints.

use crate::model::kind::{EntityKind, RelationshipKind};
use crate::model::node::{NodeRef, ProjectId};
use crate::model::relationship::{NewRelationship, Relationship, RelationshipId};
use crate::repo::{
    ensure_connection_ready, parse_entity_kind, parse_project_id, parse_tombstone, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const RELATIONSHIP_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    source_kind,
    source_id,
    target_kind,
    target_id,
    relationship_kind,
    description,
    created_by,
    created_at,
    deleted_at,
    deleted_by
FROM relationships";

/// Repository interface for relationship persistence.
pub trait RelationshipRepository {
    /// Inserts one relationship after confirming both endpoints are active
    /// nodes of `input.project_id`.
    fn insert_relationship(&self, input: &NewRelationship, at: i64) -> RepoResult<RelationshipId>;
    fn get_relationship(
        &self,
        id: RelationshipId,
        project_id: ProjectId,
        include_deleted: bool,
    ) -> RepoResult<Option<Relationship>>;
    /// Lists active relationships, optionally only those touching `node`.
    ///
    /// Ordered by `created_at ASC, id ASC`.
    fn list_relationships(
        &self,
        project_id: ProjectId,
        node: Option<NodeRef>,
    ) -> RepoResult<Vec<Relationship>>;
    fn soft_delete_relationship(
        &self,
        id: RelationshipId,
        project_id: ProjectId,
        actor: &str,
        at: i64,
    ) -> RepoResult<()>;
}

/// SQLite-backed relationship repository.
pub struct SqliteRelationshipRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRelationshipRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl RelationshipRepository for SqliteRelationshipRepository<'_> {
    fn insert_relationship(&self, input: &NewRelationship, at: i64) -> RepoResult<RelationshipId> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for endpoint in [input.source, input.target] {
            if !node_is_active(&tx, input.project_id, endpoint)? {
                return Err(RepoError::NodeNotFound(endpoint));
            }
        }

        tx.execute(
            "INSERT INTO relationships (
                project_id,
                source_kind,
                source_id,
                target_kind,
                target_id,
                relationship_kind,
                description,
                created_by,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                input.project_id.to_string(),
                input.source.kind.as_str(),
                input.source.id,
                input.target.kind.as_str(),
                input.target.id,
                input.kind.as_str(),
                input.description.as_deref(),
                input.actor.as_str(),
                at,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    fn get_relationship(
        &self,
        id: RelationshipId,
        project_id: ProjectId,
        include_deleted: bool,
    ) -> RepoResult<Option<Relationship>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RELATIONSHIP_SELECT_SQL}
             WHERE id = ?1
               AND project_id = ?2
               AND (?3 = 1 OR deleted_at IS NULL);"
        ))?;
        let mut rows = stmt.query(params![
            id,
            project_id.to_string(),
            i64::from(include_deleted)
        ])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_relationship_row(row)?));
        }
        Ok(None)
    }

    fn list_relationships(
        &self,
        project_id: ProjectId,
        node: Option<NodeRef>,
    ) -> RepoResult<Vec<Relationship>> {
        let mut items = Vec::new();
        match node {
            Some(node) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{RELATIONSHIP_SELECT_SQL}
                     WHERE project_id = ?1
                       AND deleted_at IS NULL
                       AND (
                         (source_kind = ?2 AND source_id = ?3)
                         OR (target_kind = ?2 AND target_id = ?3)
                       )
                     ORDER BY created_at ASC, id ASC;"
                ))?;
                let mut rows =
                    stmt.query(params![project_id.to_string(), node.kind.as_str(), node.id])?;
                while let Some(row) = rows.next()? {
                    items.push(parse_relationship_row(row)?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "{RELATIONSHIP_SELECT_SQL}
                     WHERE project_id = ?1
                       AND deleted_at IS NULL
                     ORDER BY created_at ASC, id ASC;"
                ))?;
                let mut rows = stmt.query([project_id.to_string()])?;
                while let Some(row) = rows.next()? {
                    items.push(parse_relationship_row(row)?);
                }
            }
        }
        Ok(items)
    }

    fn soft_delete_relationship(
        &self,
        id: RelationshipId,
        project_id: ProjectId,
        actor: &str,
        at: i64,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE relationships
             SET deleted_at = ?3,
                 deleted_by = ?4
             WHERE id = ?1
               AND project_id = ?2
               AND deleted_at IS NULL;",
            params![id, project_id.to_string(), at, actor],
        )?;
        if changed == 0 {
            return Err(RepoError::RelationshipNotFound(id));
        }
        Ok(())
    }
}

fn node_is_active(conn: &Connection, project_id: ProjectId, node: NodeRef) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(
                SELECT 1
                FROM {table}
                WHERE id = ?1
                  AND project_id = ?2
                  AND deleted_at IS NULL
            );",
            table = node.kind.table()
        ),
        params![node.id, project_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn parse_relationship_kind(value: &str) -> RepoResult<RelationshipKind> {
    RelationshipKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == value)
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid relationship kind `{value}` in relationships.relationship_kind"
            ))
        })
}

pub(crate) fn parse_endpoint(
    row: &Row<'_>,
    kind_column: &'static str,
    id_column: &'static str,
) -> RepoResult<NodeRef> {
    let kind_text: String = row.get(kind_column)?;
    let kind: EntityKind = parse_entity_kind(&kind_text, kind_column)?;
    Ok(NodeRef::new(kind, row.get(id_column)?))
}

fn parse_relationship_row(row: &Row<'_>) -> RepoResult<Relationship> {
    let project_text: String = row.get("project_id")?;
    let kind_text: String = row.get("relationship_kind")?;
    let (deleted_at, deleted_by) = parse_tombstone(
        row.get("deleted_at")?,
        row.get("deleted_by")?,
        "relationships",
    )?;

    Ok(Relationship {
        id: row.get("id")?,
        project_id: parse_project_id(&project_text, "relationships.project_id")?,
        source: parse_endpoint(row, "source_kind", "source_id")?,
        target: parse_endpoint(row, "target_kind", "target_id")?,
        kind: parse_relationship_kind(&kind_text)?,
        description: row.get("description")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        deleted_at,
        deleted_by,
    })
}
