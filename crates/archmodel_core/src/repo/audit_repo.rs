//! Lifecycle column scans for audit reconstruction.
//!
//! # Invariants
//! - Scans include soft-deleted rows; history must survive deletion.
//! - Scans are point-in-time reads with no caching.

use crate::model::audit::{NodeLifecycle, RelationshipLifecycle};
use crate::model::kind::EntityKind;
use crate::model::node::ProjectId;
use crate::repo::relationship_repo::{parse_endpoint, parse_relationship_kind};
use crate::repo::{ensure_connection_ready, parse_tombstone, RepoResult};
use rusqlite::{Connection, Row};

/// Read-only access to lifecycle columns of every table.
pub trait AuditRepository {
    /// All rows of one kind table in `project_id`, deleted included.
    fn node_lifecycles(
        &self,
        project_id: ProjectId,
        kind: EntityKind,
    ) -> RepoResult<Vec<NodeLifecycle>>;
    /// All relationship rows in `project_id`, deleted included.
    fn relationship_lifecycles(&self, project_id: ProjectId)
        -> RepoResult<Vec<RelationshipLifecycle>>;
}

pub struct SqliteAuditRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuditRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AuditRepository for SqliteAuditRepository<'_> {
    fn node_lifecycles(
        &self,
        project_id: ProjectId,
        kind: EntityKind,
    ) -> RepoResult<Vec<NodeLifecycle>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name, created_by, created_at, updated_by, updated_at, deleted_at, deleted_by
             FROM {table}
             WHERE project_id = ?1;",
            table = kind.table()
        ))?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_node_lifecycle(kind, row)?);
        }
        Ok(items)
    }

    fn relationship_lifecycles(
        &self,
        project_id: ProjectId,
    ) -> RepoResult<Vec<RelationshipLifecycle>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                source_kind,
                source_id,
                target_kind,
                target_id,
                relationship_kind,
                created_by,
                created_at,
                deleted_at,
                deleted_by
             FROM relationships
             WHERE project_id = ?1;",
        )?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_relationship_lifecycle(row)?);
        }
        Ok(items)
    }
}

fn parse_node_lifecycle(kind: EntityKind, row: &Row<'_>) -> RepoResult<NodeLifecycle> {
    let (deleted_at, deleted_by) =
        parse_tombstone(row.get("deleted_at")?, row.get("deleted_by")?, kind.table())?;
    Ok(NodeLifecycle {
        kind,
        id: row.get("id")?,
        name: row.get("name")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        updated_by: row.get("updated_by")?,
        updated_at: row.get("updated_at")?,
        deleted_at,
        deleted_by,
    })
}

fn parse_relationship_lifecycle(row: &Row<'_>) -> RepoResult<RelationshipLifecycle> {
    let kind_text: String = row.get("relationship_kind")?;
    let (deleted_at, deleted_by) = parse_tombstone(
        row.get("deleted_at")?,
        row.get("deleted_by")?,
        "relationships",
    )?;
    Ok(RelationshipLifecycle {
        id: row.get("id")?,
        kind: parse_relationship_kind(&kind_text)?,
        source: parse_endpoint(row, "source_kind", "source_id")?,
        target: parse_endpoint(row, "target_kind", "target_id")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        deleted_at,
        deleted_by,
    })
}
