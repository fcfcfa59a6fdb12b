//! Node repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/update/read/list APIs over the five kind tables.
//! - Own the soft-delete cascade from a node to its incident relationships.
//!
//! # Invariants
//! - Every query is scoped by `project_id`.
//! - The cascade runs in one `IMMEDIATE` transaction; either the node and all
//!   its active relationships are tombstoned, or nothing is.
//! - Unique-index violations are reported as `RepoError::UniqueViolation`.

use crate::model::kind::EntityKind;
use crate::model::node::{
    ApplicationLifecycle, AutomationLevel, DataClassification, Node, NodeAttributes, NodeId,
    NodeRef, ProjectId, RequirementPriority, RequirementStatus,
};
use crate::repo::{
    ensure_connection_ready, like_contains_pattern, map_write_error, parse_project_id,
    parse_tombstone, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::collections::HashSet;

const COMMON_COLUMNS: &str = "id, project_id, name, normalized_name, description";
const LIFECYCLE_COLUMNS: &str =
    "created_by, created_at, updated_by, updated_at, deleted_at, deleted_by";

/// Values written by node creation.
#[derive(Debug, Clone, Copy)]
pub struct NodeInsert<'a> {
    pub project_id: ProjectId,
    pub name: &'a str,
    pub normalized_name: &'a str,
    pub description: Option<&'a str>,
    pub attributes: &'a NodeAttributes,
    pub actor: &'a str,
    /// Used for both `created_at` and `updated_at`.
    pub at: i64,
}

/// Filter and page for active node listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeListQuery {
    pub project_id: ProjectId,
    pub kind: EntityKind,
    /// Already-normalized substring matched against `normalized_name`.
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

/// Repository interface for node persistence.
pub trait NodeRepository {
    /// Inserts one node and returns its row id.
    fn insert_node(&self, node: &NodeInsert<'_>) -> RepoResult<NodeId>;
    /// Writes the mutable columns of an active node.
    fn update_node(&self, node: &Node) -> RepoResult<()>;
    /// Loads one node scoped to `project_id`.
    fn get_node(
        &self,
        node: NodeRef,
        project_id: ProjectId,
        include_deleted: bool,
    ) -> RepoResult<Option<Node>>;
    /// Lists active nodes ordered by `normalized_name ASC, id ASC`.
    fn list_nodes(&self, query: &NodeListQuery) -> RepoResult<Vec<Node>>;
    /// Counts active nodes matching `query`, ignoring its page.
    fn count_nodes(&self, query: &NodeListQuery) -> RepoResult<usize>;
    /// Returns the id of the active node holding `normalized_name`, if any.
    fn find_active_by_normalized_name(
        &self,
        project_id: ProjectId,
        kind: EntityKind,
        normalized_name: &str,
    ) -> RepoResult<Option<NodeId>>;
    /// Returns active keys that start with `prefix`, for free-name suggestions.
    fn active_names_with_prefix(
        &self,
        project_id: ProjectId,
        kind: EntityKind,
        prefix: &str,
    ) -> RepoResult<HashSet<String>>;
    /// Tombstones one node and every active relationship touching it.
    ///
    /// Returns the number of cascaded relationships.
    fn soft_delete_node(
        &self,
        node: NodeRef,
        project_id: ProjectId,
        actor: &str,
        at: i64,
    ) -> RepoResult<usize>;
}

/// SQLite-backed node repository.
pub struct SqliteNodeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNodeRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NodeRepository for SqliteNodeRepository<'_> {
    fn insert_node(&self, node: &NodeInsert<'_>) -> RepoResult<NodeId> {
        let kind = node.attributes.kind();
        let attribute_columns = kind.attribute_columns();
        let sql = format!(
            "INSERT INTO {table} (
                project_id, name, normalized_name, description, {attributes},
                created_by, created_at, updated_by, updated_at
            ) VALUES (?1, ?2, ?3, ?4, {placeholders}, ?{actor}, ?{at}, ?{actor}, ?{at});",
            table = kind.table(),
            attributes = attribute_columns.join(", "),
            placeholders = numbered_placeholders(5, attribute_columns.len()),
            actor = 5 + attribute_columns.len(),
            at = 6 + attribute_columns.len(),
        );

        let description = node.description.map(str::to_string);
        let mut values = vec![
            Value::Text(node.project_id.to_string()),
            Value::Text(node.name.to_string()),
            Value::Text(node.normalized_name.to_string()),
            description.map_or(Value::Null, Value::Text),
        ];
        values.extend(attribute_values(node.attributes));
        values.push(Value::Text(node.actor.to_string()));
        values.push(Value::Integer(node.at));

        self.conn
            .execute(&sql, params_from_iter(values))
            .map_err(|err| map_write_error(err, kind.table()))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_node(&self, node: &Node) -> RepoResult<()> {
        let kind = node.kind();
        let attribute_columns = kind.attribute_columns();
        let assignments = attribute_columns
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 4))
            .collect::<Vec<_>>()
            .join(", ");
        let next = 4 + attribute_columns.len();
        let sql = format!(
            "UPDATE {table}
             SET name = ?1,
                 normalized_name = ?2,
                 description = ?3,
                 {assignments},
                 updated_by = ?{updated_by},
                 updated_at = ?{updated_at}
             WHERE id = ?{id}
               AND project_id = ?{project}
               AND deleted_at IS NULL;",
            table = kind.table(),
            updated_by = next,
            updated_at = next + 1,
            id = next + 2,
            project = next + 3,
        );

        let mut values = vec![
            Value::Text(node.name.clone()),
            Value::Text(node.normalized_name.clone()),
            node.description.clone().map_or(Value::Null, Value::Text),
        ];
        values.extend(attribute_values(&node.attributes));
        values.push(Value::Text(node.updated_by.clone()));
        values.push(Value::Integer(node.updated_at));
        values.push(Value::Integer(node.id));
        values.push(Value::Text(node.project_id.to_string()));

        let changed = self
            .conn
            .execute(&sql, params_from_iter(values))
            .map_err(|err| map_write_error(err, kind.table()))?;
        if changed == 0 {
            return Err(RepoError::NodeNotFound(node.node_ref()));
        }
        Ok(())
    }

    fn get_node(
        &self,
        node: NodeRef,
        project_id: ProjectId,
        include_deleted: bool,
    ) -> RepoResult<Option<Node>> {
        let sql = format!(
            "{select}
             WHERE id = ?1
               AND project_id = ?2
               AND (?3 = 1 OR deleted_at IS NULL);",
            select = select_sql(node.kind),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![
            node.id,
            project_id.to_string(),
            i64::from(include_deleted)
        ])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_node_row(node.kind, row)?));
        }
        Ok(None)
    }

    fn list_nodes(&self, query: &NodeListQuery) -> RepoResult<Vec<Node>> {
        let (filter, mut bind_values) = list_filter(query);
        let sql = format!(
            "{select} {filter}
             ORDER BY normalized_name ASC, id ASC
             LIMIT ? OFFSET ?;",
            select = select_sql(query.kind),
        );
        bind_values.push(Value::Integer(i64::from(query.limit)));
        bind_values.push(Value::Integer(i64::from(query.offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut nodes = Vec::new();
        while let Some(row) = rows.next()? {
            nodes.push(parse_node_row(query.kind, row)?);
        }
        Ok(nodes)
    }

    fn count_nodes(&self, query: &NodeListQuery) -> RepoResult<usize> {
        let (filter, bind_values) = list_filter(query);
        let sql = format!(
            "SELECT COUNT(*) FROM {table} {filter};",
            table = query.kind.table()
        );
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
    }

    fn find_active_by_normalized_name(
        &self,
        project_id: ProjectId,
        kind: EntityKind,
        normalized_name: &str,
    ) -> RepoResult<Option<NodeId>> {
        let sql = format!(
            "SELECT id
             FROM {table}
             WHERE project_id = ?1
               AND normalized_name = ?2
               AND deleted_at IS NULL
             LIMIT 1;",
            table = kind.table()
        );
        let id = self
            .conn
            .query_row(
                &sql,
                params![project_id.to_string(), normalized_name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn active_names_with_prefix(
        &self,
        project_id: ProjectId,
        kind: EntityKind,
        prefix: &str,
    ) -> RepoResult<HashSet<String>> {
        let sql = format!(
            "SELECT normalized_name
             FROM {table}
             WHERE project_id = ?1
               AND deleted_at IS NULL
               AND substr(normalized_name, 1, length(?2)) = ?2;",
            table = kind.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![project_id.to_string(), prefix])?;
        let mut names = HashSet::new();
        while let Some(row) = rows.next()? {
            names.insert(row.get(0)?);
        }
        Ok(names)
    }

    fn soft_delete_node(
        &self,
        node: NodeRef,
        project_id: ProjectId,
        actor: &str,
        at: i64,
    ) -> RepoResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            &format!(
                "UPDATE {table}
                 SET deleted_at = ?3,
                     deleted_by = ?4
                 WHERE id = ?1
                   AND project_id = ?2
                   AND deleted_at IS NULL;",
                table = node.kind.table()
            ),
            params![node.id, project_id.to_string(), at, actor],
        )?;
        if changed == 0 {
            return Err(RepoError::NodeNotFound(node));
        }

        let cascaded = tx.execute(
            "UPDATE relationships
             SET deleted_at = ?4,
                 deleted_by = ?5
             WHERE project_id = ?1
               AND deleted_at IS NULL
               AND (
                 (source_kind = ?2 AND source_id = ?3)
                 OR (target_kind = ?2 AND target_id = ?3)
               );",
            params![
                project_id.to_string(),
                node.kind.as_str(),
                node.id,
                at,
                actor,
            ],
        )?;

        tx.commit()?;
        Ok(cascaded)
    }
}

fn select_sql(kind: EntityKind) -> String {
    format!(
        "SELECT {COMMON_COLUMNS}, {attributes}, {LIFECYCLE_COLUMNS} FROM {table}",
        attributes = kind.attribute_columns().join(", "),
        table = kind.table(),
    )
}

fn list_filter(query: &NodeListQuery) -> (String, Vec<Value>) {
    let mut filter = String::from("WHERE project_id = ? AND deleted_at IS NULL");
    let mut bind_values = vec![Value::Text(query.project_id.to_string())];
    if let Some(search) = query.search.as_deref().filter(|value| !value.is_empty()) {
        filter.push_str(" AND normalized_name LIKE ? ESCAPE '\\'");
        bind_values.push(Value::Text(like_contains_pattern(search)));
    }
    (filter, bind_values)
}

/// Kind-specific values in `EntityKind::attribute_columns` order.
fn attribute_values(attributes: &NodeAttributes) -> Vec<Value> {
    fn text(value: &Option<String>) -> Value {
        value.clone().map_or(Value::Null, Value::Text)
    }
    fn tag(value: &'static str) -> Value {
        Value::Text(value.to_string())
    }

    match attributes {
        NodeAttributes::Capability { level, owner } => {
            vec![Value::Integer(i64::from(*level)), text(owner)]
        }
        NodeAttributes::Application { vendor, lifecycle } => {
            vec![text(vendor), tag(lifecycle.as_str())]
        }
        NodeAttributes::Process { owner, automation } => {
            vec![text(owner), tag(automation.as_str())]
        }
        NodeAttributes::DataEntity {
            classification,
            steward,
        } => vec![tag(classification.as_str()), text(steward)],
        NodeAttributes::Requirement { priority, status } => {
            vec![tag(priority.as_str()), tag(status.as_str())]
        }
    }
}

fn numbered_placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_node_row(kind: EntityKind, row: &Row<'_>) -> RepoResult<Node> {
    let table = kind.table();
    let project_text: String = row.get("project_id")?;
    let (deleted_at, deleted_by) =
        parse_tombstone(row.get("deleted_at")?, row.get("deleted_by")?, table)?;

    Ok(Node {
        id: row.get("id")?,
        project_id: parse_project_id(&project_text, &format!("{table}.project_id"))?,
        name: row.get("name")?,
        normalized_name: row.get("normalized_name")?,
        description: row.get("description")?,
        attributes: parse_attributes(kind, row)?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        updated_by: row.get("updated_by")?,
        updated_at: row.get("updated_at")?,
        deleted_at,
        deleted_by,
    })
}

fn parse_attributes(kind: EntityKind, row: &Row<'_>) -> RepoResult<NodeAttributes> {
    let table = kind.table();
    let attributes = match kind {
        EntityKind::Capability => {
            let level: i64 = row.get("level")?;
            let level = u8::try_from(level).map_err(|_| {
                RepoError::InvalidData(format!("invalid level `{level}` in {table}.level"))
            })?;
            NodeAttributes::Capability {
                level,
                owner: row.get("owner")?,
            }
        }
        EntityKind::Application => NodeAttributes::Application {
            vendor: row.get("vendor")?,
            lifecycle: parse_tag(row, table, "lifecycle", ApplicationLifecycle::parse)?,
        },
        EntityKind::Process => NodeAttributes::Process {
            owner: row.get("owner")?,
            automation: parse_tag(row, table, "automation", AutomationLevel::parse)?,
        },
        EntityKind::DataEntity => NodeAttributes::DataEntity {
            classification: parse_tag(row, table, "classification", DataClassification::parse)?,
            steward: row.get("steward")?,
        },
        EntityKind::Requirement => NodeAttributes::Requirement {
            priority: parse_tag(row, table, "priority", RequirementPriority::parse)?,
            status: parse_tag(row, table, "status", RequirementStatus::parse)?,
        },
    };
    Ok(attributes)
}

fn parse_tag<T>(
    row: &Row<'_>,
    table: &str,
    column: &'static str,
    parse: fn(&str) -> Option<T>,
) -> RepoResult<T> {
    let value: String = row.get(column)?;
    parse(&value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid value `{value}` in {table}.{column}"))
    })
}

#[cfg(test)]
mod tests {
    use super::{attribute_values, numbered_placeholders};
    use crate::model::kind::EntityKind;
    use crate::model::node::NodeAttributes;

    #[test]
    fn placeholders_are_numbered_from_first() {
        assert_eq!(numbered_placeholders(5, 2), "?5, ?6");
        assert_eq!(numbered_placeholders(1, 0), "");
    }

    #[test]
    fn attribute_values_follow_attribute_columns() {
        for kind in EntityKind::ALL {
            let values = attribute_values(&NodeAttributes::default_for(kind));
            assert_eq!(values.len(), kind.attribute_columns().len());
        }
    }
}
