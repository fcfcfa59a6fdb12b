//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Rows are never physically deleted; deletion writes `deleted_at`/`deleted_by`.
//! - Active reads filter on `deleted_at IS NULL`.
//! - Repository APIs return semantic errors (`NodeNotFound`, `UniqueViolation`)
//!   in addition to DB transport errors.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::kind::EntityKind;
use crate::model::node::{NodeRef, ProjectId};
use crate::model::relationship::RelationshipId;
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

pub mod audit_repo;
pub mod node_repo;
pub mod relationship_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence-layer error shared by all repositories.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    Db(DbError),
    /// Target node is missing, soft-deleted, or in another project.
    #[error("node not found: {0}")]
    NodeNotFound(NodeRef),
    #[error("relationship not found: {0}")]
    RelationshipNotFound(RelationshipId),
    /// Storage unique index rejected the write.
    #[error("unique constraint violated on `{table}`")]
    UniqueViolation { table: &'static str },
    /// Connection schema is not at the expected migrated version.
    #[error("repository requires schema version {expected_version}, got {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("repository requires table `{0}`")]
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid read model.
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Maps a write failure, turning unique-index violations on `table` into
/// `RepoError::UniqueViolation`.
pub(crate) fn map_write_error(err: rusqlite::Error, table: &'static str) -> RepoError {
    let db_error = DbError::Sqlite(err);
    if db_error.is_unique_violation() {
        RepoError::UniqueViolation { table }
    } else {
        RepoError::Db(db_error)
    }
}

/// Checks that `conn` is fully migrated and carries every model table.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let tables = EntityKind::ALL
        .iter()
        .map(|kind| kind.table())
        .chain(std::iter::once("relationships"));
    for table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

pub(crate) fn parse_project_id(value: &str, column: &str) -> RepoResult<ProjectId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_entity_kind(value: &str, column: &str) -> RepoResult<EntityKind> {
    EntityKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid entity kind `{value}` in {column}")))
}

/// Pairs `deleted_at` with `deleted_by`; a half-set tombstone is corrupt data.
pub(crate) fn parse_tombstone(
    deleted_at: Option<i64>,
    deleted_by: Option<String>,
    table: &str,
) -> RepoResult<(Option<i64>, Option<String>)> {
    match (deleted_at, deleted_by) {
        (None, None) => Ok((None, None)),
        (Some(at), Some(by)) => Ok((Some(at), Some(by))),
        _ => Err(RepoError::InvalidData(format!(
            "deleted_at/deleted_by mismatch in {table}"
        ))),
    }
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn like_contains_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::like_contains_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_contains_pattern("crm"), "%crm%");
        assert_eq!(like_contains_pattern("a_b%c"), "%a\\_b\\%c%");
    }
}
