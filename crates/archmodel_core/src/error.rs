//! Service-level error taxonomy.
//!
//! # Responsibility
//! - Give boundary callers one error type with actionable detail.
//! - Translate repository failures into semantic variants.
//!
//! # Invariants
//! - A storage unique-index violation surfaces as `DuplicateName`, the same
//!   variant the pre-check produces.
//! - Storage failures are not retried here; they propagate as
//!   `StorageUnavailable` with the source attached.

use crate::model::kind::{EntityKind, RelationshipKind};
use crate::model::node::{NodeRef, NodeValidationError, ProjectId};
use crate::model::relationship::RelationshipId;
use crate::repo::RepoError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

/// Identifies a record for not-found reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRef {
    Node(NodeRef),
    Relationship(RelationshipId),
}

impl Display for RecordRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node(node) => write!(f, "{node}"),
            Self::Relationship(id) => write!(f, "relationship/{id}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid input: {0}")]
    Validation(#[from] NodeValidationError),

    #[error("unknown entity type `{0}`")]
    InvalidEntityType(String),

    #[error("unknown relationship kind `{0}`")]
    UnknownRelationshipKind(String),

    #[error(
        "a {kind} named `{normalized_name}` already exists in project {project_id}; try `{suggestion}`"
    )]
    DuplicateName {
        project_id: ProjectId,
        kind: EntityKind,
        normalized_name: String,
        suggestion: String,
    },

    #[error(
        "`{relationship_kind}` is not allowed from {source_kind} to {target_kind}; allowed: [{}]",
        join_kinds(.allowed)
    )]
    RelationshipMatrix {
        source_kind: EntityKind,
        target_kind: EntityKind,
        relationship_kind: RelationshipKind,
        allowed: Vec<RelationshipKind>,
    },

    #[error("relationship cannot reference {0} from itself")]
    SelfReference(NodeRef),

    #[error("{0} not found or already deleted")]
    NotFound(RecordRef),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] RepoError),
}

impl ModelError {
    /// Stable short code for structured logs and boundary mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvalidEntityType(_) => "invalid_entity_type",
            Self::UnknownRelationshipKind(_) => "unknown_relationship_kind",
            Self::DuplicateName { .. } => "duplicate_name",
            Self::RelationshipMatrix { .. } => "relationship_matrix",
            Self::SelfReference(_) => "self_reference",
            Self::NotFound(_) => "not_found",
            Self::StorageUnavailable(_) => "storage_unavailable",
        }
    }
}

impl From<RepoError> for ModelError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NodeNotFound(node) => Self::NotFound(RecordRef::Node(node)),
            RepoError::RelationshipNotFound(id) => Self::NotFound(RecordRef::Relationship(id)),
            other => Self::StorageUnavailable(other),
        }
    }
}

fn join_kinds(kinds: &[RelationshipKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
