//! Relationship domain model.
//!
//! # Invariants
//! - `source != target`.
//! - Relationships are immutable after creation apart from soft delete.

use crate::model::kind::RelationshipKind;
use crate::model::node::{NodeRef, ProjectId};
use serde::{Deserialize, Serialize};

/// Row id in the relationship table.
pub type RelationshipId = i64;

/// Persisted directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub project_id: ProjectId,
    pub source: NodeRef,
    pub target: NodeRef,
    pub kind: RelationshipKind,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
    pub deleted_by: Option<String>,
}

impl Relationship {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Returns whether `node` is either endpoint.
    pub fn touches(&self, node: NodeRef) -> bool {
        self.source == node || self.target == node
    }
}

/// Input for relationship creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelationship {
    pub project_id: ProjectId,
    pub source: NodeRef,
    pub target: NodeRef,
    pub kind: RelationshipKind,
    pub description: Option<String>,
    pub actor: String,
}

impl NewRelationship {
    pub fn new(
        project_id: ProjectId,
        source: NodeRef,
        target: NodeRef,
        kind: RelationshipKind,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            project_id,
            source,
            target,
            kind,
            description: None,
            actor: actor.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
