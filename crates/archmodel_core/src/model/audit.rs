//! Audit event model.
//!
//! Audit events are synthesized on read from lifecycle columns; nothing here
//! is persisted.
//!
//! # Invariants
//! - Each variant carries only the fields that exist for that lifecycle step.
//! - `AuditEvent::sort_key` defines a total order used for newest-first output.

use crate::model::kind::{EntityKind, RelationshipKind};
use crate::model::node::{NodeId, NodeRef};
use crate::model::relationship::RelationshipId;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Lifecycle step an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
}

/// What an event is about: a node of some kind, or a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "subject", content = "kind")]
pub enum AuditSubject {
    Node(EntityKind),
    Relationship,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    NodeCreated {
        node: NodeRef,
        name: String,
        actor: String,
        at: i64,
    },
    NodeUpdated {
        node: NodeRef,
        name: String,
        actor: String,
        at: i64,
    },
    NodeDeleted {
        node: NodeRef,
        name: String,
        actor: String,
        at: i64,
    },
    RelationshipCreated {
        id: RelationshipId,
        kind: RelationshipKind,
        source: NodeRef,
        target: NodeRef,
        /// "{source name} {phrase} {target name}".
        label: String,
        actor: String,
        at: i64,
    },
    RelationshipDeleted {
        id: RelationshipId,
        kind: RelationshipKind,
        source: NodeRef,
        target: NodeRef,
        label: String,
        actor: String,
        at: i64,
    },
}

impl AuditEvent {
    pub fn action(&self) -> AuditAction {
        match self {
            Self::NodeCreated { .. } | Self::RelationshipCreated { .. } => AuditAction::Created,
            Self::NodeUpdated { .. } => AuditAction::Updated,
            Self::NodeDeleted { .. } | Self::RelationshipDeleted { .. } => AuditAction::Deleted,
        }
    }

    pub fn subject(&self) -> AuditSubject {
        match self {
            Self::NodeCreated { node, .. }
            | Self::NodeUpdated { node, .. }
            | Self::NodeDeleted { node, .. } => AuditSubject::Node(node.kind),
            Self::RelationshipCreated { .. } | Self::RelationshipDeleted { .. } => {
                AuditSubject::Relationship
            }
        }
    }

    /// Epoch milliseconds of the lifecycle step.
    pub fn at(&self) -> i64 {
        match self {
            Self::NodeCreated { at, .. }
            | Self::NodeUpdated { at, .. }
            | Self::NodeDeleted { at, .. }
            | Self::RelationshipCreated { at, .. }
            | Self::RelationshipDeleted { at, .. } => *at,
        }
    }

    pub fn actor(&self) -> &str {
        match self {
            Self::NodeCreated { actor, .. }
            | Self::NodeUpdated { actor, .. }
            | Self::NodeDeleted { actor, .. }
            | Self::RelationshipCreated { actor, .. }
            | Self::RelationshipDeleted { actor, .. } => actor,
        }
    }

    /// Display name of the subject; relationship events use their label.
    pub fn name(&self) -> &str {
        match self {
            Self::NodeCreated { name, .. }
            | Self::NodeUpdated { name, .. }
            | Self::NodeDeleted { name, .. } => name,
            Self::RelationshipCreated { label, .. } | Self::RelationshipDeleted { label, .. } => {
                label
            }
        }
    }

    /// Row id of the subject within its table.
    pub fn record_id(&self) -> i64 {
        match self {
            Self::NodeCreated { node, .. }
            | Self::NodeUpdated { node, .. }
            | Self::NodeDeleted { node, .. } => node.id,
            Self::RelationshipCreated { id, .. } | Self::RelationshipDeleted { id, .. } => *id,
        }
    }

    /// Ascending sort yields newest first.
    ///
    /// Equal timestamps order by action (deleted, updated, created), then
    /// relationships before nodes, then kind, then descending row id.
    pub fn sort_key(
        &self,
    ) -> (Reverse<i64>, Reverse<AuditAction>, SubjectRank, Reverse<i64>) {
        (
            Reverse(self.at()),
            Reverse(self.action()),
            SubjectRank::of(self.subject()),
            Reverse(self.record_id()),
        )
    }
}

/// Tie-break rank; relationships sort ahead of nodes for equal timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubjectRank(u8, Option<EntityKind>);

impl SubjectRank {
    fn of(subject: AuditSubject) -> Self {
        match subject {
            AuditSubject::Relationship => Self(0, None),
            AuditSubject::Node(kind) => Self(1, Some(kind)),
        }
    }
}

/// Filters and pagination for audit history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    pub subject: Option<AuditSubject>,
    pub action: Option<AuditAction>,
    /// Case-insensitive substring on `AuditEvent::name`.
    pub search: Option<String>,
    /// `None` applies the configured default.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// One page of reconstructed history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditPage {
    pub events: Vec<AuditEvent>,
    /// Matching events before pagination.
    pub total: usize,
    pub has_more: bool,
    pub applied_limit: u32,
}

/// Lifecycle columns of one node row, as read by the reconstructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLifecycle {
    pub kind: EntityKind,
    pub id: NodeId,
    pub name: String,
    pub created_by: String,
    pub created_at: i64,
    pub updated_by: String,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    pub deleted_by: Option<String>,
}

impl NodeLifecycle {
    /// Per-row adapter: created always, updated iff touched, deleted iff tombstoned.
    pub fn events(&self) -> Vec<AuditEvent> {
        let node = NodeRef::new(self.kind, self.id);
        let mut events = vec![AuditEvent::NodeCreated {
            node,
            name: self.name.clone(),
            actor: self.created_by.clone(),
            at: self.created_at,
        }];
        if self.updated_at != self.created_at {
            events.push(AuditEvent::NodeUpdated {
                node,
                name: self.name.clone(),
                actor: self.updated_by.clone(),
                at: self.updated_at,
            });
        }
        if let Some(deleted_at) = self.deleted_at {
            events.push(AuditEvent::NodeDeleted {
                node,
                name: self.name.clone(),
                actor: self.deleted_by.clone().unwrap_or_default(),
                at: deleted_at,
            });
        }
        events
    }
}

/// Lifecycle columns of one relationship row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipLifecycle {
    pub id: RelationshipId,
    pub kind: RelationshipKind,
    pub source: NodeRef,
    pub target: NodeRef,
    pub created_by: String,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
    pub deleted_by: Option<String>,
}

impl RelationshipLifecycle {
    /// Per-row adapter; `label` is the rendered "{source} {phrase} {target}".
    pub fn events(&self, label: &str) -> Vec<AuditEvent> {
        let mut events = vec![AuditEvent::RelationshipCreated {
            id: self.id,
            kind: self.kind,
            source: self.source,
            target: self.target,
            label: label.to_string(),
            actor: self.created_by.clone(),
            at: self.created_at,
        }];
        if let Some(deleted_at) = self.deleted_at {
            events.push(AuditEvent::RelationshipDeleted {
                id: self.id,
                kind: self.kind,
                source: self.source,
                target: self.target,
                label: label.to_string(),
                actor: self.deleted_by.clone().unwrap_or_default(),
                at: deleted_at,
            });
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle(updated_at: i64, deleted_at: Option<i64>) -> NodeLifecycle {
        NodeLifecycle {
            kind: EntityKind::Process,
            id: 3,
            name: "Order to Cash".to_string(),
            created_by: "alice".to_string(),
            created_at: 100,
            updated_by: "bob".to_string(),
            updated_at,
            deleted_at,
            deleted_by: deleted_at.map(|_| "carol".to_string()),
        }
    }

    #[test]
    fn untouched_node_emits_only_created() {
        let events = lifecycle(100, None).events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action(), AuditAction::Created);
        assert_eq!(events[0].actor(), "alice");
    }

    #[test]
    fn updated_and_deleted_node_emits_three_events() {
        let events = lifecycle(200, Some(300)).events();
        let actions: Vec<_> = events.iter().map(AuditEvent::action).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::Created,
                AuditAction::Updated,
                AuditAction::Deleted
            ]
        );
        assert_eq!(events[1].actor(), "bob");
        assert_eq!(events[2].actor(), "carol");
        assert_eq!(events[2].at(), 300);
    }

    #[test]
    fn sort_key_orders_newest_first_with_deterministic_ties() {
        let mut older = lifecycle(100, None);
        older.id = 1;
        let mut events = older.events();
        events.extend(lifecycle(100, Some(100)).events());
        events.sort_by_key(AuditEvent::sort_key);

        let order: Vec<_> = events
            .iter()
            .map(|event| (event.action(), event.record_id()))
            .collect();
        assert_eq!(
            order,
            vec![
                (AuditAction::Deleted, 3),
                (AuditAction::Created, 3),
                (AuditAction::Created, 1),
            ]
        );
    }

    #[test]
    fn events_serialize_with_variant_tag() {
        let event = &lifecycle(100, None).events()[0];
        let value = serde_json::to_value(event).unwrap();
        assert_eq!(value["event"], "node_created");
        assert_eq!(value["node"]["kind"], "process");
        assert_eq!(value["actor"], "alice");
    }
}
