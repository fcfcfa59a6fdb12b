//! Node domain model.
//!
//! # Responsibility
//! - Define the canonical record shared by all five node kinds.
//! - Carry kind-specific attributes as a closed, typed union.
//! - Validate caller input before it reaches persistence.
//!
//! # Invariants
//! - `attributes.kind()` is the node's kind; there is no separate tag.
//! - `deleted_at` and `deleted_by` are either both set or both unset.
//! - `normalized_name == normalize(name)` for every persisted node.

use crate::model::kind::EntityKind;
use crate::model::name::normalize;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;
use uuid::Uuid;

/// Row id of a node within its kind table.
pub type NodeId = i64;

/// Caller-owned project scope.
pub type ProjectId = Uuid;

/// Upper bound on display name length, in characters.
pub const MAX_NAME_CHARS: usize = 200;

/// Addresses one node across kind tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub kind: EntityKind,
    pub id: NodeId,
}

impl NodeRef {
    pub fn new(kind: EntityKind, id: NodeId) -> Self {
        Self { kind, id }
    }
}

impl Display for NodeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationLifecycle {
    Planned,
    Active,
    Retiring,
    Retired,
}

impl ApplicationLifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::Retiring => "retiring",
            Self::Retired => "retired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "planned" => Some(Self::Planned),
            "active" => Some(Self::Active),
            "retiring" => Some(Self::Retiring),
            "retired" => Some(Self::Retired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationLevel {
    Manual,
    Partial,
    Full,
}

impl AutomationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Partial => "partial",
            Self::Full => "full",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(Self::Manual),
            "partial" => Some(Self::Partial),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataClassification {
    Public,
    Internal,
    Confidential,
    Restricted,
}

impl DataClassification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Confidential => "confidential",
            Self::Restricted => "restricted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "internal" => Some(Self::Internal),
            "confidential" => Some(Self::Confidential),
            "restricted" => Some(Self::Restricted),
            _ => None,
        }
    }
}

/// MoSCoW priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementPriority {
    Must,
    Should,
    Could,
    Wont,
}

impl RequirementPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Must => "must",
            Self::Should => "should",
            Self::Could => "could",
            Self::Wont => "wont",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "must" => Some(Self::Must),
            "should" => Some(Self::Should),
            "could" => Some(Self::Could),
            "wont" => Some(Self::Wont),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    Draft,
    Approved,
    Implemented,
}

impl RequirementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Implemented => "implemented",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "approved" => Some(Self::Approved),
            "implemented" => Some(Self::Implemented),
            _ => None,
        }
    }
}

/// Kind-specific node attributes.
///
/// The variant decides which table the node lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeAttributes {
    Capability {
        /// Decomposition depth, 1 = top-level capability.
        level: u8,
        owner: Option<String>,
    },
    Application {
        vendor: Option<String>,
        lifecycle: ApplicationLifecycle,
    },
    Process {
        owner: Option<String>,
        automation: AutomationLevel,
    },
    DataEntity {
        classification: DataClassification,
        steward: Option<String>,
    },
    Requirement {
        priority: RequirementPriority,
        status: RequirementStatus,
    },
}

impl NodeAttributes {
    /// Attributes a node of `kind` gets when the caller supplies none.
    pub fn default_for(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Capability => Self::Capability {
                level: 1,
                owner: None,
            },
            EntityKind::Application => Self::Application {
                vendor: None,
                lifecycle: ApplicationLifecycle::Active,
            },
            EntityKind::Process => Self::Process {
                owner: None,
                automation: AutomationLevel::Manual,
            },
            EntityKind::DataEntity => Self::DataEntity {
                classification: DataClassification::Internal,
                steward: None,
            },
            EntityKind::Requirement => Self::Requirement {
                priority: RequirementPriority::Should,
                status: RequirementStatus::Draft,
            },
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Capability { .. } => EntityKind::Capability,
            Self::Application { .. } => EntityKind::Application,
            Self::Process { .. } => EntityKind::Process,
            Self::DataEntity { .. } => EntityKind::DataEntity,
            Self::Requirement { .. } => EntityKind::Requirement,
        }
    }

    /// Checks value ranges that the type system does not encode.
    pub fn validate(&self) -> Result<(), NodeValidationError> {
        if let Self::Capability { level, .. } = self {
            if !(1..=5).contains(level) {
                return Err(NodeValidationError::CapabilityLevelOutOfRange(*level));
            }
        }
        Ok(())
    }
}

/// Persisted node row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub project_id: ProjectId,
    pub name: String,
    pub normalized_name: String,
    pub description: Option<String>,
    pub attributes: NodeAttributes,
    pub created_by: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub updated_by: String,
    /// Epoch milliseconds. Equal to `created_at` until the first update.
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    pub deleted_by: Option<String>,
}

impl Node {
    pub fn kind(&self) -> EntityKind {
        self.attributes.kind()
    }

    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(self.kind(), self.id)
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Input for node creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub project_id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub attributes: NodeAttributes,
    /// Authenticated caller identity recorded as `created_by`.
    pub actor: String,
}

impl NewNode {
    /// Creates input with default attributes for `kind`.
    pub fn new(
        project_id: ProjectId,
        kind: EntityKind,
        name: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            project_id,
            name: name.into(),
            description: None,
            attributes: NodeAttributes::default_for(kind),
            actor: actor.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_attributes(mut self, attributes: NodeAttributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Partial update for one node. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePatch {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub attributes: Option<NodeAttributes>,
    /// Recorded as `updated_by`.
    pub actor: String,
}

impl NodePatch {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            ..Self::default()
        }
    }

    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn describe(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_attributes(mut self, attributes: NodeAttributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.attributes.is_none()
    }
}

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedNode {
    pub id: NodeId,
    pub normalized_name: String,
}

/// Caller input rejected before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeValidationError {
    #[error("name must not be blank")]
    BlankName,
    #[error("name is {actual} characters, limit is {max}")]
    NameTooLong { max: usize, actual: usize },
    #[error("actor must not be blank")]
    BlankActor,
    #[error("capability level {0} is outside 1..=5")]
    CapabilityLevelOutOfRange(u8),
    #[error("attributes for `{actual}` cannot be stored as `{expected}`")]
    AttributeKindMismatch {
        expected: EntityKind,
        actual: EntityKind,
    },
}

/// Validates a display name and returns its canonical key.
pub fn validate_name(name: &str) -> Result<String, NodeValidationError> {
    let normalized = normalize(name);
    if normalized.is_empty() {
        return Err(NodeValidationError::BlankName);
    }
    let actual = name.trim().chars().count();
    if actual > MAX_NAME_CHARS {
        return Err(NodeValidationError::NameTooLong {
            max: MAX_NAME_CHARS,
            actual,
        });
    }
    Ok(normalized)
}

pub(crate) fn validate_actor(actor: &str) -> Result<(), NodeValidationError> {
    if actor.trim().is_empty() {
        return Err(NodeValidationError::BlankActor);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_attributes_match_requested_kind() {
        for kind in EntityKind::ALL {
            let attributes = NodeAttributes::default_for(kind);
            assert_eq!(attributes.kind(), kind);
            assert!(attributes.validate().is_ok());
        }
    }

    #[test]
    fn capability_level_is_range_checked() {
        let attributes = NodeAttributes::Capability {
            level: 6,
            owner: None,
        };
        assert_eq!(
            attributes.validate(),
            Err(NodeValidationError::CapabilityLevelOutOfRange(6))
        );
    }

    #[test]
    fn validate_name_rejects_blank_and_oversized() {
        assert_eq!(validate_name("   "), Err(NodeValidationError::BlankName));
        let long = "x".repeat(MAX_NAME_CHARS + 1);
        assert!(matches!(
            validate_name(&long),
            Err(NodeValidationError::NameTooLong { .. })
        ));
        assert_eq!(validate_name(" Order  To Cash").unwrap(), "order to cash");
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(NodePatch::new("alice").is_empty());
        assert!(!NodePatch::new("alice").rename("CRM").is_empty());
        assert!(!NodePatch::new("alice").describe(None).is_empty());
    }

    #[test]
    fn attributes_serialize_with_kind_tag() {
        let value = serde_json::to_value(NodeAttributes::default_for(EntityKind::DataEntity))
            .unwrap();
        assert_eq!(value["kind"], "data_entity");
        assert_eq!(value["classification"], "internal");
    }
}
