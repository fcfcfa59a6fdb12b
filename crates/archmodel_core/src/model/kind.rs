//! Entity type registry.
//!
//! # Responsibility
//! - Define the closed set of node kinds and relationship kinds.
//! - Map each node kind to its backing table and attribute columns.
//! - Parse caller-supplied string tags at the boundary.
//!
//! # Invariants
//! - Tags returned by `as_str` are the persisted values; they never change.
//! - Parsing is case-insensitive and treats `-`, ` ` and `_` alike.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Meta-model node category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Capability,
    Application,
    Process,
    DataEntity,
    Requirement,
}

impl EntityKind {
    /// All registered kinds, in registry order.
    pub const ALL: [EntityKind; 5] = [
        Self::Capability,
        Self::Application,
        Self::Process,
        Self::DataEntity,
        Self::Requirement,
    ];

    /// Stable tag used in storage and at API boundaries.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Capability => "capability",
            Self::Application => "application",
            Self::Process => "process",
            Self::DataEntity => "data_entity",
            Self::Requirement => "requirement",
        }
    }

    /// Backing table for nodes of this kind.
    pub fn table(self) -> &'static str {
        match self {
            Self::Capability => "capabilities",
            Self::Application => "applications",
            Self::Process => "processes",
            Self::DataEntity => "data_entities",
            Self::Requirement => "requirements",
        }
    }

    /// Kind-specific columns, in the order the node repository binds them.
    pub fn attribute_columns(self) -> &'static [&'static str] {
        match self {
            Self::Capability => &["level", "owner"],
            Self::Application => &["vendor", "lifecycle"],
            Self::Process => &["owner", "automation"],
            Self::DataEntity => &["classification", "steward"],
            Self::Requirement => &["priority", "status"],
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match canonical_tag(value).as_str() {
            "capability" | "capabilities" => Ok(Self::Capability),
            "application" | "applications" => Ok(Self::Application),
            "process" | "processes" => Ok(Self::Process),
            "data_entity" | "data_entities" | "dataentity" => Ok(Self::DataEntity),
            "requirement" | "requirements" => Ok(Self::Requirement),
            _ => Err(ModelError::InvalidEntityType(value.trim().to_string())),
        }
    }
}

/// Directed relationship category between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Supports,
    Realizes,
    Automates,
    Uses,
    Reads,
    Writes,
    Owns,
    DependsOn,
    IntegratesWith,
    ComposedOf,
    Precedes,
    Constrains,
    Satisfies,
    RelatesTo,
}

impl RelationshipKind {
    pub const ALL: [RelationshipKind; 14] = [
        Self::Supports,
        Self::Realizes,
        Self::Automates,
        Self::Uses,
        Self::Reads,
        Self::Writes,
        Self::Owns,
        Self::DependsOn,
        Self::IntegratesWith,
        Self::ComposedOf,
        Self::Precedes,
        Self::Constrains,
        Self::Satisfies,
        Self::RelatesTo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Supports => "supports",
            Self::Realizes => "realizes",
            Self::Automates => "automates",
            Self::Uses => "uses",
            Self::Reads => "reads",
            Self::Writes => "writes",
            Self::Owns => "owns",
            Self::DependsOn => "depends_on",
            Self::IntegratesWith => "integrates_with",
            Self::ComposedOf => "composed_of",
            Self::Precedes => "precedes",
            Self::Constrains => "constrains",
            Self::Satisfies => "satisfies",
            Self::RelatesTo => "relates_to",
        }
    }

    /// Lowercase phrase used when rendering a relationship as text.
    pub fn phrase(self) -> &'static str {
        match self {
            Self::DependsOn => "depends on",
            Self::IntegratesWith => "integrates with",
            Self::ComposedOf => "composed of",
            Self::RelatesTo => "relates to",
            other => other.as_str(),
        }
    }
}

impl Display for RelationshipKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipKind {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let tag = canonical_tag(value);
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| ModelError::UnknownRelationshipKind(value.trim().to_string()))
    }
}

fn canonical_tag(value: &str) -> String {
    value
        .trim()
        .to_ascii_lowercase()
        .split(|ch: char| ch == '-' || ch == '_' || ch.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
