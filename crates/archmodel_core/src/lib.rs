//! Core integrity engine for enterprise architecture meta-models.
//! This crate is the single source of truth for naming, relationship and
//! lifecycle invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig, MatrixRuleConfig, PageLimits};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use engine::ModelEngine;
pub use error::{ModelError, ModelResult, RecordRef};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::audit::{AuditAction, AuditEvent, AuditPage, AuditQuery, AuditSubject};
pub use model::kind::{EntityKind, RelationshipKind};
pub use model::matrix::{MatrixRule, RelationshipMatrix};
pub use model::name::normalize;
pub use model::node::{
    CreatedNode, NewNode, Node, NodeAttributes, NodeId, NodePatch, NodeRef, NodeValidationError,
    ProjectId,
};
pub use model::relationship::{NewRelationship, Relationship, RelationshipId};
pub use repo::{RepoError, RepoResult};
pub use service::node_service::{NodeListRequest, NodePage};
pub use service::relationship_service::TaggedRelationship;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
