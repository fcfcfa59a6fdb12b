//! Engine facade over one migrated connection.
//!
//! # Responsibility
//! - Wire node, relationship and audit services to SQLite repositories.
//! - Expose the external operations as one call surface.
//!
//! # Invariants
//! - All services share the same connection, clock and configuration.

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::ModelResult;
use crate::model::audit::{AuditPage, AuditQuery};
use crate::model::kind::EntityKind;
use crate::model::matrix::RelationshipMatrix;
use crate::model::node::{CreatedNode, NewNode, Node, NodeId, NodePatch, NodeRef, ProjectId};
use crate::model::relationship::{NewRelationship, Relationship, RelationshipId};
use crate::repo::audit_repo::SqliteAuditRepository;
use crate::repo::node_repo::SqliteNodeRepository;
use crate::repo::relationship_repo::SqliteRelationshipRepository;
use crate::service::audit_service::AuditService;
use crate::service::node_service::{NodeListRequest, NodePage, NodeService};
use crate::service::relationship_service::{RelationshipService, TaggedRelationship};
use rusqlite::Connection;

pub struct ModelEngine<'conn, C: Clock + Clone = SystemClock> {
    nodes: NodeService<SqliteNodeRepository<'conn>, C>,
    relationships: RelationshipService<SqliteRelationshipRepository<'conn>, C>,
    audit: AuditService<SqliteAuditRepository<'conn>>,
}

impl<'conn> ModelEngine<'conn> {
    /// Builds an engine on the wall clock.
    ///
    /// # Errors
    /// - `InvalidEntityType` / `UnknownRelationshipKind` for a bad matrix
    ///   override.
    /// - `StorageUnavailable` when `conn` is not migrated.
    pub fn new(conn: &'conn Connection, config: &EngineConfig) -> ModelResult<Self> {
        Self::with_clock(conn, config, SystemClock)
    }
}

impl<'conn, C: Clock + Clone> ModelEngine<'conn, C> {
    pub fn with_clock(
        conn: &'conn Connection,
        config: &EngineConfig,
        clock: C,
    ) -> ModelResult<Self> {
        let matrix = config.relationship_matrix()?;
        Ok(Self {
            nodes: NodeService::with_clock(
                SqliteNodeRepository::try_new(conn)?,
                clock.clone(),
                config.list_limits,
            ),
            relationships: RelationshipService::with_clock(
                SqliteRelationshipRepository::try_new(conn)?,
                matrix,
                clock,
            ),
            audit: AuditService::with_limits(
                SqliteAuditRepository::try_new(conn)?,
                config.audit_limits,
            ),
        })
    }

    pub fn matrix(&self) -> &RelationshipMatrix {
        self.relationships.matrix()
    }

    pub fn create_node(&self, kind: EntityKind, input: NewNode) -> ModelResult<CreatedNode> {
        self.nodes.create_node(kind, input)
    }

    pub fn update_node(
        &self,
        kind: EntityKind,
        id: NodeId,
        project_id: ProjectId,
        patch: NodePatch,
    ) -> ModelResult<()> {
        self.nodes.update_node(kind, id, project_id, patch)
    }

    pub fn delete_node(
        &self,
        kind: EntityKind,
        id: NodeId,
        project_id: ProjectId,
        actor: &str,
    ) -> ModelResult<()> {
        self.nodes.delete_node(kind, id, project_id, actor)
    }

    pub fn get_node(
        &self,
        kind: EntityKind,
        id: NodeId,
        project_id: ProjectId,
    ) -> ModelResult<Node> {
        self.nodes.get_node(kind, id, project_id)
    }

    pub fn list_nodes(
        &self,
        project_id: ProjectId,
        kind: EntityKind,
        request: &NodeListRequest,
    ) -> ModelResult<NodePage> {
        self.nodes.list_nodes(project_id, kind, request)
    }

    pub fn create_relationship(&self, input: NewRelationship) -> ModelResult<RelationshipId> {
        self.relationships.create_relationship(input)
    }

    pub fn create_relationship_tagged(
        &self,
        request: &TaggedRelationship<'_>,
    ) -> ModelResult<RelationshipId> {
        self.relationships.create_relationship_tagged(request)
    }

    pub fn delete_relationship(
        &self,
        id: RelationshipId,
        project_id: ProjectId,
        actor: &str,
    ) -> ModelResult<()> {
        self.relationships
            .delete_relationship(id, project_id, actor)
    }

    pub fn get_relationship(
        &self,
        id: RelationshipId,
        project_id: ProjectId,
    ) -> ModelResult<Relationship> {
        self.relationships.get_relationship(id, project_id)
    }

    pub fn list_relationships(
        &self,
        project_id: ProjectId,
        node: Option<NodeRef>,
    ) -> ModelResult<Vec<Relationship>> {
        self.relationships.list_relationships(project_id, node)
    }

    pub fn get_audit_history(
        &self,
        project_id: ProjectId,
        query: &AuditQuery,
    ) -> ModelResult<AuditPage> {
        self.audit.get_audit_history(project_id, query)
    }
}
