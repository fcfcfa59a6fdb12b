//! Relationship use-case service.
//!
//! # Responsibility
//! - Gate relationship creation on the directional matrix.
//! - Provide create/delete/get/list APIs for relationships.
//!
//! # Invariants
//! - Checks run in order: self-reference, matrix, endpoint existence.
//! - A rejected request writes nothing.

use crate::clock::{Clock, SystemClock};
use crate::error::{ModelError, ModelResult, RecordRef};
use crate::model::matrix::RelationshipMatrix;
use crate::model::node::{validate_actor, NodeId, NodeRef, ProjectId};
use crate::model::relationship::{NewRelationship, Relationship, RelationshipId};
use crate::repo::relationship_repo::RelationshipRepository;
use log::{info, warn};

/// Relationship request expressed in caller string tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedRelationship<'a> {
    pub project_id: ProjectId,
    pub source_kind: &'a str,
    pub source_id: NodeId,
    pub target_kind: &'a str,
    pub target_id: NodeId,
    pub relationship_kind: &'a str,
    pub description: Option<&'a str>,
    pub actor: &'a str,
}

/// Relationship service facade.
pub struct RelationshipService<R: RelationshipRepository, C: Clock = SystemClock> {
    repo: R,
    matrix: RelationshipMatrix,
    clock: C,
}

impl<R: RelationshipRepository> RelationshipService<R> {
    /// Creates service with the built-in matrix and wall clock.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, RelationshipMatrix::enterprise_default(), SystemClock)
    }
}

impl<R: RelationshipRepository, C: Clock> RelationshipService<R, C> {
    pub fn with_clock(repo: R, matrix: RelationshipMatrix, clock: C) -> Self {
        Self {
            repo,
            matrix,
            clock,
        }
    }

    pub fn matrix(&self) -> &RelationshipMatrix {
        &self.matrix
    }

    /// Creates one directed relationship.
    ///
    /// # Errors
    /// - `Validation` for a blank actor.
    /// - `SelfReference` when source and target are the same node.
    /// - `RelationshipMatrix` when the triple is not allowed; the error lists
    ///   the kinds that are.
    /// - `NotFound` when an endpoint is missing, deleted or in another project.
    pub fn create_relationship(&self, mut input: NewRelationship) -> ModelResult<RelationshipId> {
        input.actor = input.actor.trim().to_string();
        let result = validate_actor(&input.actor)
            .map_err(ModelError::from)
            .and_then(|()| self.matrix.validate(input.source, input.target, input.kind))
            .and_then(|()| {
                self.repo
                    .insert_relationship(&input, self.clock.now_ms())
                    .map_err(ModelError::from)
            });
        match &result {
            Ok(id) => info!(
                "event=relationship_create module=service status=ok id={} kind={} source={} target={}",
                id, input.kind, input.source, input.target
            ),
            Err(err) => warn!(
                "event=relationship_create module=service status=error kind={} source={} target={} error_code={}",
                input.kind,
                input.source,
                input.target,
                err.code()
            ),
        }
        result
    }

    /// Parses caller tags, then creates the relationship.
    ///
    /// # Errors
    /// - `InvalidEntityType` / `UnknownRelationshipKind` for unknown tags,
    ///   before any other check.
    /// - Everything `create_relationship` returns.
    pub fn create_relationship_tagged(
        &self,
        request: &TaggedRelationship<'_>,
    ) -> ModelResult<RelationshipId> {
        let source = NodeRef::new(request.source_kind.parse()?, request.source_id);
        let target = NodeRef::new(request.target_kind.parse()?, request.target_id);
        let kind = request.relationship_kind.parse()?;

        let mut input =
            NewRelationship::new(request.project_id, source, target, kind, request.actor);
        if let Some(description) = request.description {
            input = input.with_description(description);
        }
        self.create_relationship(input)
    }

    /// Soft-deletes one relationship; its endpoints are untouched.
    pub fn delete_relationship(
        &self,
        id: RelationshipId,
        project_id: ProjectId,
        actor: &str,
    ) -> ModelResult<()> {
        let result = validate_actor(actor)
            .map_err(ModelError::from)
            .and_then(|()| {
                self.repo
                    .soft_delete_relationship(id, project_id, actor.trim(), self.clock.now_ms())
                    .map_err(ModelError::from)
            });
        match &result {
            Ok(()) => info!(
                "event=relationship_delete module=service status=ok id={}",
                id
            ),
            Err(err) => warn!(
                "event=relationship_delete module=service status=error id={} error_code={}",
                id,
                err.code()
            ),
        }
        result
    }

    /// Loads one active relationship.
    pub fn get_relationship(
        &self,
        id: RelationshipId,
        project_id: ProjectId,
    ) -> ModelResult<Relationship> {
        self.repo
            .get_relationship(id, project_id, false)?
            .ok_or(ModelError::NotFound(RecordRef::Relationship(id)))
    }

    /// Lists active relationships touching `node`, or all of the project.
    pub fn list_relationships(
        &self,
        project_id: ProjectId,
        node: Option<NodeRef>,
    ) -> ModelResult<Vec<Relationship>> {
        Ok(self.repo.list_relationships(project_id, node)?)
    }
}
