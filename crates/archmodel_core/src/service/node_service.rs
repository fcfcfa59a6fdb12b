//! Node use-case service.
//!
//! # Responsibility
//! - Provide create/update/delete/get/list APIs for the five node kinds.
//! - Guard name uniqueness per `(project, kind)` on normalized keys.
//!
//! # Invariants
//! - The duplicate pre-check is a fast path only; a unique-index violation
//!   from storage is reported as the same `DuplicateName` error.
//! - Deleting a node tombstones its active relationships in the same
//!   transaction.
//! - An update always moves `updated_at` strictly past its previous value.

use crate::clock::{Clock, SystemClock};
use crate::config::{PageLimits, DEFAULT_LIST_LIMITS};
use crate::error::{ModelError, ModelResult, RecordRef};
use crate::model::kind::EntityKind;
use crate::model::name::{normalize, suggest_available_name, suggestion_key_prefix};
use crate::model::node::{
    validate_actor, validate_name, CreatedNode, NewNode, Node, NodeAttributes, NodeId, NodePatch,
    NodeRef, NodeValidationError, ProjectId,
};
use crate::repo::node_repo::{NodeInsert, NodeListQuery, NodeRepository};
use crate::repo::RepoError;
use log::{info, warn};
use serde::Serialize;
use std::time::Instant;

/// List result envelope used by service callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodePage {
    /// Active nodes sorted by `normalized_name ASC, id ASC`.
    pub items: Vec<Node>,
    /// Matching nodes before pagination.
    pub total: usize,
    pub has_more: bool,
    pub applied_limit: u32,
}

/// Filter and page for `list_nodes`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeListRequest {
    /// Substring matched on the normalized name.
    pub search: Option<String>,
    /// `None` applies the configured default.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Node service facade.
pub struct NodeService<R: NodeRepository, C: Clock = SystemClock> {
    repo: R,
    clock: C,
    limits: PageLimits,
}

impl<R: NodeRepository> NodeService<R> {
    /// Creates service with the wall clock and default page limits.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, SystemClock, DEFAULT_LIST_LIMITS)
    }
}

impl<R: NodeRepository, C: Clock> NodeService<R, C> {
    pub fn with_clock(repo: R, clock: C, limits: PageLimits) -> Self {
        Self {
            repo,
            clock,
            limits,
        }
    }

    /// Creates one node of `kind`.
    ///
    /// # Errors
    /// - `Validation` for blank actor/name, oversized name, bad attributes,
    ///   or attributes of another kind.
    /// - `DuplicateName` when an active node of the same kind and project
    ///   already holds the normalized name.
    pub fn create_node(&self, kind: EntityKind, input: NewNode) -> ModelResult<CreatedNode> {
        let started_at = Instant::now();
        let result = self.create_node_inner(kind, &input);
        match &result {
            Ok(created) => info!(
                "event=node_create module=service status=ok kind={} id={} duration_ms={}",
                kind,
                created.id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=node_create module=service status=error kind={} error_code={}",
                kind,
                err.code()
            ),
        }
        result
    }

    fn create_node_inner(&self, kind: EntityKind, input: &NewNode) -> ModelResult<CreatedNode> {
        validate_actor(&input.actor)?;
        let normalized_name = validate_name(&input.name)?;
        check_attributes(kind, &input.attributes)?;
        self.ensure_name_available(input.project_id, kind, &input.name, None)?;

        let at = self.clock.now_ms();
        let insert = NodeInsert {
            project_id: input.project_id,
            name: input.name.trim(),
            normalized_name: &normalized_name,
            description: input.description.as_deref(),
            attributes: &input.attributes,
            actor: input.actor.trim(),
            at,
        };
        let id = match self.repo.insert_node(&insert) {
            Ok(id) => id,
            Err(RepoError::UniqueViolation { .. }) => {
                return Err(self.duplicate_name(input.project_id, kind, &input.name)?)
            }
            Err(err) => return Err(err.into()),
        };

        Ok(CreatedNode {
            id,
            normalized_name,
        })
    }

    /// Applies `patch` to one active node.
    ///
    /// An empty patch only checks that the node exists.
    ///
    /// # Errors
    /// - `NotFound` when the node is missing, deleted or in another project.
    /// - `DuplicateName` when a rename collides with another active node.
    /// - `Validation` for bad names, attributes or actor.
    pub fn update_node(
        &self,
        kind: EntityKind,
        id: NodeId,
        project_id: ProjectId,
        patch: NodePatch,
    ) -> ModelResult<()> {
        let result = self.update_node_inner(kind, id, project_id, patch);
        match &result {
            Ok(()) => info!(
                "event=node_update module=service status=ok kind={} id={}",
                kind, id
            ),
            Err(err) => warn!(
                "event=node_update module=service status=error kind={} id={} error_code={}",
                kind,
                id,
                err.code()
            ),
        }
        result
    }

    fn update_node_inner(
        &self,
        kind: EntityKind,
        id: NodeId,
        project_id: ProjectId,
        patch: NodePatch,
    ) -> ModelResult<()> {
        validate_actor(&patch.actor)?;
        let mut node = self.get_node(kind, id, project_id)?;
        if patch.is_empty() {
            return Ok(());
        }

        if let Some(name) = patch.name {
            let normalized_name = validate_name(&name)?;
            if normalized_name != node.normalized_name {
                self.ensure_name_available(project_id, kind, &name, Some(id))?;
            }
            node.name = name.trim().to_string();
            node.normalized_name = normalized_name;
        }
        if let Some(description) = patch.description {
            node.description = description;
        }
        if let Some(attributes) = patch.attributes {
            check_attributes(kind, &attributes)?;
            node.attributes = attributes;
        }
        node.updated_by = patch.actor.trim().to_string();
        node.updated_at = self.clock.now_ms().max(node.updated_at + 1);

        match self.repo.update_node(&node) {
            Ok(()) => Ok(()),
            Err(RepoError::UniqueViolation { .. }) => {
                Err(self.duplicate_name(project_id, kind, &node.name)?)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Soft-deletes one node and cascades to its active relationships.
    ///
    /// # Errors
    /// - `NotFound` when the node is missing or already deleted.
    /// - `StorageUnavailable` when the cascade fails; nothing is changed.
    pub fn delete_node(
        &self,
        kind: EntityKind,
        id: NodeId,
        project_id: ProjectId,
        actor: &str,
    ) -> ModelResult<()> {
        let started_at = Instant::now();
        let result = validate_actor(actor)
            .map_err(ModelError::from)
            .and_then(|()| {
                self.repo
                    .soft_delete_node(
                        NodeRef::new(kind, id),
                        project_id,
                        actor.trim(),
                        self.clock.now_ms(),
                    )
                    .map_err(ModelError::from)
            });
        match &result {
            Ok(cascaded) => info!(
                "event=node_delete module=service status=ok kind={} id={} cascaded={} duration_ms={}",
                kind,
                id,
                cascaded,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=node_delete module=service status=error kind={} id={} error_code={}",
                kind,
                id,
                err.code()
            ),
        }
        result.map(|_| ())
    }

    /// Loads one active node.
    pub fn get_node(
        &self,
        kind: EntityKind,
        id: NodeId,
        project_id: ProjectId,
    ) -> ModelResult<Node> {
        let node = NodeRef::new(kind, id);
        self.repo
            .get_node(node, project_id, false)?
            .ok_or(ModelError::NotFound(RecordRef::Node(node)))
    }

    /// Lists active nodes of one kind with stable pagination.
    pub fn list_nodes(
        &self,
        project_id: ProjectId,
        kind: EntityKind,
        request: &NodeListRequest,
    ) -> ModelResult<NodePage> {
        let applied_limit = self.limits.resolve(request.limit);
        let query = NodeListQuery {
            project_id,
            kind,
            search: request
                .search
                .as_deref()
                .map(normalize)
                .filter(|value| !value.is_empty()),
            limit: applied_limit,
            offset: request.offset,
        };

        let items = self.repo.list_nodes(&query)?;
        let total = self.repo.count_nodes(&query)?;
        let has_more = (request.offset as usize).saturating_add(items.len()) < total;
        Ok(NodePage {
            items,
            total,
            has_more,
            applied_limit,
        })
    }

    /// Fails with `DuplicateName` when `name` is held by an active node of
    /// `kind` in `project_id` other than `except`.
    pub fn ensure_name_available(
        &self,
        project_id: ProjectId,
        kind: EntityKind,
        name: &str,
        except: Option<NodeId>,
    ) -> ModelResult<()> {
        let normalized_name = validate_name(name)?;
        match self
            .repo
            .find_active_by_normalized_name(project_id, kind, &normalized_name)?
        {
            Some(holder) if Some(holder) != except => {
                Err(self.duplicate_name(project_id, kind, name)?)
            }
            _ => Ok(()),
        }
    }

    fn duplicate_name(
        &self,
        project_id: ProjectId,
        kind: EntityKind,
        name: &str,
    ) -> ModelResult<ModelError> {
        let prefix = suggestion_key_prefix(name);
        let taken = self
            .repo
            .active_names_with_prefix(project_id, kind, &prefix)?;
        Ok(ModelError::DuplicateName {
            project_id,
            kind,
            normalized_name: normalize(name),
            suggestion: suggest_available_name(name, &taken),
        })
    }
}

fn check_attributes(kind: EntityKind, attributes: &NodeAttributes) -> ModelResult<()> {
    if attributes.kind() != kind {
        return Err(NodeValidationError::AttributeKindMismatch {
            expected: kind,
            actual: attributes.kind(),
        }
        .into());
    }
    attributes.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::check_attributes;
    use crate::error::ModelError;
    use crate::model::kind::EntityKind;
    use crate::model::node::{NodeAttributes, NodeValidationError};

    #[test]
    fn attributes_must_match_kind() {
        let err = check_attributes(
            EntityKind::Process,
            &NodeAttributes::default_for(EntityKind::Application),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ModelError::Validation(NodeValidationError::AttributeKindMismatch {
                expected: EntityKind::Process,
                actual: EntityKind::Application,
            })
        ));
    }

    #[test]
    fn capability_level_is_range_checked() {
        let attributes = NodeAttributes::Capability {
            level: 9,
            owner: None,
        };
        assert!(matches!(
            check_attributes(EntityKind::Capability, &attributes),
            Err(ModelError::Validation(
                NodeValidationError::CapabilityLevelOutOfRange(9)
            ))
        ));
    }
}
