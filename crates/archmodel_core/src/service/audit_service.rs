//! Audit history reconstruction.
//!
//! # Responsibility
//! - Synthesize lifecycle events from node and relationship rows.
//! - Merge, filter, sort and paginate them into one `AuditPage`.
//!
//! # Invariants
//! - Events are derived on read; nothing is persisted here.
//! - Soft-deleted rows still contribute their full history.
//! - `total` counts matches before pagination.

use crate::config::{PageLimits, DEFAULT_AUDIT_LIMITS};
use crate::error::ModelResult;
use crate::model::audit::{AuditEvent, AuditPage, AuditQuery, AuditSubject, RelationshipLifecycle};
use crate::model::kind::EntityKind;
use crate::model::node::{NodeRef, ProjectId};
use crate::repo::audit_repo::AuditRepository;
use log::{info, warn};
use std::collections::HashMap;
use std::time::Instant;

/// Audit service facade.
pub struct AuditService<R: AuditRepository> {
    repo: R,
    limits: PageLimits,
}

impl<R: AuditRepository> AuditService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_limits(repo, DEFAULT_AUDIT_LIMITS)
    }

    pub fn with_limits(repo: R, limits: PageLimits) -> Self {
        Self { repo, limits }
    }

    /// Returns one newest-first page of history for `project_id`.
    pub fn get_audit_history(
        &self,
        project_id: ProjectId,
        query: &AuditQuery,
    ) -> ModelResult<AuditPage> {
        let started_at = Instant::now();
        let result = self.history(project_id, query);
        match &result {
            Ok(page) => info!(
                "event=audit_history module=service status=ok total={} returned={} duration_ms={}",
                page.total,
                page.events.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=audit_history module=service status=error error_code={}",
                err.code()
            ),
        }
        result
    }

    fn history(&self, project_id: ProjectId, query: &AuditQuery) -> ModelResult<AuditPage> {
        let mut events = self.collect_events(project_id, query.subject)?;

        if let Some(action) = query.action {
            events.retain(|event| event.action() == action);
        }
        if let Some(needle) = query
            .search
            .as_deref()
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty())
        {
            events.retain(|event| event.name().to_lowercase().contains(&needle));
        }

        events.sort_by_key(AuditEvent::sort_key);
        Ok(paginate(
            events,
            self.limits.resolve(query.limit),
            query.offset,
        ))
    }

    fn collect_events(
        &self,
        project_id: ProjectId,
        subject: Option<AuditSubject>,
    ) -> ModelResult<Vec<AuditEvent>> {
        let mut events = Vec::new();

        if let Some(AuditSubject::Node(kind)) = subject {
            for lifecycle in self.repo.node_lifecycles(project_id, kind)? {
                events.extend(lifecycle.events());
            }
            return Ok(events);
        }

        // Relationship labels need every endpoint name, deleted ones included.
        let mut names = HashMap::new();
        for kind in EntityKind::ALL {
            for lifecycle in self.repo.node_lifecycles(project_id, kind)? {
                if subject.is_none() {
                    events.extend(lifecycle.events());
                }
                names.insert(NodeRef::new(lifecycle.kind, lifecycle.id), lifecycle.name);
            }
        }

        for lifecycle in self.repo.relationship_lifecycles(project_id)? {
            events.extend(lifecycle.events(&relationship_label(&lifecycle, &names)));
        }
        Ok(events)
    }
}

fn relationship_label(
    lifecycle: &RelationshipLifecycle,
    names: &HashMap<NodeRef, String>,
) -> String {
    let name_of = |node: NodeRef| {
        names
            .get(&node)
            .cloned()
            .unwrap_or_else(|| node.to_string())
    };
    format!(
        "{} {} {}",
        name_of(lifecycle.source),
        lifecycle.kind.phrase(),
        name_of(lifecycle.target)
    )
}

fn paginate(events: Vec<AuditEvent>, limit: u32, offset: u32) -> AuditPage {
    let total = events.len();
    let events = events
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect::<Vec<_>>();
    let has_more = (offset as usize).saturating_add(events.len()) < total;
    AuditPage {
        events,
        total,
        has_more,
        applied_limit: limit,
    }
}
