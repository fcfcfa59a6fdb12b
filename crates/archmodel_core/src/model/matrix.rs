//! Directional relationship matrix.
//!
//! # Responsibility
//! - Hold the legal `(source kind, target kind) -> relationship kinds` table.
//! - Validate relationship requests against it.
//!
//! # Invariants
//! - Direction matters: allowing `A -> B` never implies `B -> A`.
//! - Self-references are rejected before the table is consulted.

use crate::error::{ModelError, ModelResult};
use crate::model::kind::{EntityKind, RelationshipKind};
use crate::model::node::NodeRef;
use std::collections::{BTreeMap, BTreeSet};

/// One matrix row: every kind allowed from `source` to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixRule {
    pub source: EntityKind,
    pub target: EntityKind,
    pub kinds: Vec<RelationshipKind>,
}

/// Legal relationship triples, keyed by ordered kind pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipMatrix {
    rules: BTreeMap<(EntityKind, EntityKind), BTreeSet<RelationshipKind>>,
}

impl RelationshipMatrix {
    /// Creates a matrix that allows nothing.
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Built-in enterprise architecture matrix.
    pub fn enterprise_default() -> Self {
        use EntityKind::{Application, Capability, DataEntity, Process, Requirement};
        use RelationshipKind::*;

        Self::empty()
            .allow(Application, Capability, [Supports, Realizes])
            .allow(Process, Capability, [Supports, Realizes])
            .allow(Capability, Capability, [ComposedOf, DependsOn])
            .allow(Application, Process, [Supports, Automates])
            .allow(Application, Application, [DependsOn, IntegratesWith, Uses])
            .allow(Application, DataEntity, [Reads, Writes, Owns])
            .allow(Process, DataEntity, [Reads, Writes, Uses])
            .allow(Process, Process, [Precedes, ComposedOf])
            .allow(DataEntity, DataEntity, [ComposedOf, RelatesTo])
            .allow(Application, Requirement, [Satisfies])
            .allow(Process, Requirement, [Satisfies])
            .allow(Requirement, Capability, [Constrains])
            .allow(Requirement, Application, [Constrains])
            .allow(Requirement, Process, [Constrains])
            .allow(Requirement, DataEntity, [Constrains])
            .allow(Requirement, Requirement, [DependsOn, RelatesTo])
    }

    /// Adds `kinds` to the allowed set for `source -> target`.
    pub fn allow(
        mut self,
        source: EntityKind,
        target: EntityKind,
        kinds: impl IntoIterator<Item = RelationshipKind>,
    ) -> Self {
        self.insert(source, target, kinds);
        self
    }

    pub(crate) fn insert(
        &mut self,
        source: EntityKind,
        target: EntityKind,
        kinds: impl IntoIterator<Item = RelationshipKind>,
    ) {
        self.rules
            .entry((source, target))
            .or_default()
            .extend(kinds);
    }

    /// Legal kinds for `source -> target`, sorted; empty when the pair is illegal.
    pub fn allowed_kinds(&self, source: EntityKind, target: EntityKind) -> Vec<RelationshipKind> {
        self.rules
            .get(&(source, target))
            .map(|kinds| kinds.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_allowed(
        &self,
        source: EntityKind,
        target: EntityKind,
        kind: RelationshipKind,
    ) -> bool {
        self.rules
            .get(&(source, target))
            .is_some_and(|kinds| kinds.contains(&kind))
    }

    /// Iterates rows in `(source, target)` order.
    pub fn rules(&self) -> impl Iterator<Item = MatrixRule> + '_ {
        self.rules.iter().map(|((source, target), kinds)| MatrixRule {
            source: *source,
            target: *target,
            kinds: kinds.iter().copied().collect(),
        })
    }

    /// Number of legal triples.
    pub fn triple_count(&self) -> usize {
        self.rules.values().map(BTreeSet::len).sum()
    }

    /// Validates one requested relationship.
    ///
    /// # Errors
    /// - `SelfReference` when both endpoints are the same node.
    /// - `RelationshipMatrix` when the triple is not listed.
    pub fn validate(
        &self,
        source: NodeRef,
        target: NodeRef,
        kind: RelationshipKind,
    ) -> ModelResult<()> {
        if source == target {
            return Err(ModelError::SelfReference(source));
        }

        if !self.is_allowed(source.kind, target.kind, kind) {
            return Err(ModelError::RelationshipMatrix {
                source_kind: source.kind,
                target_kind: target.kind,
                relationship_kind: kind,
                allowed: self.allowed_kinds(source.kind, target.kind),
            });
        }

        Ok(())
    }
}

impl Default for RelationshipMatrix {
    fn default() -> Self {
        Self::enterprise_default()
    }
}

#[cfg(test)]
mod tests {
    use super::RelationshipMatrix;
    use crate::error::ModelError;
    use crate::model::kind::{EntityKind, RelationshipKind};
    use crate::model::node::NodeRef;

    fn node(kind: EntityKind, id: i64) -> NodeRef {
        NodeRef::new(kind, id)
    }

    #[test]
    fn listed_triple_is_accepted() {
        let matrix = RelationshipMatrix::enterprise_default();
        matrix
            .validate(
                node(EntityKind::Application, 2),
                node(EntityKind::Capability, 1),
                RelationshipKind::Supports,
            )
            .unwrap();
    }

    #[test]
    fn reversed_pair_is_rejected_with_empty_alternatives() {
        let matrix = RelationshipMatrix::enterprise_default();
        let err = matrix
            .validate(
                node(EntityKind::Capability, 1),
                node(EntityKind::Application, 2),
                RelationshipKind::Supports,
            )
            .unwrap_err();
        match err {
            ModelError::RelationshipMatrix {
                source_kind,
                target_kind,
                allowed,
                ..
            } => {
                assert_eq!(source_kind, EntityKind::Capability);
                assert_eq!(target_kind, EntityKind::Application);
                assert!(allowed.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_kind_for_legal_pair_lists_alternatives() {
        let matrix = RelationshipMatrix::enterprise_default();
        let err = matrix
            .validate(
                node(EntityKind::Application, 2),
                node(EntityKind::DataEntity, 7),
                RelationshipKind::Supports,
            )
            .unwrap_err();
        match err {
            ModelError::RelationshipMatrix { allowed, .. } => assert_eq!(
                allowed,
                vec![
                    RelationshipKind::Reads,
                    RelationshipKind::Writes,
                    RelationshipKind::Owns
                ]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn self_reference_fails_for_every_kind() {
        let matrix = RelationshipMatrix::enterprise_default();
        for kind in EntityKind::ALL {
            for relationship_kind in RelationshipKind::ALL {
                let err = matrix
                    .validate(node(kind, 5), node(kind, 5), relationship_kind)
                    .unwrap_err();
                assert!(matches!(err, ModelError::SelfReference(_)));
            }
        }
    }

    #[test]
    fn same_id_across_kinds_is_not_self_reference() {
        let matrix = RelationshipMatrix::enterprise_default();
        matrix
            .validate(
                node(EntityKind::Application, 5),
                node(EntityKind::Capability, 5),
                RelationshipKind::Realizes,
            )
            .unwrap();
    }

    #[test]
    fn custom_matrix_preserves_direction_exactly() {
        let matrix = RelationshipMatrix::empty().allow(
            EntityKind::Capability,
            EntityKind::Application,
            [RelationshipKind::Realizes],
        );
        assert!(matrix.is_allowed(
            EntityKind::Capability,
            EntityKind::Application,
            RelationshipKind::Realizes
        ));
        assert!(!matrix.is_allowed(
            EntityKind::Application,
            EntityKind::Capability,
            RelationshipKind::Realizes
        ));
        assert_eq!(matrix.triple_count(), 1);
    }

    #[test]
    fn rules_iterate_in_pair_order() {
        let matrix = RelationshipMatrix::enterprise_default();
        let pairs: Vec<_> = matrix
            .rules()
            .map(|rule| (rule.source, rule.target))
            .collect();
        let mut sorted = pairs.clone();
        sorted.sort();
        assert_eq!(pairs, sorted);
    }
}
