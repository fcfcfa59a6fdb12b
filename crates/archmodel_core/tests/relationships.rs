use archmodel_core::db::open_db_in_memory;
use archmodel_core::{
    EngineConfig, EntityKind, ManualClock, MatrixRuleConfig, ModelEngine, ModelError, NewNode,
    NewRelationship, NodeRef, ProjectId, RecordRef, RelationshipKind, TaggedRelationship,
};
use rusqlite::Connection;
use uuid::Uuid;

struct Fixture {
    project: ProjectId,
    capability: NodeRef,
    application: NodeRef,
    data: NodeRef,
}

fn seed(engine: &ModelEngine<'_, &ManualClock>) -> Fixture {
    let project = Uuid::new_v4();
    let create = |kind: EntityKind, name: &str| {
        let created = engine
            .create_node(kind, NewNode::new(project, kind, name, "alice"))
            .unwrap();
        NodeRef::new(kind, created.id)
    };
    Fixture {
        capability: create(EntityKind::Capability, "Customer Management"),
        application: create(EntityKind::Application, "CRM"),
        data: create(EntityKind::DataEntity, "Customer"),
        project,
    }
}

fn count_relationships(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM relationships;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn allowed_triple_is_created_and_listed() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new(10, 1);
    let engine = ModelEngine::with_clock(&conn, &EngineConfig::default(), &clock).unwrap();
    let fx = seed(&engine);

    let id = engine
        .create_relationship(
            NewRelationship::new(
                fx.project,
                fx.application,
                fx.capability,
                RelationshipKind::Supports,
                "alice",
            )
            .with_description("front office"),
        )
        .unwrap();

    let relationship = engine.get_relationship(id, fx.project).unwrap();
    assert_eq!(relationship.source, fx.application);
    assert_eq!(relationship.target, fx.capability);
    assert_eq!(relationship.kind, RelationshipKind::Supports);
    assert_eq!(relationship.description.as_deref(), Some("front office"));
    assert!(relationship.is_active());

    let touching = engine
        .list_relationships(fx.project, Some(fx.capability))
        .unwrap();
    assert_eq!(touching.len(), 1);
    assert!(touching[0].touches(fx.application));

    assert!(engine
        .list_relationships(fx.project, Some(fx.data))
        .unwrap()
        .is_empty());
}

#[test]
fn reversed_asymmetric_pair_is_rejected_with_alternatives() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new(10, 1);
    let engine = ModelEngine::with_clock(&conn, &EngineConfig::default(), &clock).unwrap();
    let fx = seed(&engine);

    let err = engine
        .create_relationship(NewRelationship::new(
            fx.project,
            fx.capability,
            fx.application,
            RelationshipKind::Supports,
            "alice",
        ))
        .unwrap_err();
    match err {
        ModelError::RelationshipMatrix {
            source_kind,
            target_kind,
            relationship_kind,
            allowed,
        } => {
            assert_eq!(source_kind, EntityKind::Capability);
            assert_eq!(target_kind, EntityKind::Application);
            assert_eq!(relationship_kind, RelationshipKind::Supports);
            assert_eq!(
                allowed,
                engine
                    .matrix()
                    .allowed_kinds(EntityKind::Capability, EntityKind::Application)
            );
        }
        other => panic!("unexpected error: {other}"),
    }

    let wrong_kind = engine
        .create_relationship(NewRelationship::new(
            fx.project,
            fx.application,
            fx.data,
            RelationshipKind::Supports,
            "alice",
        ))
        .unwrap_err();
    assert!(wrong_kind.to_string().contains("reads"));
    assert_eq!(count_relationships(&conn), 0);
}

#[test]
fn self_reference_is_rejected_even_when_kind_pair_is_allowed() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new(10, 1);
    let engine = ModelEngine::with_clock(&conn, &EngineConfig::default(), &clock).unwrap();
    let fx = seed(&engine);

    let err = engine
        .create_relationship(NewRelationship::new(
            fx.project,
            fx.application,
            fx.application,
            RelationshipKind::DependsOn,
            "alice",
        ))
        .unwrap_err();
    assert!(matches!(err, ModelError::SelfReference(node) if node == fx.application));
    assert_eq!(count_relationships(&conn), 0);
}

#[test]
fn missing_deleted_or_foreign_endpoint_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new(10, 1);
    let engine = ModelEngine::with_clock(&conn, &EngineConfig::default(), &clock).unwrap();
    let fx = seed(&engine);

    let ghost = NodeRef::new(EntityKind::Capability, 999);
    let err = engine
        .create_relationship(NewRelationship::new(
            fx.project,
            fx.application,
            ghost,
            RelationshipKind::Realizes,
            "alice",
        ))
        .unwrap_err();
    assert!(matches!(err, ModelError::NotFound(RecordRef::Node(node)) if node == ghost));

    let foreign = engine
        .create_relationship(NewRelationship::new(
            Uuid::new_v4(),
            fx.application,
            fx.capability,
            RelationshipKind::Realizes,
            "alice",
        ))
        .unwrap_err();
    assert_eq!(foreign.code(), "not_found");

    engine
        .delete_node(EntityKind::DataEntity, fx.data.id, fx.project, "alice")
        .unwrap();
    let deleted = engine
        .create_relationship(NewRelationship::new(
            fx.project,
            fx.application,
            fx.data,
            RelationshipKind::Reads,
            "alice",
        ))
        .unwrap_err();
    assert!(matches!(deleted, ModelError::NotFound(_)));
    assert_eq!(count_relationships(&conn), 0);
}

#[test]
fn tagged_request_validates_tags_first() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new(10, 1);
    let engine = ModelEngine::with_clock(&conn, &EngineConfig::default(), &clock).unwrap();
    let fx = seed(&engine);

    let request = TaggedRelationship {
        project_id: fx.project,
        source_kind: "Application",
        source_id: fx.application.id,
        target_kind: "data-entity",
        target_id: fx.data.id,
        relationship_kind: "WRITES",
        description: None,
        actor: "alice",
    };
    let id = engine.create_relationship_tagged(&request).unwrap();
    assert_eq!(
        engine.get_relationship(id, fx.project).unwrap().kind,
        RelationshipKind::Writes
    );

    let bad_entity = engine
        .create_relationship_tagged(&TaggedRelationship {
            source_kind: "server",
            ..request.clone()
        })
        .unwrap_err();
    assert!(matches!(bad_entity, ModelError::InvalidEntityType(tag) if tag == "server"));

    let bad_kind = engine
        .create_relationship_tagged(&TaggedRelationship {
            relationship_kind: "hosts",
            ..request
        })
        .unwrap_err();
    assert!(matches!(bad_kind, ModelError::UnknownRelationshipKind(_)));
}

#[test]
fn deleting_relationship_keeps_endpoints_and_second_delete_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new(10, 1);
    let engine = ModelEngine::with_clock(&conn, &EngineConfig::default(), &clock).unwrap();
    let fx = seed(&engine);

    let id = engine
        .create_relationship(NewRelationship::new(
            fx.project,
            fx.application,
            fx.data,
            RelationshipKind::Owns,
            "alice",
        ))
        .unwrap();
    engine.delete_relationship(id, fx.project, "bob").unwrap();

    let remaining = engine.list_relationships(fx.project, None).unwrap();
    assert!(remaining.is_empty());
    engine
        .get_node(EntityKind::Application, fx.application.id, fx.project)
        .unwrap();
    engine
        .get_node(EntityKind::DataEntity, fx.data.id, fx.project)
        .unwrap();

    let err = engine
        .delete_relationship(id, fx.project, "bob")
        .unwrap_err();
    assert!(matches!(err, ModelError::NotFound(RecordRef::Relationship(found)) if found == id));
}

#[test]
fn configured_matrix_replaces_builtin_rules() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new(10, 1);
    let config = EngineConfig {
        relationship_matrix: Some(vec![MatrixRuleConfig {
            source: "capability".to_string(),
            target: "application".to_string(),
            kinds: vec!["realizes".to_string()],
        }]),
        ..EngineConfig::default()
    };
    let engine = ModelEngine::with_clock(&conn, &config, &clock).unwrap();
    let fx = seed(&engine);

    engine
        .create_relationship(NewRelationship::new(
            fx.project,
            fx.capability,
            fx.application,
            RelationshipKind::Realizes,
            "alice",
        ))
        .unwrap();
    let err = engine
        .create_relationship(NewRelationship::new(
            fx.project,
            fx.application,
            fx.capability,
            RelationshipKind::Supports,
            "alice",
        ))
        .unwrap_err();
    assert!(
        matches!(err, ModelError::RelationshipMatrix { ref allowed, .. } if allowed.is_empty())
    );
}
