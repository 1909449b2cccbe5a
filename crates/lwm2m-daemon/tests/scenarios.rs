//! End-to-end operation scenarios, exercised directly against the handler
//! layer rather than over a socket.

use std::collections::BTreeMap;

use lwm2m_core::{ObjectDefinition, ObjectId, Operations, Path, ResourceDefinition, ResourceId, ResourceType, Value};
use lwm2m_daemon::handlers::handle_tree;
use lwm2m_protocol::{OperationLeaf, RequestKind, Tree};
use lwm2m_runtime::{DefinitionRegistry, ObjectStore, ObservationTable};

fn heater_registry() -> DefinitionRegistry {
    let mut resources = BTreeMap::new();
    resources.insert(
        101,
        ResourceDefinition {
            id: ResourceId::new(101).unwrap(),
            name: "Manufacturer".into(),
            kind: ResourceType::String,
            min_instances: 1,
            max_instances: 1,
            operations: Operations::READ_ONLY,
            default: Some(Value::String("Acme".into())),
        },
    );
    resources.insert(
        104,
        ResourceDefinition {
            id: ResourceId::new(104).unwrap(),
            name: "Temperature".into(),
            kind: ResourceType::Float,
            min_instances: 1,
            max_instances: 1,
            operations: Operations::READ_WRITE,
            default: Some(Value::Float(0.0)),
        },
    );
    resources.insert(
        105,
        ResourceDefinition {
            id: ResourceId::new(105).unwrap(),
            name: "Readings".into(),
            kind: ResourceType::IntegerArray,
            min_instances: 0,
            max_instances: 65534,
            operations: Operations::READ_WRITE,
            default: None,
        },
    );
    resources.insert(
        106,
        ResourceDefinition {
            id: ResourceId::new(106).unwrap(),
            name: "Reset".into(),
            kind: ResourceType::None,
            min_instances: 1,
            max_instances: 1,
            operations: Operations::EXECUTE_ONLY,
            default: None,
        },
    );
    let mut registry = DefinitionRegistry::new();
    registry
        .define(ObjectDefinition {
            id: ObjectId::new(1000).unwrap(),
            name: "Heater".into(),
            min_instances: 0,
            max_instances: 65534,
            resources,
        })
        .unwrap();
    registry
}

#[test]
fn define_then_read_returns_default() {
    let mut registry = heater_registry();
    let mut store = ObjectStore::new();
    let mut observations = ObservationTable::new();
    let iid = store.create_instance(&registry, ObjectId::new(1000).unwrap(), None).unwrap();
    let path = Path::parse(&format!("/1000/{}/101", iid.value())).unwrap();

    let mut tree = Tree::new();
    tree.insert(path, OperationLeaf::Read);
    let response = handle_tree(&mut registry, &mut store, &mut observations, 1, RequestKind::Read, &tree);

    let (_, leaf) = &response.leaves()[0];
    assert_eq!(leaf.value, Some(Value::String("Acme".into())));
}

#[test]
fn write_then_read_integer() {
    let mut registry = heater_registry();
    let mut store = ObjectStore::new();
    let mut observations = ObservationTable::new();
    let iid = store.create_instance(&registry, ObjectId::new(1000).unwrap(), None).unwrap();
    let path = Path::parse(&format!("/1000/{}/104", iid.value())).unwrap();

    let mut write_tree = Tree::new();
    write_tree.insert(path, OperationLeaf::Write { value: Value::Float(22.0), create_optional: false });
    let write_response = handle_tree(&mut registry, &mut store, &mut observations, 1, RequestKind::Write, &write_tree);
    assert!(write_response.leaves()[0].1.is_success());

    let mut read_tree = Tree::new();
    read_tree.insert(path, OperationLeaf::Read);
    let read_response = handle_tree(&mut registry, &mut store, &mut observations, 1, RequestKind::Read, &read_tree);
    assert_eq!(read_response.leaves()[0].1.value, Some(Value::Float(22.0)));
}

#[test]
fn array_replace_then_update_merges_by_instance_id() {
    let mut registry = heater_registry();
    let mut store = ObjectStore::new();
    let mut observations = ObservationTable::new();
    let iid = store.create_instance(&registry, ObjectId::new(1000).unwrap(), None).unwrap();
    let path = Path::parse(&format!("/1000/{}/105", iid.value())).unwrap();

    let mut replace = lwm2m_core::ResourceArray::new();
    replace.insert(0, 10i64);
    store
        .set(&registry, &path, Value::IntegerArray(replace), lwm2m_runtime::SetMode::Replace)
        .unwrap();

    let mut update = lwm2m_core::ResourceArray::new();
    update.insert(1, 20i64);
    store
        .set(&registry, &path, Value::IntegerArray(update), lwm2m_runtime::SetMode::Update)
        .unwrap();

    if let Value::IntegerArray(result) = store.get(&path).unwrap() {
        assert_eq!(result.get(&0), Some(&10));
        assert_eq!(result.get(&1), Some(&20));
    } else {
        panic!("expected array");
    }
}

#[test]
fn execute_with_args_on_executable_resource_succeeds() {
    let mut registry = heater_registry();
    let mut store = ObjectStore::new();
    let mut observations = ObservationTable::new();
    let iid = store.create_instance(&registry, ObjectId::new(1000).unwrap(), None).unwrap();
    let path = Path::parse(&format!("/1000/{}/106", iid.value())).unwrap();

    let mut tree = Tree::new();
    tree.insert(path, OperationLeaf::Execute { args: Some(vec![1, 2, 3]) });
    let response = handle_tree(&mut registry, &mut store, &mut observations, 1, RequestKind::Execute, &tree);
    assert!(response.leaves()[0].1.is_success());
}

#[test]
fn writing_a_read_only_resource_fails() {
    let mut registry = heater_registry();
    let mut store = ObjectStore::new();
    let mut observations = ObservationTable::new();
    let iid = store.create_instance(&registry, ObjectId::new(1000).unwrap(), None).unwrap();
    let path = Path::parse(&format!("/1000/{}/101", iid.value())).unwrap();

    let mut tree = Tree::new();
    tree.insert(path, OperationLeaf::Write { value: Value::String("Other".into()), create_optional: false });
    let response = handle_tree(&mut registry, &mut store, &mut observations, 1, RequestKind::Write, &tree);
    assert!(!response.leaves()[0].1.is_success());
}

#[test]
fn observe_creates_a_live_observation_for_the_client() {
    let mut registry = heater_registry();
    let mut store = ObjectStore::new();
    let mut observations = ObservationTable::new();
    let iid = store.create_instance(&registry, ObjectId::new(1000).unwrap(), None).unwrap();
    let path = Path::parse(&format!("/1000/{}/104", iid.value())).unwrap();

    let mut tree = Tree::new();
    tree.insert(path, OperationLeaf::Observe);
    handle_tree(&mut registry, &mut store, &mut observations, 7, RequestKind::Observe, &tree);

    assert_eq!(observations.for_client(7).count(), 1);
}

#[test]
fn write_to_observed_path_delivers_a_notification() {
    let mut registry = heater_registry();
    let mut store = ObjectStore::new();
    let mut observations = ObservationTable::new();
    let iid = store.create_instance(&registry, ObjectId::new(1000).unwrap(), None).unwrap();
    let path = Path::parse(&format!("/1000/{}/104", iid.value())).unwrap();

    let mut observe_tree = Tree::new();
    observe_tree.insert(path, OperationLeaf::Observe);
    handle_tree(&mut registry, &mut store, &mut observations, 7, RequestKind::Observe, &observe_tree);

    let mut write_tree = Tree::new();
    write_tree.insert(path, OperationLeaf::Write { value: Value::Float(30.0), create_optional: false });
    let write_response = handle_tree(&mut registry, &mut store, &mut observations, 7, RequestKind::Write, &write_tree);
    assert!(write_response.leaves()[0].1.is_success());

    let pending = observations.take_pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].path, path);
    assert_eq!(pending[0].value, Value::Float(30.0));
}
