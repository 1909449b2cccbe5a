//! Per-kind daemon request handlers.
//!
//! One function per [`RequestKind`]. The client daemon calls these against
//! its own live [`ObjectStore`] — both for requests its local application
//! sends, and for CoAP requests a server forwards on to it. The server
//! daemon only calls these for the local-bookkeeping kinds (Observe,
//! CancelObserve, WriteAttributes, Discover); everything that touches a
//! client's actual object model round-trips over CoAP instead.

use lwm2m_core::{LwM2mError, Path};
use lwm2m_protocol::{OperationLeaf, RequestKind, ResponseLeaf, Tree};
use lwm2m_runtime::{DefinitionRegistry, ObjectStore, ObservationTable, SetMode};

/// Apply every leaf of an operation tree against `store`, returning the
/// matching response tree. Leaf mutation order follows the tree's ascending
/// path order; each leaf applies independently rather than as one transaction.
pub fn handle_tree(
    registry: &mut DefinitionRegistry,
    store: &mut ObjectStore,
    observations: &mut ObservationTable,
    client_id: u32,
    kind: RequestKind,
    tree: &Tree<OperationLeaf>,
) -> Tree<ResponseLeaf> {
    let mut response = Tree::new();
    for (path, leaf) in tree.leaves() {
        let outcome = apply_leaf(registry, store, observations, client_id, kind, &path, leaf);
        response.insert(path, outcome);
    }
    response
}

fn apply_leaf(
    registry: &mut DefinitionRegistry,
    store: &mut ObjectStore,
    observations: &mut ObservationTable,
    client_id: u32,
    kind: RequestKind,
    path: &Path,
    leaf: &OperationLeaf,
) -> ResponseLeaf {
    match (kind, leaf) {
        (RequestKind::Read, OperationLeaf::Read) => match store.get(path) {
            Ok(value) => ResponseLeaf::success(Some(value)),
            Err(e) => ResponseLeaf::failure(e),
        },

        (RequestKind::Write, OperationLeaf::Write { value, create_optional }) => {
            match store.set(registry, path, value.clone(), SetMode::Replace) {
                Ok(()) => {
                    observations.evaluate_write(client_id, path, value, 1);
                    ResponseLeaf::success(None)
                }
                Err(LwM2mError::PathNotFound) if *create_optional => {
                    match ensure_instance_exists(registry, store, path) {
                        Ok(()) => match store.set(registry, path, value.clone(), SetMode::Replace) {
                            Ok(()) => {
                                observations.evaluate_write(client_id, path, value, 1);
                                ResponseLeaf::success(None)
                            }
                            Err(e) => ResponseLeaf::failure(e),
                        },
                        Err(e) => ResponseLeaf::failure(e),
                    }
                }
                Err(e) => ResponseLeaf::failure(e),
            }
        }

        (RequestKind::Execute, OperationLeaf::Execute { .. }) => {
            let Some(rid) = path.resource_id() else {
                return ResponseLeaf::failure(LwM2mError::OperationInvalid {
                    reason: "Execute requires a resource path".into(),
                });
            };
            match registry.lookup_resource(path.object_id(), rid) {
                Some(def) if def.is_executable() => ResponseLeaf::success(None),
                Some(_) => ResponseLeaf::failure(LwM2mError::OperationInvalid {
                    reason: "resource is not executable".into(),
                }),
                None => ResponseLeaf::failure(LwM2mError::NotDefined),
            }
        }

        (RequestKind::Delete, OperationLeaf::Delete) => {
            let result = if path.resource_id().is_some() {
                store.delete_resource(registry, path)
            } else {
                match path.instance_id() {
                    Some(iid) => store.delete_instance(registry, path.object_id(), iid),
                    None => Err(LwM2mError::OperationInvalid {
                        reason: "Delete requires at least an instance path".into(),
                    }),
                }
            };
            match result {
                Ok(()) => ResponseLeaf::success(None),
                Err(e) => ResponseLeaf::failure(e),
            }
        }

        (RequestKind::WriteAttributes, OperationLeaf::WriteAttributes { cancel, .. }) => {
            if *cancel {
                let matching: Vec<_> = observations
                    .for_client(client_id)
                    .filter(|o| o.path == *path)
                    .map(|o| o.id)
                    .collect();
                for id in matching {
                    observations.cancel(id);
                }
            }
            ResponseLeaf::success(None)
        }

        (RequestKind::Observe, OperationLeaf::Observe) => {
            observations.create(*path, client_id, Vec::new());
            ResponseLeaf::success(None)
        }

        (RequestKind::CancelObserve, OperationLeaf::CancelObserve) => {
            let matching: Vec<_> = observations
                .for_client(client_id)
                .filter(|o| o.path == *path)
                .map(|o| o.id)
                .collect();
            for id in matching {
                observations.cancel(id);
            }
            ResponseLeaf::success(None)
        }

        (RequestKind::Discover, OperationLeaf::Discover) => match registry.lookup_object(path.object_id()) {
            Some(_) => ResponseLeaf::success(None),
            None => ResponseLeaf::failure(LwM2mError::NotDefined),
        },

        (RequestKind::Create, OperationLeaf::Create { value }) => {
            match store.create_instance(registry, path.object_id(), None) {
                Ok(iid) => {
                    if let Some(value) = value {
                        let resource_path = match path.resource_id() {
                            Some(rid) => Path::new(path.object_id(), Some(iid), Some(rid), None),
                            None => Ok(*path),
                        };
                        if let Ok(resource_path) = resource_path {
                            let _ = store.set(registry, &resource_path, value.clone(), SetMode::Replace);
                        }
                    }
                    ResponseLeaf::success(None)
                }
                Err(e) => ResponseLeaf::failure(e),
            }
        }

        (RequestKind::Read | RequestKind::WriteAttributes | RequestKind::Observe, OperationLeaf::SubscribeChange) => {
            ResponseLeaf::success(None)
        }
        (_, OperationLeaf::SubscribeExecute) => ResponseLeaf::success(None),

        _ => ResponseLeaf::failure(LwM2mError::OperationInvalid {
            reason: format!("{kind:?} does not accept this leaf shape"),
        }),
    }
}

fn ensure_instance_exists(registry: &mut DefinitionRegistry, store: &mut ObjectStore, path: &Path) -> Result<(), LwM2mError> {
    let Some(iid) = path.instance_id() else {
        return Err(LwM2mError::PathInvalid { reason: "Write target has no instance".into() });
    };
    if store.get(&Path::new(path.object_id(), Some(iid), None, None)?).is_ok() {
        return Ok(());
    }
    store.create_instance(registry, path.object_id(), Some(iid)).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwm2m_core::{ObjectDefinition, ObjectId, Operations, ResourceDefinition, ResourceId, ResourceType, Value};
    use std::collections::BTreeMap;

    fn registry_with_heater() -> DefinitionRegistry {
        let mut resources = BTreeMap::new();
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
    fn read_returns_materialized_default() {
        let mut registry = registry_with_heater();
        let mut store = ObjectStore::new();
        let mut observations = ObservationTable::new();
        let iid = store.create_instance(&registry, ObjectId::new(1000).unwrap(), None).unwrap();
        let path = Path::parse(&format!("/1000/{}/104", iid.value())).unwrap();

        let mut tree = Tree::new();
        tree.insert(path, OperationLeaf::Read);

        let response = handle_tree(&mut registry, &mut store, &mut observations, 1, RequestKind::Read, &tree);
        let leaves = response.leaves();
        assert_eq!(leaves.len(), 1);
        assert!(leaves[0].1.is_success());
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut registry = registry_with_heater();
        let mut store = ObjectStore::new();
        let mut observations = ObservationTable::new();
        let iid = store.create_instance(&registry, ObjectId::new(1000).unwrap(), None).unwrap();
        let path = Path::parse(&format!("/1000/{}/104", iid.value())).unwrap();

        let mut write_tree = Tree::new();
        write_tree.insert(path, OperationLeaf::Write { value: Value::Float(21.5), create_optional: false });
        let write_response = handle_tree(&mut registry, &mut store, &mut observations, 1, RequestKind::Write, &write_tree);
        assert!(write_response.leaves()[0].1.is_success());

        assert_eq!(store.get(&path).unwrap(), Value::Float(21.5));
    }

    #[test]
    fn observe_then_cancel_observe_clears_entry() {
        let mut registry = registry_with_heater();
        let mut store = ObjectStore::new();
        let mut observations = ObservationTable::new();
        let iid = store.create_instance(&registry, ObjectId::new(1000).unwrap(), None).unwrap();
        let path = Path::parse(&format!("/1000/{}/104", iid.value())).unwrap();

        let mut tree = Tree::new();
        tree.insert(path, OperationLeaf::Observe);
        handle_tree(&mut registry, &mut store, &mut observations, 1, RequestKind::Observe, &tree);
        assert_eq!(observations.len(), 1);

        let mut cancel_tree = Tree::new();
        cancel_tree.insert(path, OperationLeaf::CancelObserve);
        handle_tree(&mut registry, &mut store, &mut observations, 1, RequestKind::CancelObserve, &cancel_tree);
        assert!(observations.is_empty());
    }
}
