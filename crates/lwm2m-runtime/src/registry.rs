//! Definition Registry.

use std::collections::BTreeMap;

use lwm2m_core::{LwM2mError, ObjectDefinition, ObjectId, ResourceDefinition, ResourceId};

/// In-memory registry of [`ObjectDefinition`]s, keyed by [`ObjectId`].
///
/// Immutable once a definition is registered: there is no `&mut` accessor
/// into a stored definition, only whole-definition replacement guarded by
/// the byte-equality rule in [`DefinitionRegistry::define`].
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    objects: BTreeMap<u16, ObjectDefinition>,
}

impl DefinitionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `def`. Fails with `AlreadyDefined` if an object with the
    /// same ID is already registered and is not byte-identical to `def`
    /// (partial overwrite is forbidden).
    pub fn define(&mut self, def: ObjectDefinition) -> Result<(), LwM2mError> {
        def.validate()?;

        let key = def.id.value() as u16;
        if let Some(existing) = self.objects.get(&key) {
            if definitions_equal(existing, &def) {
                return Ok(());
            }
            return Err(LwM2mError::AlreadyDefined);
        }

        self.objects.insert(key, def);
        Ok(())
    }

    #[must_use]
    pub fn lookup_object(&self, id: ObjectId) -> Option<&ObjectDefinition> {
        self.objects.get(&(id.value() as u16))
    }

    #[must_use]
    pub fn lookup_resource(&self, oid: ObjectId, rid: ResourceId) -> Option<&ResourceDefinition> {
        self.lookup_object(oid)?.resource(rid)
    }

    /// Ascending-by-ID iteration over registered objects.
    pub fn iter_objects(&self) -> impl Iterator<Item = &ObjectDefinition> {
        self.objects.values()
    }

    /// Ascending-by-ID iteration over one object's resources.
    pub fn iter_resources(&self, oid: ObjectId) -> impl Iterator<Item = &ResourceDefinition> {
        self.lookup_object(oid).into_iter().flat_map(|o| o.resources.values())
    }

    #[must_use]
    pub fn is_defined(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&(id.value() as u16))
    }
}

fn definitions_equal(a: &ObjectDefinition, b: &ObjectDefinition) -> bool {
    match (serde_json::to_vec(a), serde_json::to_vec(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwm2m_core::{Operations, ResourceType, Value};
    use std::collections::BTreeMap as Map;

    fn heater_def() -> ObjectDefinition {
        let mut resources = Map::new();
        resources.insert(
            101,
            ResourceDefinition {
                id: ResourceId::new(101).unwrap(),
                name: "Manufacturer".into(),
                kind: ResourceType::String,
                min_instances: 1,
                max_instances: 1,
                operations: Operations::READ_ONLY,
                default: Some(Value::String(String::new())),
            },
        );
        ObjectDefinition {
            id: ObjectId::new(1000).unwrap(),
            name: "Heater".into(),
            min_instances: 0,
            max_instances: 65534,
            resources,
        }
    }

    #[test]
    fn define_then_lookup() {
        let mut registry = DefinitionRegistry::new();
        registry.define(heater_def()).unwrap();
        let found = registry.lookup_object(ObjectId::new(1000).unwrap()).unwrap();
        assert_eq!(found.name, "Heater");
    }

    #[test]
    fn redefining_identically_is_ok() {
        let mut registry = DefinitionRegistry::new();
        registry.define(heater_def()).unwrap();
        registry.define(heater_def()).unwrap();
    }

    #[test]
    fn redefining_differently_fails() {
        let mut registry = DefinitionRegistry::new();
        registry.define(heater_def()).unwrap();
        let mut changed = heater_def();
        changed.name = "Other".into();
        assert!(matches!(registry.define(changed), Err(LwM2mError::AlreadyDefined)));
    }

    #[test]
    fn iteration_is_ascending_by_id() {
        let mut registry = DefinitionRegistry::new();
        let mut second = heater_def();
        second.id = ObjectId::new(1).unwrap();
        registry.define(heater_def()).unwrap();
        registry.define(second).unwrap();
        let ids: Vec<_> = registry.iter_objects().map(|o| o.id.value()).collect();
        assert_eq!(ids, vec![1, 1000]);
    }
}
