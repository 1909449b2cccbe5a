//! Object Store: the four-level model tree.
//!
//! This is the client daemon's single live object model. The server daemon
//! never holds one of its own — it tracks registered clients by identity
//! (see [`ClientRegistry`]) and reaches their object model over CoAP.

use std::collections::BTreeMap;

use lwm2m_core::{InstanceId, LwM2mError, ObjectId, Path, ResourceId, Value};

use crate::registry::DefinitionRegistry;

/// How a `set` mutates an existing array-valued resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Clear existing entries and install the new set.
    Replace,
    /// Merge by `ResourceInstanceID`: existing IDs overwritten, new IDs
    /// added, absent IDs kept.
    Update,
}

#[derive(Debug, Default, Clone)]
struct InstanceData {
    resources: BTreeMap<u16, Value>,
}

#[derive(Debug, Default, Clone)]
struct ObjectInstances {
    instances: BTreeMap<u16, InstanceData>,
}

/// The four-level Object->Instance->Resource->ResourceInstance tree.
#[derive(Debug, Default, Clone)]
pub struct ObjectStore {
    objects: BTreeMap<u16, ObjectInstances>,
}

impl ObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count_instances(&self, oid: ObjectId) -> usize {
        self.objects
            .get(&(oid.value() as u16))
            .map(|o| o.instances.len())
            .unwrap_or(0)
    }

    /// Create a new ObjectInstance, materializing default values for
    /// mandatory resources.
    ///
    /// `iid` omitted means the store chooses the lowest unused ID.
    pub fn create_instance(
        &mut self,
        defs: &DefinitionRegistry,
        oid: ObjectId,
        iid: Option<InstanceId>,
    ) -> Result<InstanceId, LwM2mError> {
        let object_def = defs.lookup_object(oid).ok_or(LwM2mError::NotDefined)?;

        let entry = self.objects.entry(oid.value() as u16).or_default();
        if object_def.is_single_instance() && !entry.instances.is_empty() {
            return Err(LwM2mError::CannotCreate);
        }
        if entry.instances.len() as u16 >= object_def.max_instances {
            return Err(LwM2mError::CannotCreate);
        }

        let chosen = match iid {
            Some(iid) => {
                if entry.instances.contains_key(&(iid.value() as u16)) {
                    return Err(LwM2mError::CannotCreate);
                }
                iid
            }
            None => {
                let next = (0..=65534u32)
                    .find(|candidate| !entry.instances.contains_key(&(*candidate as u16)))
                    .ok_or(LwM2mError::CannotCreate)?;
                InstanceId::new(next).ok_or(LwM2mError::CannotCreate)?
            }
        };

        let mut data = InstanceData::default();
        for resource in object_def.resources.values() {
            if resource.is_mandatory() {
                if let Some(value) = materialize_default(resource) {
                    data.resources.insert(resource.id.value() as u16, value);
                }
            }
        }

        entry.instances.insert(chosen.value() as u16, data);
        Ok(chosen)
    }

    /// Delete an ObjectInstance. Fails with `CannotDelete` if it would
    /// violate `min_instances`, or if not present.
    pub fn delete_instance(
        &mut self,
        defs: &DefinitionRegistry,
        oid: ObjectId,
        iid: InstanceId,
    ) -> Result<(), LwM2mError> {
        let object_def = defs.lookup_object(oid).ok_or(LwM2mError::NotDefined)?;
        let entry = self.objects.get_mut(&(oid.value() as u16)).ok_or(LwM2mError::PathNotFound)?;

        if !entry.instances.contains_key(&(iid.value() as u16)) {
            return Err(LwM2mError::PathNotFound);
        }
        if entry.instances.len() as u16 <= object_def.min_instances {
            return Err(LwM2mError::CannotDelete);
        }

        entry.instances.remove(&(iid.value() as u16));
        Ok(())
    }

    /// Read the value at `path`.
    pub fn get(&self, path: &Path) -> Result<Value, LwM2mError> {
        let instance = self.instance(path.object_id(), path.instance_id().ok_or(LwM2mError::PathInvalid {
            reason: "get requires at least an instance path".into(),
        })?)?;
        let resource_id = path.resource_id().ok_or(LwM2mError::PathInvalid {
            reason: "get requires a resource path".into(),
        })?;
        let value = instance
            .resources
            .get(&(resource_id.value() as u16))
            .ok_or(LwM2mError::PathNotFound)?;

        match path.resource_instance_id() {
            None => Ok(value.clone()),
            Some(ri) => value.array_get(ri).ok_or(LwM2mError::PathNotFound),
        }
    }

    /// Write `value` at `path`. Only resource-level paths are supported;
    /// per-element writes go through `mode = Update` with a single-entry array.
    pub fn set(
        &mut self,
        defs: &DefinitionRegistry,
        path: &Path,
        value: Value,
        mode: SetMode,
    ) -> Result<(), LwM2mError> {
        let oid = path.object_id();
        let iid = path.instance_id().ok_or(LwM2mError::PathInvalid {
            reason: "set requires at least an instance path".into(),
        })?;
        let rid = path.resource_id().ok_or(LwM2mError::PathInvalid {
            reason: "set requires a resource path".into(),
        })?;

        let resource_def = defs.lookup_resource(oid, rid).ok_or(LwM2mError::NotDefined)?;
        if !resource_def.operations.write {
            return Err(LwM2mError::LwM2mProtocol { kind: lwm2m_core::LwM2mErrorKind::MethodNotAllowed });
        }
        if value.resource_type() != resource_def.kind {
            return Err(LwM2mError::TypeMismatch);
        }
        if value.len() > resource_def.max_instances as usize {
            return Err(LwM2mError::RangeInvalid);
        }
        if mode == SetMode::Replace && value.len() < resource_def.min_instances as usize {
            return Err(LwM2mError::RangeInvalid);
        }

        let entry = self
            .objects
            .get_mut(&(oid.value() as u16))
            .and_then(|o| o.instances.get_mut(&(iid.value() as u16)))
            .ok_or(LwM2mError::PathNotFound)?;

        match mode {
            SetMode::Replace => {
                entry.resources.insert(rid.value() as u16, value);
            }
            SetMode::Update => {
                merge_update(entry.resources.entry(rid.value() as u16).or_insert_with(|| value.clone()), value);
            }
        }
        Ok(())
    }

    /// Delete an optional resource. Fails with `CannotDelete` if the
    /// resource is mandatory.
    pub fn delete_resource(
        &mut self,
        defs: &DefinitionRegistry,
        path: &Path,
    ) -> Result<(), LwM2mError> {
        let oid = path.object_id();
        let iid = path.instance_id().ok_or(LwM2mError::PathInvalid {
            reason: "delete_resource requires an instance path".into(),
        })?;
        let rid = path.resource_id().ok_or(LwM2mError::PathInvalid {
            reason: "delete_resource requires a resource path".into(),
        })?;

        let resource_def = defs.lookup_resource(oid, rid).ok_or(LwM2mError::NotDefined)?;
        if resource_def.is_mandatory() {
            return Err(LwM2mError::CannotDelete);
        }

        let entry = self
            .objects
            .get_mut(&(oid.value() as u16))
            .and_then(|o| o.instances.get_mut(&(iid.value() as u16)))
            .ok_or(LwM2mError::PathNotFound)?;
        entry.resources.remove(&(rid.value() as u16));
        Ok(())
    }

    fn instance(&self, oid: ObjectId, iid: InstanceId) -> Result<&InstanceData, LwM2mError> {
        self.objects
            .get(&(oid.value() as u16))
            .and_then(|o| o.instances.get(&(iid.value() as u16)))
            .ok_or(LwM2mError::PathNotFound)
    }
}

fn materialize_default(resource: &lwm2m_core::ResourceDefinition) -> Option<Value> {
    if resource.kind == lwm2m_core::ResourceType::None {
        return None;
    }
    resource.default.clone().or_else(|| default_for_type(resource.kind))
}

fn default_for_type(kind: lwm2m_core::ResourceType) -> Option<Value> {
    use lwm2m_core::ResourceType as T;
    Some(match kind {
        T::String => Value::String(String::new()),
        T::Integer => Value::Integer(0),
        T::Float => Value::Float(0.0),
        T::Boolean => Value::Boolean(false),
        T::Opaque => Value::Opaque(Vec::new()),
        T::Time => Value::Time(0),
        T::ObjectLink => Value::ObjectLink(lwm2m_core::ObjectLink { object_id: 0, instance_id: 0 }),
        T::StringArray
        | T::IntegerArray
        | T::FloatArray
        | T::BooleanArray
        | T::OpaqueArray
        | T::TimeArray
        | T::ObjectLinkArray
        | T::None => return None,
    })
}

fn merge_update(existing: &mut Value, incoming: Value) {
    use lwm2m_core::Value as V;
    match (existing, incoming) {
        (V::IntegerArray(e), V::IntegerArray(n)) => e.extend(n),
        (V::FloatArray(e), V::FloatArray(n)) => e.extend(n),
        (V::BooleanArray(e), V::BooleanArray(n)) => e.extend(n),
        (V::StringArray(e), V::StringArray(n)) => e.extend(n),
        (V::OpaqueArray(e), V::OpaqueArray(n)) => e.extend(n),
        (V::TimeArray(e), V::TimeArray(n)) => e.extend(n),
        (V::ObjectLinkArray(e), V::ObjectLinkArray(n)) => e.extend(n),
        (existing, incoming) => *existing = incoming,
    }
}

/// A registered client's identity, as tracked by the server daemon. The
/// object model itself lives on the client's own process; the server talks
/// to it over CoAP at `address` rather than mirroring it locally.
#[derive(Debug, Clone)]
pub struct ClientRegistration {
    pub client_id: u32,
    pub address: String,
    pub registration_time: i64,
}

/// `client_id -> ClientRegistration`, the server-side analogue of the
/// client daemon's single live model.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: BTreeMap<u32, ClientRegistration>,
}

impl ClientRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, registration: ClientRegistration) {
        self.clients.insert(registration.client_id, registration);
    }

    pub fn deregister(&mut self, client_id: u32) -> Option<ClientRegistration> {
        self.clients.remove(&client_id)
    }

    #[must_use]
    pub fn get(&self, client_id: u32) -> Option<&ClientRegistration> {
        self.clients.get(&client_id)
    }

    pub fn get_mut(&mut self, client_id: u32) -> Option<&mut ClientRegistration> {
        self.clients.get_mut(&client_id)
    }

    pub fn client_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.clients.keys().copied()
    }
}
