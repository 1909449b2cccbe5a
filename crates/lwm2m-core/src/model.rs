//! Object/Resource definitions.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::LwM2mError;
use crate::ids::{ObjectId, ResourceId};
use crate::value::{ResourceType, Value};

/// The set of operations permitted against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Operations {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl Operations {
    pub const READ_ONLY: Self = Self { read: true, write: false, execute: false };
    pub const WRITE_ONLY: Self = Self { read: false, write: true, execute: false };
    pub const READ_WRITE: Self = Self { read: true, write: true, execute: false };
    pub const EXECUTE_ONLY: Self = Self { read: false, write: false, execute: true };

    #[must_use]
    pub fn none() -> Self {
        Self { read: false, write: false, execute: false }
    }
}

/// Declaration of one Resource's shape within an Object definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResourceDefinition {
    pub id: ResourceId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub min_instances: u16,
    pub max_instances: u16,
    pub operations: Operations,
    pub default: Option<Value>,
}

impl ResourceDefinition {
    /// A resource is executable iff its operation set is exactly `{Execute}`
    /// and its type is [`ResourceType::None`].
    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.kind == ResourceType::None
            && self.operations == Operations::EXECUTE_ONLY
    }

    /// A resource is mandatory if at least one instance must always exist.
    #[must_use]
    pub fn is_mandatory(&self) -> bool {
        self.min_instances >= 1
    }

    pub fn validate(&self) -> Result<(), LwM2mError> {
        if self.min_instances > self.max_instances {
            return Err(LwM2mError::DefinitionInvalid {
                reason: format!(
                    "resource {}: min_instances {} > max_instances {}",
                    self.id, self.min_instances, self.max_instances
                ),
            });
        }
        if self.kind == ResourceType::None && self.operations != Operations::EXECUTE_ONLY {
            return Err(LwM2mError::DefinitionInvalid {
                reason: format!("resource {}: None-typed resource must be Execute-only", self.id),
            });
        }
        if self.kind != ResourceType::None && self.operations.execute {
            return Err(LwM2mError::DefinitionInvalid {
                reason: format!("resource {}: Execute only valid on None-typed resources", self.id),
            });
        }
        Ok(())
    }
}

/// Declaration of an Object's shape: its ID, instance bounds, and resources.
///
/// Immutable once registered (enforced by [`crate::model::ObjectDefinition::validate`]
/// at registration time, not by interior mutability — the registry simply never
/// exposes `&mut` access once stored).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectDefinition {
    pub id: ObjectId,
    pub name: String,
    pub min_instances: u16,
    pub max_instances: u16,
    pub resources: BTreeMap<u16, ResourceDefinition>,
}

impl ObjectDefinition {
    /// `true` if this object admits only a single instance.
    #[must_use]
    pub fn is_single_instance(&self) -> bool {
        self.max_instances == 1
    }

    pub fn resource(&self, id: ResourceId) -> Option<&ResourceDefinition> {
        self.resources.get(&(id.value() as u16))
    }

    /// Structural validation performed before a definition is accepted by the registry.
    pub fn validate(&self) -> Result<(), LwM2mError> {
        if self.min_instances > self.max_instances {
            return Err(LwM2mError::DefinitionInvalid {
                reason: format!(
                    "object {}: min_instances {} > max_instances {}",
                    self.id, self.min_instances, self.max_instances
                ),
            });
        }
        for resource in self.resources.values() {
            resource.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_resource() -> ResourceDefinition {
        ResourceDefinition {
            id: ResourceId::new(101).unwrap(),
            name: "Manufacturer".into(),
            kind: ResourceType::String,
            min_instances: 1,
            max_instances: 1,
            operations: Operations::READ_ONLY,
            default: Some(Value::String(String::new())),
        }
    }

    #[test]
    fn executable_requires_none_type_and_execute_only() {
        let mut r = string_resource();
        r.kind = ResourceType::None;
        r.operations = Operations::EXECUTE_ONLY;
        assert!(r.is_executable());
    }

    #[test]
    fn validate_rejects_min_greater_than_max() {
        let mut obj = ObjectDefinition {
            id: ObjectId::new(1000).unwrap(),
            name: "Heater".into(),
            min_instances: 2,
            max_instances: 1,
            resources: BTreeMap::new(),
        };
        assert!(obj.validate().is_err());
        obj.min_instances = 0;
        assert!(obj.validate().is_ok());
    }

    #[test]
    fn validate_rejects_none_typed_non_executable() {
        let mut r = string_resource();
        r.kind = ResourceType::None;
        r.operations = Operations::READ_ONLY;
        assert!(r.validate().is_err());
    }
}
