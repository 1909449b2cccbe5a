//! The typed value union and resource-type tags.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::ResourceInstanceId;

/// The declared type of a Resource definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// No value — used only by executable resources.
    None,
    String,
    Integer,
    Float,
    Boolean,
    Opaque,
    Time,
    ObjectLink,
    StringArray,
    IntegerArray,
    FloatArray,
    BooleanArray,
    OpaqueArray,
    TimeArray,
    ObjectLinkArray,
}

impl ResourceType {
    /// Returns `true` for the `*Array` variants.
    #[must_use]
    pub fn is_array(self) -> bool {
        matches!(
            self,
            ResourceType::StringArray
                | ResourceType::IntegerArray
                | ResourceType::FloatArray
                | ResourceType::BooleanArray
                | ResourceType::OpaqueArray
                | ResourceType::TimeArray
                | ResourceType::ObjectLinkArray
        )
    }

    /// The scalar type carried by each element, for array types; identity otherwise.
    #[must_use]
    pub fn scalar(self) -> ResourceType {
        match self {
            ResourceType::StringArray => ResourceType::String,
            ResourceType::IntegerArray => ResourceType::Integer,
            ResourceType::FloatArray => ResourceType::Float,
            ResourceType::BooleanArray => ResourceType::Boolean,
            ResourceType::OpaqueArray => ResourceType::Opaque,
            ResourceType::TimeArray => ResourceType::Time,
            ResourceType::ObjectLinkArray => ResourceType::ObjectLink,
            other => other,
        }
    }
}

/// An ObjectLink value: a reference to another Object/Instance pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectLink {
    pub object_id: u16,
    pub instance_id: u16,
}

/// Mapping from resource-instance ID to scalar value; iteration is ascending by ID.
pub type ResourceArray<T> = BTreeMap<u16, T>;

/// A resource's runtime value, tagged by the variant the wire type maps to.
///
/// The public codec API exposes typed accessors (see [`Value::as_integer`] and
/// friends); the core itself never does type-erased casts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Opaque(Vec<u8>),
    Time(i64),
    ObjectLink(ObjectLink),
    IntegerArray(ResourceArray<i64>),
    FloatArray(ResourceArray<f64>),
    BooleanArray(ResourceArray<bool>),
    StringArray(ResourceArray<String>),
    OpaqueArray(ResourceArray<Vec<u8>>),
    TimeArray(ResourceArray<i64>),
    ObjectLinkArray(ResourceArray<ObjectLink>),
}

impl Value {
    /// The [`ResourceType`] this value is an instance of.
    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Value::Integer(_) => ResourceType::Integer,
            Value::Float(_) => ResourceType::Float,
            Value::Boolean(_) => ResourceType::Boolean,
            Value::String(_) => ResourceType::String,
            Value::Opaque(_) => ResourceType::Opaque,
            Value::Time(_) => ResourceType::Time,
            Value::ObjectLink(_) => ResourceType::ObjectLink,
            Value::IntegerArray(_) => ResourceType::IntegerArray,
            Value::FloatArray(_) => ResourceType::FloatArray,
            Value::BooleanArray(_) => ResourceType::BooleanArray,
            Value::StringArray(_) => ResourceType::StringArray,
            Value::OpaqueArray(_) => ResourceType::OpaqueArray,
            Value::TimeArray(_) => ResourceType::TimeArray,
            Value::ObjectLinkArray(_) => ResourceType::ObjectLinkArray,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) | Value::Time(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_opaque(&self) -> Option<&[u8]> {
        match self {
            Value::Opaque(v) => Some(v),
            _ => None,
        }
    }

    /// Look up a single element of an array-valued resource by instance ID.
    #[must_use]
    pub fn array_get(&self, ri: ResourceInstanceId) -> Option<Value> {
        let idx = ri.value() as u16;
        match self {
            Value::IntegerArray(m) => m.get(&idx).map(|v| Value::Integer(*v)),
            Value::FloatArray(m) => m.get(&idx).map(|v| Value::Float(*v)),
            Value::BooleanArray(m) => m.get(&idx).map(|v| Value::Boolean(*v)),
            Value::StringArray(m) => m.get(&idx).cloned().map(Value::String),
            Value::OpaqueArray(m) => m.get(&idx).cloned().map(Value::Opaque),
            Value::TimeArray(m) => m.get(&idx).map(|v| Value::Time(*v)),
            Value::ObjectLinkArray(m) => m.get(&idx).map(|v| Value::ObjectLink(*v)),
            _ => None,
        }
    }

    /// Number of elements, for array types; `1` for scalars (a singleton resource
    /// always has exactly resource-instance `0`).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Value::IntegerArray(m) => m.len(),
            Value::FloatArray(m) => m.len(),
            Value::BooleanArray(m) => m.len(),
            Value::StringArray(m) => m.len(),
            Value::OpaqueArray(m) => m.len(),
            Value::TimeArray(m) => m.len(),
            Value::ObjectLinkArray(m) => m.len(),
            _ => 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_type_round_trips_via_scalar() {
        assert_eq!(ResourceType::IntegerArray.scalar(), ResourceType::Integer);
        assert_eq!(ResourceType::String.scalar(), ResourceType::String);
    }

    #[test]
    fn array_get_reads_by_instance_id() {
        let mut m = ResourceArray::new();
        m.insert(0, 1i64);
        m.insert(2, 3i64);
        let v = Value::IntegerArray(m);
        assert_eq!(
            v.array_get(ResourceInstanceId::new(2).unwrap()),
            Some(Value::Integer(3))
        );
        assert_eq!(v.array_get(ResourceInstanceId::new(1).unwrap()), None);
    }

    #[test]
    fn serde_tag_round_trip() {
        let v = Value::String("Acme".into());
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
