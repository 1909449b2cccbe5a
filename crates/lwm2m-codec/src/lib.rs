//! Typed value codec across PlainText, Opaque and TLV content formats.

pub mod opaque;
pub mod plaintext;
pub mod scalar;
pub mod tlv;

use lwm2m_core::{ContentFormat, ResourceDefinition, Value};
use thiserror::Error;

/// Codec-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("value of wrong type for definition")]
    TypeMismatch,
    #[error("value exceeds buffer")]
    Overrun,
    #[error("decoded value outside definition's stated range")]
    RangeInvalid,
}

/// Encode `value` for `def` in `format`, per the per-type wire representation.
pub fn encode(value: &Value, def: &ResourceDefinition, format: ContentFormat) -> Result<Vec<u8>, CodecError> {
    if value.resource_type() != def.kind {
        return Err(CodecError::TypeMismatch);
    }

    match format {
        ContentFormat::PlainText => {
            if def.kind.is_array() {
                return Err(CodecError::TypeMismatch);
            }
            Ok(plaintext::encode_scalar(value)?.into_bytes())
        }
        ContentFormat::Opaque => opaque::encode(value),
        ContentFormat::Tlv => {
            if def.kind.is_array() {
                let array = as_value_array(value)?;
                tlv::encode_array(&array)
            } else {
                tlv::encode_scalar(value)
            }
        }
    }
}

/// Decode `bytes` against `def` in `format`, enforcing the definition's
/// declared arity (`RangeInvalid` if an array exceeds `max_instances`).
pub fn decode(bytes: &[u8], def: &ResourceDefinition, format: ContentFormat) -> Result<Value, CodecError> {
    let scalar_type = def.kind.scalar();

    let value = match format {
        ContentFormat::PlainText => {
            if def.kind.is_array() {
                return Err(CodecError::TypeMismatch);
            }
            let text = std::str::from_utf8(bytes).map_err(|_| CodecError::TypeMismatch)?;
            plaintext::decode_scalar(text, scalar_type)?
        }
        ContentFormat::Opaque => opaque::decode(bytes),
        ContentFormat::Tlv => {
            if def.kind.is_array() {
                let array = tlv::decode_array(bytes, scalar_type)?;
                if array.len() > def.max_instances as usize {
                    return Err(CodecError::RangeInvalid);
                }
                from_value_array(def.kind, array)?
            } else {
                tlv::decode_scalar(bytes, scalar_type)?
            }
        }
    };

    if value.resource_type() != def.kind {
        return Err(CodecError::TypeMismatch);
    }
    Ok(value)
}

/// TLV is mandatory for multi-instance resources and whole-object/instance
/// reads; PlainText only when the carrier negotiated it and the resource is
/// scalar; Opaque is reserved for opaque-typed resources.
#[must_use]
pub fn recommended_format(def: &ResourceDefinition, negotiated: ContentFormat, whole_object_read: bool) -> ContentFormat {
    if def.kind.is_array() || whole_object_read {
        ContentFormat::Tlv
    } else if def.kind == lwm2m_core::ResourceType::Opaque {
        ContentFormat::Opaque
    } else {
        negotiated
    }
}

fn as_value_array(value: &Value) -> Result<lwm2m_core::ResourceArray<Value>, CodecError> {
    use lwm2m_core::Value as V;
    let mut out = lwm2m_core::ResourceArray::new();
    match value {
        V::IntegerArray(m) => {
            for (k, v) in m {
                out.insert(*k, V::Integer(*v));
            }
        }
        V::FloatArray(m) => {
            for (k, v) in m {
                out.insert(*k, V::Float(*v));
            }
        }
        V::BooleanArray(m) => {
            for (k, v) in m {
                out.insert(*k, V::Boolean(*v));
            }
        }
        V::StringArray(m) => {
            for (k, v) in m {
                out.insert(*k, V::String(v.clone()));
            }
        }
        V::OpaqueArray(m) => {
            for (k, v) in m {
                out.insert(*k, V::Opaque(v.clone()));
            }
        }
        V::TimeArray(m) => {
            for (k, v) in m {
                out.insert(*k, V::Time(*v));
            }
        }
        V::ObjectLinkArray(m) => {
            for (k, v) in m {
                out.insert(*k, V::ObjectLink(*v));
            }
        }
        _ => return Err(CodecError::TypeMismatch),
    }
    Ok(out)
}

fn from_value_array(
    array_type: lwm2m_core::ResourceType,
    values: lwm2m_core::ResourceArray<Value>,
) -> Result<Value, CodecError> {
    use lwm2m_core::ResourceType as T;
    use lwm2m_core::Value as V;

    match array_type {
        T::IntegerArray => Ok(V::IntegerArray(
            values.into_iter().map(|(k, v)| (k, v.as_integer().unwrap_or_default())).collect(),
        )),
        T::FloatArray => Ok(V::FloatArray(
            values.into_iter().map(|(k, v)| (k, v.as_float().unwrap_or_default())).collect(),
        )),
        T::BooleanArray => Ok(V::BooleanArray(
            values.into_iter().map(|(k, v)| (k, v.as_bool().unwrap_or_default())).collect(),
        )),
        T::StringArray => Ok(V::StringArray(
            values
                .into_iter()
                .map(|(k, v)| (k, v.as_str().unwrap_or_default().to_string()))
                .collect(),
        )),
        T::OpaqueArray => Ok(V::OpaqueArray(
            values
                .into_iter()
                .map(|(k, v)| (k, v.as_opaque().unwrap_or_default().to_vec()))
                .collect(),
        )),
        T::TimeArray => Ok(V::TimeArray(
            values.into_iter().map(|(k, v)| (k, v.as_integer().unwrap_or_default())).collect(),
        )),
        T::ObjectLinkArray => {
            let mut out = lwm2m_core::ResourceArray::new();
            for (k, v) in values {
                if let V::ObjectLink(link) = v {
                    out.insert(k, link);
                }
            }
            Ok(V::ObjectLinkArray(out))
        }
        _ => Err(CodecError::TypeMismatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwm2m_core::{Operations, ResourceId, ResourceType};
    use proptest::prelude::*;

    fn int_def() -> ResourceDefinition {
        ResourceDefinition {
            id: ResourceId::new(104).unwrap(),
            name: "Temperature".into(),
            kind: ResourceType::Float,
            min_instances: 1,
            max_instances: 1,
            operations: Operations::READ_WRITE,
            default: Some(Value::Float(0.0)),
        }
    }

    #[test]
    fn float_tlv_round_trip() {
        let def = int_def();
        let v = Value::Float(21.5);
        let bytes = encode(&v, &def, ContentFormat::Tlv).unwrap();
        assert_eq!(decode(&bytes, &def, ContentFormat::Tlv).unwrap(), v);
    }

    #[test]
    fn float_plaintext_round_trip() {
        let def = int_def();
        let v = Value::Float(21.5);
        let bytes = encode(&v, &def, ContentFormat::PlainText).unwrap();
        assert_eq!(decode(&bytes, &def, ContentFormat::PlainText).unwrap(), v);
    }

    #[test]
    fn array_exceeding_max_instances_is_range_invalid() {
        let def = ResourceDefinition {
            id: ResourceId::new(105).unwrap(),
            name: "Readings".into(),
            kind: ResourceType::IntegerArray,
            min_instances: 0,
            max_instances: 1,
            operations: Operations::READ_WRITE,
            default: None,
        };
        let mut arr = lwm2m_core::ResourceArray::new();
        arr.insert(0, 1i64);
        arr.insert(1, 2i64);
        let value = Value::IntegerArray(arr);
        let bytes = encode(&value, &def, ContentFormat::Tlv).unwrap();
        assert_eq!(decode(&bytes, &def, ContentFormat::Tlv), Err(CodecError::RangeInvalid));
    }

    proptest! {
        #[test]
        fn prop_integer_round_trips_tlv(v in any::<i32>()) {
            let def = ResourceDefinition {
                id: ResourceId::new(1).unwrap(),
                name: "x".into(),
                kind: ResourceType::Integer,
                min_instances: 1,
                max_instances: 1,
                operations: Operations::READ_WRITE,
                default: None,
            };
            let value = Value::Integer(v as i64);
            let bytes = encode(&value, &def, ContentFormat::Tlv).unwrap();
            prop_assert_eq!(decode(&bytes, &def, ContentFormat::Tlv).unwrap(), value);
        }
    }
}
