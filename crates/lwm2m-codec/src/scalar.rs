//! Canonical binary representation of each scalar type.

use lwm2m_core::{ObjectLink, ResourceType, Value};

use crate::CodecError;

/// Encode one scalar value to its canonical binary representation.
///
/// Integers and times use the minimal two's-complement width (1/2/4/8 bytes)
/// that fits; floats always encode as binary64.
pub fn encode_scalar_binary(value: &Value) -> Result<Vec<u8>, CodecError> {
    match value {
        Value::Integer(v) | Value::Time(v) => Ok(minimal_int_bytes(*v)),
        Value::Float(v) => Ok(v.to_be_bytes().to_vec()),
        Value::Boolean(v) => Ok(vec![if *v { 1 } else { 0 }]),
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        Value::Opaque(b) => Ok(b.clone()),
        Value::ObjectLink(link) => {
            let mut out = Vec::with_capacity(4);
            out.extend_from_slice(&link.object_id.to_be_bytes());
            out.extend_from_slice(&link.instance_id.to_be_bytes());
            Ok(out)
        }
        _ => Err(CodecError::TypeMismatch),
    }
}

fn minimal_int_bytes(v: i64) -> Vec<u8> {
    if v >= i8::MIN as i64 && v <= i8::MAX as i64 {
        vec![v as i8 as u8]
    } else if v >= i16::MIN as i64 && v <= i16::MAX as i64 {
        (v as i16).to_be_bytes().to_vec()
    } else if v >= i32::MIN as i64 && v <= i32::MAX as i64 {
        (v as i32).to_be_bytes().to_vec()
    } else {
        v.to_be_bytes().to_vec()
    }
}

/// Decode one scalar value from its canonical binary representation.
pub fn decode_scalar_binary(bytes: &[u8], scalar_type: ResourceType) -> Result<Value, CodecError> {
    match scalar_type {
        ResourceType::Integer | ResourceType::Time => {
            let v = decode_int(bytes)?;
            Ok(if scalar_type == ResourceType::Time {
                Value::Time(v)
            } else {
                Value::Integer(v)
            })
        }
        ResourceType::Float => match bytes.len() {
            4 => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| CodecError::Overrun)?;
                Ok(Value::Float(f32::from_be_bytes(arr) as f64))
            }
            8 => {
                let arr: [u8; 8] = bytes.try_into().map_err(|_| CodecError::Overrun)?;
                Ok(Value::Float(f64::from_be_bytes(arr)))
            }
            _ => Err(CodecError::Overrun),
        },
        ResourceType::Boolean => {
            if bytes.len() != 1 {
                return Err(CodecError::Overrun);
            }
            Ok(Value::Boolean(bytes[0] != 0))
        }
        ResourceType::String => {
            let s = std::str::from_utf8(bytes).map_err(|_| CodecError::TypeMismatch)?;
            Ok(Value::String(s.to_string()))
        }
        ResourceType::Opaque => Ok(Value::Opaque(bytes.to_vec())),
        ResourceType::ObjectLink => {
            if bytes.len() != 4 {
                return Err(CodecError::Overrun);
            }
            let object_id = u16::from_be_bytes([bytes[0], bytes[1]]);
            let instance_id = u16::from_be_bytes([bytes[2], bytes[3]]);
            Ok(Value::ObjectLink(ObjectLink { object_id, instance_id }))
        }
        _ => Err(CodecError::TypeMismatch),
    }
}

fn decode_int(bytes: &[u8]) -> Result<i64, CodecError> {
    match bytes.len() {
        1 => Ok(bytes[0] as i8 as i64),
        2 => Ok(i16::from_be_bytes(bytes.try_into().unwrap()) as i64),
        4 => Ok(i32::from_be_bytes(bytes.try_into().unwrap()) as i64),
        8 => Ok(i64::from_be_bytes(bytes.try_into().unwrap())),
        _ => Err(CodecError::Overrun),
    }
}
