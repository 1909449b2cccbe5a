//! PlainText content format: scalars only, used for single-resource
//! Read/Write once the peer has advertised it.

use base64::Engine;
use lwm2m_core::{ObjectLink, ResourceType, Value};

use crate::CodecError;

fn base64_engine() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// Encode a scalar value as UTF-8 text.
pub fn encode_scalar(value: &Value) -> Result<String, CodecError> {
    match value {
        Value::Integer(v) | Value::Time(v) => Ok(v.to_string()),
        Value::Float(v) => Ok(v.to_string()),
        Value::Boolean(v) => Ok(if *v { "1".to_string() } else { "0".to_string() }),
        Value::String(s) => Ok(s.clone()),
        Value::Opaque(bytes) => Ok(base64_engine().encode(bytes)),
        Value::ObjectLink(link) => Ok(format!("{}:{}", link.object_id, link.instance_id)),
        _ => Err(CodecError::TypeMismatch),
    }
}

/// Decode a scalar value from UTF-8 text.
pub fn decode_scalar(text: &str, scalar_type: ResourceType) -> Result<Value, CodecError> {
    match scalar_type {
        ResourceType::Integer => text
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| CodecError::TypeMismatch),
        ResourceType::Time => text
            .parse::<i64>()
            .map(Value::Time)
            .map_err(|_| CodecError::TypeMismatch),
        ResourceType::Float => text
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| CodecError::TypeMismatch),
        ResourceType::Boolean => match text.to_ascii_lowercase().as_str() {
            "1" | "true" => Ok(Value::Boolean(true)),
            "0" | "false" => Ok(Value::Boolean(false)),
            _ => Err(CodecError::TypeMismatch),
        },
        ResourceType::String => Ok(Value::String(text.to_string())),
        ResourceType::Opaque => base64_engine()
            .decode(text)
            .map(Value::Opaque)
            .map_err(|_| CodecError::TypeMismatch),
        ResourceType::ObjectLink => {
            let (o, i) = text.split_once(':').ok_or(CodecError::TypeMismatch)?;
            let object_id = o.parse().map_err(|_| CodecError::TypeMismatch)?;
            let instance_id = i.parse().map_err(|_| CodecError::TypeMismatch)?;
            Ok(Value::ObjectLink(ObjectLink { object_id, instance_id }))
        }
        _ => Err(CodecError::TypeMismatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_round_trips() {
        let v = Value::Integer(-42);
        let text = encode_scalar(&v).unwrap();
        assert_eq!(decode_scalar(&text, ResourceType::Integer).unwrap(), v);
    }

    #[test]
    fn boolean_is_case_insensitive() {
        assert_eq!(
            decode_scalar("TRUE", ResourceType::Boolean).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            decode_scalar("0", ResourceType::Boolean).unwrap(),
            Value::Boolean(false)
        );
    }

    #[test]
    fn opaque_round_trips_through_base64() {
        let v = Value::Opaque(vec![0x61, 0x00, 0x7b]);
        let text = encode_scalar(&v).unwrap();
        assert_eq!(decode_scalar(&text, ResourceType::Opaque).unwrap(), v);
    }

    #[test]
    fn float_round_trips() {
        let v = Value::Float(21.5);
        let text = encode_scalar(&v).unwrap();
        assert_eq!(decode_scalar(&text, ResourceType::Float).unwrap(), v);
    }
}
