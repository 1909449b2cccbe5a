//! Opaque content format: raw bytes, used for Execute arguments and
//! opaque-typed resources.

use lwm2m_core::Value;

use crate::CodecError;

/// Encode an opaque-typed value as raw bytes.
pub fn encode(value: &Value) -> Result<Vec<u8>, CodecError> {
    match value {
        Value::Opaque(bytes) => Ok(bytes.clone()),
        _ => Err(CodecError::TypeMismatch),
    }
}

/// Decode raw bytes as an opaque-typed value.
#[must_use]
pub fn decode(bytes: &[u8]) -> Value {
    Value::Opaque(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_raw_bytes() {
        let bytes = vec![0x61, 0x00, 0x7b];
        let v = decode(&bytes);
        assert_eq!(encode(&v).unwrap(), bytes);
    }
}
