//! TLV content format: mandatory for multi-instance resources and for Read
//! of a whole object/instance.
//!
//! Each array element is headed by a `(resource_instance_id, value)` TLV
//! entry; header layout follows the OMA-LwM2M TLV type/length-field shape
//! (type tag, optional wide ID, optional wide length) without claiming exact
//! bit-for-bit parity with any particular vendor encoder.

use lwm2m_core::{ResourceArray, ResourceType, Value};

use crate::scalar::{decode_scalar_binary, encode_scalar_binary};
use crate::CodecError;

/// Resource Instance tag, used for every entry this encoder emits — the
/// caller already knows from the `ResourceDefinition` whether the overall
/// value is scalar or an array.
const TAG_RESOURCE_INSTANCE: u8 = 0b01;

fn encode_header(out: &mut Vec<u8>, id: u16, length: usize) {
    let id_is_wide = id > 0xFF;
    let mut header = (TAG_RESOURCE_INSTANCE) << 6;
    if id_is_wide {
        header |= 0b0010_0000;
    }

    let length_type: u8 = if length <= 0b111 {
        0
    } else if length <= 0xFF {
        1
    } else if length <= 0xFFFF {
        2
    } else {
        3
    };
    header |= length_type << 3;
    if length_type == 0 {
        header |= length as u8 & 0b111;
    }

    out.push(header);
    if id_is_wide {
        out.extend_from_slice(&id.to_be_bytes());
    } else {
        out.push(id as u8);
    }
    match length_type {
        0 => {}
        1 => out.push(length as u8),
        2 => out.extend_from_slice(&(length as u16).to_be_bytes()),
        3 => {
            let bytes = (length as u32).to_be_bytes();
            out.extend_from_slice(&bytes[1..]);
        }
        _ => unreachable!(),
    }
}

struct Header {
    id: u16,
    length: usize,
    header_len: usize,
}

fn decode_header(bytes: &[u8]) -> Result<Header, CodecError> {
    let first = *bytes.first().ok_or(CodecError::Overrun)?;
    let id_is_wide = first & 0b0010_0000 != 0;
    let length_type = (first >> 3) & 0b11;

    let mut offset = 1;
    let id = if id_is_wide {
        let b = bytes.get(offset..offset + 2).ok_or(CodecError::Overrun)?;
        offset += 2;
        u16::from_be_bytes([b[0], b[1]])
    } else {
        let b = *bytes.get(offset).ok_or(CodecError::Overrun)?;
        offset += 1;
        b as u16
    };

    let length = match length_type {
        0 => (first & 0b111) as usize,
        1 => {
            let v = *bytes.get(offset).ok_or(CodecError::Overrun)? as usize;
            offset += 1;
            v
        }
        2 => {
            let b = bytes.get(offset..offset + 2).ok_or(CodecError::Overrun)?;
            offset += 2;
            u16::from_be_bytes([b[0], b[1]]) as usize
        }
        3 => {
            let b = bytes.get(offset..offset + 3).ok_or(CodecError::Overrun)?;
            offset += 3;
            u32::from_be_bytes([0, b[0], b[1], b[2]]) as usize
        }
        _ => unreachable!(),
    };

    Ok(Header { id, length, header_len: offset })
}

/// Encode a scalar value as a single TLV entry keyed by resource-instance `0`.
pub fn encode_scalar(value: &Value) -> Result<Vec<u8>, CodecError> {
    let payload = encode_scalar_binary(value)?;
    let mut out = Vec::with_capacity(payload.len() + 4);
    encode_header(&mut out, 0, payload.len());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode a single scalar TLV entry.
pub fn decode_scalar(bytes: &[u8], scalar_type: ResourceType) -> Result<Value, CodecError> {
    let header = decode_header(bytes)?;
    let body = bytes
        .get(header.header_len..header.header_len + header.length)
        .ok_or(CodecError::Overrun)?;
    decode_scalar_binary(body, scalar_type)
}

/// Encode a [`ResourceArray`] as a sequence of TLV entries, ascending by ID.
pub fn encode_array(array: &ResourceArray<Value>) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    for (id, value) in array {
        let payload = encode_scalar_binary(value)?;
        encode_header(&mut out, *id, payload.len());
        out.extend_from_slice(&payload);
    }
    Ok(out)
}

/// Decode a sequence of TLV entries into a resource-instance-keyed array.
pub fn decode_array(
    mut bytes: &[u8],
    scalar_type: ResourceType,
) -> Result<ResourceArray<Value>, CodecError> {
    let mut out = ResourceArray::new();
    while !bytes.is_empty() {
        let header = decode_header(bytes)?;
        let body = bytes
            .get(header.header_len..header.header_len + header.length)
            .ok_or(CodecError::Overrun)?;
        let value = decode_scalar_binary(body, scalar_type)?;
        out.insert(header.id, value);
        bytes = &bytes[header.header_len + header.length..];
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_round_trips() {
        let v = Value::Integer(21);
        let bytes = encode_scalar(&v).unwrap();
        assert_eq!(decode_scalar(&bytes, ResourceType::Integer).unwrap(), v);
    }

    #[test]
    fn array_round_trips_ascending() {
        let mut arr = ResourceArray::new();
        arr.insert(0, Value::Integer(1));
        arr.insert(1, Value::Integer(2));
        let bytes = encode_array(&arr).unwrap();
        let decoded = decode_array(&bytes, ResourceType::Integer).unwrap();
        let values: ResourceArray<i64> = decoded
            .into_iter()
            .map(|(k, v)| (k, v.as_integer().unwrap()))
            .collect();
        assert_eq!(values.get(&0), Some(&1));
        assert_eq!(values.get(&1), Some(&2));
    }

    #[test]
    fn wide_id_round_trips() {
        let mut arr = ResourceArray::new();
        arr.insert(300, Value::Boolean(true));
        let bytes = encode_array(&arr).unwrap();
        let decoded = decode_array(&bytes, ResourceType::Boolean).unwrap();
        assert_eq!(decoded.get(&300), Some(&Value::Boolean(true)));
    }

    #[test]
    fn truncated_buffer_is_overrun() {
        let bytes = [0b0100_0010, 5]; // claims length 5, but only 0 bytes follow
        assert!(matches!(
            decode_scalar(&bytes, ResourceType::Integer),
            Err(CodecError::Overrun)
        ));
    }
}
