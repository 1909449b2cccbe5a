//! Length-delimited framing for the application<->daemon transport: a
//! 4-byte length prefix over a reliable local stream transport.

use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::envelope::Envelope;
use crate::error::ProtocolError;

const LENGTH_PREFIX_BYTES: usize = 4;

/// Encode one [`Envelope`] as a 4-byte big-endian length prefix followed by
/// its JSON body, enforcing `max_message_size_bytes`.
pub fn encode_frame(envelope: &Envelope, max_message_size_bytes: u32) -> Result<BytesMut, ProtocolError> {
    let payload = serde_json::to_vec(envelope)?;
    if payload.len() > max_message_size_bytes as usize {
        return Err(ProtocolError::FrameTooLarge(payload.len(), max_message_size_bytes));
    }
    let mut out = BytesMut::with_capacity(LENGTH_PREFIX_BYTES + payload.len());
    out.put_u32(payload.len() as u32);
    out.put_slice(&payload);
    Ok(out)
}

/// Read exactly one length-prefixed frame from `reader` and decode it.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_message_size_bytes: u32,
) -> Result<Envelope, ProtocolError> {
    let mut len_buf = [0u8; LENGTH_PREFIX_BYTES];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(ProtocolError::Closed),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > max_message_size_bytes {
        return Err(ProtocolError::FrameTooLarge(len as usize, max_message_size_bytes));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    let envelope = serde_json::from_slice(&payload)?;
    Ok(envelope)
}

/// Write one [`Envelope`] as a length-prefixed frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    envelope: &Envelope,
    max_message_size_bytes: u32,
) -> Result<(), ProtocolError> {
    let frame = encode_frame(envelope, max_message_size_bytes)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Attempt to decode one frame from the front of `buf`, advancing it past the
/// consumed bytes on success. Returns `None` if `buf` does not yet contain a
/// full frame (used by datagram-oriented transports where a whole message
/// may arrive in fragments, or a stream reader draining a socket buffer).
pub fn try_decode_frame(buf: &mut BytesMut, max_message_size_bytes: u32) -> Result<Option<Envelope>, ProtocolError> {
    if buf.len() < LENGTH_PREFIX_BYTES {
        return Ok(None);
    }
    let len = u32::from_be_bytes(buf[..LENGTH_PREFIX_BYTES].try_into().unwrap());
    if len > max_message_size_bytes {
        return Err(ProtocolError::FrameTooLarge(len as usize, max_message_size_bytes));
    }
    if buf.len() < LENGTH_PREFIX_BYTES + len as usize {
        return Ok(None);
    }

    buf.advance(LENGTH_PREFIX_BYTES);
    let payload = buf.split_to(len as usize);
    let envelope = serde_json::from_slice(&payload)?;
    Ok(Some(envelope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{RequestBody, RequestId, RequestKind};
    use crate::tree::Tree;

    fn sample_envelope() -> Envelope {
        Envelope::Request {
            request_id: RequestId(1),
            session_id: 1,
            kind: RequestKind::Read,
            body: RequestBody::Tree { tree: Tree::new() },
        }
    }

    #[tokio::test]
    async fn round_trips_through_an_in_memory_pipe() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let envelope = sample_envelope();
        write_frame(&mut client, &envelope, 65536).await.unwrap();
        let decoded = read_frame(&mut server, 65536).await.unwrap();
        assert_eq!(decoded.request_id(), envelope.request_id());
    }

    #[test]
    fn try_decode_returns_none_on_partial_frame() {
        let envelope = sample_envelope();
        let full = encode_frame(&envelope, 65536).unwrap();
        let mut partial = BytesMut::from(&full[..full.len() - 1]);
        assert!(try_decode_frame(&mut partial, 65536).unwrap().is_none());
    }

    #[test]
    fn rejects_oversized_frame() {
        let envelope = sample_envelope();
        assert!(matches!(
            encode_frame(&envelope, 1),
            Err(ProtocolError::FrameTooLarge(_, 1))
        ));
    }
}
