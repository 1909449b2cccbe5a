//! CoAP transaction construction/parsing.
//!
//! Not a full CoAP implementation (no retransmission, no blockwise
//! transfer) — just real wire bytes for the handful of request/response
//! codes the LwM2M operations need, built on `coap-lite`.

use std::net::SocketAddr;
use std::time::Duration;

use coap_lite::{CoapOption, MessageClass, Packet, MessageType, RequestType as Method, ResponseType};
use lwm2m_core::{LwM2mError, LwM2mErrorKind};
use lwm2m_protocol::RequestKind;
use thiserror::Error;
use tokio::net::UdpSocket;

#[derive(Debug, Error)]
pub enum CoapError {
    #[error("failed to encode CoAP packet: {0}")]
    Encode(String),
    #[error("failed to decode CoAP packet: {0}")]
    Decode(String),
    #[error("request carried no Uri-Path option")]
    MissingPath,
}

/// A decoded inbound CoAP request, reduced to what the handlers need.
#[derive(Debug, Clone)]
pub struct CoapRequest {
    pub message_id: u16,
    pub token: Vec<u8>,
    pub method: Method,
    pub path: String,
    pub payload: Vec<u8>,
}

/// A decoded inbound CoAP response, reduced to what the handlers need.
#[derive(Debug, Clone)]
pub struct CoapResponse {
    pub message_id: u16,
    pub token: Vec<u8>,
    pub code: ResponseType,
    pub payload: Vec<u8>,
}

/// Encode one CoAP request targeting `path`.
pub fn encode_request(
    method: Method,
    path: &str,
    token: Vec<u8>,
    message_id: u16,
    payload: Vec<u8>,
) -> Result<Vec<u8>, CoapError> {
    let mut packet = Packet::new();
    packet.header.set_version(1);
    packet.header.set_type(MessageType::Confirmable);
    packet.header.code = MessageClass::Request(method);
    packet.header.message_id = message_id;
    packet.set_token(token);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        packet.add_option(CoapOption::UriPath, segment.as_bytes().to_vec());
    }
    packet.payload = payload;
    packet.to_bytes().map_err(|e| CoapError::Encode(e.to_string()))
}

/// Decode an inbound CoAP request.
pub fn decode_request(bytes: &[u8]) -> Result<CoapRequest, CoapError> {
    let packet = Packet::from_bytes(bytes).map_err(|e| CoapError::Decode(format!("{e:?}")))?;

    let path = packet
        .get_option(CoapOption::UriPath)
        .ok_or(CoapError::MissingPath)?
        .iter()
        .map(|segment| String::from_utf8_lossy(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");

    let method = match packet.header.code {
        MessageClass::Request(method) => method,
        _ => Method::UnKnown,
    };

    Ok(CoapRequest {
        message_id: packet.header.message_id,
        token: packet.get_token().to_vec(),
        method,
        path: format!("/{path}"),
        payload: packet.payload,
    })
}

/// Encode a CoAP response carrying `payload` with the given outcome.
pub fn encode_response(
    code: ResponseType,
    token: Vec<u8>,
    message_id: u16,
    payload: Vec<u8>,
) -> Result<Vec<u8>, CoapError> {
    let mut packet = Packet::new();
    packet.header.set_version(1);
    packet.header.set_type(MessageType::Acknowledgement);
    packet.header.code = MessageClass::Response(code);
    packet.header.message_id = message_id;
    packet.set_token(token);
    packet.payload = payload;
    packet.to_bytes().map_err(|e| CoapError::Encode(e.to_string()))
}

/// Decode an inbound CoAP response.
pub fn decode_response(bytes: &[u8]) -> Result<CoapResponse, CoapError> {
    let packet = Packet::from_bytes(bytes).map_err(|e| CoapError::Decode(format!("{e:?}")))?;
    let code = match packet.header.code {
        MessageClass::Response(code) => code,
        other => return Err(CoapError::Decode(format!("not a response: {other:?}"))),
    };
    Ok(CoapResponse {
        message_id: packet.header.message_id,
        token: packet.get_token().to_vec(),
        code,
        payload: packet.payload,
    })
}

/// The CoAP method a given request kind is carried over.
#[must_use]
pub fn method_for_kind(kind: RequestKind) -> Method {
    match kind {
        RequestKind::Read
        | RequestKind::Discover
        | RequestKind::Observe
        | RequestKind::CancelObserve
        | RequestKind::ListClients => Method::Get,
        RequestKind::Write | RequestKind::WriteAttributes | RequestKind::Define => Method::Put,
        RequestKind::Execute | RequestKind::Create | RequestKind::Connect => Method::Post,
        RequestKind::Delete | RequestKind::Disconnect => Method::Delete,
    }
}

/// The reverse of [`response_code_for`]: a received response code mapped
/// back into an application error, or `None` for a successful outcome.
#[must_use]
pub fn error_for_response(code: ResponseType) -> Option<LwM2mError> {
    match code {
        ResponseType::Content | ResponseType::Created | ResponseType::Changed | ResponseType::Deleted => None,
        ResponseType::NotFound => Some(LwM2mError::PathNotFound),
        ResponseType::BadRequest => Some(LwM2mError::LwM2mProtocol { kind: LwM2mErrorKind::BadRequest }),
        ResponseType::Unauthorized => Some(LwM2mError::LwM2mProtocol { kind: LwM2mErrorKind::Unauthorized }),
        ResponseType::MethodNotAllowed => Some(LwM2mError::LwM2mProtocol { kind: LwM2mErrorKind::MethodNotAllowed }),
        ResponseType::NotAcceptable => Some(LwM2mError::LwM2mProtocol { kind: LwM2mErrorKind::NotAcceptable }),
        ResponseType::GatewayTimeout => Some(LwM2mError::LwM2mProtocol { kind: LwM2mErrorKind::Timeout }),
        ResponseType::InternalServerError => Some(LwM2mError::LwM2mProtocol { kind: LwM2mErrorKind::ServerError }),
        _ => Some(LwM2mError::Unspecified),
    }
}

/// Send one CoAP request to `peer` over a fresh ephemeral socket and wait
/// for its matching reply, up to `timeout`. One socket per exchange keeps
/// this free of any shared-socket correlation bookkeeping.
pub async fn exchange(
    peer: SocketAddr,
    method: Method,
    path: &str,
    token: Vec<u8>,
    message_id: u16,
    payload: Vec<u8>,
    timeout: Duration,
) -> Result<CoapResponse, CoapError> {
    let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(|e| CoapError::Encode(e.to_string()))?;
    let request = encode_request(method, path, token, message_id, payload)?;
    socket.send_to(&request, peer).await.map_err(|e| CoapError::Encode(e.to_string()))?;

    let mut buf = [0u8; 2048];
    let len = tokio::time::timeout(timeout, socket.recv_from(&mut buf))
        .await
        .map_err(|_| CoapError::Decode("timed out waiting for response".into()))?
        .map_err(|e| CoapError::Decode(e.to_string()))?
        .0;
    decode_response(&buf[..len])
}

/// Register with `peer` via a fire-and-forget `POST /rd`.
pub async fn register_with_server(socket: &UdpSocket, peer: SocketAddr) -> Result<(), CoapError> {
    let bytes = encode_request(Method::Post, "/rd", vec![0], 0, Vec::new())?;
    socket.send_to(&bytes, peer).await.map_err(|e| CoapError::Encode(e.to_string()))?;
    Ok(())
}

/// Map an application-level outcome into the CoAP response code to send.
#[must_use]
pub fn response_code_for(error: Option<&LwM2mError>) -> ResponseType {
    match error {
        None => ResponseType::Content,
        Some(LwM2mError::PathNotFound | LwM2mError::NotDefined | LwM2mError::ClientNotFound) => {
            ResponseType::NotFound
        }
        Some(LwM2mError::TypeMismatch | LwM2mError::OperationInvalid { .. } | LwM2mError::PathInvalid { .. }) => {
            ResponseType::BadRequest
        }
        Some(LwM2mError::LwM2mProtocol { kind }) => match kind {
            LwM2mErrorKind::BadRequest => ResponseType::BadRequest,
            LwM2mErrorKind::Unauthorized => ResponseType::Unauthorized,
            LwM2mErrorKind::NotFound => ResponseType::NotFound,
            LwM2mErrorKind::MethodNotAllowed => ResponseType::MethodNotAllowed,
            LwM2mErrorKind::NotAcceptable => ResponseType::NotAcceptable,
            LwM2mErrorKind::Timeout => ResponseType::GatewayTimeout,
            LwM2mErrorKind::ServerError => ResponseType::InternalServerError,
        },
        Some(_) => ResponseType::InternalServerError,
    }
}
