//! Client daemon transports: the app-facing length-delimited listener, and
//! the CoAP peer listener answering a server's GET/PUT/POST/DELETE against
//! this client's object model.

use std::sync::{Arc, Mutex};

use lwm2m_core::{LwM2mError, RuntimeConfig};
use lwm2m_protocol::{Envelope, OperationLeaf, RequestBody, RequestKind, ResponseBody, ResponseCode, ResponseLeaf, Tree};
use lwm2m_runtime::{DefinitionRegistry, ObjectStore, ObservationTable};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tracing::{debug, info, warn};

use crate::{coap, handlers};

/// Shared state for one client daemon process: a single live object model.
pub struct ClientDaemonState {
    pub config: RuntimeConfig,
    pub registry: Mutex<DefinitionRegistry>,
    pub store: Mutex<ObjectStore>,
    pub observations: Mutex<ObservationTable>,
}

impl ClientDaemonState {
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            registry: Mutex::new(DefinitionRegistry::new()),
            store: Mutex::new(ObjectStore::new()),
            observations: Mutex::new(ObservationTable::new()),
        }
    }
}

/// Bind and serve the app-facing listener until the process is signaled to
/// stop. Each connection is handled on its own task; state is shared behind
/// `Arc` + `Mutex` (single daemon, not a per-connection object model).
pub async fn serve(listener: TcpListener, state: Arc<ClientDaemonState>) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "accepted app connection");
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                warn!(error = %e, %peer, "app connection ended with an error");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<ClientDaemonState>) -> Result<(), LwM2mError> {
    let max = state.config.max_message_size_bytes;
    loop {
        let request = match lwm2m_protocol::read_frame(&mut stream, max).await {
            Ok(envelope) => envelope,
            Err(lwm2m_protocol::ProtocolError::Closed) => return Ok(()),
            Err(e) => return Err(LwM2mError::IpcError { reason: e.to_string() }),
        };

        let Envelope::Request { request_id, session_id, kind, body } = request else {
            continue;
        };

        if kind == RequestKind::Disconnect {
            return Ok(());
        }

        let response = process_request(&state, kind, body);
        let envelope = Envelope::Response {
            request_id,
            session_id,
            kind,
            code: if response.is_ok() { ResponseCode::Success } else { ResponseCode::FailureBadRequest },
            body: response.unwrap_or(ResponseBody::Empty),
            notification: false,
        };
        lwm2m_protocol::write_frame(&mut stream, &envelope, max)
            .await
            .map_err(|e| LwM2mError::IpcError { reason: e.to_string() })?;

        let pending = state.observations.lock().unwrap().take_pending();
        for note in pending {
            let mut tree = Tree::new();
            tree.insert(note.path, ResponseLeaf::success(Some(note.value)));
            let notify = Envelope::Response {
                request_id,
                session_id,
                kind: RequestKind::Observe,
                code: ResponseCode::Success,
                body: ResponseBody::Tree { tree },
                notification: true,
            };
            lwm2m_protocol::write_frame(&mut stream, &notify, max)
                .await
                .map_err(|e| LwM2mError::IpcError { reason: e.to_string() })?;
        }
    }
}

fn process_request(
    state: &ClientDaemonState,
    kind: RequestKind,
    body: RequestBody,
) -> Result<ResponseBody, LwM2mError> {
    match (kind, body) {
        (RequestKind::Connect, _) => Ok(ResponseBody::Empty),

        (RequestKind::Define, RequestBody::Define { definition }) => {
            state.registry.lock().unwrap().define(definition)?;
            info!("object definition registered");
            Ok(ResponseBody::Empty)
        }

        (_, RequestBody::Tree { tree }) => {
            let mut registry = state.registry.lock().unwrap();
            let mut store = state.store.lock().unwrap();
            let mut observations = state.observations.lock().unwrap();
            let response_tree = handlers::handle_tree(&mut registry, &mut store, &mut observations, 0, kind, &tree);
            Ok(ResponseBody::Tree { tree: response_tree })
        }

        _ => Err(LwM2mError::OperationInvalid { reason: format!("unsupported request shape for {kind:?}") }),
    }
}

/// Listen for server-initiated CoAP requests against this client's object
/// model: one UDP packet in, one decoded leaf applied via [`handlers::handle_tree`],
/// one response packet out.
pub async fn serve_coap_peer(socket: UdpSocket, state: Arc<ClientDaemonState>) -> std::io::Result<()> {
    let mut buf = [0u8; 2048];
    loop {
        let (len, peer) = socket.recv_from(&mut buf).await?;
        let Ok(request) = coap::decode_request(&buf[..len]) else {
            warn!(%peer, "dropped unparseable CoAP packet");
            continue;
        };
        let Ok(path) = lwm2m_core::Path::parse(&request.path) else {
            warn!(%peer, path = %request.path, "dropped request with unparseable path");
            continue;
        };
        let Ok(leaf) = serde_json::from_slice::<OperationLeaf>(&request.payload) else {
            warn!(%peer, "dropped request with unparseable payload");
            continue;
        };

        let mut tree = Tree::new();
        let kind = leaf.kind();
        tree.insert(path, leaf);

        let outcome = {
            let mut registry = state.registry.lock().unwrap();
            let mut store = state.store.lock().unwrap();
            let mut observations = state.observations.lock().unwrap();
            let response_tree = handlers::handle_tree(&mut registry, &mut store, &mut observations, 0, kind, &tree);
            response_tree.leaves().into_iter().next().map(|(_, leaf)| leaf.clone())
        };
        let outcome = outcome.unwrap_or_else(|| ResponseLeaf::failure(LwM2mError::PathNotFound));

        let code = coap::response_code_for(outcome.error.as_ref());
        let payload = serde_json::to_vec(&outcome).unwrap_or_default();
        if let Ok(bytes) = coap::encode_response(code, request.token.clone(), request.message_id, payload) {
            let _ = socket.send_to(&bytes, peer).await;
        }
    }
}
