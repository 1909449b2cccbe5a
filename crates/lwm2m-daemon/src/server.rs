//! Server daemon state and listeners: a CoAP registration endpoint populating
//! the [`ClientRegistry`], and the app-facing listener answering
//! `ListClients`/per-client tree operations by speaking real CoAP to the
//! registered client's address.
//!
//! The wire envelope has one `session_id`; for a server-role daemon that
//! value doubles as the target `client_id` a Tree request operates against
//! (an app session on the server side always addresses exactly one
//! registered client at a time).

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use coap_lite::RequestType as CoapMethod;
use lwm2m_core::{LwM2mError, RuntimeConfig};
use lwm2m_protocol::{Envelope, OperationLeaf, RequestBody, RequestKind, ResponseBody, ResponseCode, ResponseLeaf, Tree};
use lwm2m_runtime::{ClientRegistration, ClientRegistry, DefinitionRegistry, ObjectStore, ObservationTable};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tracing::{debug, info, warn};

use crate::{coap, handlers};

const COAP_ROUND_TRIP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ServerDaemonState {
    pub config: RuntimeConfig,
    pub registry: Mutex<DefinitionRegistry>,
    pub clients: Mutex<ClientRegistry>,
    pub observations: Mutex<ObservationTable>,
    next_client_id: Mutex<u32>,
}

impl ServerDaemonState {
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            registry: Mutex::new(DefinitionRegistry::new()),
            clients: Mutex::new(ClientRegistry::new()),
            observations: Mutex::new(ObservationTable::new()),
            next_client_id: Mutex::new(1),
        }
    }
}

/// Listen for CoAP registration requests (`POST /rd`) and add each
/// registering endpoint to the client registry.
pub async fn serve_coap_registrations(socket: UdpSocket, state: Arc<ServerDaemonState>) -> std::io::Result<()> {
    let mut buf = [0u8; 2048];
    loop {
        let (len, peer) = socket.recv_from(&mut buf).await?;
        let Ok(request) = coap::decode_request(&buf[..len]) else {
            warn!(%peer, "dropped unparseable CoAP packet");
            continue;
        };
        if request.method != CoapMethod::Post || !request.path.trim_start_matches('/').starts_with("rd") {
            continue;
        }

        let client_id = {
            let mut next = state.next_client_id.lock().unwrap();
            let id = *next;
            *next += 1;
            id
        };
        state.clients.lock().unwrap().register(ClientRegistration {
            client_id,
            address: peer.to_string(),
            registration_time: 0,
        });
        info!(client_id, %peer, "client registered");
    }
}

/// Bind and serve the app-facing listener for server-role daemons.
pub async fn serve_app_listener(listener: TcpListener, state: Arc<ServerDaemonState>) -> std::io::Result<()> {
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

async fn handle_connection(mut stream: TcpStream, state: Arc<ServerDaemonState>) -> Result<(), LwM2mError> {
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

        let response = process_request(&state, session_id, kind, body).await;
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

async fn process_request(
    state: &ServerDaemonState,
    client_id: u32,
    kind: RequestKind,
    body: RequestBody,
) -> Result<ResponseBody, LwM2mError> {
    match (kind, body) {
        (RequestKind::Connect, _) => Ok(ResponseBody::Empty),

        (RequestKind::ListClients, _) => {
            let client_ids = state.clients.lock().unwrap().client_ids().collect();
            Ok(ResponseBody::ClientList { client_ids })
        }

        (RequestKind::Define, RequestBody::Define { definition }) => {
            state.registry.lock().unwrap().define(definition)?;
            Ok(ResponseBody::Empty)
        }

        (
            RequestKind::Observe | RequestKind::CancelObserve | RequestKind::WriteAttributes | RequestKind::Discover,
            RequestBody::Tree { tree },
        ) => {
            // Local bookkeeping only: neither of these touch the client's
            // object model, so there is nothing to round-trip over CoAP for.
            let mut registry = state.registry.lock().unwrap();
            let mut observations = state.observations.lock().unwrap();
            let mut scratch = ObjectStore::new();
            let response_tree = handlers::handle_tree(&mut registry, &mut scratch, &mut observations, client_id, kind, &tree);
            Ok(ResponseBody::Tree { tree: response_tree })
        }

        (_, RequestBody::Tree { tree }) => {
            let address = {
                let clients = state.clients.lock().unwrap();
                clients.get(client_id).ok_or(LwM2mError::ClientNotFound)?.address.clone()
            };
            let response_tree = send_tree_request(&address, kind, &tree).await?;

            if kind == RequestKind::Write {
                let mut observations = state.observations.lock().unwrap();
                let reply_leaves = response_tree.leaves();
                for (path, leaf) in tree.leaves() {
                    if let OperationLeaf::Write { value, .. } = leaf {
                        let succeeded = reply_leaves.iter().any(|(p, l)| *p == path && l.is_success());
                        if succeeded {
                            observations.evaluate_write(client_id, &path, value, 1);
                        }
                    }
                }
            }
            Ok(ResponseBody::Tree { tree: response_tree })
        }

        _ => Err(LwM2mError::OperationInvalid { reason: format!("unsupported request shape for {kind:?}") }),
    }
}

/// Send every leaf of `tree` to `address` as its own CoAP exchange and
/// assemble the replies into a response tree. One exchange per leaf rather
/// than a single batched wire format.
async fn send_tree_request(address: &str, kind: RequestKind, tree: &Tree<OperationLeaf>) -> Result<Tree<ResponseLeaf>, LwM2mError> {
    let peer: SocketAddr = address.parse().map_err(|_| LwM2mError::ClientNotFound)?;
    let method = coap::method_for_kind(kind);
    let mut response_tree = Tree::new();
    for (index, (path, leaf)) in tree.leaves().into_iter().enumerate() {
        let payload = serde_json::to_vec(leaf).map_err(|e| LwM2mError::Internal { reason: e.to_string() })?;
        let message_id = index as u16;
        let token = message_id.to_be_bytes().to_vec();
        let reply = coap::exchange(peer, method, &path.to_string(), token, message_id, payload, COAP_ROUND_TRIP_TIMEOUT)
            .await
            .map_err(|e| LwM2mError::Internal { reason: e.to_string() })?;
        let outcome = serde_json::from_slice::<ResponseLeaf>(&reply.payload)
            .unwrap_or_else(|_| ResponseLeaf::failure(coap::error_for_response(reply.code).unwrap_or(LwM2mError::Unspecified)));
        response_tree.insert(path, outcome);
    }
    Ok(response_tree)
}
