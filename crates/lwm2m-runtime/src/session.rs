//! Session & Connection Manager.
//!
//! `connect` performs the handshake and spawns the reader/writer halves of
//! the transport; `perform`/`process`/`dispatch_callbacks` are the only
//! blocking operations, driving a single-threaded cooperative dispatch loop.

use std::time::Duration;

use lwm2m_core::{ChangeKind, LwM2mError};
use lwm2m_protocol::{Envelope, RequestBody, RequestId, RequestKind, ResponseBody, ResponseCode};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::dispatch::CallbackDispatcher;
use crate::pipeline::Pipeline;
use crate::subscription::{ChangeSet, SubscriptionTable};

/// A connected application<->daemon session.
pub struct Session {
    session_id: u32,
    pipeline: Pipeline,
    subscriptions: SubscriptionTable,
    dispatcher: CallbackDispatcher,
    notifications: mpsc::Receiver<Envelope>,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
    max_message_size_bytes: u32,
}

impl Session {
    /// Connect over an already-open transport, sending the initial `Connect`
    /// request and validating the daemon's first response before returning.
    pub async fn connect<T>(transport: T, session_id: u32, max_message_size_bytes: u32) -> Result<Self, LwM2mError>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Envelope>(32);
        let (notif_tx, notifications) = mpsc::channel::<Envelope>(32);
        let (mut read_half, mut write_half) = tokio::io::split(transport);

        let pipeline = Pipeline::new(outbound_tx);
        let request_id = pipeline.next_request_id();
        let connect_request = Envelope::Request {
            request_id,
            session_id,
            kind: RequestKind::Connect,
            body: RequestBody::Empty,
        };

        lwm2m_protocol::write_frame(&mut write_half, &connect_request, max_message_size_bytes)
            .await
            .map_err(|e| LwM2mError::IpcError { reason: e.to_string() })?;

        let handshake_response = lwm2m_protocol::read_frame(&mut read_half, max_message_size_bytes)
            .await
            .map_err(|e| LwM2mError::IpcError { reason: e.to_string() })?;
        match &handshake_response {
            Envelope::Response { code: ResponseCode::Success, .. } => {}
            Envelope::Response { code, .. } => {
                return Err(LwM2mError::Internal { reason: format!("connect rejected: {code:?}") })
            }
            Envelope::Request { .. } => return Err(LwM2mError::SessionInvalid),
        }

        let reader_task = tokio::spawn(async move {
            loop {
                match lwm2m_protocol::read_frame(&mut read_half, max_message_size_bytes).await {
                    Ok(envelope) => {
                        if notif_tx.send(envelope).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        let writer_task = tokio::spawn(async move {
            while let Some(envelope) = outbound_rx.recv().await {
                if lwm2m_protocol::write_frame(&mut write_half, &envelope, max_message_size_bytes)
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        Ok(Self {
            session_id,
            pipeline,
            subscriptions: SubscriptionTable::new(),
            dispatcher: CallbackDispatcher::new(),
            notifications,
            reader_task,
            writer_task,
            max_message_size_bytes,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    #[must_use]
    pub fn next_request_id(&self) -> RequestId {
        self.pipeline.next_request_id()
    }

    /// Send `request` and await its matching response, up to `timeout`.
    pub async fn perform(&self, request: Envelope, timeout: Duration) -> Result<Envelope, LwM2mError> {
        self.pipeline.perform(request, timeout).await
    }

    /// Pump the transport: read whatever has already arrived from the
    /// reader task and route it (response vs. notification), up to
    /// `timeout`. Never runs user callbacks directly.
    pub async fn process(&mut self, timeout: Duration) -> Result<(), LwM2mError> {
        match tokio::time::timeout(timeout, self.notifications.recv()).await {
            Ok(Some(envelope)) => {
                if let Some(unmatched) = self.pipeline.dispatch(envelope) {
                    for change in changesets_from_envelope(&unmatched) {
                        self.subscriptions.notify(change).await;
                    }
                }
                Ok(())
            }
            Ok(None) => Err(LwM2mError::SessionNotConnected),
            Err(_) => Ok(()),
        }
    }

    #[must_use]
    pub fn subscriptions_mut(&mut self) -> &mut SubscriptionTable {
        &mut self.subscriptions
    }

    #[must_use]
    pub fn dispatcher_mut(&mut self) -> &mut CallbackDispatcher {
        &mut self.dispatcher
    }

    /// Invoke every registered callback with whatever has been queued since
    /// the last call. The only place user code runs.
    pub fn dispatch_callbacks(&mut self) -> usize {
        self.dispatcher.dispatch_callbacks()
    }

    #[must_use]
    pub fn max_message_size_bytes(&self) -> u32 {
        self.max_message_size_bytes
    }
}

/// Turn one notification envelope's response tree into the `ChangeSet`s
/// `SubscriptionTable::notify` delivers, one per leaf that carried a value.
fn changesets_from_envelope(envelope: &Envelope) -> Vec<ChangeSet> {
    let Envelope::Response { body: ResponseBody::Tree { tree }, .. } = envelope else {
        return Vec::new();
    };
    tree.leaves()
        .into_iter()
        .filter(|(_, leaf)| leaf.is_success())
        .map(|(path, leaf)| ChangeSet { path, kind: ChangeKind::ResourceModified, value: leaf.value.clone() })
        .collect()
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reader_task.abort();
        self.writer_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_fails_fast_on_rejected_handshake() {
        let (mut daemon_side, app_side) = tokio::io::duplex(4096);
        let handshake = tokio::spawn(async move {
            let _req = lwm2m_protocol::read_frame(&mut daemon_side, 65536).await.unwrap();
            let rejection = Envelope::Response {
                request_id: RequestId(1),
                session_id: 1,
                kind: RequestKind::Connect,
                code: ResponseCode::FailureNotConnected,
                body: lwm2m_protocol::ResponseBody::Empty,
                notification: false,
            };
            lwm2m_protocol::write_frame(&mut daemon_side, &rejection, 65536).await.unwrap();
        });

        let result = Session::connect(app_side, 1, 65536).await;
        handshake.await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn process_routes_unmatched_notification_into_subscriptions() {
        let (mut daemon_side, app_side) = tokio::io::duplex(4096);
        let path = lwm2m_core::Path::parse("/1000/0/104").unwrap();
        let handshake = tokio::spawn(async move {
            let _req = lwm2m_protocol::read_frame(&mut daemon_side, 65536).await.unwrap();
            let ack = Envelope::Response {
                request_id: RequestId(1),
                session_id: 1,
                kind: RequestKind::Connect,
                code: ResponseCode::Success,
                body: ResponseBody::Empty,
                notification: false,
            };
            lwm2m_protocol::write_frame(&mut daemon_side, &ack, 65536).await.unwrap();

            let mut tree = lwm2m_protocol::Tree::new();
            tree.insert(path, lwm2m_protocol::ResponseLeaf::success(Some(lwm2m_core::Value::Float(30.0))));
            let notify = Envelope::Response {
                request_id: RequestId(0),
                session_id: 1,
                kind: RequestKind::Observe,
                code: ResponseCode::Success,
                body: ResponseBody::Tree { tree },
                notification: true,
            };
            lwm2m_protocol::write_frame(&mut daemon_side, &notify, 65536).await.unwrap();
        });

        let mut session = Session::connect(app_side, 1, 65536).await.unwrap();
        let (_id, _cancel, mut rx) = session.subscriptions_mut().subscribe(path, 4);

        session.process(Duration::from_secs(1)).await.unwrap();
        handshake.await.unwrap();

        let change = rx.recv().await.unwrap();
        assert_eq!(change.value, Some(lwm2m_core::Value::Float(30.0)));
    }
}
