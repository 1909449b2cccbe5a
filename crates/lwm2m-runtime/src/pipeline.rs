//! Request/Response Pipeline, application side.
//!
//! Correlates outbound [`Envelope::Request`]s with their eventual
//! [`Envelope::Response`] by [`RequestId`]. An inbound envelope that doesn't
//! match an in-flight waiter — a subscription notification, or a response
//! whose waiter already timed out — is handed back to the caller rather than
//! resolved here; `Session::process` is responsible for routing it onward.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use lwm2m_core::LwM2mError;
use lwm2m_protocol::{Envelope, RequestId};
use tokio::sync::{mpsc, oneshot};

/// One application-side half of the pipeline: hands out `RequestId`s, parks
/// a waiter per in-flight request, and routes completed responses.
pub struct Pipeline {
    next_id: Mutex<u64>,
    in_flight: Mutex<HashMap<RequestId, oneshot::Sender<Envelope>>>,
    outbound: mpsc::Sender<Envelope>,
}

impl Pipeline {
    #[must_use]
    pub fn new(outbound: mpsc::Sender<Envelope>) -> Self {
        Self {
            next_id: Mutex::new(1),
            in_flight: Mutex::new(HashMap::new()),
            outbound,
        }
    }

    /// Allocate the next monotonically increasing `RequestId` for this session.
    #[must_use]
    pub fn next_request_id(&self) -> RequestId {
        let mut guard = self.next_id.lock().unwrap();
        let id = *guard;
        *guard += 1;
        RequestId(id)
    }

    /// Send `request` and block until its matching response arrives, or
    /// `timeout` elapses. Dropping the returned future before it resolves
    /// removes the waiter without sending anything further on the wire.
    pub async fn perform(&self, request: Envelope, timeout: Duration) -> Result<Envelope, LwM2mError> {
        let request_id = request.request_id();
        let (tx, rx) = oneshot::channel();
        self.in_flight.lock().unwrap().insert(request_id, tx);

        if self.outbound.send(request).await.is_err() {
            self.in_flight.lock().unwrap().remove(&request_id);
            return Err(LwM2mError::SessionNotConnected);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(LwM2mError::Internal { reason: "response channel dropped".into() }),
            Err(_) => {
                self.in_flight.lock().unwrap().remove(&request_id);
                Err(LwM2mError::Timeout)
            }
        }
    }

    /// Route one inbound envelope. A non-notification response resolves the
    /// matching `perform` waiter and returns `None`; anything else (a
    /// notification, or a response whose waiter already timed out) is
    /// returned unchanged for the caller to route onward.
    #[must_use]
    pub fn dispatch(&self, envelope: Envelope) -> Option<Envelope> {
        if !envelope.is_notification() {
            let waiter = self.in_flight.lock().unwrap().remove(&envelope.request_id());
            if let Some(waiter) = waiter {
                let _ = waiter.send(envelope);
                return None;
            }
        }
        Some(envelope)
    }

    /// Number of requests still awaiting a response.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwm2m_protocol::{ResponseBody, ResponseCode};

    fn response(id: RequestId, notification: bool) -> Envelope {
        Envelope::Response {
            request_id: id,
            session_id: 1,
            kind: lwm2m_protocol::RequestKind::Read,
            code: ResponseCode::Success,
            body: ResponseBody::Empty,
            notification,
        }
    }

    #[tokio::test]
    async fn perform_resolves_on_matching_response() {
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let pipeline = Pipeline::new(out_tx);

        let request_id = pipeline.next_request_id();
        let request = Envelope::Request {
            request_id,
            session_id: 1,
            kind: lwm2m_protocol::RequestKind::Read,
            body: lwm2m_protocol::RequestBody::Empty,
        };

        let pipeline_ref = &pipeline;
        let (result, _) = tokio::join!(pipeline_ref.perform(request, Duration::from_secs(1)), async {
            let sent = out_rx.recv().await.unwrap();
            assert!(pipeline_ref.dispatch(response(sent.request_id(), false)).is_none());
        });
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn perform_times_out_without_a_response() {
        let (out_tx, _out_rx) = mpsc::channel(8);
        let pipeline = Pipeline::new(out_tx);
        let request_id = pipeline.next_request_id();
        let request = Envelope::Request {
            request_id,
            session_id: 1,
            kind: lwm2m_protocol::RequestKind::Read,
            body: lwm2m_protocol::RequestBody::Empty,
        };
        let result = pipeline.perform(request, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(LwM2mError::Timeout)));
    }

    #[tokio::test]
    async fn notification_is_returned_rather_than_resolved() {
        let (out_tx, _out_rx) = mpsc::channel(8);
        let pipeline = Pipeline::new(out_tx);
        let returned = pipeline.dispatch(response(RequestId(99), true));
        assert!(returned.is_some_and(|e| e.is_notification()));
    }

    #[tokio::test]
    async fn unmatched_response_is_returned_rather_than_dropped() {
        let (out_tx, _out_rx) = mpsc::channel(8);
        let pipeline = Pipeline::new(out_tx);
        let returned = pipeline.dispatch(response(RequestId(1), false));
        assert!(returned.is_some());
    }
}
