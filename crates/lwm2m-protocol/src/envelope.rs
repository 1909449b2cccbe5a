//! The application<->daemon wire envelope.
//!
//! A message is a sequence of typed key->value pairs with a nested "content"
//! subtree, realized as a `#[serde(tag = "t")]` enum rather than a stringly
//! keyed map.

use lwm2m_core::{LwM2mError, ObjectDefinition, Value};
use serde::{Deserialize, Serialize};

use crate::tree::Tree;

/// Monotonically increasing per-session request correlation ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

/// Request kinds recognized by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Connect,
    Disconnect,
    Define,
    Read,
    Write,
    Execute,
    Delete,
    WriteAttributes,
    Observe,
    CancelObserve,
    Discover,
    Create,
    ListClients,
}

/// Top-level response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseCode {
    Success,
    FailureBadRequest,
    FailureInternal,
    FailureTimeout,
    FailureNotConnected,
}

/// A WriteAttributes attribute value: `{key: text, value: text|int|float}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeValue {
    Text(String),
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: AttributeValue,
}

/// Per-leaf request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OperationLeaf {
    Read,
    Write { value: Value, create_optional: bool },
    Execute { args: Option<Vec<u8>> },
    Delete,
    WriteAttributes { attributes: Vec<Attribute>, cancel: bool },
    Observe,
    CancelObserve,
    Discover,
    Create { value: Option<Value> },
    SubscribeChange,
    SubscribeExecute,
}

impl OperationLeaf {
    /// The [`RequestKind`] a decoded leaf implies, for a listener that only
    /// has the leaf itself (no separate out-of-band request kind) to go on.
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        match self {
            OperationLeaf::Read | OperationLeaf::SubscribeChange => RequestKind::Read,
            OperationLeaf::Write { .. } => RequestKind::Write,
            OperationLeaf::Execute { .. } | OperationLeaf::SubscribeExecute => RequestKind::Execute,
            OperationLeaf::Delete => RequestKind::Delete,
            OperationLeaf::WriteAttributes { .. } => RequestKind::WriteAttributes,
            OperationLeaf::Observe => RequestKind::Observe,
            OperationLeaf::CancelObserve => RequestKind::CancelObserve,
            OperationLeaf::Discover => RequestKind::Discover,
            OperationLeaf::Create { .. } => RequestKind::Create,
        }
    }
}

/// Per-leaf response payload: an outcome plus any carried value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseLeaf {
    /// Application-level error; takes precedence over `protocol_error` when
    /// both are present.
    pub error: Option<LwM2mError>,
    /// Secondary protocol-level detail, retained even when `error` is set.
    pub protocol_error: Option<LwM2mError>,
    pub value: Option<Value>,
}

impl ResponseLeaf {
    #[must_use]
    pub fn success(value: Option<Value>) -> Self {
        Self { error: None, protocol_error: None, value }
    }

    #[must_use]
    pub fn failure(error: LwM2mError) -> Self {
        Self { error: Some(error), protocol_error: None, value: None }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Request-side content: either a tree of per-path operations, a single
/// definition (Define is local to the daemon and has no per-path shape), or
/// nothing (ListClients/Disconnect).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "content_kind", rename_all = "snake_case")]
pub enum RequestBody {
    Define { definition: ObjectDefinition },
    Tree { tree: Tree<OperationLeaf> },
    Empty,
}

/// Response-side content, mirroring [`RequestBody`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "content_kind", rename_all = "snake_case")]
pub enum ResponseBody {
    Tree { tree: Tree<ResponseLeaf> },
    ClientList { client_ids: Vec<u32> },
    Empty,
}

/// The wire envelope exchanged between an application and its daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum Envelope {
    Request {
        request_id: RequestId,
        session_id: u32,
        kind: RequestKind,
        body: RequestBody,
    },
    Response {
        request_id: RequestId,
        session_id: u32,
        kind: RequestKind,
        code: ResponseCode,
        body: ResponseBody,
        /// Distinguishes a subscription delivery from the reply to the
        /// establishing request.
        notification: bool,
    },
}

impl Envelope {
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        match self {
            Envelope::Request { request_id, .. } | Envelope::Response { request_id, .. } => *request_id,
        }
    }

    #[must_use]
    pub fn is_notification(&self) -> bool {
        matches!(self, Envelope::Response { notification: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips_through_json() {
        let env = Envelope::Request {
            request_id: RequestId(1),
            session_id: 42,
            kind: RequestKind::Read,
            body: RequestBody::Tree { tree: Tree::new() },
        };
        let json = serde_json::to_string(&env).unwrap();
        let back: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.request_id(), RequestId(1));
    }

    #[test]
    fn leaf_kind_matches_the_operation_it_carries() {
        assert_eq!(OperationLeaf::Delete.kind(), RequestKind::Delete);
        assert_eq!(OperationLeaf::Write { value: Value::Integer(1), create_optional: false }.kind(), RequestKind::Write);
    }

    #[test]
    fn notification_flag_is_observable() {
        let env = Envelope::Response {
            request_id: RequestId(5),
            session_id: 1,
            kind: RequestKind::Observe,
            code: ResponseCode::Success,
            body: ResponseBody::Empty,
            notification: true,
        };
        assert!(env.is_notification());
    }
}
