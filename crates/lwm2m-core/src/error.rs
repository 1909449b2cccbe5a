//! Error taxonomy carried in a response leaf's `error` field.
//!
//! Grouped by category with a stable `code()` string per variant, so logs
//! and CLI output can reference a specific error unambiguously.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The LwM2M-protocol error kinds carried by `LwM2mError::LwM2mProtocol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LwM2mErrorKind {
    BadRequest,
    Unauthorized,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    Timeout,
    ServerError,
}

/// The full error taxonomy a response leaf may carry.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum LwM2mError {
    // ── Infrastructural ──────────────────────────────────────────────
    #[error("unspecified error")]
    Unspecified,
    #[error("internal error: {reason}")]
    Internal { reason: String },
    #[error("out of memory")]
    OutOfMemory,
    #[error("IPC error: {reason}")]
    IpcError { reason: String },

    // ── Session ──────────────────────────────────────────────────────
    #[error("session invalid")]
    SessionInvalid,
    #[error("session not connected")]
    SessionNotConnected,

    // ── Operation shape ──────────────────────────────────────────────
    #[error("operation invalid: {reason}")]
    OperationInvalid { reason: String },
    #[error("add invalid: {reason}")]
    AddInvalid { reason: String },
    #[error("response invalid: {reason}")]
    ResponseInvalid { reason: String },
    #[error("range invalid")]
    RangeInvalid,

    // ── Definition ───────────────────────────────────────────────────
    #[error("not defined")]
    NotDefined,
    #[error("already defined")]
    AlreadyDefined,
    #[error("definition invalid: {reason}")]
    DefinitionInvalid { reason: String },

    // ── Path / identity ──────────────────────────────────────────────
    #[error("path invalid: {reason}")]
    PathInvalid { reason: String },
    #[error("path not found")]
    PathNotFound,
    #[error("id invalid: {value}")]
    IdInvalid { value: u32 },

    // ── Type ─────────────────────────────────────────────────────────
    #[error("type mismatch")]
    TypeMismatch,
    #[error("overrun")]
    Overrun,

    // ── Access ───────────────────────────────────────────────────────
    #[error("cannot create")]
    CannotCreate,
    #[error("cannot delete")]
    CannotDelete,

    // ── Subscription ─────────────────────────────────────────────────
    #[error("already subscribed")]
    AlreadySubscribed,
    #[error("subscription invalid")]
    SubscriptionInvalid,
    #[error("observation invalid")]
    ObservationInvalid,

    // ── Client identity ──────────────────────────────────────────────
    #[error("client id invalid")]
    ClientIdInvalid,
    #[error("client not found")]
    ClientNotFound,

    // ── Protocol (LwM2M) ─────────────────────────────────────────────
    #[error("LwM2M protocol error: {kind:?}")]
    LwM2mProtocol { kind: LwM2mErrorKind },

    // ── Other ────────────────────────────────────────────────────────
    #[error("timeout")]
    Timeout,
    #[error("unsupported: {reason}")]
    Unsupported { reason: String },
    #[error("iterator invalid")]
    IteratorInvalid,
    #[error("response error: {reason}")]
    Response { reason: String },
    #[error("log level invalid")]
    LogLevelInvalid,
}

impl LwM2mError {
    /// Stable machine-readable error code, e.g. `"LWM2M-PATH002"`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unspecified => "LWM2M-INF001",
            Self::Internal { .. } => "LWM2M-INF002",
            Self::OutOfMemory => "LWM2M-INF003",
            Self::IpcError { .. } => "LWM2M-INF004",

            Self::SessionInvalid => "LWM2M-SES001",
            Self::SessionNotConnected => "LWM2M-SES002",

            Self::OperationInvalid { .. } => "LWM2M-OPS001",
            Self::AddInvalid { .. } => "LWM2M-OPS002",
            Self::ResponseInvalid { .. } => "LWM2M-OPS003",
            Self::RangeInvalid => "LWM2M-OPS004",

            Self::NotDefined => "LWM2M-DEF001",
            Self::AlreadyDefined => "LWM2M-DEF002",
            Self::DefinitionInvalid { .. } => "LWM2M-DEF003",

            Self::PathInvalid { .. } => "LWM2M-PATH001",
            Self::PathNotFound => "LWM2M-PATH002",
            Self::IdInvalid { .. } => "LWM2M-PATH003",

            Self::TypeMismatch => "LWM2M-TYP001",
            Self::Overrun => "LWM2M-TYP002",

            Self::CannotCreate => "LWM2M-ACC001",
            Self::CannotDelete => "LWM2M-ACC002",

            Self::AlreadySubscribed => "LWM2M-SUB001",
            Self::SubscriptionInvalid => "LWM2M-SUB002",
            Self::ObservationInvalid => "LWM2M-SUB003",

            Self::ClientIdInvalid => "LWM2M-CLI001",
            Self::ClientNotFound => "LWM2M-CLI002",

            Self::LwM2mProtocol { .. } => "LWM2M-PROTO001",

            Self::Timeout => "LWM2M-OTH001",
            Self::Unsupported { .. } => "LWM2M-OTH002",
            Self::IteratorInvalid => "LWM2M-OTH003",
            Self::Response { .. } => "LWM2M-OTH004",
            Self::LogLevelInvalid => "LWM2M-OTH005",
        }
    }

    /// Map a CoAP response code class into the protocol error kind.
    #[must_use]
    pub fn from_coap_class(class: u8, detail: u8) -> Option<Self> {
        match class {
            2 => None,
            4 => {
                let kind = match detail {
                    0 => LwM2mErrorKind::BadRequest,
                    1 => LwM2mErrorKind::Unauthorized,
                    4 => LwM2mErrorKind::NotFound,
                    5 => LwM2mErrorKind::MethodNotAllowed,
                    6 => LwM2mErrorKind::NotAcceptable,
                    _ => LwM2mErrorKind::BadRequest,
                };
                Some(Self::LwM2mProtocol { kind })
            }
            5 => Some(Self::LwM2mProtocol { kind: LwM2mErrorKind::ServerError }),
            _ => Some(Self::Unspecified),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_code() {
        assert_eq!(LwM2mError::PathNotFound.code(), "LWM2M-PATH002");
        assert_eq!(LwM2mError::CannotDelete.code(), "LWM2M-ACC002");
    }

    #[test]
    fn coap_2xx_maps_to_none() {
        assert!(LwM2mError::from_coap_class(2, 5).is_none());
    }

    #[test]
    fn coap_404_maps_to_not_found() {
        let e = LwM2mError::from_coap_class(4, 4).unwrap();
        assert!(matches!(e, LwM2mError::LwM2mProtocol { kind: LwM2mErrorKind::NotFound }));
    }

    #[test]
    fn coap_5xx_maps_to_server_error() {
        let e = LwM2mError::from_coap_class(5, 0).unwrap();
        assert!(matches!(e, LwM2mError::LwM2mProtocol { kind: LwM2mErrorKind::ServerError }));
    }
}
