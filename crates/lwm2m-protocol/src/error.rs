//! Protocol-level failures, distinct from application-level
//! [`lwm2m_core::LwM2mError`]: the two are carried in separate fields.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame exceeds max_message_size_bytes ({0} > {1})")]
    FrameTooLarge(usize, u32),
    #[error("protocol violation: {0}")]
    Violation(String),
    #[error("unexpected message: expected {expected}, got {got}")]
    UnexpectedMessage { expected: &'static str, got: String },
    #[error("connection closed")]
    Closed,
}
