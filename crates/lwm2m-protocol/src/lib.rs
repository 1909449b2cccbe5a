//! Application<->daemon wire protocol: envelope, length-delimited framing,
//! and the operation/response tree shape.

pub mod envelope;
pub mod error;
pub mod framing;
pub mod tree;

pub use envelope::{
    Attribute, AttributeValue, Envelope, OperationLeaf, RequestBody, RequestId, RequestKind,
    ResponseBody, ResponseCode, ResponseLeaf,
};
pub use error::ProtocolError;
pub use framing::{encode_frame, read_frame, try_decode_frame, write_frame};
pub use tree::{Tree, TreeNode};
