//! Path, identifier, typed-value, definition, error and configuration types
//! shared by every crate in this workspace.
//!
//! This crate has no dependency on transport, codec-wire-format, or daemon
//! concerns — it is the vocabulary the rest of the runtime is built from.

pub mod change;
pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod path;
pub mod value;

pub use change::ChangeKind;
pub use config::{ContentFormat, Endpoint, LogLevel, Role, RuntimeConfig};
pub use error::{LwM2mError, LwM2mErrorKind};
pub use ids::{InstanceId, ObjectId, ResourceId, ResourceInstanceId, INVALID_ID};
pub use model::{ObjectDefinition, Operations, ResourceDefinition};
pub use path::{Path, PathKind};
pub use value::{ObjectLink, ResourceArray, ResourceType, Value};
