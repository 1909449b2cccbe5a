//! Definition registry, object store, operation builder, request/response
//! pipeline, subscriptions/observations, and session management — the
//! in-process library shared by the client and server daemons.

pub mod dispatch;
pub mod observation;
pub mod operation;
pub mod pipeline;
pub mod registry;
pub mod session;
pub mod store;
pub mod subscription;

pub use dispatch::{CallbackDispatcher, ChangeCallback};
pub use observation::{Notification, Observation, ObservationId, ObservationTable, NotificationAttributes};
pub use operation::OperationBuilder;
pub use pipeline::Pipeline;
pub use registry::DefinitionRegistry;
pub use session::Session;
pub use store::{ClientRegistration, ClientRegistry, ObjectStore, SetMode};
pub use subscription::{CancelHandle, ChangeSet, SubscriptionId, SubscriptionTable};
