//! CoAP transport, per-kind request handlers, and the app-facing
//! length-delimited listener shared by the client and server daemon binaries.

pub mod coap;
pub mod handlers;
pub mod server;
pub mod transport;

pub use server::{serve_app_listener, serve_coap_registrations, ServerDaemonState};
pub use transport::{serve, serve_coap_peer, ClientDaemonState};
