//! Server daemon entry point: tracks registered LwM2M clients and exposes
//! them to local applications over the app protocol.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use lwm2m_core::{Role, RuntimeConfig};
use lwm2m_daemon::ServerDaemonState;
use tokio::net::{TcpListener, UdpSocket};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "lwm2m-server-daemon", about = "LwM2M server daemon")]
struct Args {
    /// Path to a TOML config file; built-in defaults are used for anything it omits.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RuntimeConfig::load_from_file(path, Role::Server)?,
        None => RuntimeConfig::default_for(Role::Server),
    }
    .apply_env_overrides();
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.as_filter_directive()))
        .json()
        .init();

    tracing::info!(
        app_endpoint = %config.daemon_endpoint,
        coap_endpoint = %config.coap_endpoint,
        "starting server daemon"
    );

    let app_listener = TcpListener::bind((config.daemon_endpoint.host, config.daemon_endpoint.port)).await?;
    let coap_socket = UdpSocket::bind((config.coap_endpoint.host, config.coap_endpoint.port)).await?;
    let state = Arc::new(ServerDaemonState::new(config));

    tokio::select! {
        result = lwm2m_daemon::serve_app_listener(app_listener, state.clone()) => result?,
        result = lwm2m_daemon::serve_coap_registrations(coap_socket, state) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
    }

    Ok(())
}
