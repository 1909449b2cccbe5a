//! Client daemon entry point: hosts the live object model an LwM2M client
//! exposes, speaking CoAP to a server and the length-delimited app protocol
//! to local applications.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use lwm2m_core::{LogLevel, Role, RuntimeConfig};
use lwm2m_daemon::ClientDaemonState;
use tokio::net::{TcpListener, UdpSocket};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "lwm2m-client-daemon", about = "LwM2M client daemon")]
struct Args {
    /// Path to a TOML config file; built-in defaults are used for anything it omits.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured log level.
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliLogLevel {
    None,
    Error,
    Warning,
    Info,
    Debug,
}

impl From<CliLogLevel> for LogLevel {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::None => LogLevel::None,
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warning => LogLevel::Warning,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RuntimeConfig::load_from_file(path, Role::Client)?,
        None => RuntimeConfig::default_for(Role::Client),
    }
    .apply_env_overrides();
    if let Some(level) = args.log_level {
        config.log_level = level.into();
    }
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.as_filter_directive()))
        .json()
        .init();

    tracing::info!(endpoint = %config.daemon_endpoint, "starting client daemon");

    let listener = TcpListener::bind((config.daemon_endpoint.host, config.daemon_endpoint.port)).await?;
    let coap_socket = UdpSocket::bind((config.coap_endpoint.host, config.coap_endpoint.port)).await?;

    if let Some(server_endpoint) = &config.server_endpoint {
        let peer = (server_endpoint.host, server_endpoint.port).into();
        match lwm2m_daemon::coap::register_with_server(&coap_socket, peer).await {
            Ok(()) => tracing::info!(%peer, "sent registration to server"),
            Err(e) => tracing::warn!(error = %e, %peer, "registration failed"),
        }
    }

    let state = Arc::new(ClientDaemonState::new(config));

    tokio::select! {
        result = lwm2m_daemon::serve(listener, state.clone()) => result?,
        result = lwm2m_daemon::serve_coap_peer(coap_socket, state) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
    }

    Ok(())
}
