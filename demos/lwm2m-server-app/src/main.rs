//! Minimal example application: connects to a running server daemon and
//! lists which clients are currently registered. Not a general-purpose
//! CLI — this exists only to show the library surface end-to-end.

use std::time::Duration;

use clap::Parser;
use lwm2m_core::Endpoint;
use lwm2m_protocol::{Envelope, RequestBody, RequestKind, ResponseBody};
use lwm2m_runtime::Session;
use tokio::net::TcpStream;

#[derive(Debug, Parser)]
struct Args {
    /// Server daemon app-protocol endpoint.
    #[arg(long, default_value = "127.0.0.1:54321")]
    daemon: Endpoint,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let stream = TcpStream::connect((args.daemon.host, args.daemon.port)).await?;
    let mut session = Session::connect(stream, 1, 65536).await?;

    let request = Envelope::Request {
        request_id: session.next_request_id(),
        session_id: session.session_id(),
        kind: RequestKind::ListClients,
        body: RequestBody::Empty,
    };
    let response = session.perform(request, Duration::from_secs(5)).await?;
    if let Envelope::Response { body: ResponseBody::ClientList { client_ids }, .. } = response {
        tracing::info!(count = client_ids.len(), ids = ?client_ids, "registered clients");
    }

    Ok(())
}
