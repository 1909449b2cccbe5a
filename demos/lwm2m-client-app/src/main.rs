//! Minimal example application: connects to a running client daemon,
//! defines the Heater object used throughout the test suite, and reads
//! back one of its resources. Not a general-purpose CLI — this exists only
//! to show the library surface end-to-end.

use std::collections::BTreeMap;
use std::time::Duration;

use clap::Parser;
use lwm2m_core::{Endpoint, ObjectDefinition, ObjectId, Operations, Path, ResourceDefinition, ResourceId, ResourceType, Value};
use lwm2m_protocol::{Envelope, RequestBody, RequestKind, ResponseBody};
use lwm2m_runtime::Session;
use tokio::net::TcpStream;

#[derive(Debug, Parser)]
struct Args {
    /// Client daemon app-protocol endpoint.
    #[arg(long, default_value = "127.0.0.1:12345")]
    daemon: Endpoint,
}

fn heater_definition() -> ObjectDefinition {
    let mut resources = BTreeMap::new();
    resources.insert(
        104,
        ResourceDefinition {
            id: ResourceId::new(104).unwrap(),
            name: "Temperature".into(),
            kind: ResourceType::Float,
            min_instances: 1,
            max_instances: 1,
            operations: Operations::READ_WRITE,
            default: Some(Value::Float(18.0)),
        },
    );
    ObjectDefinition {
        id: ObjectId::new(1000).unwrap(),
        name: "Heater".into(),
        min_instances: 0,
        max_instances: 65534,
        resources,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let stream = TcpStream::connect((args.daemon.host, args.daemon.port)).await?;
    let mut session = Session::connect(stream, 1, 65536).await?;

    let define_request = Envelope::Request {
        request_id: session.next_request_id(),
        session_id: session.session_id(),
        kind: RequestKind::Define,
        body: RequestBody::Define { definition: heater_definition() },
    };
    session.perform(define_request, Duration::from_secs(5)).await?;
    tracing::info!("Heater object defined");

    let mut create_tree = lwm2m_protocol::Tree::new();
    create_tree.insert(Path::parse("/1000")?, lwm2m_protocol::OperationLeaf::Create { value: None });
    let create_request = Envelope::Request {
        request_id: session.next_request_id(),
        session_id: session.session_id(),
        kind: RequestKind::Create,
        body: RequestBody::Tree { tree: create_tree },
    };
    session.perform(create_request, Duration::from_secs(5)).await?;
    tracing::info!("Heater instance created");

    let mut read_tree = lwm2m_protocol::Tree::new();
    read_tree.insert(Path::parse("/1000/0/104")?, lwm2m_protocol::OperationLeaf::Read);
    let read_request = Envelope::Request {
        request_id: session.next_request_id(),
        session_id: session.session_id(),
        kind: RequestKind::Read,
        body: RequestBody::Tree { tree: read_tree },
    };
    let response = session.perform(read_request, Duration::from_secs(5)).await?;
    if let Envelope::Response { body: ResponseBody::Tree { tree }, .. } = response {
        for (path, leaf) in tree.leaves() {
            tracing::info!(%path, value = ?leaf.value, "read result");
        }
    }

    Ok(())
}
