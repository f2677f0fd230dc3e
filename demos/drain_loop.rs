// ABOUTME: Example embedding application: starts the server and drains the ingress queue in a loop
// ABOUTME: A stand-in for whatever top-level app loop an embedder builds around this crate

use ingress_gate::{MessageOrError, Server, ServerConfig};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 7000);
    let server = Server::start(addr, ServerConfig::default()).await?;

    println!("listening on {addr}, draining the ingress queue (ctrl-c to stop)");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_millis(100)) => {
                while let Some(item) = server.read_message() {
                    match item.message {
                        MessageOrError::Message(message) => {
                            println!("{}: {:?}", item.peer_address, message.raw);
                        }
                        MessageOrError::SoftwareError(err) => {
                            println!("{}: {err}", item.peer_address);
                        }
                    }
                }
            }
        }
    }

    server.stop().await;
    Ok(())
}
