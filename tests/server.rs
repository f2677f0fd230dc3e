// ABOUTME: End-to-end tests against real loopback sockets, no mocked I/O
// ABOUTME: Covers framing, keep-alive suppression, remote close, decode errors, and liveness timeout

use ingress_gate::{MessageOrError, QueueItem, Server, ServerConfig, SoftwareError};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Binds to an OS-assigned port and returns both the server and the address
/// a client should connect to.
async fn start_on_any_port(config: ServerConfig) -> (Server, SocketAddrV4) {
    // Bind a throwaway listener first purely to reserve a free port number,
    // then drop it immediately before handing the same address to the real
    // server. This avoids needing a `local_addr()`-style accessor on
    // `Server`, which the public API deliberately doesn't have.
    let probe = tokio::net::TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
        .await
        .unwrap();
    let addr = match probe.local_addr().unwrap() {
        std::net::SocketAddr::V4(v4) => v4,
        _ => unreachable!(),
    };
    drop(probe);

    let server = Server::start(addr, config).await.unwrap();
    (server, addr)
}

/// Poll `read_message` until it yields an item or the timeout elapses.
async fn recv_message(server: &Server) -> QueueItem {
    for _ in 0..200 {
        if let Some(item) = server.read_message() {
            return item;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no message arrived within the timeout");
}

async fn wait_until<F: Fn() -> bool>(predicate: F) {
    for _ in 0..200 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never became true");
}

#[tokio::test]
async fn single_message_is_delivered() {
    let (server, addr) = start_on_any_port(ServerConfig::default()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(br#"{"type":"PING","seq":1}"#)
        .await
        .unwrap();

    let item = recv_message(&server).await;
    match item.message {
        MessageOrError::Message(message) => assert_eq!(message.raw["seq"], 1),
        other => panic!("unexpected item: {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn keep_alive_is_suppressed_and_not_enqueued() {
    let (server, addr) = start_on_any_port(ServerConfig::default()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(br#"{"type":"KEEP_ALIVE"}"#).await.unwrap();

    // Give the reader task time to process the frame.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(server.read_message().is_none());

    server.stop().await;
}

#[tokio::test]
async fn two_back_to_back_objects_are_both_delivered() {
    let (server, addr) = start_on_any_port(ServerConfig::default()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(br#"{"a":{"b":1}}{"c":2}"#)
        .await
        .unwrap();

    let first = recv_message(&server).await;
    let second = recv_message(&server).await;

    match (first.message, second.message) {
        (MessageOrError::Message(a), MessageOrError::Message(b)) => {
            assert_eq!(a.raw["a"]["b"], 1);
            assert_eq!(b.raw["c"], 2);
        }
        other => panic!("unexpected items: {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn remote_close_reports_connection_closed() {
    let (server, addr) = start_on_any_port(ServerConfig::default()).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    drop(stream);

    let item = recv_message(&server).await;
    match item.message {
        MessageOrError::SoftwareError(SoftwareError::ConnectionClosed) => {}
        other => panic!("unexpected item: {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn decode_error_reports_but_keeps_connection_open() {
    let (server, addr) = start_on_any_port(ServerConfig::default()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(br#"{not json}"#).await.unwrap();

    let item = recv_message(&server).await;
    match item.message {
        MessageOrError::SoftwareError(SoftwareError::CouldNotDecodeMessage) => {}
        other => panic!("unexpected item: {other:?}"),
    }

    // The connection should still be open: a follow-up valid frame is still
    // delivered on the same socket.
    stream.write_all(br#"{"type":"PING"}"#).await.unwrap();
    let next = recv_message(&server).await;
    assert!(matches!(next.message, MessageOrError::Message(_)));

    server.stop().await;
}

#[tokio::test]
async fn liveness_timeout_is_reported_without_closing_connection() {
    let config = ServerConfig::new(Duration::from_millis(20))
        .with_check_period(1)
        .with_keep_alive_prod(Duration::from_millis(30));
    let (server, addr) = start_on_any_port(config).await;

    let stream = TcpStream::connect(addr).await.unwrap();

    let item = recv_message(&server).await;
    match item.message {
        MessageOrError::SoftwareError(SoftwareError::ConnectionTimeout) => {}
        other => panic!("unexpected item: {other:?}"),
    }

    // The sweeper only reports; it must not have torn down the connection.
    assert_eq!(server.get_connected_list().len(), 1);

    drop(stream);
    server.stop().await;
}

#[tokio::test]
async fn get_connected_list_reflects_live_connections() {
    let (server, addr) = start_on_any_port(ServerConfig::default()).await;

    let _a = TcpStream::connect(addr).await.unwrap();
    let _b = TcpStream::connect(addr).await.unwrap();

    wait_until(|| server.get_connected_list().len() == 2).await;
    let peers = server.get_connected_list();
    assert_eq!(peers, vec![Ipv4Addr::LOCALHOST; 2]);

    server.stop().await;
}
