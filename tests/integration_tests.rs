//! Integration tests for the LAN reporter components
//!
//! These tests validate cross-component interactions and real network
//! behavior: beacon datagrams over actual UDP sockets and masterserver
//! sync against a live HTTP stub.

use pax_reporter::beacon::{self, QUERY_PACKET};
use pax_reporter::listing_manager::{ListingManager, ServerListing};
use pax_reporter::masterserver::MasterClient;
use pax_reporter::sync_queue::{ActionKind, DirectoryAction, SyncQueue};
use serde_json::Value;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::oneshot;

/// Builds a beacon reply datagram with the fixed wire layout
fn reply_packet(port: u16, open_slots: u8, max_slots: u8, name: &str) -> Vec<u8> {
    let mut buf = vec![0u8; 64];
    buf[10] = b'S';
    buf[11] = b'R';
    buf[20..24].copy_from_slice(&[192, 168, 1, 42]);
    buf[26..28].copy_from_slice(&port.to_be_bytes());
    buf[31] = open_slots;
    buf[39] = max_slots;
    buf.extend_from_slice(name.as_bytes());
    buf
}

/// Serves exactly one HTTP request, recording it and answering 200 with
/// the given body
async fn spawn_http_stub(response_body: &'static str) -> (SocketAddr, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (request_tx, request_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_http_request(&mut stream).await;

        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            response_body.len(),
            response_body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();

        let _ = request_tx.send(request);
    });

    (addr, request_rx)
}

/// Reads one full HTTP request (headers plus content-length body)
async fn read_http_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);

            let total = header_end + 4 + content_length;
            while buf.len() < total {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            break;
        }
    }

    String::from_utf8_lossy(&buf).to_string()
}

fn request_body(request: &str) -> &str {
    request.split("\r\n\r\n").nth(1).unwrap_or("")
}

/// Returns an address where every connection attempt is refused
async fn dead_endpoint() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// BEACON PROTOCOL TESTS
mod beacon_protocol_tests {
    use super::*;

    /// A reply datagram sent over a real UDP socket decodes into the
    /// expected listing and registers as an add
    #[tokio::test]
    async fn udp_reply_registers_a_listing() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let receiver_addr = receiver.local_addr().unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        sender
            .send_to(&reply_packet(8080, 2, 10, "Arena01\0\0"), receiver_addr)
            .await
            .unwrap();

        let mut buf = [0u8; 2048];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();

        let reply = beacon::decode_reply(&buf[..len]).unwrap();
        assert_eq!(reply.listing, ServerListing::new("Arena01", 8, 10, 8080));

        let mut manager = ListingManager::new();
        let action = manager.reconcile(reply.listing.clone()).unwrap();
        assert_eq!(action.kind, ActionKind::Add);
        assert_eq!(action.server, reply.listing);
    }

    /// Our own query broadcast arrives on the shared socket and must
    /// decode as not-a-reply
    #[tokio::test]
    async fn udp_query_is_not_a_reply() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let receiver_addr = receiver.local_addr().unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        sender.send_to(&QUERY_PACKET, receiver_addr).await.unwrap();

        let mut buf = [0u8; 2048];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();

        assert_eq!(len, QUERY_PACKET.len());
        assert!(beacon::decode_reply(&buf[..len]).is_none());
    }
}

/// MASTERSERVER SYNC TESTS
mod masterserver_sync_tests {
    use super::*;

    /// A flush delivers the whole batch as one PUT with arrival order
    /// preserved
    #[tokio::test]
    async fn flush_delivers_one_ordered_batch() {
        let (addr, request_rx) = spawn_http_stub("").await;
        let master = MasterClient::new(&format!("http://{}", addr)).unwrap();

        let mut queue = SyncQueue::new();
        queue.enqueue(DirectoryAction::add(ServerListing::new("Arena01", 8, 10, 8080)));
        queue.enqueue(DirectoryAction::update(ServerListing::new("Arena01", 9, 10, 8080)));
        queue.enqueue(DirectoryAction::delete(ServerListing::new("Lobby", 0, 16, 9090)));

        let handle = queue.flush(&master).unwrap();
        assert!(queue.is_empty());
        handle.await.unwrap();

        let request = request_rx.await.unwrap();
        assert!(request.starts_with("PUT /serverListings"));

        let body: Value = serde_json::from_str(request_body(&request)).unwrap();
        let batch = body.as_array().unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0]["type"], "add");
        assert_eq!(batch[1]["type"], "update");
        assert_eq!(batch[2]["type"], "delete");
        assert_eq!(batch[0]["server"]["maxPlayers"], 10);
        assert_eq!(batch[2]["server"]["port"], 9090);
    }

    /// A failed batch is dropped, and the next flush carries only the
    /// actions enqueued afterwards
    #[tokio::test]
    async fn failed_batch_is_dropped_not_retried() {
        let dead = dead_endpoint().await;
        let failing = MasterClient::new(&format!("http://{}", dead)).unwrap();

        let mut queue = SyncQueue::new();
        queue.enqueue(DirectoryAction::add(ServerListing::new("Arena01", 8, 10, 8080)));
        queue.enqueue(DirectoryAction::update(ServerListing::new("Arena01", 9, 10, 8080)));
        queue.enqueue(DirectoryAction::delete(ServerListing::new("Lobby", 0, 16, 9090)));

        let handle = queue.flush(&failing).unwrap();
        assert!(queue.is_empty());
        handle.await.unwrap();
        assert!(queue.is_empty());

        // Only traffic enqueued after the failure reaches the next flush
        let (addr, request_rx) = spawn_http_stub("").await;
        let live = MasterClient::new(&format!("http://{}", addr)).unwrap();

        queue.enqueue(DirectoryAction::add(ServerListing::new("Castle", 3, 12, 7000)));
        let handle = queue.flush(&live).unwrap();
        handle.await.unwrap();

        let request = request_rx.await.unwrap();
        let body: Value = serde_json::from_str(request_body(&request)).unwrap();
        let batch = body.as_array().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0]["type"], "add");
        assert_eq!(batch[0]["server"]["name"], "Castle");
    }

    /// The config endpoint parses into a typed RemoteConfig
    #[tokio::test]
    async fn config_fetch_parses_remote_config() {
        let (addr, request_rx) = spawn_http_stub(
            r#"{"serviceMessage": "Maintenance at 22:00", "heartbeatIntervalMs": 30000}"#,
        )
        .await;
        let master = MasterClient::new(&format!("http://{}", addr)).unwrap();

        let config = master.fetch_config().await.unwrap();
        assert_eq!(config.service_message, "Maintenance at 22:00");
        assert_eq!(config.heartbeat_interval_ms, 30_000);

        let request = request_rx.await.unwrap();
        assert!(request.starts_with("GET /config"));
    }

    /// A refused connection surfaces as a fetch error
    #[tokio::test]
    async fn config_fetch_failure_is_an_error() {
        let dead = dead_endpoint().await;
        let master = MasterClient::new(&format!("http://{}", dead)).unwrap();

        assert!(master.fetch_config().await.is_err());
    }
}

/// ROSTER LIFECYCLE TESTS
mod roster_lifecycle_tests {
    use super::*;

    /// A server is discovered, stays up for a few cycles, goes silent,
    /// and is eventually delisted; the resulting action stream is
    /// exactly add then delete
    #[test]
    fn discovery_to_expiry_emits_add_then_delete() {
        let expire_ticks = 3;
        let mut manager = ListingManager::new();
        let mut actions = Vec::new();

        for _ in 0..3 {
            let reply = beacon::decode_reply(&reply_packet(8080, 2, 10, "Arena01")).unwrap();
            actions.extend(manager.reconcile(reply.listing));
            actions.extend(manager.expire(expire_ticks));
        }
        for _ in 0..expire_ticks + 1 {
            actions.extend(manager.expire(expire_ticks));
        }

        let kinds: Vec<ActionKind> = actions.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ActionKind::Add, ActionKind::Delete]);
        assert!(manager.is_empty());
    }

    /// The shutdown path delists everything exactly once
    #[test]
    fn shutdown_clear_delists_everything_once() {
        let mut manager = ListingManager::new();
        for port in [8080u16, 9090, 7000] {
            let reply = beacon::decode_reply(&reply_packet(port, 2, 10, "Arena01")).unwrap();
            manager.reconcile(reply.listing);
        }

        let deletes = manager.clear();
        assert_eq!(deletes.len(), 3);
        assert!(deletes.iter().all(|a| a.kind == ActionKind::Delete));

        assert!(manager.clear().is_empty());
        assert!(manager.snapshot().is_empty());
    }
}
