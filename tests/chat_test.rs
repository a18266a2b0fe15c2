//! End-to-end tests: a real server on an ephemeral port driven over
//! WebSocket and HTTP.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use chat_relay::app_state::AppState;
use chat_relay::auth::JwtCredentialService;
use chat_relay::auth::jwt::DEFAULT_TOKEN_TTL;
use chat_relay::domain::{ConnectionRegistry, SubjectId};
use chat_relay::server;
use chat_relay::service::ChatService;
use chat_relay::store::InMemoryHistoryStore;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SECRET: &[u8] = b"test-secret";
const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const QUIET_PERIOD: Duration = Duration::from_millis(300);

struct TestServer {
    addr: SocketAddr,
    credentials: JwtCredentialService,
}

impl TestServer {
    async fn start(auth_timeout: Option<Duration>) -> Self {
        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        let state = AppState {
            chat_service: Arc::new(ChatService::new(
                Arc::new(ConnectionRegistry::new()),
                Arc::new(JwtCredentialService::new(SECRET)),
                Arc::new(InMemoryHistoryStore::new(100)),
            )),
            auth_timeout,
            history_limit: 100,
            outbound_capacity: 64,
        };
        tokio::spawn(server::serve(listener, state, Duration::from_secs(5)));
        Self {
            addr,
            credentials: JwtCredentialService::new(SECRET),
        }
    }

    fn token(&self, subject: impl Into<SubjectId>) -> String {
        let Ok(token) = self.credentials.issue(&subject.into(), DEFAULT_TOKEN_TTL) else {
            panic!("token issue failed");
        };
        token
    }

    async fn connect(&self) -> Client {
        let Ok((ws, _)) = connect_async(format!("ws://{}/ws", self.addr)).await else {
            panic!("ws connect failed");
        };
        ws
    }

    async fn join(&self, subject: &str) -> Client {
        let mut ws = self.connect().await;
        send(&mut ws, serde_json::json!({"type": "auth", "token": self.token(subject)})).await;
        assert_eq!(recv(&mut ws).await, serde_json::json!({"type": "auth_ok"}));
        ws
    }

    async fn get_json(&self, path: &str) -> serde_json::Value {
        let Ok(response) = reqwest::get(format!("http://{}{path}", self.addr)).await else {
            panic!("http request failed");
        };
        let Ok(json) = response.json().await else {
            panic!("json body");
        };
        json
    }

    async fn wait_for_connections(&self, expected: u64) {
        for _ in 0..50 {
            if self.get_json("/api/health").await["connections"] == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("connection count never reached {expected}");
    }
}

async fn send(ws: &mut Client, frame: serde_json::Value) {
    if ws.send(Message::text(frame.to_string())).await.is_err() {
        panic!("ws send failed");
    }
}

async fn next_message(ws: &mut Client, wait: Duration) -> Option<Message> {
    loop {
        match tokio::time::timeout(wait, ws.next()).await {
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
            Ok(Some(Ok(msg))) => return Some(msg),
            _ => return None,
        }
    }
}

async fn recv(ws: &mut Client) -> serde_json::Value {
    let Some(Message::Text(text)) = next_message(ws, RECV_TIMEOUT).await else {
        panic!("expected a text frame");
    };
    let Ok(value) = serde_json::from_str(text.as_str()) else {
        panic!("frame is not JSON");
    };
    value
}

async fn assert_silent(ws: &mut Client) {
    if let Some(msg) = next_message(ws, QUIET_PERIOD).await {
        panic!("unexpected frame: {msg:?}");
    }
}

#[tokio::test]
async fn authenticated_clients_receive_each_others_messages() {
    let server = TestServer::start(None).await;
    let mut a = server.join("A").await;
    let mut b = server.join("B").await;

    send(&mut a, serde_json::json!({"type": "message", "content": "hi"})).await;

    for ws in [&mut a, &mut b] {
        let frame = recv(ws).await;
        assert_eq!(frame["type"], "message");
        assert_eq!(frame["sender_id"], "A");
        assert_eq!(frame["content"], "hi");
        assert!(frame["created_at"].as_str().is_some_and(|s| s.ends_with('Z')));
        assert_silent(ws).await;
    }
}

#[tokio::test]
async fn unauthenticated_message_reaches_nobody() {
    let server = TestServer::start(None).await;
    let mut a = server.join("A").await;
    let mut c = server.connect().await;

    send(&mut c, serde_json::json!({"type": "message", "content": "hello"})).await;

    assert_silent(&mut a).await;
    assert_silent(&mut c).await;
    let history = server.get_json("/api/messages").await;
    assert_eq!(history, serde_json::json!([]));
}

#[tokio::test]
async fn unauthenticated_connection_does_not_receive_broadcasts() {
    let server = TestServer::start(None).await;
    let mut a = server.join("A").await;
    let mut lurker = server.connect().await;

    send(&mut a, serde_json::json!({"type": "message", "content": "secret"})).await;
    assert_eq!(recv(&mut a).await["content"], "secret");
    assert_silent(&mut lurker).await;
}

#[tokio::test]
async fn failed_auth_can_be_retried() {
    let server = TestServer::start(None).await;
    let mut d = server.connect().await;

    send(&mut d, serde_json::json!({"type": "auth", "token": "forged"})).await;
    assert_eq!(recv(&mut d).await, serde_json::json!({"type": "auth_fail"}));
    server.wait_for_connections(1).await;

    send(&mut d, serde_json::json!({"type": "auth", "token": server.token("D")})).await;
    assert_eq!(recv(&mut d).await, serde_json::json!({"type": "auth_ok"}));

    send(&mut d, serde_json::json!({"type": "message", "content": "made it"})).await;
    let frame = recv(&mut d).await;
    assert_eq!(frame["sender_id"], "D");
    assert_eq!(frame["content"], "made it");
}

#[tokio::test]
async fn malformed_and_blank_frames_are_dropped() {
    let server = TestServer::start(None).await;
    let mut a = server.join("A").await;

    if a.send(Message::text("{not json".to_string())).await.is_err() {
        panic!("ws send failed");
    }
    send(&mut a, serde_json::json!({"type": "message", "content": "   "})).await;
    assert_silent(&mut a).await;

    send(&mut a, serde_json::json!({"type": "message", "content": "still open"})).await;
    assert_eq!(recv(&mut a).await["content"], "still open");
}

#[tokio::test]
async fn abrupt_disconnect_does_not_disturb_others() {
    let server = TestServer::start(None).await;
    let mut a = server.join("A").await;
    let e = server.join("E").await;
    let mut f = server.join("F").await;
    server.wait_for_connections(3).await;

    drop(e);
    send(&mut f, serde_json::json!({"type": "message", "content": "anyone?"})).await;

    assert_eq!(recv(&mut a).await["content"], "anyone?");
    assert_eq!(recv(&mut f).await["content"], "anyone?");
    server.wait_for_connections(2).await;

    send(&mut a, serde_json::json!({"type": "message", "content": "still serving"})).await;
    assert_eq!(recv(&mut f).await["content"], "still serving");
}

#[tokio::test]
async fn history_is_served_oldest_first() {
    let server = TestServer::start(None).await;
    let mut a = server.join("A").await;
    for content in ["one", "two", "three"] {
        send(&mut a, serde_json::json!({"type": "message", "content": content})).await;
        recv(&mut a).await;
    }

    let history = server.get_json("/api/messages?limit=2").await;
    let Some(items) = history.as_array() else {
        panic!("expected array");
    };
    let contents: Vec<_> = items.iter().map(|m| m["content"].clone()).collect();
    assert_eq!(contents, vec!["two", "three"]);
}

#[tokio::test]
async fn numeric_subject_keeps_numeric_sender_id() {
    let server = TestServer::start(None).await;
    let mut ws = server.connect().await;
    send(&mut ws, serde_json::json!({"type": "auth", "token": server.token(17_i64)})).await;
    assert_eq!(recv(&mut ws).await, serde_json::json!({"type": "auth_ok"}));

    send(&mut ws, serde_json::json!({"type": "message", "content": "hi"})).await;
    let frame = recv(&mut ws).await;
    assert_eq!(frame["sender_id"], serde_json::json!(17));

    let history = server.get_json("/api/messages").await;
    assert_eq!(history[0]["sender_id"], serde_json::json!(17));
    assert_eq!(history[0]["id"], serde_json::json!(1));
}

#[tokio::test]
async fn versioned_history_path_still_served() {
    let server = TestServer::start(None).await;
    assert_eq!(server.get_json("/api/v1/messages").await, serde_json::json!([]));
    assert_eq!(server.get_json("/health").await["status"], "healthy");
}

#[tokio::test]
async fn idle_unauthenticated_connection_is_closed() {
    let server = TestServer::start(Some(Duration::from_millis(200))).await;
    let mut idle = server.connect().await;

    let Some(Message::Close(Some(frame))) = next_message(&mut idle, RECV_TIMEOUT).await else {
        panic!("expected a close frame");
    };
    assert_eq!(u16::from(frame.code), 1008);
    server.wait_for_connections(0).await;
}

#[tokio::test]
async fn authenticated_connection_outlives_auth_timeout() {
    let server = TestServer::start(Some(Duration::from_millis(200))).await;
    let mut a = server.join("A").await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    send(&mut a, serde_json::json!({"type": "message", "content": "awake"})).await;
    assert_eq!(recv(&mut a).await["content"], "awake");
}
