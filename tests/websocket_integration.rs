//! End-to-end tests against a bound server, using tokio-tungstenite as the
//! client and an in-memory status reporter.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use ara_presence_service::config::{HeartbeatConfig, Settings};
use ara_presence_service::notification::{
    NotifyError, PresenceNotifier, PresenceStatus, StatusReporter, StatusUpdate,
};
use ara_presence_service::server::{create_app, AppState};
use ara_presence_service::tasks::HeartbeatTask;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct ChannelReporter {
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

#[async_trait]
impl StatusReporter for ChannelReporter {
    async fn report(&self, update: &StatusUpdate) -> Result<(), NotifyError> {
        let _ = self.tx.send(update.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

struct TestServer {
    addr: SocketAddr,
    state: AppState,
    updates: mpsc::UnboundedReceiver<StatusUpdate>,
}

impl TestServer {
    async fn start() -> Self {
        let (tx, updates) = mpsc::unbounded_channel();
        let notifier = Arc::new(PresenceNotifier::new(Arc::new(ChannelReporter { tx })));
        let state = AppState::with_notifier(Settings::default(), notifier);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            updates,
        }
    }

    async fn connect(&self, user_id: &str) -> Client {
        let url = format!("ws://{}/ws?userId={}", self.addr, user_id);
        let (client, _) = connect_async(url).await.expect("handshake should succeed");
        client
    }

    async fn next_update(&mut self) -> StatusUpdate {
        tokio::time::timeout(Duration::from_secs(2), self.updates.recv())
            .await
            .expect("status update should arrive")
            .expect("reporter channel should be open")
    }

    async fn presence(&self, user_id: &str) -> Value {
        let url = format!("http://{}/api/v1/users/{}/presence", self.addr, user_id);
        reqwest::get(url).await.unwrap().json().await.unwrap()
    }

    fn heartbeat(&self) -> (HeartbeatTask, broadcast::Sender<()>) {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = HeartbeatTask::new(
            HeartbeatConfig {
                interval_secs: 10,
                max_missed_probes: 2,
            },
            self.state.tracker.clone(),
            self.state.hub.clone(),
            shutdown_rx,
        );
        (task, shutdown_tx)
    }
}

async fn next_message(client: &mut Client) -> Message {
    tokio::time::timeout(Duration::from_secs(2), client.next())
        .await
        .expect("message should arrive")
        .expect("stream should be open")
        .expect("frame should be valid")
}

async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check().await {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_connect_and_disconnect_report_presence() {
    let mut server = TestServer::start().await;

    let mut first = server.connect("u1").await;
    assert_eq!(
        server.next_update().await,
        StatusUpdate::new("u1", PresenceStatus::Online)
    );

    let mut second = server.connect("u1").await;
    let tracker = server.state.tracker.clone();
    wait_until(|| {
        let tracker = tracker.clone();
        async move { tracker.user_presence("u1").await.connection_count == 2 }
    })
    .await;

    let presence = server.presence("u1").await;
    assert_eq!(presence["online"], true);
    assert_eq!(presence["connection_count"], 2);

    first.close(None).await.unwrap();
    wait_until(|| {
        let tracker = tracker.clone();
        async move { tracker.user_presence("u1").await.connection_count == 1 }
    })
    .await;

    second.close(None).await.unwrap();
    assert_eq!(
        server.next_update().await,
        StatusUpdate::new("u1", PresenceStatus::Offline)
    );

    let presence = server.presence("u1").await;
    assert_eq!(presence["online"], false);
    assert_eq!(presence["connection_count"], 0);
}

#[tokio::test]
async fn test_missing_user_id_is_closed_with_policy_code() {
    let server = TestServer::start().await;
    let url = format!("ws://{}/ws", server.addr);
    let (mut client, _) = connect_async(url).await.unwrap();

    match next_message(&mut client).await {
        Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 1008),
        other => panic!("expected close frame, got {:?}", other),
    }
    assert_eq!(server.state.tracker.stats().await.total_connections, 0);
}

#[tokio::test]
async fn test_unreadable_query_is_closed_with_policy_code() {
    let server = TestServer::start().await;

    for query in ["userId=a&userId=b", "userId="] {
        let url = format!("ws://{}/ws?{}", server.addr, query);
        let (mut client, _) = connect_async(url)
            .await
            .unwrap_or_else(|e| panic!("upgrade refused for {}: {}", query, e));

        match next_message(&mut client).await {
            Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 1008),
            other => panic!("expected close frame for {}, got {:?}", query, other),
        }
    }
    assert_eq!(server.state.tracker.stats().await.total_connections, 0);
}

#[tokio::test]
async fn test_application_ping_gets_pong() {
    let server = TestServer::start().await;
    let mut client = server.connect("u1").await;

    client
        .send(Message::Text(r#"{"type":"ping"}"#.to_string()))
        .await
        .unwrap();
    match next_message(&mut client).await {
        Message::Text(text) => assert_eq!(text, r#"{"type":"pong"}"#),
        other => panic!("expected pong, got {:?}", other),
    }

    client
        .send(Message::Text("not json".to_string()))
        .await
        .unwrap();
    match next_message(&mut client).await {
        Message::Text(text) => {
            let value: Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["type"], "error");
            assert_eq!(value["code"], "INVALID_MESSAGE");
        }
        other => panic!("expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pong_resets_missed_probes() {
    let server = TestServer::start().await;
    let (heartbeat, _shutdown) = server.heartbeat();
    let mut client = server.connect("u1").await;

    let tracker = server.state.tracker.clone();
    wait_until(|| {
        let tracker = tracker.clone();
        async move { tracker.user_presence("u1").await.online }
    })
    .await;

    assert_eq!(heartbeat.sweep().await.probed, 1);
    assert!(matches!(next_message(&mut client).await, Message::Ping(_)));

    // Keep reading so the queued pong gets flushed
    tokio::spawn(async move { while client.next().await.is_some() {} });

    let registry = server.state.tracker.registry().clone();
    wait_until(|| {
        let registry = registry.clone();
        async move {
            registry
                .all_connections()
                .await
                .iter()
                .all(|c| c.missed_probes == 0)
        }
    })
    .await;
}

#[tokio::test]
async fn test_unresponsive_client_is_force_closed() {
    let mut server = TestServer::start().await;
    let (heartbeat, _shutdown) = server.heartbeat();
    let mut client = server.connect("u2").await;
    assert_eq!(server.next_update().await.status, PresenceStatus::Online);

    // The client does not read, so no pongs are sent
    for _ in 0..3 {
        assert_eq!(heartbeat.sweep().await.probed, 1);
    }
    let outcome = heartbeat.sweep().await;
    assert_eq!(outcome.evicted, 1);
    assert_eq!(outcome.went_offline, 1);

    assert_eq!(
        server.next_update().await,
        StatusUpdate::new("u2", PresenceStatus::Offline)
    );

    assert!(server.state.hub.is_empty());

    // Drain the buffered pings; the server must end the session. Queued
    // pongs may hit the closed socket first, so a read error also counts.
    let drained = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(result) = client.next().await {
            match result {
                Ok(Message::Close(Some(frame))) => {
                    assert_eq!(u16::from(frame.code), 1001);
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    })
    .await;
    assert!(drained.is_ok(), "server kept the session open");

    // The handler's own close path must not report offline a second time
    let extra = tokio::time::timeout(Duration::from_millis(200), server.updates.recv()).await;
    assert!(extra.is_err());
}
