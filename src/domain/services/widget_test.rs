use std::path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::ChatWidget;
use super::NotificationDispatcher;
use super::SessionCache;
use super::WidgetPhase;
use crate::domain::models::ChannelState;
use crate::domain::models::Event;
use crate::domain::models::MessageDescriptor;
use crate::domain::models::OutboundEvent;
use crate::domain::models::Transport;
use crate::domain::models::TransportName;
use crate::domain::models::TypingSignal;
use crate::infrastructure::api::ChatApi;
use crate::infrastructure::notifiers::noop::NoopNotifier;

struct FakeTransport {
    state: ChannelState,
    connected_before: bool,
    joins: Arc<Mutex<Vec<String>>>,
    left: Arc<Mutex<Vec<String>>>,
    emitted: Arc<Mutex<Vec<OutboundEvent>>>,
}

#[async_trait]
impl Transport for FakeTransport {
    fn name(&self) -> TransportName {
        return TransportName::WebSocket;
    }

    fn state(&self) -> ChannelState {
        return self.state;
    }

    #[allow(clippy::implicit_return)]
    async fn connect(&mut self, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
        self.state = ChannelState::Connected;

        if self.connected_before {
            tx.send(Event::ChannelReconnected())?;
        } else {
            tx.send(Event::ChannelConnected())?;
        }
        self.connected_before = true;

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn join_conversation(&mut self, conversation_id: &str) -> Result<()> {
        self.joins.lock().unwrap().push(conversation_id.to_string());
        self.state = ChannelState::Joined;
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn leave_conversation(&mut self, conversation_id: &str) -> Result<()> {
        self.left.lock().unwrap().push(conversation_id.to_string());
        self.state = ChannelState::Connected;
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn emit(&mut self, event: OutboundEvent) -> Result<()> {
        self.emitted.lock().unwrap().push(event);
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn close(&mut self) -> Result<()> {
        self.state = ChannelState::Disconnected;
        return Ok(());
    }
}

struct Harness {
    widget: ChatWidget,
    rx: mpsc::UnboundedReceiver<Event>,
    joins: Arc<Mutex<Vec<String>>>,
    left: Arc<Mutex<Vec<String>>>,
    emitted: Arc<Mutex<Vec<OutboundEvent>>>,
    cache_dir: path::PathBuf,
    _dir: tempfile::TempDir,
}

fn harness(api_url: String) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("conversations");
    let (tx, rx) = mpsc::unbounded_channel::<Event>();

    let joins = Arc::new(Mutex::new(vec![]));
    let left = Arc::new(Mutex::new(vec![]));
    let emitted = Arc::new(Mutex::new(vec![]));

    let transport = FakeTransport {
        state: ChannelState::Disconnected,
        connected_before: false,
        joins: joins.clone(),
        left: left.clone(),
        emitted: emitted.clone(),
    };

    let widget = ChatWidget::new(
        "vendor-7",
        ChatApi::with_url(api_url),
        Box::new(transport),
        NotificationDispatcher::new(Box::new(NoopNotifier::default())),
        SessionCache::new(cache_dir.clone()),
        tx,
    );

    return Harness {
        widget,
        rx,
        joins,
        left,
        emitted,
        cache_dir,
        _dir: dir,
    };
}

async fn seed_cache(cache_dir: &path::Path, conversation_id: &str) {
    SessionCache::new(cache_dir.to_path_buf())
        .save("vendor-7", conversation_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn it_bootstraps_a_new_conversation_end_to_end() -> Result<()> {
    let mut server = mockito::Server::new();
    let start_mock = server
        .mock("POST", "/support/conversations")
        .with_status(200)
        .with_body(r#"{"conversationId": "conv-abc"}"#)
        .expect(1)
        .create();
    let history_mock = server
        .mock("GET", "/support/conversations/conv-abc/messages")
        .with_status(200)
        .with_body("[]")
        .create();
    let _send_mock = server
        .mock("POST", "/support/messages")
        .with_status(200)
        .create();

    let mut h = harness(server.url());
    h.widget.open().await?;
    assert_eq!(h.widget.conversation_id(), Some("conv-abc"));

    let connected = h.rx.recv().await.unwrap();
    h.widget.handle_event(connected).await?;

    assert_eq!(h.widget.phase(), WidgetPhase::Ready);
    assert_eq!(h.joins.lock().unwrap().as_slice(), ["conv-abc"]);
    start_mock.assert();
    history_mock.assert();

    let temp_id = h.widget.send("hello").await?;
    assert_eq!(h.widget.messages().len(), 1);
    assert!(h.widget.messages()[0].optimistic);

    let echo = MessageDescriptor {
        id: Some("m1".to_string()),
        temp_id: Some(temp_id),
        sender: "vendor-7".to_string(),
        content: "hello".to_string(),
        timestamp: "2024-01-10T10:00:10Z".to_string(),
    };
    h.widget.handle_event(Event::MessageReceived(echo)).await?;

    assert_eq!(h.widget.messages().len(), 1);
    assert_eq!(h.widget.messages()[0].id.as_deref(), Some("m1"));
    assert!(!h.widget.messages()[0].optimistic);

    return Ok(());
}

#[tokio::test]
async fn it_resumes_cached_conversations_without_starting_new_ones() -> Result<()> {
    let mut server = mockito::Server::new();
    let start_mock = server
        .mock("POST", "/support/conversations")
        .expect(0)
        .create();
    let history_mock = server
        .mock("GET", "/support/conversations/conv-cached/messages")
        .with_status(200)
        .with_body(test_utils::history_fixture())
        .create();

    let mut h = harness(server.url());
    seed_cache(&h.cache_dir, "conv-cached").await;

    h.widget.open().await?;
    let connected = h.rx.recv().await.unwrap();
    h.widget.handle_event(connected).await?;

    assert_eq!(h.widget.conversation_id(), Some("conv-cached"));
    assert_eq!(h.widget.messages().len(), 2);
    start_mock.assert();
    history_mock.assert();

    return Ok(());
}

#[tokio::test]
async fn it_refetches_history_on_every_reconnect() -> Result<()> {
    let mut server = mockito::Server::new();
    let history_mock = server
        .mock("GET", "/support/conversations/conv-cached/messages")
        .with_status(200)
        .with_body("[]")
        .expect(2)
        .create();

    let mut h = harness(server.url());
    seed_cache(&h.cache_dir, "conv-cached").await;

    h.widget.open().await?;
    let connected = h.rx.recv().await.unwrap();
    h.widget.handle_event(connected).await?;

    h.widget.handle_event(Event::ChannelReconnected()).await?;

    // Join is re-issued on every connect; the gateway forgets it.
    assert_eq!(
        h.joins.lock().unwrap().as_slice(),
        ["conv-cached", "conv-cached"]
    );
    history_mock.assert();

    return Ok(());
}

#[tokio::test]
async fn it_restarts_bootstrap_when_the_cached_conversation_is_rejected() -> Result<()> {
    let mut server = mockito::Server::new();
    let stale_mock = server
        .mock("GET", "/support/conversations/conv-stale/messages")
        .with_status(404)
        .create();
    let start_mock = server
        .mock("POST", "/support/conversations")
        .with_status(200)
        .with_body(r#"{"conversationId": "conv-fresh"}"#)
        .create();
    let fresh_mock = server
        .mock("GET", "/support/conversations/conv-fresh/messages")
        .with_status(200)
        .with_body("[]")
        .create();

    let mut h = harness(server.url());
    seed_cache(&h.cache_dir, "conv-stale").await;

    h.widget.open().await?;
    let connected = h.rx.recv().await.unwrap();
    h.widget.handle_event(connected).await?;

    assert_eq!(h.widget.conversation_id(), Some("conv-fresh"));
    assert_eq!(h.widget.phase(), WidgetPhase::Ready);
    assert_eq!(
        h.joins.lock().unwrap().as_slice(),
        ["conv-stale", "conv-fresh"]
    );

    let cached = SessionCache::new(h.cache_dir.clone()).load("vendor-7").await?;
    assert_eq!(cached.as_deref(), Some("conv-fresh"));

    stale_mock.assert();
    start_mock.assert();
    fresh_mock.assert();

    return Ok(());
}

#[tokio::test]
async fn it_marks_failed_sends_and_retries_them() -> Result<()> {
    let mut server = mockito::Server::new();
    let _history_mock = server
        .mock("GET", "/support/conversations/conv-cached/messages")
        .with_status(200)
        .with_body("[]")
        .create();
    let _send_mock = server
        .mock("POST", "/support/messages")
        .with_status(500)
        .create();

    let mut h = harness(server.url());
    seed_cache(&h.cache_dir, "conv-cached").await;

    h.widget.open().await?;
    let connected = h.rx.recv().await.unwrap();
    h.widget.handle_event(connected).await?;

    let temp_id = h.widget.send("did my payout clear?").await?;

    let failure = h.rx.recv().await.unwrap();
    assert!(matches!(failure, Event::SendFailed(_)));
    h.widget.handle_event(failure).await?;

    assert_eq!(h.widget.messages().len(), 1);
    assert!(h.widget.messages()[0].failed);

    h.widget.retry(&temp_id).await?;
    assert_eq!(h.widget.messages().len(), 1);
    assert!(!h.widget.messages()[0].failed);

    return Ok(());
}

#[tokio::test]
async fn it_adopts_server_initiated_conversations() -> Result<()> {
    let mut server = mockito::Server::new();
    let history_mock = server
        .mock("GET", "/support/conversations/conv-srv/messages")
        .with_status(200)
        .with_body("[]")
        .create();

    let mut h = harness(server.url());
    h.widget
        .handle_event(Event::ConversationStarted("conv-srv".to_string()))
        .await?;

    assert_eq!(h.widget.conversation_id(), Some("conv-srv"));
    assert_eq!(h.joins.lock().unwrap().as_slice(), ["conv-srv"]);
    history_mock.assert();

    let cached = SessionCache::new(h.cache_dir.clone()).load("vendor-7").await?;
    assert_eq!(cached.as_deref(), Some("conv-srv"));

    return Ok(());
}

#[tokio::test]
async fn it_debounces_typing_signals_through_the_gateway() -> Result<()> {
    let mut server = mockito::Server::new();
    let _history_mock = server
        .mock("GET", "/support/conversations/conv-cached/messages")
        .with_status(200)
        .with_body("[]")
        .create();

    let mut h = harness(server.url());
    seed_cache(&h.cache_dir, "conv-cached").await;

    h.widget.open().await?;
    let connected = h.rx.recv().await.unwrap();
    h.widget.handle_event(connected).await?;

    h.widget.keystroke().await?;
    h.widget.keystroke().await?;
    h.widget.keystroke().await?;

    let expected = OutboundEvent::Typing(TypingSignal {
        conversation_id: "conv-cached".to_string(),
        sender: "vendor-7".to_string(),
    });
    assert_eq!(h.emitted.lock().unwrap().as_slice(), [expected]);

    h.widget.tick(Instant::now() + Duration::from_secs(2)).await?;

    let stopped = OutboundEvent::StopTyping(TypingSignal {
        conversation_id: "conv-cached".to_string(),
        sender: "vendor-7".to_string(),
    });
    assert_eq!(h.emitted.lock().unwrap().len(), 2);
    assert_eq!(h.emitted.lock().unwrap()[1], stopped);

    return Ok(());
}

#[tokio::test]
async fn it_tracks_remote_typing_for_the_active_conversation_only() -> Result<()> {
    let mut server = mockito::Server::new();
    let _history_mock = server
        .mock("GET", "/support/conversations/conv-cached/messages")
        .with_status(200)
        .with_body("[]")
        .create();

    let mut h = harness(server.url());
    seed_cache(&h.cache_dir, "conv-cached").await;

    h.widget.open().await?;
    let connected = h.rx.recv().await.unwrap();
    h.widget.handle_event(connected).await?;

    h.widget
        .handle_event(Event::RemoteTyping(TypingSignal {
            conversation_id: "conv-other".to_string(),
            sender: "support-agent-2".to_string(),
        }))
        .await?;
    assert_eq!(h.widget.remote_typist(), None);

    h.widget
        .handle_event(Event::RemoteTyping(TypingSignal {
            conversation_id: "conv-cached".to_string(),
            sender: "support-agent-2".to_string(),
        }))
        .await?;
    assert_eq!(h.widget.remote_typist(), Some("support-agent-2"));

    h.widget
        .handle_event(Event::RemoteStoppedTyping(TypingSignal {
            conversation_id: "conv-cached".to_string(),
            sender: "support-agent-2".to_string(),
        }))
        .await?;
    assert_eq!(h.widget.remote_typist(), None);

    return Ok(());
}

#[tokio::test]
async fn it_leaves_the_conversation_on_close() -> Result<()> {
    let mut server = mockito::Server::new();
    let _history_mock = server
        .mock("GET", "/support/conversations/conv-cached/messages")
        .with_status(200)
        .with_body("[]")
        .create();

    let mut h = harness(server.url());
    seed_cache(&h.cache_dir, "conv-cached").await;

    h.widget.open().await?;
    let connected = h.rx.recv().await.unwrap();
    h.widget.handle_event(connected).await?;

    h.widget.close().await?;

    assert_eq!(h.widget.phase(), WidgetPhase::Closed);
    assert_eq!(h.left.lock().unwrap().as_slice(), ["conv-cached"]);

    return Ok(());
}

#[tokio::test]
async fn it_parks_in_failed_when_the_channel_errors_terminally() -> Result<()> {
    let server = mockito::Server::new();

    let mut h = harness(server.url());
    h.widget
        .handle_event(Event::ChannelError("gateway unreachable".to_string()))
        .await?;

    assert_eq!(h.widget.phase(), WidgetPhase::Failed);
    let res = h.widget.send("hello").await;
    assert!(res.is_err());

    return Ok(());
}
