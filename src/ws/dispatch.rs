//! Frame dispatcher: the per-connection protocol state machine.
//!
//! The transport layer (`ws/connection.rs`) decodes frames and calls
//! [`dispatch_client_frame`] for each one, in arrival order. All protocol
//! semantics live here: registry routing, authorization, snapshot
//! delivery, subscription bookkeeping, and the application message path.
//!
//! Failures local to one operation produce at most an `error` frame; no
//! handler failure ever tears down the connection.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::messages::{ClientCommand, ClientFrame, ServerFrame};
use crate::auth::AuthContext;
use crate::channel::handlers::ChannelRequest;
use crate::channel::{ChannelRegistry, ConnectionId, TopicHub};
use crate::error::ChannelError;

/// Application hook invoked for every valid `message` frame.
///
/// Errors are caught and logged at the dispatch boundary; they are never
/// surfaced to the client.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handles one application command from a connection.
    ///
    /// # Errors
    ///
    /// Any error is logged and swallowed by the dispatcher.
    async fn on_message(
        &self,
        auth: &AuthContext,
        connection: ConnectionId,
        command: ClientCommand,
    ) -> anyhow::Result<()>;
}

/// Per-connection state threaded through the dispatcher.
///
/// The subscription set is only ever mutated by the owning connection's
/// task, so it needs no lock — only the hub is shared. Every mutation of
/// the set pairs with the matching hub registration in the same operation.
pub struct ConnectionContext {
    /// Identifier assigned at handshake time.
    pub connection_id: ConnectionId,
    /// Identity produced by the handshake authenticator.
    pub auth: AuthContext,
    /// Outbound queue consumed by the connection's sender task.
    pub tx: mpsc::Sender<ServerFrame>,
    /// Channel registry (shared, immutable after startup).
    pub registry: Arc<ChannelRegistry>,
    /// Shared topic hub.
    pub hub: TopicHub,
    /// Application message hook, if the application registered one.
    pub message_handler: Option<Arc<dyn MessageHandler>>,
    /// Bound on one `authorize` + `snapshot` hook pair.
    pub handler_timeout: Duration,
    /// Concrete channel strings this connection is subscribed to.
    pub subscriptions: HashSet<String>,
}

impl std::fmt::Debug for ConnectionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("connection_id", &self.connection_id)
            .field("auth", &self.auth)
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

impl ConnectionContext {
    /// Creates the context for a freshly upgraded connection.
    #[must_use]
    pub fn new(
        auth: AuthContext,
        tx: mpsc::Sender<ServerFrame>,
        registry: Arc<ChannelRegistry>,
        hub: TopicHub,
        message_handler: Option<Arc<dyn MessageHandler>>,
        handler_timeout: Duration,
    ) -> Self {
        Self {
            connection_id: ConnectionId::new(),
            auth,
            tx,
            registry,
            hub,
            message_handler,
            handler_timeout,
            subscriptions: HashSet::new(),
        }
    }
}

/// Processes one decoded frame from the client.
pub async fn dispatch_client_frame(ctx: &mut ConnectionContext, frame: ClientFrame) {
    match frame {
        ClientFrame::Subscribe { channel } => handle_subscribe(ctx, channel).await,
        ClientFrame::Unsubscribe { channel } => handle_unsubscribe(ctx, &channel).await,
        ClientFrame::Message { data } => handle_message(ctx, data).await,
        ClientFrame::Ping => {
            let _ = ctx.tx.send(ServerFrame::Pong).await;
        }
    }
}

/// Releases every topic registration for the connection. Called exactly
/// once when the connection closes; afterwards no further deliveries can
/// reach it.
pub async fn disconnect_cleanup(ctx: &mut ConnectionContext) {
    ctx.hub
        .release_all(ctx.connection_id, &ctx.subscriptions)
        .await;
    ctx.subscriptions.clear();
    debug!(connection = %ctx.connection_id, "released all subscriptions");
}

async fn handle_subscribe(ctx: &mut ConnectionContext, channel: String) {
    let registry = Arc::clone(&ctx.registry);
    let Some(resolved) = registry.resolve(&channel) else {
        send_channel_error(ctx, &channel, &ChannelError::UnknownChannel).await;
        return;
    };
    let Some(handlers) = resolved.handlers.map(Arc::clone) else {
        send_channel_error(ctx, &channel, &ChannelError::NoHandler).await;
        return;
    };

    let request = ChannelRequest {
        auth: ctx.auth.clone(),
        params: resolved.params,
        connection_id: ctx.connection_id,
    };

    match tokio::time::timeout(ctx.handler_timeout, handlers.authorize(&request)).await {
        Ok(true) => {}
        Ok(false) => {
            send_channel_error(ctx, &channel, &ChannelError::Unauthorized).await;
            return;
        }
        Err(_) => {
            warn!(connection = %ctx.connection_id, channel, "authorize hook timed out");
            send_channel_error(
                ctx,
                &channel,
                &ChannelError::Snapshot("authorization timed out".to_string()),
            )
            .await;
            return;
        }
    }

    // Register before fetching the snapshot so a publish racing the fetch
    // is still delivered; the seq stamped on the snapshot lets the client
    // order the two.
    ctx.subscriptions.insert(channel.clone());
    ctx.hub
        .register(&channel, ctx.connection_id, ctx.tx.clone())
        .await;

    let snapshot = match tokio::time::timeout(ctx.handler_timeout, handlers.snapshot(&request)).await
    {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("snapshot timed out")),
    };

    match snapshot {
        Ok(data) => {
            let seq = ctx.hub.current_seq(&channel).await;
            let _ = ctx
                .tx
                .send(ServerFrame::Snapshot {
                    channel,
                    seq,
                    data,
                })
                .await;
        }
        Err(err) => {
            // The subscription stays active: the client was told the fetch
            // failed and may re-subscribe to retry, while broadcasts keep
            // flowing.
            warn!(connection = %ctx.connection_id, channel, error = %err, "snapshot hook failed");
            send_channel_error(ctx, &channel, &ChannelError::Snapshot(err.to_string())).await;
        }
    }
}

async fn handle_unsubscribe(ctx: &mut ConnectionContext, channel: &str) {
    // Unsubscribing a channel that was never subscribed is a no-op.
    if ctx.subscriptions.remove(channel) {
        ctx.hub.release(channel, ctx.connection_id).await;
    }
}

async fn handle_message(ctx: &ConnectionContext, data: serde_json::Value) {
    let command = match serde_json::from_value::<ClientCommand>(data) {
        Ok(command) => command,
        Err(err) => {
            debug!(connection = %ctx.connection_id, error = %err, "dropping invalid message payload");
            return;
        }
    };

    let Some(handler) = ctx.message_handler.as_ref() else {
        debug!(connection = %ctx.connection_id, "no message handler registered; dropping command");
        return;
    };

    if let Err(err) = handler
        .on_message(&ctx.auth, ctx.connection_id, command)
        .await
    {
        warn!(connection = %ctx.connection_id, error = %err, "message handler failed");
    }
}

async fn send_channel_error(ctx: &ConnectionContext, channel: &str, error: &ChannelError) {
    let _ = ctx
        .tx
        .send(ServerFrame::Error {
            channel: channel.to_string(),
            error: error.to_string(),
        })
        .await;
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::channel::ChannelDefinition;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Mutex;

    struct TestHandlers {
        allow: bool,
        fail_snapshot: bool,
        snapshot_called: AtomicBool,
    }

    impl TestHandlers {
        fn allowing() -> Arc<Self> {
            Arc::new(Self {
                allow: true,
                fail_snapshot: false,
                snapshot_called: AtomicBool::new(false),
            })
        }

        fn denying() -> Arc<Self> {
            Arc::new(Self {
                allow: false,
                fail_snapshot: false,
                snapshot_called: AtomicBool::new(false),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                allow: true,
                fail_snapshot: true,
                snapshot_called: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl crate::channel::ChannelHandlers for TestHandlers {
        async fn authorize(&self, _request: &ChannelRequest) -> bool {
            self.allow
        }

        async fn snapshot(&self, request: &ChannelRequest) -> anyhow::Result<serde_json::Value> {
            self.snapshot_called.store(true, Ordering::SeqCst);
            if self.fail_snapshot {
                anyhow::bail!("store offline");
            }
            Ok(serde_json::json!({
                "title": "Untitled",
                "participantCount": 0,
                "session": request.param("session_id"),
            }))
        }
    }

    #[derive(Default)]
    struct RecordingMessageHandler {
        received: Mutex<Vec<ClientCommand>>,
        fail: bool,
    }

    #[async_trait]
    impl MessageHandler for RecordingMessageHandler {
        async fn on_message(
            &self,
            _auth: &AuthContext,
            _connection: ConnectionId,
            command: ClientCommand,
        ) -> anyhow::Result<()> {
            self.received.lock().await.push(command);
            if self.fail {
                anyhow::bail!("handler exploded");
            }
            Ok(())
        }
    }

    struct Fixture {
        ctx: ConnectionContext,
        rx: mpsc::Receiver<ServerFrame>,
        hub: TopicHub,
        message_handler: Arc<RecordingMessageHandler>,
    }

    fn fixture_with(handlers: Arc<TestHandlers>) -> Fixture {
        let registry = Arc::new(
            ChannelRegistry::builder()
                .channel(
                    ChannelDefinition::new("session_metadata", "session/{session_id}/metadata")
                        .with_delta(),
                    handlers,
                )
                .definition(ChannelDefinition::new(
                    "frames",
                    "session/{session_id}/frames",
                ))
                .build(),
        );
        let hub = TopicHub::new();
        let message_handler = Arc::new(RecordingMessageHandler::default());
        let (tx, rx) = mpsc::channel(32);
        let ctx = ConnectionContext::new(
            AuthContext::anonymous(),
            tx,
            registry,
            hub.clone(),
            Some(Arc::clone(&message_handler) as Arc<dyn MessageHandler>),
            Duration::from_secs(5),
        );
        Fixture {
            ctx,
            rx,
            hub,
            message_handler,
        }
    }

    fn subscribe(channel: &str) -> ClientFrame {
        ClientFrame::Subscribe {
            channel: channel.to_string(),
        }
    }

    #[tokio::test]
    async fn unknown_channel_is_an_error_with_no_state_change() {
        let mut f = fixture_with(TestHandlers::allowing());
        dispatch_client_frame(&mut f.ctx, subscribe("nope/abc")).await;

        let Some(ServerFrame::Error { channel, error }) = f.rx.recv().await else {
            panic!("expected an error frame");
        };
        assert_eq!(channel, "nope/abc");
        assert_eq!(error, "Unknown channel");
        assert!(f.ctx.subscriptions.is_empty());
    }

    #[tokio::test]
    async fn handlerless_channel_is_an_error() {
        let mut f = fixture_with(TestHandlers::allowing());
        dispatch_client_frame(&mut f.ctx, subscribe("session/abc/frames")).await;

        let Some(ServerFrame::Error { error, .. }) = f.rx.recv().await else {
            panic!("expected an error frame");
        };
        assert_eq!(error, "No handler for channel");
        assert!(f.ctx.subscriptions.is_empty());
    }

    #[tokio::test]
    async fn denied_subscribe_never_fetches_a_snapshot() {
        let handlers = TestHandlers::denying();
        let mut f = fixture_with(Arc::clone(&handlers));
        dispatch_client_frame(&mut f.ctx, subscribe("session/abc/metadata")).await;

        let Some(ServerFrame::Error { error, .. }) = f.rx.recv().await else {
            panic!("expected an error frame");
        };
        assert_eq!(error, "Unauthorized");
        assert!(f.ctx.subscriptions.is_empty());
        assert_eq!(f.hub.subscriber_count("session/abc/metadata").await, 0);
        assert!(!handlers.snapshot_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn successful_subscribe_yields_snapshot() {
        let mut f = fixture_with(TestHandlers::allowing());
        dispatch_client_frame(&mut f.ctx, subscribe("session/abc-123/metadata")).await;

        let Some(ServerFrame::Snapshot { channel, seq, data }) = f.rx.recv().await else {
            panic!("expected a snapshot frame");
        };
        assert_eq!(channel, "session/abc-123/metadata");
        assert_eq!(seq, 0);
        assert_eq!(data.get("title"), Some(&serde_json::json!("Untitled")));
        assert_eq!(data.get("participantCount"), Some(&serde_json::json!(0)));
        assert_eq!(data.get("session"), Some(&serde_json::json!("abc-123")));
        assert!(f.ctx.subscriptions.contains("session/abc-123/metadata"));
        assert_eq!(f.hub.subscriber_count("session/abc-123/metadata").await, 1);
    }

    #[tokio::test]
    async fn failed_snapshot_reports_error_but_keeps_subscription() {
        let mut f = fixture_with(TestHandlers::failing());
        dispatch_client_frame(&mut f.ctx, subscribe("session/abc/metadata")).await;

        let Some(ServerFrame::Error { error, .. }) = f.rx.recv().await else {
            panic!("expected an error frame");
        };
        assert_eq!(error, "store offline");
        // Decided behavior: the registration survives the failed fetch.
        assert!(f.ctx.subscriptions.contains("session/abc/metadata"));
        assert_eq!(f.hub.subscriber_count("session/abc/metadata").await, 1);

        // Broadcasts keep flowing to the still-subscribed connection.
        f.hub
            .publish(
                "session/abc/metadata",
                crate::channel::PublishKind::Delta,
                serde_json::json!({"title": "Recovered"}),
            )
            .await;
        let Some(ServerFrame::Delta { .. }) = f.rx.recv().await else {
            panic!("expected a delta frame");
        };
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let mut f = fixture_with(TestHandlers::allowing());
        dispatch_client_frame(&mut f.ctx, subscribe("session/abc/metadata")).await;
        let _ = f.rx.recv().await; // snapshot

        dispatch_client_frame(
            &mut f.ctx,
            ClientFrame::Unsubscribe {
                channel: "session/abc/metadata".to_string(),
            },
        )
        .await;
        assert!(f.ctx.subscriptions.is_empty());

        let delivered = f
            .hub
            .publish(
                "session/abc/metadata",
                crate::channel::PublishKind::Delta,
                serde_json::Value::Null,
            )
            .await;
        assert_eq!(delivered, 0);
        assert!(f.rx.try_recv().is_err()); // and no response frame for the unsubscribe
    }

    #[tokio::test]
    async fn unsubscribe_of_unknown_channel_is_a_no_op() {
        let mut f = fixture_with(TestHandlers::allowing());
        dispatch_client_frame(
            &mut f.ctx,
            ClientFrame::Unsubscribe {
                channel: "session/abc/metadata".to_string(),
            },
        )
        .await;
        assert!(f.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn ping_always_pongs() {
        let mut f = fixture_with(TestHandlers::allowing());
        dispatch_client_frame(&mut f.ctx, ClientFrame::Ping).await;
        assert!(matches!(f.rx.recv().await, Some(ServerFrame::Pong)));
    }

    #[tokio::test]
    async fn invalid_message_payload_never_reaches_the_handler() {
        let mut f = fixture_with(TestHandlers::allowing());
        dispatch_client_frame(
            &mut f.ctx,
            ClientFrame::Message {
                data: serde_json::json!({"kind": "reboot"}),
            },
        )
        .await;
        assert!(f.message_handler.received.lock().await.is_empty());
    }

    #[tokio::test]
    async fn valid_message_reaches_the_handler() {
        let mut f = fixture_with(TestHandlers::allowing());
        dispatch_client_frame(
            &mut f.ctx,
            ClientFrame::Message {
                data: serde_json::json!({
                    "kind": "typing", "session_id": "abc", "is_typing": true
                }),
            },
        )
        .await;
        let received = f.message_handler.received.lock().await;
        assert_eq!(received.len(), 1);
    }

    #[tokio::test]
    async fn message_handler_errors_are_swallowed() {
        let mut f = fixture_with(TestHandlers::allowing());
        f.ctx.message_handler = Some(Arc::new(RecordingMessageHandler {
            received: Mutex::new(Vec::new()),
            fail: true,
        }));
        dispatch_client_frame(
            &mut f.ctx,
            ClientFrame::Message {
                data: serde_json::json!({"kind": "session_join", "session_id": "abc"}),
            },
        )
        .await;
        // No error frame: handler failures are logged, never surfaced.
        assert!(f.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_releases_every_topic() {
        let mut f = fixture_with(TestHandlers::allowing());
        dispatch_client_frame(&mut f.ctx, subscribe("session/a/metadata")).await;
        dispatch_client_frame(&mut f.ctx, subscribe("session/b/metadata")).await;
        assert_eq!(f.ctx.subscriptions.len(), 2);

        disconnect_cleanup(&mut f.ctx).await;
        assert!(f.ctx.subscriptions.is_empty());
        assert_eq!(f.hub.subscriber_count("session/a/metadata").await, 0);
        assert_eq!(f.hub.subscriber_count("session/b/metadata").await, 0);
    }

    #[tokio::test]
    async fn snapshot_carries_current_topic_seq() {
        let f0 = fixture_with(TestHandlers::allowing());
        // Advance the topic before anyone subscribes.
        f0.hub
            .publish(
                "session/abc/metadata",
                crate::channel::PublishKind::Delta,
                serde_json::Value::Null,
            )
            .await;

        let mut f = f0;
        dispatch_client_frame(&mut f.ctx, subscribe("session/abc/metadata")).await;
        let Some(ServerFrame::Snapshot { seq, .. }) = f.rx.recv().await else {
            panic!("expected a snapshot frame");
        };
        assert_eq!(seq, 1);
    }
}
