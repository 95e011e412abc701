//! Topic hub: the broadcast primitive behind `publish`.
//!
//! The hub maps concrete channel strings (topics) to the outbound queues of
//! every connection currently subscribed to that exact string. Business
//! logic calls [`TopicHub::publish`] after mutating an entity; the engine
//! itself never originates deltas or events.
//!
//! Delivery is push-only and at-most-once: a full or closed per-connection
//! queue drops the frame for that connection, and the publisher is never
//! blocked on slow consumers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{RwLock, mpsc};

use super::ConnectionId;
use crate::ws::messages::ServerFrame;

/// Which payload kind a publish carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishKind {
    /// Incremental update to the channel's cumulative state.
    Delta,
    /// Discrete, non-cumulative notification.
    Event,
}

#[derive(Debug, Default)]
struct TopicHubInner {
    /// topic → per-connection outbound queues.
    topics: HashMap<String, HashMap<ConnectionId, mpsc::Sender<ServerFrame>>>,
    /// Monotonic per-topic sequence, kept past the last unsubscribe so
    /// re-subscribers observe a consistent ordering.
    sequences: HashMap<String, u64>,
}

/// Shared topic registry. Cloneable; store one per process.
#[derive(Debug, Clone, Default)]
pub struct TopicHub {
    inner: Arc<RwLock<TopicHubInner>>,
}

impl TopicHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection's outbound queue on a topic.
    ///
    /// Re-registering the same connection replaces its queue handle.
    pub async fn register(
        &self,
        topic: &str,
        connection: ConnectionId,
        sender: mpsc::Sender<ServerFrame>,
    ) {
        let mut inner = self.inner.write().await;
        inner
            .topics
            .entry(topic.to_string())
            .or_default()
            .insert(connection, sender);
    }

    /// Removes a connection from a topic. Unknown topics and connections
    /// are a no-op.
    pub async fn release(&self, topic: &str, connection: ConnectionId) {
        let mut inner = self.inner.write().await;
        if let Some(subscribers) = inner.topics.get_mut(topic) {
            subscribers.remove(&connection);
            if subscribers.is_empty() {
                inner.topics.remove(topic);
            }
        }
    }

    /// Removes a connection from every topic in `topics`. Called once on
    /// disconnect with the connection's subscription set.
    pub async fn release_all(&self, connection: ConnectionId, topics: &HashSet<String>) {
        let mut inner = self.inner.write().await;
        for topic in topics {
            if let Some(subscribers) = inner.topics.get_mut(topic) {
                subscribers.remove(&connection);
                if subscribers.is_empty() {
                    inner.topics.remove(topic);
                }
            }
        }
    }

    /// Fans a delta/event out to every connection registered on `topic`.
    ///
    /// Advances the topic sequence even when nobody is subscribed (the
    /// underlying state changed either way). Returns the number of
    /// connections the frame was queued for.
    pub async fn publish(&self, topic: &str, kind: PublishKind, data: Value) -> usize {
        let mut inner = self.inner.write().await;

        let seq_slot = inner.sequences.entry(topic.to_string()).or_insert(0);
        *seq_slot = seq_slot.saturating_add(1);
        let seq = *seq_slot;

        let Some(subscribers) = inner.topics.get_mut(topic) else {
            return 0;
        };

        let frame = match kind {
            PublishKind::Delta => ServerFrame::Delta {
                channel: topic.to_string(),
                seq,
                data,
            },
            PublishKind::Event => ServerFrame::Event {
                channel: topic.to_string(),
                seq,
                data,
            },
        };

        let mut delivered = 0usize;
        let mut closed = Vec::new();
        for (connection, sender) in subscribers.iter() {
            match sender.try_send(frame.clone()) {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(%connection, topic, "outbound queue full; dropping frame");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    closed.push(*connection);
                }
            }
        }
        for connection in closed {
            subscribers.remove(&connection);
        }
        if subscribers.is_empty() {
            inner.topics.remove(topic);
        }

        delivered
    }

    /// Returns the current sequence number of a topic (0 if it has never
    /// been published to). Snapshots are stamped with this value so clients
    /// can order them against in-flight deltas.
    pub async fn current_seq(&self, topic: &str) -> u64 {
        self.inner.read().await.sequences.get(topic).copied().unwrap_or(0)
    }

    /// Returns the number of connections registered on a topic.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .read()
            .await
            .topics
            .get(topic)
            .map_or(0, HashMap::len)
    }
}
