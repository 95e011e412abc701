//! Wire frame types: the client/server tagged unions.
//!
//! Every frame carries a snake_case `type` tag so one client-side
//! demultiplexer handles snapshots, broadcasts, errors, and heartbeats
//! alike. Frames that fail to deserialize into a known variant are dropped
//! with a log line; the connection stays open.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client → server frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Subscribe to a concrete channel string.
    Subscribe {
        /// Concrete channel, e.g. `session/abc-123/metadata`.
        channel: String,
    },
    /// Unsubscribe from a concrete channel string. Never answered.
    Unsubscribe {
        /// Concrete channel to release.
        channel: String,
    },
    /// Application message, validated against [`ClientCommand`].
    Message {
        /// Untyped payload; invalid payloads are dropped before the
        /// message handler runs.
        data: Value,
    },
    /// Heartbeat; always answered with `pong`.
    Ping,
}

/// Server → client frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Full channel state, sent once per successful subscribe.
    Snapshot {
        /// The concrete channel this state belongs to.
        channel: String,
        /// Topic sequence at snapshot time; deltas with `seq` less than or
        /// equal to this are already reflected in the snapshot.
        seq: u64,
        /// Snapshot payload.
        data: Value,
    },
    /// Incremental update published by business logic.
    Delta {
        /// The concrete channel this update belongs to.
        channel: String,
        /// Monotonic topic sequence.
        seq: u64,
        /// Delta payload.
        data: Value,
    },
    /// Discrete notification published by business logic.
    Event {
        /// The concrete channel this notification belongs to.
        channel: String,
        /// Monotonic topic sequence.
        seq: u64,
        /// Event payload.
        data: Value,
    },
    /// Per-channel failure; the subscription state is described by the
    /// operation that produced it.
    Error {
        /// The concrete channel the error applies to.
        channel: String,
        /// Wire error string (see `ChannelError`).
        error: String,
    },
    /// Heartbeat reply.
    Pong,
}

/// Connection-scoped application commands carried in `message` frames.
///
/// This union is distinct from any per-channel schema: it is how a client
/// talks to the application layer, not to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientCommand {
    /// The user started or stopped typing in a session.
    Typing {
        /// Target session.
        session_id: String,
        /// `true` while composing.
        is_typing: bool,
    },
    /// The user joined a session view.
    SessionJoin {
        /// Target session.
        session_id: String,
    },
    /// The user left a session view.
    SessionLeave {
        /// Target session.
        session_id: String,
    },
}
