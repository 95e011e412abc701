//! Per-channel hook traits and the request context they receive.
//!
//! Every channel family registers a [`ChannelHandlers`] implementation at
//! startup. The dispatcher calls `authorize` before adding a subscription
//! and `snapshot` immediately after; both may suspend (database lookups,
//! policy services) and are bounded by the configured handler timeout.

use async_trait::async_trait;
use serde_json::Value;

use super::ConnectionId;
use super::template::PathParams;
use crate::auth::AuthContext;

/// Context handed to `authorize` and `snapshot` for one subscribe request.
///
/// Params are recomputed from the concrete channel string by the path
/// matcher on every request; they are never stored on the connection.
#[derive(Debug, Clone)]
pub struct ChannelRequest {
    /// Authentication context seeded at handshake time.
    pub auth: AuthContext,
    /// Parameters captured from the concrete channel string.
    pub params: PathParams,
    /// The requesting connection.
    pub connection_id: ConnectionId,
}

impl ChannelRequest {
    /// Returns the captured parameter `name`, or an empty string if the
    /// template has no such placeholder.
    #[must_use]
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).map_or("", String::as_str)
    }
}

/// Hooks backing one channel family.
///
/// `authorize` defaults to allowing every request; `snapshot` has no
/// default — a family without a current-state source cannot be subscribed
/// to.
#[async_trait]
pub trait ChannelHandlers: Send + Sync {
    /// Decides whether the requesting connection may subscribe.
    async fn authorize(&self, request: &ChannelRequest) -> bool {
        let _ = request;
        true
    }

    /// Produces the full current state of the channel.
    ///
    /// # Errors
    ///
    /// Any error is reported to the client as an `error` frame on the
    /// channel; it never tears down the connection.
    async fn snapshot(&self, request: &ChannelRequest) -> anyhow::Result<Value>;
}
