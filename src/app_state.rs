//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::Authenticator;
use crate::channel::{ChannelRegistry, TopicHub};
use crate::config::GatewayConfig;
use crate::service::WorkspaceService;
use crate::ws::dispatch::MessageHandler;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Workspace entities and their mutation API.
    pub workspace: Arc<WorkspaceService>,
    /// Channel registry, immutable after startup.
    pub registry: Arc<ChannelRegistry>,
    /// Topic hub for broadcast fan-out.
    pub hub: TopicHub,
    /// Handshake authenticator.
    pub authenticator: Arc<dyn Authenticator>,
    /// Application hook for `message` frames.
    pub message_handler: Option<Arc<dyn MessageHandler>>,
    /// Runtime configuration.
    pub config: Arc<GatewayConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("registry_len", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
