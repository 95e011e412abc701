//! channel-gateway server entry point.
//!
//! Starts the Axum HTTP server with the REST and WebSocket endpoints.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use channel_gateway::api;
use channel_gateway::app_state::AppState;
use channel_gateway::auth::StaticTokenAuthenticator;
use channel_gateway::channel::TopicHub;
use channel_gateway::config::GatewayConfig;
use channel_gateway::service::{WorkspaceService, build_registry};
use channel_gateway::ws::dispatch::MessageHandler;
use channel_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Arc::new(GatewayConfig::from_env()?);
    tracing::info!(addr = %config.listen_addr, "starting channel-gateway");

    // Build the engine: hub, workspace, channel registry
    let hub = TopicHub::new();
    let workspace = Arc::new(WorkspaceService::new(hub.clone()));
    let registry = Arc::new(build_registry(&workspace));

    let authenticator = Arc::new(StaticTokenAuthenticator::from_spec(&config.auth_tokens));
    if authenticator.is_open() {
        tracing::warn!("no AUTH_TOKENS configured; accepting connections as anonymous");
    }

    // Build application state
    let app_state = AppState {
        workspace: Arc::clone(&workspace),
        registry,
        hub,
        authenticator,
        message_handler: Some(workspace as Arc<dyn MessageHandler>),
        config: Arc::clone(&config),
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
