//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Token table for the handshake authenticator, as comma-separated
    /// `token:user_id[:display_name]` entries. Empty means open mode.
    pub auth_tokens: String,

    /// Capacity of each connection's outbound frame queue. When a slow
    /// client fills it, further broadcast frames to that client are
    /// dropped.
    pub connection_queue_capacity: usize,

    /// Upper bound in seconds for one `authorize` + `snapshot` hook pair.
    /// A hook that hangs past this fails that subscribe only; the
    /// connection keeps processing frames.
    pub handler_timeout_secs: u64,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;

        let auth_tokens = std::env::var("AUTH_TOKENS").unwrap_or_default();

        let connection_queue_capacity = parse_env("CONNECTION_QUEUE_CAPACITY", 256);
        let handler_timeout_secs = parse_env("HANDLER_TIMEOUT_SECS", 10);

        Ok(Self {
            listen_addr,
            auth_tokens,
            connection_queue_capacity,
            handler_timeout_secs,
        })
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            auth_tokens: String::new(),
            connection_queue_capacity: 256,
            handler_timeout_secs: 10,
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_addr.port(), 3000);
        assert!(config.auth_tokens.is_empty());
        assert!(config.connection_queue_capacity > 0);
        assert!(config.handler_timeout_secs > 0);
    }
}
