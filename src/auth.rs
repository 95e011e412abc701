//! Handshake authentication.
//!
//! A connection request carries an opaque token (query parameter `token`);
//! [`Authenticator::authenticate`] turns it into an [`AuthContext`] before
//! the transport upgrade is accepted. Failure rejects the upgrade with an
//! unauthorized response — no connection state ever exists for a failed
//! handshake.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::GatewayError;

/// Identity seeded into a connection at handshake time.
///
/// Opaque to the engine: the dispatcher only threads it through to
/// `authorize`/`snapshot` hooks and the message handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Stable user identifier.
    pub user_id: String,
    /// Human-readable name for presence-style channels.
    pub display_name: String,
}

impl AuthContext {
    /// The principal used when the gateway runs without a token table.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            display_name: "Anonymous".to_string(),
        }
    }

    /// Returns `true` for the anonymous principal.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.user_id == "anonymous"
    }
}

/// Sole collaborator boundary for identity.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolves a handshake token to an identity.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthorized`] when the token is missing,
    /// unknown, or otherwise invalid; the caller must reject the upgrade.
    async fn authenticate(&self, token: Option<&str>) -> Result<AuthContext, GatewayError>;
}

/// Token-table authenticator backed by configuration.
///
/// An empty table puts the gateway in open mode: every connection is
/// accepted as the anonymous principal. A non-empty table requires a known
/// token.
#[derive(Debug, Default)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, AuthContext>,
}

impl StaticTokenAuthenticator {
    /// Builds the authenticator from `token → identity` entries.
    #[must_use]
    pub fn new(tokens: HashMap<String, AuthContext>) -> Self {
        Self { tokens }
    }

    /// Parses the `AUTH_TOKENS` configuration value.
    ///
    /// Format: comma-separated `token:user_id[:display_name]` entries.
    /// Entries without a display name reuse the user id. Malformed entries
    /// are skipped with a warning.
    #[must_use]
    pub fn from_spec(spec: &str) -> Self {
        let mut tokens = HashMap::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let mut parts = entry.splitn(3, ':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(token), Some(user_id), display) if !token.is_empty() && !user_id.is_empty() => {
                    tokens.insert(
                        token.to_string(),
                        AuthContext {
                            user_id: user_id.to_string(),
                            display_name: display.unwrap_or(user_id).to_string(),
                        },
                    );
                }
                _ => {
                    tracing::warn!(entry, "skipping malformed AUTH_TOKENS entry");
                }
            }
        }
        Self { tokens }
    }

    /// Returns `true` when no tokens are configured (open mode).
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, token: Option<&str>) -> Result<AuthContext, GatewayError> {
        if self.tokens.is_empty() {
            return Ok(AuthContext::anonymous());
        }
        token
            .and_then(|t| self.tokens.get(t))
            .cloned()
            .ok_or_else(|| GatewayError::Unauthorized("invalid or missing token".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_mode_accepts_missing_token() {
        let auth = StaticTokenAuthenticator::default();
        let Ok(ctx) = auth.authenticate(None).await else {
            panic!("open mode must accept");
        };
        assert!(ctx.is_anonymous());
    }

    #[tokio::test]
    async fn known_token_resolves_identity() {
        let auth = StaticTokenAuthenticator::from_spec("s3cr3t:alice:Alice,tok2:bob");
        let Ok(ctx) = auth.authenticate(Some("s3cr3t")).await else {
            panic!("known token must authenticate");
        };
        assert_eq!(ctx.user_id, "alice");
        assert_eq!(ctx.display_name, "Alice");

        let Ok(ctx) = auth.authenticate(Some("tok2")).await else {
            panic!("known token must authenticate");
        };
        assert_eq!(ctx.display_name, "bob"); // falls back to the user id
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let auth = StaticTokenAuthenticator::from_spec("s3cr3t:alice");
        assert!(auth.authenticate(Some("wrong")).await.is_err());
        assert!(auth.authenticate(None).await.is_err());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let auth = StaticTokenAuthenticator::from_spec("ok:alice,:missing,broken,");
        assert!(!auth.is_open());
        assert_eq!(auth.tokens.len(), 1);
    }
}
