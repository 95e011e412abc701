//! Channel definitions and the ordered schema registry.
//!
//! A [`ChannelDefinition`] describes one channel family: its unique name,
//! its path template, and which payload kinds it carries. The
//! [`ChannelRegistry`] holds the definitions in declaration order together
//! with their handler sets; routing scans the list and the first template
//! that matches a concrete channel string wins.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::handlers::ChannelHandlers;
use super::template::{PathParams, match_template, templates_overlap};

/// Static description of one channel family. Immutable after startup.
#[derive(Debug, Clone)]
pub struct ChannelDefinition {
    /// Unique name of the family (e.g. `"session_metadata"`).
    pub name: String,
    /// Path template with `{param}` placeholders.
    pub template: String,
    /// Snapshot value clients should assume before the first `snapshot`
    /// frame arrives; also what `snapshot` hooks return for absent entities.
    pub default_snapshot: Value,
    /// Whether the family publishes cumulative `delta` frames.
    pub supports_delta: bool,
    /// Whether the family publishes discrete `event` frames.
    pub supports_event: bool,
}

impl ChannelDefinition {
    /// Creates a definition with no delta/event payloads and a `null`
    /// default snapshot.
    #[must_use]
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            default_snapshot: Value::Null,
            supports_delta: false,
            supports_event: false,
        }
    }

    /// Declares that this family publishes `delta` frames.
    #[must_use]
    pub fn with_delta(mut self) -> Self {
        self.supports_delta = true;
        self
    }

    /// Declares that this family publishes `event` frames.
    #[must_use]
    pub fn with_event(mut self) -> Self {
        self.supports_event = true;
        self
    }

    /// Sets the default snapshot value.
    #[must_use]
    pub fn with_default_snapshot(mut self, value: Value) -> Self {
        self.default_snapshot = value;
        self
    }
}

/// One registry entry: a definition plus its (optional) handler set.
struct RegisteredChannel {
    definition: ChannelDefinition,
    handlers: Option<Arc<dyn ChannelHandlers>>,
}

impl fmt::Debug for RegisteredChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredChannel")
            .field("definition", &self.definition)
            .field("has_handlers", &self.handlers.is_some())
            .finish()
    }
}

/// Result of routing a concrete channel string through the registry.
pub struct ResolvedChannel<'a> {
    /// The matching definition.
    pub definition: &'a ChannelDefinition,
    /// The definition's handlers, if any were registered.
    pub handlers: Option<&'a Arc<dyn ChannelHandlers>>,
    /// Parameters captured from the concrete string.
    pub params: PathParams,
}

impl fmt::Debug for ResolvedChannel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedChannel")
            .field("definition", &self.definition.name)
            .field("params", &self.params)
            .finish()
    }
}

/// Ordered registry of every channel family, built once at startup.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    entries: Vec<RegisteredChannel>,
}

impl ChannelRegistry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> ChannelRegistryBuilder {
        ChannelRegistryBuilder::default()
    }

    /// Routes a concrete channel string to its definition.
    ///
    /// Scans the definitions in declaration order and returns the first
    /// whose template matches; overlapping templates resolve by order.
    #[must_use]
    pub fn resolve(&self, concrete: &str) -> Option<ResolvedChannel<'_>> {
        self.entries.iter().find_map(|entry| {
            match_template(&entry.definition.template, concrete).map(|params| ResolvedChannel {
                definition: &entry.definition,
                handlers: entry.handlers.as_ref(),
                params,
            })
        })
    }

    /// Returns every pair of registered templates that can both match some
    /// literal channel string. An empty result means routing is
    /// order-independent.
    #[must_use]
    pub fn overlapping_templates(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (i, a) in self.entries.iter().enumerate() {
            for b in self.entries.iter().skip(i.saturating_add(1)) {
                if templates_overlap(&a.definition.template, &b.definition.template) {
                    pairs.push((
                        a.definition.template.clone(),
                        b.definition.template.clone(),
                    ));
                }
            }
        }
        pairs
    }

    /// Returns the number of registered families.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no families are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder collecting channel families in declaration order.
#[derive(Debug, Default)]
pub struct ChannelRegistryBuilder {
    entries: Vec<RegisteredChannel>,
}

impl ChannelRegistryBuilder {
    /// Registers a family together with its handlers.
    #[must_use]
    pub fn channel(
        mut self,
        definition: ChannelDefinition,
        handlers: Arc<dyn ChannelHandlers>,
    ) -> Self {
        self.entries.push(RegisteredChannel {
            definition,
            handlers: Some(handlers),
        });
        self
    }

    /// Registers a definition without handlers. Subscribing to it yields
    /// `No handler for channel`; useful for families served by another
    /// process that still need routing visibility.
    #[must_use]
    pub fn definition(mut self, definition: ChannelDefinition) -> Self {
        self.entries.push(RegisteredChannel {
            definition,
            handlers: None,
        });
        self
    }

    /// Finalizes the registry.
    ///
    /// Logs a warning for every template pair that could route the same
    /// concrete string (first-match-wins stays in effect) and for every
    /// definition registered without handlers.
    #[must_use]
    pub fn build(self) -> ChannelRegistry {
        let registry = ChannelRegistry {
            entries: self.entries,
        };

        for (a, b) in registry.overlapping_templates() {
            tracing::warn!(first = %a, second = %b, "channel templates overlap; declaration order decides routing");
        }
        for entry in &registry.entries {
            if entry.handlers.is_none() {
                tracing::warn!(channel = %entry.definition.name, "channel registered without handlers; subscribes will be rejected");
            }
        }

        registry
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;
    use crate::channel::ConnectionId;
    use crate::channel::handlers::ChannelRequest;
    use async_trait::async_trait;

    struct NullHandlers;

    #[async_trait]
    impl ChannelHandlers for NullHandlers {
        async fn snapshot(&self, _request: &ChannelRequest) -> anyhow::Result<Value> {
            Ok(Value::Null)
        }
    }

    fn registry() -> ChannelRegistry {
        ChannelRegistry::builder()
            .channel(
                ChannelDefinition::new("session_metadata", "session/{session_id}/metadata")
                    .with_delta(),
                Arc::new(NullHandlers),
            )
            .channel(
                ChannelDefinition::new("typing", "session/{session_id}/typing").with_event(),
                Arc::new(NullHandlers),
            )
            .definition(ChannelDefinition::new("frames", "session/{session_id}/frames"))
            .build()
    }

    #[test]
    fn resolve_routes_to_matching_definition() {
        let registry = registry();
        let Some(resolved) = registry.resolve("session/abc/typing") else {
            panic!("expected a match");
        };
        assert_eq!(resolved.definition.name, "typing");
        assert_eq!(resolved.params.get("session_id").map(String::as_str), Some("abc"));
        assert!(resolved.handlers.is_some());
    }

    #[test]
    fn resolve_unknown_returns_none() {
        let registry = registry();
        assert!(registry.resolve("session/abc/unknown").is_none());
        assert!(registry.resolve("not-a-channel").is_none());
    }

    #[test]
    fn handlerless_definition_resolves_without_handlers() {
        let registry = registry();
        let Some(resolved) = registry.resolve("session/abc/frames") else {
            panic!("expected a match");
        };
        assert!(resolved.handlers.is_none());
    }

    #[test]
    fn first_match_wins_on_overlap() {
        let registry = ChannelRegistry::builder()
            .channel(
                ChannelDefinition::new("specific", "session/{id}/metadata"),
                Arc::new(NullHandlers),
            )
            .channel(
                ChannelDefinition::new("catch_all", "{kind}/{id}/metadata"),
                Arc::new(NullHandlers),
            )
            .build();

        let Some(resolved) = registry.resolve("session/abc/metadata") else {
            panic!("expected a match");
        };
        assert_eq!(resolved.definition.name, "specific");

        let Some(resolved) = registry.resolve("project/abc/metadata") else {
            panic!("expected a match");
        };
        assert_eq!(resolved.definition.name, "catch_all");
    }

    #[test]
    fn overlapping_templates_are_reported() {
        let registry = ChannelRegistry::builder()
            .definition(ChannelDefinition::new("a", "session/{id}/metadata"))
            .definition(ChannelDefinition::new("b", "{kind}/{id}/metadata"))
            .definition(ChannelDefinition::new("c", "session/{id}/roster"))
            .build();

        let pairs = registry.overlapping_templates();
        assert_eq!(pairs.len(), 2); // a~b and b~c, not a~c
    }

    #[test]
    fn disjoint_registry_reports_no_overlap() {
        assert!(registry().overlapping_templates().is_empty());
    }

    #[tokio::test]
    async fn resolved_handlers_are_callable() {
        let registry = registry();
        let Some(resolved) = registry.resolve("session/abc/metadata") else {
            panic!("expected a match");
        };
        let Some(handlers) = resolved.handlers else {
            panic!("expected handlers");
        };
        let request = ChannelRequest {
            auth: AuthContext::anonymous(),
            params: resolved.params,
            connection_id: ConnectionId::new(),
        };
        assert!(handlers.authorize(&request).await);
    }
}
