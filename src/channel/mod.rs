//! Channel engine: definitions, routing, hooks, and fan-out.
//!
//! This module is the protocol core. It knows nothing about the workspace
//! entities behind individual channels; those live in the service layer and
//! plug in through [`ChannelHandlers`] and [`TopicHub::publish`].

pub mod connection_id;
pub mod definition;
pub mod handlers;
pub mod hub;
pub mod template;

pub use connection_id::ConnectionId;
pub use definition::{ChannelDefinition, ChannelRegistry, ResolvedChannel};
pub use handlers::{ChannelHandlers, ChannelRequest};
pub use hub::{PublishKind, TopicHub};
pub use template::{PathParams, match_template};
