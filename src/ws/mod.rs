//! WebSocket layer: handshake, connection loop, and frame dispatch.
//!
//! The endpoint at `/ws` speaks the channel protocol: tagged frames in
//! both directions, one snapshot per subscribe, broadcast deltas/events
//! fanned out by the topic hub.

pub mod connection;
pub mod dispatch;
pub mod handler;
pub mod messages;
