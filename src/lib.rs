//! # channel-gateway
//!
//! WebSocket channel-subscription gateway for real-time workspace state
//! synchronization.
//!
//! Clients hold one persistent WebSocket connection and subscribe to
//! named, parameterized channels (`session/{session_id}/metadata`,
//! `project/{project_id}/roster`, ...). Each subscribe delivers a full
//! snapshot; business logic publishes deltas and events through the topic
//! hub afterwards.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handshake + Dispatcher (ws/)
//!     │
//!     ├── Channel Registry + Path Matcher (channel/)
//!     ├── TopicHub fan-out (channel/)
//!     │
//!     └── WorkspaceService (service/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod channel;
pub mod config;
pub mod error;
pub mod service;
pub mod ws;
