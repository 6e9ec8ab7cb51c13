//! Process-wide services shared by every request handler.
//!
//! - [`events`] - in-memory board/card event bus backing the SSE subscriptions
//! - [`config`] - server configuration loaded from disk and the environment
//! - [`access`] - workspace membership checks

pub mod access;
pub mod config;
pub mod events;
