//! REST and WebSocket plumbing for the easel generation client.
//!
//! Provides the [`api::GenerationBackend`] trait and its HTTP
//! implementation, typed inbound message parsing, exponential-backoff
//! reconnect policy, and the live [`transport::Transport`] that owns one
//! WebSocket connection and its telemetry.

pub mod api;
pub mod messages;
pub mod reconnect;
pub mod transport;
