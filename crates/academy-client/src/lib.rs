//! Admin client for the realtime notification channel.
//!
//! Runs two delivery paths concurrently and merges them into one display
//! feed:
//!
//! - a long-lived SSE stream with bounded exponential reconnect backoff
//! - a fixed-interval replay poll keyed by the highest event id seen
//!
//! The stream is best-effort; the poll is the correctness path. Every event
//! observed from either source goes through the same dedup/ordering/denylist
//! logic, so receiving an event twice (pushed and replayed) renders it once.
//!
//! All feed state is owned by a single merge task; the stream and poll tasks
//! only send commands to it. Dropping [`RealtimeClient`] (or calling
//! `shutdown`) tears down the stream, any pending reconnect timer, and the
//! poll loop.

pub mod config;
pub mod controller;
pub mod feed;

pub use config::ClientConfig;
pub use controller::RealtimeClient;
pub use feed::{ConnectionStatus, Feed, FeedSnapshot, Notice};
