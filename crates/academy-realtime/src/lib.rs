//! Live fan-out hub and event producer API.
//!
//! The [`Hub`] is an in-process registry of open subscriber channels: every
//! broadcast goes to every currently-attached subscriber, and a subscriber
//! that attaches late only sees later events. Durability is not this crate's
//! job — the [`Notifier`] appends every event to the Postgres log *before*
//! broadcasting, and clients that miss a push recover through the replay
//! endpoint.
//!
//! # Flow
//!
//! 1. A content mutation commits, then calls a `Notifier` method
//! 2. The notifier appends to the event log (id assigned here)
//! 3. The notifier hands the persisted event to `Hub::broadcast`
//! 4. Every open subscriber channel receives the frame; dead channels are
//!    removed, never crash the loop
//!
//! A notifier failure is logged and swallowed: realtime notification must
//! never fail or roll back the mutation that triggered it.

pub mod error;
pub mod hub;
pub mod notifier;

pub use error::{RealtimeError, Result};
pub use hub::{Hub, SubscriberId};
pub use notifier::Notifier;
