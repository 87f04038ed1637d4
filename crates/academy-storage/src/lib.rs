// Postgres event log with sqlx
//
// This crate owns the durable side of the realtime subsystem: an append-only
// `events` table whose BIGSERIAL id is the replay cursor. The fan-out hub is
// per-process and ephemeral; this log is the cross-process source of truth.

pub mod models;
pub mod repository;

pub use models::*;
pub use repository::Database;
