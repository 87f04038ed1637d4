// Error types for the realtime subsystem

use thiserror::Error;

/// Result type alias for realtime operations
pub type Result<T> = std::result::Result<T, RealtimeError>;

/// Errors that can occur while distributing events
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Event log store error
    #[error("event store error: {0}")]
    Store(String),

    /// Event could not be serialized for the wire
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored event kind no longer maps to a known variant
    #[error("unknown event kind: {0}")]
    UnknownKind(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RealtimeError {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        RealtimeError::Store(msg.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        RealtimeError::Serialization(msg.into())
    }
}

impl From<academy_contracts::UnknownEventKind> for RealtimeError {
    fn from(err: academy_contracts::UnknownEventKind) -> Self {
        RealtimeError::UnknownKind(err.0)
    }
}
