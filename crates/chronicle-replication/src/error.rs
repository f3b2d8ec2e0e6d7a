//! Replication error types

use thiserror::Error;

/// Result type for replication operations
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Errors surfaced by the replication receiver and its collaborators
#[derive(Debug, Clone, Error)]
pub enum ReplicationError {
    // ==================== Cluster Resolution ====================
    #[error("unknown cluster: {0}")]
    UnknownCluster(String),

    #[error("invalid stream metadata: {0}")]
    InvalidMetadata(String),

    // ==================== Stream Errors ====================
    #[error("stream closed")]
    StreamClosed,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("channel closed")]
    ChannelClosed,

    // ==================== Lifecycle ====================
    #[error("shutdown in progress")]
    ShuttingDown,
}

impl ReplicationError {
    /// Check if the reconnect loop should retry after this error
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ReplicationError::UnknownCluster(_)
                | ReplicationError::Transport(_)
                | ReplicationError::ChannelClosed
        )
    }
}

// Conversion from channel errors, for transports built on tokio channels
impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ReplicationError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ReplicationError::ChannelClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_errors() {
        assert!(ReplicationError::Transport("reset".into()).is_retriable());
        assert!(ReplicationError::UnknownCluster("east".into()).is_retriable());
        assert!(ReplicationError::ChannelClosed.is_retriable());
        assert!(!ReplicationError::StreamClosed.is_retriable());
        assert!(!ReplicationError::ShuttingDown.is_retriable());
        assert!(!ReplicationError::InvalidMetadata("bad".into()).is_retriable());
    }
}
