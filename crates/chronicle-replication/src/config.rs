//! Receiver configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for replication stream receivers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Interval between outbound sync-state acks
    pub sync_status_interval: Duration,

    /// Minimum time between two successive stream openings for one
    /// receiver. Rate-limits reconnect storms; a stream that outlived this
    /// interval reconnects immediately.
    pub min_reconnect_interval: Duration,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            sync_status_interval: Duration::from_secs(1),
            min_reconnect_interval: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReplicationConfig::default();
        assert_eq!(config.sync_status_interval, Duration::from_secs(1));
        assert_eq!(config.min_reconnect_interval, Duration::from_secs(5));
    }
}
