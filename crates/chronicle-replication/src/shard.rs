//! Cluster shard identity and stream metadata
//!
//! A replication stream connects exactly one source shard to one target
//! shard. The shard pair travels with the stream as request metadata so the
//! serving side can demux sessions.

use crate::error::{ReplicationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifies one shard of one named cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterShardKey {
    pub cluster_name: String,
    pub shard_id: i32,
}

impl ClusterShardKey {
    pub fn new(cluster_name: impl Into<String>, shard_id: i32) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            shard_id,
        }
    }
}

impl fmt::Display for ClusterShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cluster_name, self.shard_id)
    }
}

/// Directed shard pair; `source -> target` is the direction of task flow
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterShardKeyPair {
    pub source: ClusterShardKey,
    pub target: ClusterShardKey,
}

impl ClusterShardKeyPair {
    pub fn new(source: ClusterShardKey, target: ClusterShardKey) -> Self {
        Self { source, target }
    }
}

impl fmt::Display for ClusterShardKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

const MD_SOURCE_CLUSTER: &str = "chronicle-source-cluster-name";
const MD_SOURCE_SHARD: &str = "chronicle-source-shard-id";
const MD_TARGET_CLUSTER: &str = "chronicle-target-cluster-name";
const MD_TARGET_SHARD: &str = "chronicle-target-shard-id";

/// Request metadata attached to a replication stream.
///
/// Encoding must round-trip: the server recovers both shard keys verbatim
/// from the entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardMetadata {
    entries: HashMap<String, String>,
}

impl ShardMetadata {
    /// Encode a shard pair into stream metadata
    pub fn encode(source: &ClusterShardKey, target: &ClusterShardKey) -> Self {
        let mut entries = HashMap::with_capacity(4);
        entries.insert(MD_SOURCE_CLUSTER.to_string(), source.cluster_name.clone());
        entries.insert(MD_SOURCE_SHARD.to_string(), source.shard_id.to_string());
        entries.insert(MD_TARGET_CLUSTER.to_string(), target.cluster_name.clone());
        entries.insert(MD_TARGET_SHARD.to_string(), target.shard_id.to_string());
        Self { entries }
    }

    /// Recover the `(source, target)` shard keys from stream metadata
    pub fn decode(&self) -> Result<(ClusterShardKey, ClusterShardKey)> {
        let source = ClusterShardKey::new(
            self.require(MD_SOURCE_CLUSTER)?,
            self.require_shard_id(MD_SOURCE_SHARD)?,
        );
        let target = ClusterShardKey::new(
            self.require(MD_TARGET_CLUSTER)?,
            self.require_shard_id(MD_TARGET_SHARD)?,
        );
        Ok((source, target))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| ReplicationError::InvalidMetadata(format!("missing key: {}", key)))
    }

    fn require_shard_id(&self, key: &str) -> Result<i32> {
        self.require(key)?.parse::<i32>().map_err(|_| {
            ReplicationError::InvalidMetadata(format!("non-numeric shard id under: {}", key))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_key_display() {
        let key = ClusterShardKey::new("east", 7);
        assert_eq!(key.to_string(), "east/7");

        let pair = ClusterShardKeyPair::new(key, ClusterShardKey::new("west", 7));
        assert_eq!(pair.to_string(), "east/7->west/7");
    }

    #[test]
    fn test_metadata_round_trip() {
        let source = ClusterShardKey::new("east", 3);
        let target = ClusterShardKey::new("west", 12);

        let metadata = ShardMetadata::encode(&source, &target);
        let (decoded_source, decoded_target) = metadata.decode().unwrap();

        assert_eq!(decoded_source, source);
        assert_eq!(decoded_target, target);
    }

    #[test]
    fn test_metadata_missing_key() {
        let metadata = ShardMetadata::default();
        let err = metadata.decode().unwrap_err();
        assert!(matches!(err, ReplicationError::InvalidMetadata(_)));
    }

    #[test]
    fn test_metadata_bad_shard_id() {
        let mut metadata =
            ShardMetadata::encode(&ClusterShardKey::new("east", 1), &ClusterShardKey::new("west", 2));
        metadata
            .entries
            .insert(MD_TARGET_SHARD.to_string(), "twelve".to_string());

        let err = metadata.decode().unwrap_err();
        assert!(matches!(err, ReplicationError::InvalidMetadata(_)));
    }
}
