//! Remote admin clients and the replication stream client provider

use crate::error::{ReplicationError, Result};
use crate::protocol::{ReplicationStreamRequest, ReplicationStreamResponse};
use crate::shard::{ClusterShardKeyPair, ShardMetadata};
use crate::stream::{ReplicationRawStream, StreamClientProvider};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Admin surface of a remote cluster, reduced to the single RPC the
/// receiver consumes.
#[async_trait]
pub trait AdminClient: Send + Sync + std::fmt::Debug {
    /// Open one raw replication stream session. `metadata` carries the
    /// shard pair so the serving side can demux.
    async fn stream_workflow_replication_messages(
        &self,
        metadata: ShardMetadata,
    ) -> Result<ReplicationRawStream>;
}

/// Resolves remote admin clients by cluster name
pub trait ClientBean: Send + Sync {
    fn get_remote_admin_client(&self, cluster_name: &str) -> Result<Arc<dyn AdminClient>>;
}

/// In-process `ClientBean` keyed by cluster name
#[derive(Default)]
pub struct RemoteClientRegistry {
    clients: DashMap<String, Arc<dyn AdminClient>>,
}

impl RemoteClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, cluster_name: impl Into<String>, client: Arc<dyn AdminClient>) {
        self.clients.insert(cluster_name.into(), client);
    }

    pub fn deregister(&self, cluster_name: &str) {
        self.clients.remove(cluster_name);
    }
}

impl ClientBean for RemoteClientRegistry {
    fn get_remote_admin_client(&self, cluster_name: &str) -> Result<Arc<dyn AdminClient>> {
        self.clients
            .get(cluster_name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ReplicationError::UnknownCluster(cluster_name.to_string()))
    }
}

/// Opens raw sessions for one (source, target) shard pair.
///
/// Resolution is by the target cluster name. A small immutable value owned
/// by the stream it serves; retry on failure is the receiver's concern.
pub struct ReplicationStreamClientProvider {
    client_bean: Arc<dyn ClientBean>,
    shard_pair: ClusterShardKeyPair,
}

impl ReplicationStreamClientProvider {
    pub fn new(client_bean: Arc<dyn ClientBean>, shard_pair: ClusterShardKeyPair) -> Self {
        Self {
            client_bean,
            shard_pair,
        }
    }
}

#[async_trait]
impl StreamClientProvider<ReplicationStreamRequest, ReplicationStreamResponse>
    for ReplicationStreamClientProvider
{
    async fn open(&self) -> Result<ReplicationRawStream> {
        let admin = self
            .client_bean
            .get_remote_admin_client(&self.shard_pair.target.cluster_name)?;
        let metadata = ShardMetadata::encode(&self.shard_pair.source, &self.shard_pair.target);
        admin.stream_workflow_replication_messages(metadata).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::ClusterShardKey;
    use crate::testing::ScriptedAdminClient;

    #[test]
    fn test_registry_resolves_registered_clusters() {
        let registry = RemoteClientRegistry::new();
        registry.register("west", ScriptedAdminClient::new());

        assert!(registry.get_remote_admin_client("west").is_ok());

        let err = registry.get_remote_admin_client("north").unwrap_err();
        assert!(matches!(err, ReplicationError::UnknownCluster(_)));

        registry.deregister("west");
        assert!(registry.get_remote_admin_client("west").is_err());
    }

    #[tokio::test]
    async fn test_provider_attaches_shard_metadata() {
        let admin = ScriptedAdminClient::new();
        let _session = admin.push_session(4);

        let registry = Arc::new(RemoteClientRegistry::new());
        registry.register("west", admin.clone());

        let shard_pair = ClusterShardKeyPair::new(
            ClusterShardKey::new("east", 3),
            ClusterShardKey::new("west", 3),
        );
        let provider =
            ReplicationStreamClientProvider::new(registry, shard_pair.clone());

        provider.open().await.unwrap();

        let seen = admin.metadata_seen();
        assert_eq!(seen.len(), 1);
        let (source, target) = seen[0].decode().unwrap();
        assert_eq!(source, shard_pair.source);
        assert_eq!(target, shard_pair.target);
    }

    #[tokio::test]
    async fn test_provider_surfaces_unknown_cluster() {
        let registry = Arc::new(RemoteClientRegistry::new());
        let provider = ReplicationStreamClientProvider::new(
            registry,
            ClusterShardKeyPair::new(
                ClusterShardKey::new("east", 1),
                ClusterShardKey::new("west", 1),
            ),
        );

        let err = provider.open().await.unwrap_err();
        assert!(matches!(err, ReplicationError::UnknownCluster(_)));
    }
}
