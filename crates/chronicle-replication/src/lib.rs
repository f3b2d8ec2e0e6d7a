//! # Chronicle Replication
//!
//! Cross-cluster replication stream receiver for the chronicle
//! workflow-history service:
//! - **StreamReceiver**: one per (source-shard, target-shard) pair; pulls
//!   the ordered task stream and acks processed progress
//! - **ExecutableTaskTracker**: in-flight task tracking and low-watermark
//!   derivation
//! - **BiDirectionStream**: lazily-opened wrapper over one raw
//!   bidirectional session, replaced on reconnect
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       StreamReceiver                        │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │          ack loop            │          recv loop           │
//! │  tick → low watermark →      │  frames → convert → track →  │
//! │  SyncReplicationState        │  submit; reconnect w/ floor  │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │            shared (creation time, stream) snapshot          │
//! ├─────────────────────────────────────────────────────────────┤
//! │   BiDirectionStream ── StreamClientProvider ── ClientBean   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The ack loop swallows send failures; the recv loop treats any end of the
//! inbound sequence as a reconnect event, never sooner than
//! `min_reconnect_interval` after the previous stream was created. Shutdown
//! propagates from either loop through a shared [`ShutdownOnce`] latch.
//!
//! ## Example
//!
//! ```rust,ignore
//! use chronicle_replication::prelude::*;
//!
//! let toolbox = ProcessToolBox {
//!     config: Arc::new(ReplicationConfig::default()),
//!     client_bean: registry,
//!     task_scheduler: scheduler,
//!     task_converter: converter,
//! };
//!
//! let receiver = Arc::new(StreamReceiver::new(
//!     toolbox,
//!     ClusterShardKey::new("east", shard_id),
//!     ClusterShardKey::new("west", shard_id),
//! ));
//! receiver.start();
//! // ...
//! receiver.stop();
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod receiver;
pub mod shard;
pub mod shutdown;
pub mod stream;
pub mod task;
pub mod testing;
pub mod toolbox;
pub mod tracker;

// Re-export main types
pub use client::{AdminClient, ClientBean, RemoteClientRegistry, ReplicationStreamClientProvider};
pub use config::ReplicationConfig;
pub use error::{ReplicationError, Result};
pub use observability::ReplicationMetrics;
pub use protocol::{ReplicationStreamRequest, ReplicationStreamResponse, ReplicationTask};
pub use receiver::StreamReceiver;
pub use shard::{ClusterShardKey, ClusterShardKeyPair, ShardMetadata};
pub use shutdown::ShutdownOnce;
pub use stream::{
    BiDirectionStream, RawStream, ReplicationRawStream, ReplicationStream, StreamClientProvider,
};
pub use task::{
    ExecutableTask, ExecutableTaskConverter, NoopSchedulerMonitor, SchedulerMonitor,
    TaskScheduler, TaskState,
};
pub use toolbox::ProcessToolBox;
pub use tracker::{ExecutableTaskTracker, WatermarkInfo};

/// Re-export common types
pub mod prelude {
    pub use crate::client::*;
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::receiver::*;
    pub use crate::shard::*;
    pub use crate::task::*;
    pub use crate::toolbox::*;
    pub use crate::tracker::*;
}
