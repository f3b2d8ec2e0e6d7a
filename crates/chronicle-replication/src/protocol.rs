//! Wire frames exchanged on a replication stream
//!
//! Framing and payload serialization belong to the transport; these types
//! model the semantic content only. Payloads stay opaque until the task
//! converter decodes them.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// One opaque, per-shard-ordered unit of state change from a source cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationTask {
    /// Monotonic id within the source shard
    pub task_id: i64,
    /// Source-side event time of the change
    pub event_time: SystemTime,
    /// Opaque payload re-applied on the target
    pub payload: Bytes,
}

/// Outbound frames (receiver -> source)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicationStreamRequest {
    /// Advisory progress report: everything at or below
    /// `last_processed_message_id` is durably processed on the target, so
    /// the source may forget it.
    SyncReplicationState {
        last_processed_message_id: i64,
        last_processed_message_time: SystemTime,
    },
}

/// Inbound frames (source -> receiver)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicationStreamResponse {
    /// A batch of replication tasks plus the high watermark they advance to.
    /// `last_task_id` may exceed the largest task id in the batch.
    Messages {
        replication_tasks: Vec<ReplicationTask>,
        last_task_id: i64,
        last_task_time: SystemTime,
    },
}
