//! Stream receiver: pulls replication tasks from a source shard into a
//! target shard and acks processed progress
//!
//! One receiver per (source-shard, target-shard) pair. `start` launches two
//! cooperating workers over a shared stream handle:
//!
//! - the **ack loop** periodically reports the tracker's low watermark back
//!   to the source; send failures are swallowed and it never reconnects
//! - the **recv loop** drains inbound frames into tracked executable tasks
//!   and owns reconnection, floor-limited by `min_reconnect_interval`
//!
//! The receiver mutex guards only the `(creation time, stream)` snapshot;
//! it is never held across a send, receive, or submit.

use crate::client::ReplicationStreamClientProvider;
use crate::error::Result;
use crate::observability::ReplicationMetrics;
use crate::protocol::{ReplicationStreamRequest, ReplicationStreamResponse};
use crate::shard::{ClusterShardKey, ClusterShardKeyPair};
use crate::shutdown::ShutdownOnce;
use crate::stream::{BiDirectionStream, ReplicationStream};
use crate::toolbox::ProcessToolBox;
use crate::tracker::{ExecutableTaskTracker, WatermarkInfo};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

// Lifecycle states, advanced by compare-and-swap. `Stopped` is terminal.
const STATUS_INITIALIZED: i32 = 0;
const STATUS_STARTED: i32 = 1;
const STATUS_STOPPED: i32 = 2;

/// Receiving end of one cross-cluster replication stream
pub struct StreamReceiver {
    toolbox: ProcessToolBox,
    status: AtomicI32,
    shard_pair: ClusterShardKeyPair,
    task_tracker: Arc<ExecutableTaskTracker>,
    shutdown: ShutdownOnce,
    slot: Mutex<StreamSlot>,
    #[cfg(test)]
    workers_spawned: std::sync::atomic::AtomicUsize,
}

struct StreamSlot {
    created_at: Instant,
    stream: Arc<ReplicationStream>,
}

impl StreamReceiver {
    pub fn new(
        toolbox: ProcessToolBox,
        source_shard_key: ClusterShardKey,
        target_shard_key: ClusterShardKey,
    ) -> Self {
        let shard_pair = ClusterShardKeyPair::new(source_shard_key, target_shard_key);
        let stream = Arc::new(new_stream(&toolbox, &shard_pair));
        Self {
            toolbox,
            status: AtomicI32::new(STATUS_INITIALIZED),
            shard_pair,
            task_tracker: Arc::new(ExecutableTaskTracker::new()),
            shutdown: ShutdownOnce::new(),
            slot: Mutex::new(StreamSlot {
                created_at: Instant::now(),
                stream,
            }),
            #[cfg(test)]
            workers_spawned: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn shard_pair(&self) -> &ClusterShardKeyPair {
        &self.shard_pair
    }

    /// Launch the ack and recv workers. Only the first call transitions the
    /// receiver out of `Initialized`; later calls are no-ops.
    pub fn start(self: &Arc<Self>) {
        if self
            .status
            .compare_exchange(
                STATUS_INITIALIZED,
                STATUS_STARTED,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return;
        }

        let ack = Arc::clone(self);
        tokio::spawn(async move {
            #[cfg(test)]
            ack.workers_spawned.fetch_add(1, Ordering::SeqCst);
            ack.ack_loop().await;
            ack.stop();
        });

        let recv = Arc::clone(self);
        tokio::spawn(async move {
            #[cfg(test)]
            recv.workers_spawned.fetch_add(1, Ordering::SeqCst);
            recv.recv_loop().await;
            recv.stop();
        });

        info!(
            source = %self.shard_pair.source,
            target = %self.shard_pair.target,
            "Stream receiver started"
        );
    }

    /// Stop both workers, tear down the stream, and cancel tracked tasks.
    /// Each worker also calls this on exit, so shutdown propagates from
    /// either direction. No-op unless currently `Started`.
    pub fn stop(&self) {
        if self
            .status
            .compare_exchange(
                STATUS_STARTED,
                STATUS_STOPPED,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return;
        }

        self.shutdown.shutdown();
        self.slot.lock().stream.close();
        self.task_tracker.cancel();

        info!(
            source = %self.shard_pair.source,
            target = %self.shard_pair.target,
            "Stream receiver shutting down"
        );
    }

    /// True while both workers are live
    pub fn is_valid(&self) -> bool {
        self.status.load(Ordering::SeqCst) == STATUS_STARTED
    }

    async fn ack_loop(&self) {
        let period = self.toolbox.config.sync_status_interval;
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let stream = self.slot.lock().stream.clone();
                    self.ack_message(&stream).await;
                }
                _ = self.shutdown.wait() => return,
            }
        }
    }

    async fn ack_message(&self, stream: &ReplicationStream) {
        let Some(watermark) = self.task_tracker.low_watermark() else {
            return;
        };

        let request = ReplicationStreamRequest::SyncReplicationState {
            last_processed_message_id: watermark.watermark,
            last_processed_message_time: watermark.timestamp,
        };

        match stream.send(request).await {
            Ok(()) => {
                ReplicationMetrics::increment_acks_sent();
                ReplicationMetrics::set_low_watermark(
                    &self.shard_pair.source.cluster_name,
                    &self.shard_pair.target.cluster_name,
                    watermark.watermark,
                );
            }
            // The recv loop owns recovery; a failed ack only means this
            // stream is gone and a replacement is already on its way.
            Err(err) if self.shutdown.is_shutdown() => {
                debug!(error = %err, "Sync state skipped during shutdown");
            }
            Err(err) => {
                ReplicationMetrics::increment_send_errors();
                error!(
                    source = %self.shard_pair.source,
                    target = %self.shard_pair.target,
                    error = %err,
                    "Failed to send sync replication state"
                );
            }
        }
    }

    async fn recv_loop(&self) {
        while !self.shutdown.is_shutdown() {
            let (created_at, stream) = {
                let slot = self.slot.lock();
                (slot.created_at, slot.stream.clone())
            };

            // Errors were logged where they occurred; every outcome leads
            // to the same reconnect path.
            let _ = self.process_messages(&stream).await;

            let floor = self.toolbox.config.min_reconnect_interval;
            let elapsed = created_at.elapsed();
            if elapsed < floor {
                tokio::select! {
                    _ = time::sleep(floor - elapsed) => {}
                    _ = self.shutdown.wait() => {}
                }
            }

            let old = {
                let mut slot = self.slot.lock();
                slot.created_at = Instant::now();
                std::mem::replace(
                    &mut slot.stream,
                    Arc::new(new_stream(&self.toolbox, &self.shard_pair)),
                )
            };
            old.close();
            ReplicationMetrics::increment_reconnects();
        }
    }

    async fn process_messages(&self, stream: &ReplicationStream) -> Result<()> {
        while let Some(element) = stream.next().await {
            let response = match element {
                Ok(response) => response,
                Err(err) => {
                    ReplicationMetrics::increment_recv_errors();
                    error!(
                        source = %self.shard_pair.source,
                        target = %self.shard_pair.target,
                        error = %err,
                        "Replication stream receive failed"
                    );
                    return Err(err);
                }
            };

            let ReplicationStreamResponse::Messages {
                replication_tasks,
                last_task_id,
                last_task_time,
            } = response;

            // Inbound data originates at the remote peer of this stream,
            // which is the target shard's cluster.
            let tasks = self.toolbox.task_converter.convert_tasks(
                &self.shard_pair.target.cluster_name,
                replication_tasks,
            );

            ReplicationMetrics::record_tasks_tracked(tasks.len());
            self.task_tracker.track_tasks(
                WatermarkInfo {
                    watermark: last_task_id,
                    timestamp: last_task_time,
                },
                tasks.clone(),
            );

            for task in tasks {
                self.toolbox.task_scheduler.submit(task).await;
            }
        }

        info!(
            source = %self.shard_pair.source,
            target = %self.shard_pair.target,
            "Replication stream closed"
        );
        Ok(())
    }
}

fn new_stream(toolbox: &ProcessToolBox, shard_pair: &ClusterShardKeyPair) -> ReplicationStream {
    let provider = ReplicationStreamClientProvider::new(
        Arc::clone(&toolbox.client_bean),
        shard_pair.clone(),
    );
    BiDirectionStream::new(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RemoteClientRegistry;
    use crate::config::ReplicationConfig;
    use crate::testing::{RecordingScheduler, TestTaskConverter};
    use std::time::Duration;

    fn test_toolbox() -> ProcessToolBox {
        ProcessToolBox {
            config: Arc::new(ReplicationConfig {
                sync_status_interval: Duration::from_millis(10),
                min_reconnect_interval: Duration::from_millis(20),
            }),
            // No clusters registered: every open fails and the recv loop
            // cycles through its reconnect path.
            client_bean: Arc::new(RemoteClientRegistry::new()),
            task_scheduler: RecordingScheduler::new(),
            task_converter: TestTaskConverter::new(),
        }
    }

    fn test_receiver() -> Arc<StreamReceiver> {
        Arc::new(StreamReceiver::new(
            test_toolbox(),
            ClusterShardKey::new("east", 1),
            ClusterShardKey::new("west", 1),
        ))
    }

    #[tokio::test]
    async fn test_double_start_spawns_two_workers() {
        let receiver = test_receiver();
        receiver.start();
        receiver.start();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(receiver.workers_spawned.load(Ordering::SeqCst), 2);

        receiver.stop();
    }

    #[tokio::test]
    async fn test_status_lifecycle() {
        let receiver = test_receiver();
        assert!(!receiver.is_valid());

        receiver.start();
        assert!(receiver.is_valid());

        receiver.stop();
        receiver.stop();
        assert!(!receiver.is_valid());

        // Stopped is terminal: start cannot revive the receiver.
        receiver.start();
        assert!(!receiver.is_valid());
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let receiver = test_receiver();
        receiver.stop();
        assert!(!receiver.is_valid());

        receiver.start();
        assert!(receiver.is_valid());
        receiver.stop();
    }

    #[tokio::test]
    async fn test_shard_pair_accessor() {
        let receiver = test_receiver();
        assert_eq!(receiver.shard_pair().to_string(), "east/1->west/1");
    }
}
