//! In-memory doubles for the receiver's external contracts
//!
//! Exported so downstream crates can exercise receivers without a real
//! transport, scheduler, or task executor. Everything here is
//! deterministic: tasks change state only when the test says so, and
//! sessions deliver exactly what the test feeds them.

use crate::client::AdminClient;
use crate::error::{ReplicationError, Result};
use crate::protocol::{ReplicationStreamRequest, ReplicationStreamResponse, ReplicationTask};
use crate::shard::ShardMetadata;
use crate::stream::{RawStream, ReplicationRawStream};
use crate::task::{ExecutableTask, ExecutableTaskConverter, TaskScheduler, TaskState};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::mpsc;

/// Deterministic event time: `ms` milliseconds past the epoch
pub fn time_at_millis(ms: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_millis(ms)
}

/// Wire task with an empty payload and a deterministic event time
pub fn wire_task(task_id: i64, at_millis: u64) -> ReplicationTask {
    ReplicationTask {
        task_id,
        event_time: time_at_millis(at_millis),
        payload: Bytes::new(),
    }
}

/// Inbound frame carrying `tasks` up to high watermark `last_task_id`
pub fn messages_frame(
    tasks: Vec<ReplicationTask>,
    last_task_id: i64,
    at_millis: u64,
) -> ReplicationStreamResponse {
    ReplicationStreamResponse::Messages {
        replication_tasks: tasks,
        last_task_id,
        last_task_time: time_at_millis(at_millis),
    }
}

/// Executable task whose state is flipped by the test
pub struct ManualTask {
    task_id: i64,
    source_time: SystemTime,
    state: Mutex<TaskState>,
}

impl ManualTask {
    pub fn new(task_id: i64, source_time: SystemTime) -> Arc<Self> {
        Arc::new(Self {
            task_id,
            source_time,
            state: Mutex::new(TaskState::Pending),
        })
    }

    /// Mark the task executed, as the scheduler would on success
    pub fn ack(&self) {
        let mut state = self.state.lock();
        if *state == TaskState::Pending {
            *state = TaskState::Acked;
        }
    }
}

impl ExecutableTask for ManualTask {
    fn task_id(&self) -> i64 {
        self.task_id
    }

    fn source_time(&self) -> SystemTime {
        self.source_time
    }

    fn state(&self) -> TaskState {
        *self.state.lock()
    }

    fn cancel(&self) {
        let mut state = self.state.lock();
        if *state == TaskState::Pending {
            *state = TaskState::Cancelled;
        }
    }
}

/// Scheduler that records submissions in arrival order
#[derive(Default)]
pub struct RecordingScheduler {
    submitted: Mutex<Vec<Arc<dyn ExecutableTask>>>,
}

impl RecordingScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn submitted_ids(&self) -> Vec<i64> {
        self.submitted.lock().iter().map(|task| task.task_id()).collect()
    }
}

#[async_trait]
impl TaskScheduler for RecordingScheduler {
    async fn submit(&self, task: Arc<dyn ExecutableTask>) {
        self.submitted.lock().push(task);
    }
}

/// Converter producing [`ManualTask`]s and retaining every conversion for
/// later inspection
#[derive(Default)]
pub struct TestTaskConverter {
    converted: Mutex<Vec<Arc<ManualTask>>>,
    source_clusters: Mutex<Vec<String>>,
}

impl TestTaskConverter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every task produced so far, in conversion order
    pub fn converted(&self) -> Vec<Arc<ManualTask>> {
        self.converted.lock().clone()
    }

    /// Source cluster names passed to `convert_tasks`, in call order
    pub fn seen_source_clusters(&self) -> Vec<String> {
        self.source_clusters.lock().clone()
    }
}

impl ExecutableTaskConverter for TestTaskConverter {
    fn convert_tasks(
        &self,
        source_cluster: &str,
        tasks: Vec<ReplicationTask>,
    ) -> Vec<Arc<dyn ExecutableTask>> {
        self.source_clusters.lock().push(source_cluster.to_string());
        tasks
            .into_iter()
            .map(|task| {
                let converted = ManualTask::new(task.task_id, task.event_time);
                self.converted.lock().push(converted.clone());
                let task: Arc<dyn ExecutableTask> = converted;
                task
            })
            .collect()
    }
}

/// Test-side handles to one scripted raw session
pub struct SessionHarness {
    /// Feed inbound elements toward the receiver
    pub inbound: mpsc::Sender<Result<ReplicationStreamResponse>>,
    /// Observe outbound frames (sync-state acks)
    pub outbound: mpsc::Receiver<ReplicationStreamRequest>,
}

/// Admin client that hands out pre-wired channel sessions in queue order
/// and records the metadata attached to each open
#[derive(Default, Debug)]
pub struct ScriptedAdminClient {
    sessions: Mutex<VecDeque<ReplicationRawStream>>,
    metadata: Mutex<Vec<ShardMetadata>>,
    open_instants: Mutex<Vec<Instant>>,
    opens: AtomicUsize,
}

impl ScriptedAdminClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue one session and return the test-side handles to it
    pub fn push_session(&self, capacity: usize) -> SessionHarness {
        let (request_tx, request_rx) = mpsc::channel(capacity);
        let (response_tx, response_rx) = mpsc::channel(capacity);

        self.sessions.lock().push_back(RawStream {
            tx: request_tx,
            rx: response_rx,
        });

        SessionHarness {
            inbound: response_tx,
            outbound: request_rx,
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// When each open happened, in call order
    pub fn open_instants(&self) -> Vec<Instant> {
        self.open_instants.lock().clone()
    }

    /// Metadata attached to each open, in call order
    pub fn metadata_seen(&self) -> Vec<ShardMetadata> {
        self.metadata.lock().clone()
    }
}

#[async_trait]
impl AdminClient for ScriptedAdminClient {
    async fn stream_workflow_replication_messages(
        &self,
        metadata: ShardMetadata,
    ) -> Result<ReplicationRawStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.open_instants.lock().push(Instant::now());
        self.metadata.lock().push(metadata);

        self.sessions
            .lock()
            .pop_front()
            .ok_or_else(|| ReplicationError::Transport("no scripted session left".to_string()))
    }
}
