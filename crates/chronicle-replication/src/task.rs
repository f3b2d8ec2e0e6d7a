//! Executable task contracts
//!
//! The receiver converts wire tasks into executable tasks and hands them to
//! an external scheduler. These traits are that seam; the concrete executors
//! live with the history engine, not here.

use crate::protocol::ReplicationTask;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::SystemTime;

/// Execution state of a tracked task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Not yet executed
    Pending,
    /// Executed successfully
    Acked,
    /// Abandoned; will not be executed
    Cancelled,
}

/// A locally executable replication task
pub trait ExecutableTask: Send + Sync {
    /// Monotonic id within the source shard
    fn task_id(&self) -> i64;

    /// Source-side event time of the task
    fn source_time(&self) -> SystemTime;

    fn state(&self) -> TaskState;

    /// Abandon the task. The executor must not run it afterwards.
    fn cancel(&self);
}

/// Local execution scheduler. `submit` may await under backpressure, which
/// propagates to the inbound loop by design of the caller.
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    async fn submit(&self, task: Arc<dyn ExecutableTask>);
}

/// Decodes wire tasks into executable tasks bound to a source cluster
pub trait ExecutableTaskConverter: Send + Sync {
    fn convert_tasks(
        &self,
        source_cluster: &str,
        tasks: Vec<ReplicationTask>,
    ) -> Vec<Arc<dyn ExecutableTask>>;
}

/// Scheduler-side lifecycle monitor
pub trait SchedulerMonitor: Send + Sync {
    fn start(&self);
    fn stop(&self);
    fn record_start(&self, task: &dyn ExecutableTask);
}

/// Metric-free default monitor
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSchedulerMonitor;

impl SchedulerMonitor for NoopSchedulerMonitor {
    fn start(&self) {}

    fn stop(&self) {}

    fn record_start(&self, _task: &dyn ExecutableTask) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualTask;

    #[test]
    fn test_noop_monitor() {
        let monitor = NoopSchedulerMonitor;
        let task = ManualTask::new(1, SystemTime::UNIX_EPOCH);

        monitor.start();
        monitor.record_start(task.as_ref());
        monitor.stop();

        assert_eq!(task.state(), TaskState::Pending);
    }
}
