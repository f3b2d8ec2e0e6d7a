//! In-flight task tracking and low-watermark derivation

use crate::task::{ExecutableTask, TaskState};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::SystemTime;

/// A point in the source stream: message id plus source-side event time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkInfo {
    pub watermark: i64,
    pub timestamp: SystemTime,
}

/// Ordered set of in-flight inbound tasks.
///
/// Derives the low watermark reported back to the source. The source may
/// forget everything at or below that id, so the watermark must never
/// overshoot a task that has not been executed locally; pruning only from
/// the front keeps a single forward cursor.
pub struct ExecutableTaskTracker {
    inner: Mutex<TrackerInner>,
}

struct TrackerInner {
    tasks: VecDeque<Arc<dyn ExecutableTask>>,
    /// Highest high-watermark ever handed to `track_tasks`; reported once
    /// no tracked task is left pending.
    high_watermark: Option<WatermarkInfo>,
    cancelled: bool,
}

impl ExecutableTaskTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                tasks: VecDeque::new(),
                high_watermark: None,
                cancelled: false,
            }),
        }
    }

    /// Append `tasks` in input order and raise the remembered high
    /// watermark. Task ids must arrive in ascending order, beyond every id
    /// tracked so far. No-op after `cancel`.
    pub fn track_tasks(&self, high_watermark: WatermarkInfo, tasks: Vec<Arc<dyn ExecutableTask>>) {
        let mut inner = self.inner.lock();
        if inner.cancelled {
            return;
        }

        debug_assert!(
            {
                let mut last_id = inner.tasks.back().map(|task| task.task_id());
                tasks.iter().all(|task| {
                    let ascending = last_id.map_or(true, |id| task.task_id() > id);
                    last_id = Some(task.task_id());
                    ascending
                })
            },
            "task ids must be tracked in ascending order"
        );

        inner.tasks.extend(tasks);
        match inner.high_watermark {
            Some(current) if current.watermark >= high_watermark.watermark => {}
            _ => inner.high_watermark = Some(high_watermark),
        }
    }

    /// Prune executed tasks from the front, then derive the current low
    /// watermark: one below the first still-pending task, or the remembered
    /// high watermark once nothing is pending. `None` until anything has
    /// been tracked, and forever after `cancel`.
    pub fn low_watermark(&self) -> Option<WatermarkInfo> {
        let mut inner = self.inner.lock();
        if inner.cancelled {
            return None;
        }

        while let Some(front) = inner.tasks.front() {
            if front.state() != TaskState::Acked {
                break;
            }
            inner.tasks.pop_front();
        }

        match inner.tasks.front() {
            Some(first) => Some(WatermarkInfo {
                watermark: first.task_id() - 1,
                timestamp: first.source_time(),
            }),
            None => inner.high_watermark,
        }
    }

    /// Number of still-tracked tasks
    pub fn len(&self) -> usize {
        self.inner.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel every tracked task and refuse all further tracking. Terminal
    /// and idempotent.
    pub fn cancel(&self) {
        // Two-phase: drain under the lock, cancel outside it, so task
        // cancellation callbacks can never re-enter the tracker mid-update.
        let drained: Vec<Arc<dyn ExecutableTask>> = {
            let mut inner = self.inner.lock();
            if inner.cancelled {
                return;
            }
            inner.cancelled = true;
            inner.tasks.drain(..).collect()
        };

        for task in drained {
            task.cancel();
        }
    }
}

impl Default for ExecutableTaskTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{time_at_millis, ManualTask};

    fn watermark(id: i64, at_millis: u64) -> WatermarkInfo {
        WatermarkInfo {
            watermark: id,
            timestamp: time_at_millis(at_millis),
        }
    }

    fn as_dyn(tasks: &[Arc<ManualTask>]) -> Vec<Arc<dyn ExecutableTask>> {
        tasks
            .iter()
            .map(|task| {
                let task: Arc<dyn ExecutableTask> = task.clone();
                task
            })
            .collect()
    }

    #[test]
    fn test_empty_tracker_has_no_watermark() {
        let tracker = ExecutableTaskTracker::new();
        assert_eq!(tracker.low_watermark(), None);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_low_watermark_stops_before_first_pending() {
        let tracker = ExecutableTaskTracker::new();
        let tasks = [
            ManualTask::new(5, time_at_millis(40)),
            ManualTask::new(6, time_at_millis(60)),
            ManualTask::new(7, time_at_millis(70)),
        ];
        tracker.track_tasks(watermark(7, 100), as_dyn(&tasks));

        // Nothing executed yet: one below the first pending task.
        assert_eq!(tracker.low_watermark(), Some(watermark(4, 40)));

        tasks[0].ack();
        tasks[1].ack();
        assert_eq!(
            tracker.low_watermark(),
            Some(WatermarkInfo {
                watermark: 6,
                timestamp: time_at_millis(70),
            })
        );
        // Acked prefix is pruned for good.
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_low_watermark_falls_back_to_high_watermark() {
        let tracker = ExecutableTaskTracker::new();
        let tasks = [
            ManualTask::new(5, time_at_millis(40)),
            ManualTask::new(6, time_at_millis(60)),
            ManualTask::new(7, time_at_millis(70)),
        ];
        tracker.track_tasks(watermark(7, 100), as_dyn(&tasks));

        for task in &tasks {
            task.ack();
        }

        assert_eq!(tracker.low_watermark(), Some(watermark(7, 100)));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_high_watermark_never_regresses() {
        let tracker = ExecutableTaskTracker::new();
        tracker.track_tasks(watermark(10, 100), vec![]);
        tracker.track_tasks(watermark(8, 200), vec![]);

        assert_eq!(tracker.low_watermark(), Some(watermark(10, 100)));
    }

    #[test]
    fn test_low_watermark_is_monotonic() {
        let tracker = ExecutableTaskTracker::new();
        let first = [
            ManualTask::new(3, time_at_millis(10)),
            ManualTask::new(4, time_at_millis(20)),
        ];
        tracker.track_tasks(watermark(4, 25), as_dyn(&first));

        let mut seen = Vec::new();
        seen.push(tracker.low_watermark().unwrap().watermark);

        first[0].ack();
        seen.push(tracker.low_watermark().unwrap().watermark);

        first[1].ack();
        seen.push(tracker.low_watermark().unwrap().watermark);

        let second = [ManualTask::new(9, time_at_millis(90))];
        tracker.track_tasks(watermark(9, 95), as_dyn(&second));
        seen.push(tracker.low_watermark().unwrap().watermark);

        second[0].ack();
        seen.push(tracker.low_watermark().unwrap().watermark);

        assert!(
            seen.windows(2).all(|pair| pair[0] <= pair[1]),
            "watermarks regressed: {:?}",
            seen
        );
    }

    #[test]
    fn test_cancel_is_terminal() {
        let tracker = ExecutableTaskTracker::new();
        let tasks = [
            ManualTask::new(1, time_at_millis(10)),
            ManualTask::new(2, time_at_millis(20)),
        ];
        tracker.track_tasks(watermark(2, 20), as_dyn(&tasks));

        tracker.cancel();
        tracker.cancel();

        for task in &tasks {
            assert_eq!(task.state(), TaskState::Cancelled);
        }
        assert_eq!(tracker.low_watermark(), None);

        // Tracking after cancel is silently ignored.
        let late = [ManualTask::new(3, time_at_millis(30))];
        tracker.track_tasks(watermark(3, 30), as_dyn(&late));
        assert_eq!(tracker.low_watermark(), None);
        assert!(tracker.is_empty());
        assert_eq!(late[0].state(), TaskState::Pending);
    }
}
