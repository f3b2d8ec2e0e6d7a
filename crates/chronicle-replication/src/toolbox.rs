//! Capability bundle handed to stream receivers

use crate::client::ClientBean;
use crate::config::ReplicationConfig;
use crate::task::{ExecutableTaskConverter, TaskScheduler};
use std::sync::Arc;

/// Everything a stream receiver needs, injected by composition.
///
/// Logging and metrics go through the `tracing` and `metrics` facades and
/// are not carried here.
#[derive(Clone)]
pub struct ProcessToolBox {
    pub config: Arc<ReplicationConfig>,
    pub client_bean: Arc<dyn ClientBean>,
    pub task_scheduler: Arc<dyn TaskScheduler>,
    pub task_converter: Arc<dyn ExecutableTaskConverter>,
}
