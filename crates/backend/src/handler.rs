//! Task queue and dispatch.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::backend::{Backend, FilePosition};
use crate::error::{BackendError, Result};
use crate::task::{IOTask, NodeId, Operation, TaskOutput};

/// Counters over queue activity.
///
/// Per-operation counters are recorded at **enqueue** time, so a caller
/// can assert what a round of flushing put on the queue; in particular,
/// that reflushing an unmodified object enqueued no further attribute
/// writes. `executed` advances only on successful dispatch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueMetrics {
    /// Tasks enqueued over the handler's lifetime.
    pub enqueued: u64,
    /// Tasks executed successfully.
    pub executed: u64,
    /// Flush rounds started.
    pub flush_rounds: u64,
    /// `CreateFile` tasks enqueued.
    pub files_created: u64,
    /// `OpenFile` tasks enqueued.
    pub files_opened: u64,
    /// `CreatePath` tasks enqueued.
    pub paths_created: u64,
    /// `OpenPath` tasks enqueued.
    pub paths_opened: u64,
    /// `WriteAttribute` tasks enqueued.
    pub attributes_written: u64,
    /// `ReadAttribute` tasks enqueued.
    pub attributes_read: u64,
    /// Listing tasks enqueued (attributes, paths and datasets combined).
    pub listings: u64,
    /// `OpenDataset` tasks enqueued.
    pub datasets_opened: u64,
}

/// Dispatches queued [`IOTask`]s against a [`Backend`].
///
/// Enqueueing never touches the backend. [`IOHandler::flush`] drains the
/// queue in FIFO order, resolving node handles to backend positions
/// through its registry: file operations bind the task node's position,
/// path and dataset opens resolve the parent's and bind the node's, and
/// everything else resolves the node's. The first failing task aborts
/// the flush; tasks not yet dispatched are dropped so the next round
/// starts from an empty queue, and already-applied effects remain.
pub struct IOHandler {
    backend: Box<dyn Backend>,
    queue: VecDeque<IOTask>,
    positions: FxHashMap<NodeId, FilePosition>,
    metrics: QueueMetrics,
}

impl IOHandler {
    /// Wrap a backend.
    pub fn new(backend: Box<dyn Backend>) -> Self {
        debug!(backend = backend.name(), "i/o handler ready");
        IOHandler {
            backend,
            queue: VecDeque::new(),
            positions: FxHashMap::default(),
            metrics: QueueMetrics::default(),
        }
    }

    /// Append a task to the queue. No I/O happens here.
    pub fn enqueue(&mut self, task: IOTask) {
        self.metrics.enqueued += 1;
        match &task.operation {
            Operation::CreateFile { .. } => self.metrics.files_created += 1,
            Operation::OpenFile { .. } => self.metrics.files_opened += 1,
            Operation::CreatePath { .. } => self.metrics.paths_created += 1,
            Operation::OpenPath { .. } => self.metrics.paths_opened += 1,
            Operation::WriteAttribute { .. } => self.metrics.attributes_written += 1,
            Operation::ReadAttribute { .. } => self.metrics.attributes_read += 1,
            Operation::ListAttributes | Operation::ListPaths | Operation::ListDatasets => {
                self.metrics.listings += 1
            }
            Operation::OpenDataset { .. } => self.metrics.datasets_opened += 1,
        }
        self.queue.push_back(task);
    }

    /// Number of tasks waiting for dispatch.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Snapshot of the activity counters.
    pub fn metrics(&self) -> QueueMetrics {
        self.metrics
    }

    /// Position currently bound for a node, if any.
    pub fn position(&self, node: NodeId) -> Option<FilePosition> {
        self.positions.get(&node).copied()
    }

    /// Bind `to` to the position already bound for `from`.
    ///
    /// Scalar records share their component's backend object; this is
    /// the aliasing primitive that models it.
    pub fn adopt_position(&mut self, to: NodeId, from: NodeId) -> Result<()> {
        let pos = self
            .positions
            .get(&from)
            .copied()
            .ok_or(BackendError::UnboundNode(from))?;
        self.positions.insert(to, pos);
        Ok(())
    }

    /// Drain and dispatch the queue in order.
    ///
    /// Returns one [`TaskOutput`] per executed task, index-aligned with
    /// the dispatch order.
    pub fn flush(&mut self) -> Result<Vec<TaskOutput>> {
        self.metrics.flush_rounds += 1;
        let waiting = self.queue.len();
        if waiting > 0 {
            debug!(tasks = waiting, "dispatching queued i/o tasks");
        }
        let mut outputs = Vec::with_capacity(waiting);
        while let Some(task) = self.queue.pop_front() {
            match self.execute(&task) {
                Ok(output) => {
                    self.metrics.executed += 1;
                    outputs.push(output);
                }
                Err(err) => {
                    // Fatal: drop what was never dispatched so the next
                    // round starts clean. No rollback of applied tasks.
                    self.queue.clear();
                    return Err(err);
                }
            }
        }
        Ok(outputs)
    }

    /// Convenience for the dispatch-immediately pattern: enqueue one task
    /// and flush in the same call.
    pub fn dispatch(&mut self, task: IOTask) -> Result<Vec<TaskOutput>> {
        self.enqueue(task);
        self.flush()
    }

    /// All file names known to the wrapped backend.
    pub fn list_files(&self) -> Result<Vec<String>> {
        self.backend.list_files()
    }

    fn execute(&mut self, task: &IOTask) -> Result<TaskOutput> {
        trace!(
            op = task.operation.name(),
            node = task.node.raw(),
            "executing task"
        );
        match &task.operation {
            Operation::CreateFile { name } => {
                let pos = self.backend.create_file(name)?;
                self.positions.insert(task.node, pos);
                Ok(TaskOutput::None)
            }
            Operation::OpenFile { name } => {
                let pos = self.backend.open_file(name)?;
                self.positions.insert(task.node, pos);
                Ok(TaskOutput::None)
            }
            Operation::CreatePath { path } => {
                let at = self.parent_position(task)?;
                let pos = self.backend.create_path(at, path)?;
                self.positions.insert(task.node, pos);
                Ok(TaskOutput::None)
            }
            Operation::OpenPath { path } => {
                let at = self.parent_position(task)?;
                let pos = self.backend.open_path(at, path)?;
                self.positions.insert(task.node, pos);
                Ok(TaskOutput::None)
            }
            Operation::WriteAttribute { name, value } => {
                let at = self.node_position(task)?;
                self.backend.write_attribute(at, name, value)?;
                Ok(TaskOutput::None)
            }
            Operation::ReadAttribute { name } => {
                let at = self.node_position(task)?;
                let (dtype, value) = self.backend.read_attribute(at, name)?;
                Ok(TaskOutput::Attribute { dtype, value })
            }
            Operation::ListAttributes => {
                let at = self.node_position(task)?;
                Ok(TaskOutput::Attributes(self.backend.list_attributes(at)?))
            }
            Operation::ListPaths => {
                let at = self.node_position(task)?;
                Ok(TaskOutput::Paths(self.backend.list_paths(at)?))
            }
            Operation::ListDatasets => {
                let at = self.node_position(task)?;
                Ok(TaskOutput::Datasets(self.backend.list_datasets(at)?))
            }
            Operation::OpenDataset { name } => {
                let at = self.parent_position(task)?;
                let (pos, descriptor) = self.backend.open_dataset(at, name)?;
                self.positions.insert(task.node, pos);
                Ok(TaskOutput::Dataset(descriptor))
            }
        }
    }

    fn node_position(&self, task: &IOTask) -> Result<FilePosition> {
        self.positions
            .get(&task.node)
            .copied()
            .ok_or(BackendError::UnboundNode(task.node))
    }

    fn parent_position(&self, task: &IOTask) -> Result<FilePosition> {
        let parent = task.parent.ok_or(BackendError::MissingParent(task.node))?;
        self.positions
            .get(&parent)
            .copied()
            .ok_or(BackendError::UnboundNode(parent))
    }
}

impl std::fmt::Debug for IOHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IOHandler")
            .field("backend", &self.backend.name())
            .field("queued", &self.queue.len())
            .field("positions", &self.positions.len())
            .field("metrics", &self.metrics)
            .finish()
    }
}
