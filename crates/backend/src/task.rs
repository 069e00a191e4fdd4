//! The I/O task vocabulary.
//!
//! Every interaction with storage is described by an [`IOTask`]: a target
//! node, an optional parent node, and one [`Operation`]. Tasks are inert
//! data; building or enqueueing one performs no I/O. The
//! [`IOHandler`](crate::IOHandler) dispatches queued tasks in FIFO order
//! at flush time.
//!
//! The vocabulary is closed at ten operations. There is deliberately no
//! dataset-create or payload-write operation: array transfer is out of
//! scope for this layer and datasets only ever enter through
//! [`Operation::OpenDataset`] on read.

use serde::{Deserialize, Serialize};

use openpmd_core::{Dataset, Datatype, Value};

/// Opaque identity of an object-model node.
///
/// Nodes are addressed by handle, not by reference: tasks carry `NodeId`s
/// and the handler maps them to backend positions. Ids are allocated once
/// per node and never reused within a series.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw id. Allocation policy lives with the object model.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        NodeId(raw)
    }

    /// The raw id.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// One storage operation.
///
/// Position handling is two-regime: file operations bind the task node's
/// position from nothing; `CreatePath`, `OpenPath` and `OpenDataset`
/// resolve the task's **parent** position and bind the node's; all others
/// resolve the task **node's** position and bind nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Create a file (replacing any existing one of the same name).
    CreateFile {
        /// File name, extension included.
        name: String,
    },
    /// Open an existing file.
    OpenFile {
        /// File name, extension included.
        name: String,
    },
    /// Create a group. A leading `/` anchors at the file root instead of
    /// the resolved parent position.
    CreatePath {
        /// Group path, possibly several segments.
        path: String,
    },
    /// Open an existing group. Anchoring as for `CreatePath`.
    OpenPath {
        /// Group path, possibly several segments.
        path: String,
    },
    /// Write one attribute at the node's position.
    WriteAttribute {
        /// Attribute name.
        name: String,
        /// Attribute value; the backend stores exactly this kind.
        value: Value,
    },
    /// Read one attribute at the node's position.
    ReadAttribute {
        /// Attribute name.
        name: String,
    },
    /// List attribute names at the node's position.
    ListAttributes,
    /// List sub-group names at the node's position.
    ListPaths,
    /// List dataset names at the node's position.
    ListDatasets,
    /// Open a dataset by name under the parent's position and bind the
    /// node's position to it.
    OpenDataset {
        /// Dataset name.
        name: String,
    },
}

impl Operation {
    /// Wire-vocabulary spelling, for logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateFile { .. } => "CREATE_FILE",
            Operation::OpenFile { .. } => "OPEN_FILE",
            Operation::CreatePath { .. } => "CREATE_PATH",
            Operation::OpenPath { .. } => "OPEN_PATH",
            Operation::WriteAttribute { .. } => "WRITE_ATT",
            Operation::ReadAttribute { .. } => "READ_ATT",
            Operation::ListAttributes => "LIST_ATTS",
            Operation::ListPaths => "LIST_PATHS",
            Operation::ListDatasets => "LIST_DATASETS",
            Operation::OpenDataset { .. } => "OPEN_DATASET",
        }
    }
}

/// An addressed operation awaiting dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IOTask {
    /// Node the operation acts on or binds.
    pub node: NodeId,
    /// Parent node, resolved by the path-creating operations.
    pub parent: Option<NodeId>,
    /// The operation itself.
    pub operation: Operation,
}

impl IOTask {
    /// Address `operation` at `node`, resolving through `parent` where
    /// the operation calls for it.
    pub fn new(node: NodeId, parent: Option<NodeId>, operation: Operation) -> Self {
        IOTask {
            node,
            parent,
            operation,
        }
    }
}

/// Result of one executed task.
///
/// A flush yields one output per dispatched task, index-aligned with the
/// dispatch order.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    /// Creates, opens and writes yield nothing.
    None,
    /// `ReadAttribute`: the reported datatype and value.
    Attribute {
        /// Kind the backend reports for the stored attribute.
        dtype: Datatype,
        /// The stored value.
        value: Value,
    },
    /// `ListAttributes`: names in backend listing order.
    Attributes(Vec<String>),
    /// `ListPaths`: names in backend listing order.
    Paths(Vec<String>),
    /// `ListDatasets`: names in backend listing order.
    Datasets(Vec<String>),
    /// `OpenDataset`: the opened dataset's descriptor.
    Dataset(Dataset),
}
