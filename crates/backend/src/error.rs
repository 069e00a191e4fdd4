//! Storage-level errors.

use thiserror::Error;

use crate::task::NodeId;

/// Result alias for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Failure raised by a [`Backend`](crate::Backend) implementation or by
/// task dispatch.
///
/// Every variant is fatal to the enclosing flush or read call. This layer
/// never retries, and operations applied before the failure stay applied.
#[derive(Debug, Error)]
pub enum BackendError {
    /// `OpenFile` named a file the backend does not have.
    #[error("no such file: {0}")]
    NoSuchFile(String),

    /// `OpenPath` named a group that does not exist.
    #[error("no such path: {0}")]
    NoSuchPath(String),

    /// `ReadAttribute` named an attribute that does not exist.
    #[error("no such attribute: {0}")]
    NoSuchAttribute(String),

    /// `OpenDataset` named a dataset that does not exist.
    #[error("no such dataset: {0}")]
    NoSuchDataset(String),

    /// `CreatePath` would overwrite an existing group.
    #[error("path already exists: {0}")]
    PathExists(String),

    /// A task acted on a node whose position was never bound.
    #[error("no storage position bound for node {0:?}")]
    UnboundNode(NodeId),

    /// A path-resolving task carried no parent node.
    #[error("task for node {0:?} requires a parent node")]
    MissingParent(NodeId),

    /// A position handle did not resolve to a live location.
    #[error("invalid position handle")]
    InvalidHandle,

    /// Underlying I/O failure from a file-backed implementation.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
