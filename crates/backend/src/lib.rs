//! Deferred I/O for the openPMD persistence stack.
//!
//! This crate carries everything below the object model: the closed
//! [`Operation`] vocabulary, the [`IOHandler`] that queues and dispatches
//! [`IOTask`]s, the [`Backend`] trait concrete storage plugs into, and
//! the in-memory reference backend.
//!
//! The contract in one breath: building and enqueueing tasks is free of
//! I/O; `flush()` dispatches strictly in FIFO order; a failing task is
//! fatal to its flush round and nothing is rolled back.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod handler;
pub mod memory;
pub mod task;

pub use backend::{Backend, FilePosition};
pub use error::{BackendError, Result};
pub use handler::{IOHandler, QueueMetrics};
pub use memory::MemoryBackend;
pub use task::{IOTask, NodeId, Operation, TaskOutput};
