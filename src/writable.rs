//! Node identity and lifecycle state.
//!
//! Every persistent object in the hierarchy owns a [`Writable`]: a
//! handle identifying it in I/O tasks, the handle of its parent, and the
//! `written` flag tracking backend presence. Nodes address each other by
//! handle only; there are no parent pointers to walk.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use openpmd_backend::{IOTask, NodeId, Operation};

use crate::attributable::Attributed;
use crate::context::{FlushContext, ReadContext};
use crate::error::Result;

/// Mints unique [`NodeId`]s for one series.
///
/// Clones share the counter, so containers create children at any depth
/// without routing through the root.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeAllocator {
    next: Arc<AtomicU64>,
}

impl NodeAllocator {
    pub(crate) fn new() -> Self {
        NodeAllocator::default()
    }

    pub(crate) fn allocate(&self) -> NodeId {
        NodeId::from_raw(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Lifecycle state carried by every node in the hierarchy.
///
/// `written` flips false to true at most once per lifecycle phase, when
/// the node's backend object is first created or opened. Reading a
/// subtree resets the flags transiently while it repopulates, then sets
/// them again.
#[derive(Debug)]
pub struct Writable {
    id: NodeId,
    parent: Option<NodeId>,
    written: bool,
}

impl Writable {
    pub(crate) fn new(alloc: &NodeAllocator) -> Self {
        Writable {
            id: alloc.allocate(),
            parent: None,
            written: false,
        }
    }

    /// This node's handle.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The parent's handle, once attached.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether this node has a backend object behind it.
    #[inline]
    pub fn written(&self) -> bool {
        self.written
    }

    pub(crate) fn set_parent(&mut self, parent: NodeId) {
        self.parent = Some(parent);
    }

    pub(crate) fn set_written(&mut self, written: bool) {
        self.written = written;
    }

    /// Build a task addressed at this node, resolving through its parent.
    pub(crate) fn task(&self, operation: Operation) -> IOTask {
        IOTask::new(self.id, self.parent, operation)
    }
}

/// Internal machinery every hierarchy node implements.
///
/// `flush_node` persists the subtree under the given name relative to
/// the already-flushed parent; `read_node` repopulates it, its own
/// backend position having been bound by the caller.
pub(crate) trait Node: Attributed {
    /// Fresh, unattached instance with defaults applied.
    fn fresh(alloc: &NodeAllocator) -> Self
    where
        Self: Sized;

    /// Wire this node under `parent`.
    ///
    /// Internal edges between a node and the sub-objects it owns are
    /// wired in [`Node::fresh`]; this sets the one edge pointing out.
    fn attach(&mut self, parent: NodeId);

    /// Persist this node and its subtree under `name`.
    fn flush_node(&mut self, name: &str, cx: &mut FlushContext<'_>) -> Result<()>;

    /// Repopulate this node and its subtree from storage.
    fn read_node(&mut self, cx: &mut ReadContext<'_>) -> Result<()>;
}
