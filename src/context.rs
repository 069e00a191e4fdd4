//! Flush and read contexts threaded through the hierarchy.
//!
//! Nodes never hold a pointer back to their series. Whatever a subtree
//! needs from the series level during a flush or a read travels down in
//! one of these contexts: the task queue, a narrow view of series state,
//! and the path of the node being worked on for error reporting.

use openpmd_backend::{
    BackendError, IOHandler, IOTask, NodeId, Operation, TaskOutput,
};
use openpmd_core::{Datatype, Dataset, Value};

use crate::attributable::Attributable;
use crate::error::{Error, Result};
use crate::series::{DEFAULT_MESHES_PATH, DEFAULT_PARTICLES_PATH};
use crate::writable::Writable;

// ============================================================================
// Series scopes
// ============================================================================

/// What a flushing subtree may touch at series level.
///
/// Deliberately narrow: the root node for series-level attributes, the
/// filename pattern for per-iteration file naming, and the handle of the
/// iterations group for addressing the base path.
pub(crate) struct SeriesScope<'a> {
    pub(crate) filename: &'a str,
    pub(crate) root: &'a mut Attributable,
    pub(crate) iterations_id: NodeId,
}

/// What a reading subtree may see at series level.
pub(crate) struct ReadScope<'a> {
    pub(crate) root: &'a Attributable,
}

fn series_path(root: &Attributable, attribute: &str, default: &str) -> String {
    match root.get(attribute).and_then(Value::as_str) {
        Some(path) => path.to_string(),
        None => default.to_string(),
    }
}

// ============================================================================
// FlushContext
// ============================================================================

/// State carried through one flush pass.
pub(crate) struct FlushContext<'a> {
    pub(crate) handler: &'a mut IOHandler,
    pub(crate) scope: SeriesScope<'a>,
    path: String,
}

impl<'a> FlushContext<'a> {
    pub(crate) fn new(handler: &'a mut IOHandler, scope: SeriesScope<'a>) -> Self {
        FlushContext {
            handler,
            scope,
            path: String::new(),
        }
    }

    /// Dispatch one task immediately, discarding its output.
    pub(crate) fn run(&mut self, task: IOTask) -> Result<()> {
        self.handler.dispatch(task)?;
        Ok(())
    }

    /// Push a path segment; returns the mark to restore at [`Self::exit`].
    pub(crate) fn enter(&mut self, segment: &str) -> usize {
        let mark = self.path.len();
        self.path.push('/');
        self.path.push_str(segment.trim_end_matches('/'));
        mark
    }

    pub(crate) fn exit(&mut self, mark: usize) {
        self.path.truncate(mark);
    }

    /// Path of the node currently being flushed, for error reporting.
    pub(crate) fn location(&self) -> &str {
        if self.path.is_empty() {
            "/"
        } else {
            &self.path
        }
    }

    /// The filename pattern the series was created with.
    pub(crate) fn series_filename(&self) -> &str {
        self.scope.filename
    }

    /// Handle of the series root node.
    pub(crate) fn series_root_id(&self) -> NodeId {
        self.scope.root.writable().id()
    }

    /// Handle of the iterations group node.
    pub(crate) fn series_iterations_id(&self) -> NodeId {
        self.scope.iterations_id
    }

    /// Mark the series root as having a backend object.
    pub(crate) fn mark_series_written(&mut self) {
        self.scope.root.writable_mut().set_written(true);
    }

    /// Whether a series-level attribute is stored.
    pub(crate) fn series_has_attribute(&self, name: &str) -> bool {
        self.scope.root.contains(name)
    }

    /// Set a series-level attribute if it is not set yet.
    pub(crate) fn ensure_series_default(&mut self, name: &str, value: Value) {
        self.scope.root.set_default(name, value);
    }

    /// Flush one series-level attribute if it is dirty.
    pub(crate) fn flush_series_attribute(&mut self, name: &str) -> Result<()> {
        self.scope.root.flush_attribute(name, self.handler)
    }

    /// Mark every series-level attribute dirty again.
    ///
    /// Called when a file-based flush starts a fresh file that needs the
    /// full set of root attributes written into it.
    pub(crate) fn touch_series_attributes(&mut self) {
        self.scope.root.touch_all();
    }

    /// Flush all dirty series-level attributes.
    pub(crate) fn flush_series_attributes(&mut self) -> Result<()> {
        self.scope.root.flush_attributes(self.handler)
    }

    /// The configured meshes path, or the standard default.
    pub(crate) fn meshes_path(&self) -> String {
        series_path(self.scope.root, "meshesPath", DEFAULT_MESHES_PATH)
    }

    /// The configured particles path, or the standard default.
    pub(crate) fn particles_path(&self) -> String {
        series_path(self.scope.root, "particlesPath", DEFAULT_PARTICLES_PATH)
    }
}

// ============================================================================
// ReadContext
// ============================================================================

/// State carried through one read pass.
pub(crate) struct ReadContext<'a> {
    pub(crate) handler: &'a mut IOHandler,
    pub(crate) scope: ReadScope<'a>,
    path: String,
}

impl<'a> ReadContext<'a> {
    pub(crate) fn new(handler: &'a mut IOHandler, scope: ReadScope<'a>) -> Self {
        ReadContext {
            handler,
            scope,
            path: String::new(),
        }
    }

    /// Push a path segment; returns the mark to restore at [`Self::exit`].
    pub(crate) fn enter(&mut self, segment: &str) -> usize {
        let mark = self.path.len();
        self.path.push('/');
        self.path.push_str(segment.trim_end_matches('/'));
        mark
    }

    pub(crate) fn exit(&mut self, mark: usize) {
        self.path.truncate(mark);
    }

    /// Path of the node currently being read, for error reporting.
    pub(crate) fn location(&self) -> &str {
        if self.path.is_empty() {
            "/"
        } else {
            &self.path
        }
    }

    /// A format violation at the current location.
    pub(crate) fn format_violation(&self, reason: impl Into<String>) -> Error {
        Error::FormatViolation {
            path: self.location().to_string(),
            reason: reason.into(),
        }
    }

    /// The configured meshes path, or the standard default.
    pub(crate) fn meshes_path(&self) -> String {
        series_path(self.scope.root, "meshesPath", DEFAULT_MESHES_PATH)
    }

    /// The configured particles path, or the standard default.
    pub(crate) fn particles_path(&self) -> String {
        series_path(self.scope.root, "particlesPath", DEFAULT_PARTICLES_PATH)
    }

    /// The openPMD standard version the series declares.
    pub(crate) fn standard_version(&self) -> Option<&str> {
        self.scope.root.get("openPMD").and_then(Value::as_str)
    }

    /// Whether a series-level attribute is stored.
    pub(crate) fn series_has_attribute(&self, name: &str) -> bool {
        self.scope.root.contains(name)
    }

    /// Dispatch one task and hand back its single output.
    pub(crate) fn dispatch_one(&mut self, task: IOTask) -> Result<TaskOutput> {
        let mut outputs = self.handler.dispatch(task)?;
        outputs
            .pop()
            .ok_or_else(|| Error::Internal("task produced no output".to_string()))
    }

    /// Bind `writable` to the sub-path `path` under its parent.
    pub(crate) fn open_path(&mut self, writable: &Writable, path: &str) -> Result<()> {
        self.dispatch_one(writable.task(Operation::OpenPath {
            path: path.to_string(),
        }))?;
        Ok(())
    }

    /// Names of the sub-paths at `writable`'s position.
    pub(crate) fn list_paths(&mut self, writable: &Writable) -> Result<Vec<String>> {
        match self.dispatch_one(writable.task(Operation::ListPaths))? {
            TaskOutput::Paths(paths) => Ok(paths),
            other => Err(Error::Internal(format!(
                "unexpected output for LIST_PATHS: {other:?}"
            ))),
        }
    }

    /// Names of the datasets at `writable`'s position.
    pub(crate) fn list_datasets(&mut self, writable: &Writable) -> Result<Vec<String>> {
        match self.dispatch_one(writable.task(Operation::ListDatasets))? {
            TaskOutput::Datasets(datasets) => Ok(datasets),
            other => Err(Error::Internal(format!(
                "unexpected output for LIST_DATASETS: {other:?}"
            ))),
        }
    }

    /// Attribute names at `writable`'s position.
    pub(crate) fn list_attributes(&mut self, writable: &Writable) -> Result<Vec<String>> {
        match self.dispatch_one(writable.task(Operation::ListAttributes))? {
            TaskOutput::Attributes(names) => Ok(names),
            other => Err(Error::Internal(format!(
                "unexpected output for LIST_ATTS: {other:?}"
            ))),
        }
    }

    /// Bind `writable` to `path` under its parent and list the attributes
    /// there, as one batched round.
    pub(crate) fn open_path_listing_attributes(
        &mut self,
        writable: &Writable,
        path: &str,
    ) -> Result<Vec<String>> {
        self.handler.enqueue(writable.task(Operation::OpenPath {
            path: path.to_string(),
        }));
        self.handler.enqueue(writable.task(Operation::ListAttributes));
        let mut outputs = self.handler.flush()?;
        match outputs.pop() {
            Some(TaskOutput::Attributes(names)) => Ok(names),
            other => Err(Error::Internal(format!(
                "unexpected output for LIST_ATTS: {other:?}"
            ))),
        }
    }

    /// Read one attribute, keeping the stored type visible.
    ///
    /// An absent attribute is a [`Error::MissingAttribute`] carrying the
    /// current location; readers call this for attributes the standard
    /// requires.
    pub(crate) fn read_attribute(
        &mut self,
        writable: &Writable,
        name: &str,
    ) -> Result<(Datatype, Value)> {
        let task = writable.task(Operation::ReadAttribute {
            name: name.to_string(),
        });
        let mut outputs = match self.handler.dispatch(task) {
            Ok(outputs) => outputs,
            Err(BackendError::NoSuchAttribute(attribute)) => {
                return Err(Error::MissingAttribute {
                    attribute,
                    path: self.location().to_string(),
                })
            }
            Err(err) => return Err(err.into()),
        };
        match outputs.pop() {
            Some(TaskOutput::Attribute { dtype, value }) => Ok((dtype, value)),
            other => Err(Error::Internal(format!(
                "unexpected output for READ_ATT: {other:?}"
            ))),
        }
    }

    /// Bind `writable` to the dataset `name` under its parent and return
    /// the stored descriptor.
    pub(crate) fn open_dataset(&mut self, writable: &Writable, name: &str) -> Result<Dataset> {
        match self.dispatch_one(writable.task(Operation::OpenDataset {
            name: name.to_string(),
        }))? {
            TaskOutput::Dataset(descriptor) => Ok(descriptor),
            other => Err(Error::Internal(format!(
                "unexpected output for OPEN_DATASET: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writable::NodeAllocator;
    use openpmd_backend::MemoryBackend;

    fn read_context(handler: &mut IOHandler, root: &Attributable) -> String {
        let mut cx = ReadContext::new(
            handler,
            ReadScope {
                root,
            },
        );
        let top = cx.enter("data");
        let inner = cx.enter("7");
        let deep = cx.location().to_string();
        cx.exit(inner);
        cx.exit(top);
        assert_eq!(cx.location(), "/");
        deep
    }

    #[test]
    fn test_path_tracking_nests_and_restores() {
        let alloc = NodeAllocator::new();
        let root = Attributable::new(&alloc);
        let mut handler = IOHandler::new(Box::new(MemoryBackend::new()));
        assert_eq!(read_context(&mut handler, &root), "/data/7");
    }

    #[test]
    fn test_series_paths_fall_back_to_defaults() {
        let alloc = NodeAllocator::new();
        let mut root = Attributable::new(&alloc);
        let mut handler = IOHandler::new(Box::new(MemoryBackend::new()));
        {
            let cx = ReadContext::new(&mut handler, ReadScope { root: &root });
            assert_eq!(cx.meshes_path(), "meshes/");
            assert_eq!(cx.particles_path(), "particles/");
        }
        root.set_clean("meshesPath".into(), Value::String("fields/".into()));
        let cx = ReadContext::new(&mut handler, ReadScope { root: &root });
        assert_eq!(cx.meshes_path(), "fields/");
    }

    #[test]
    fn test_missing_attribute_carries_location() {
        let mut handler = IOHandler::new(Box::new(MemoryBackend::new()));
        let alloc = NodeAllocator::new();
        let root = Attributable::new(&alloc);
        let node = Attributable::new(&alloc);
        handler
            .dispatch(node.writable().task(Operation::CreateFile {
                name: "run.h5".into(),
            }))
            .unwrap();

        let mut cx = ReadContext::new(&mut handler, ReadScope { root: &root });
        cx.enter("7");
        let err = cx.read_attribute(node.writable(), "dt").unwrap_err();
        match err {
            Error::MissingAttribute { attribute, path } => {
                assert_eq!(attribute, "dt");
                assert_eq!(path, "/7");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
