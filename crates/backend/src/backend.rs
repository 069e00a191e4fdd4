//! The storage service-provider interface.

use openpmd_core::{Dataset, Datatype, Value};

use crate::error::Result;

/// Opaque location handle inside a backend.
///
/// Minted by the create/open operations and passed back to every
/// operation acting on an existing location. A handle is valid for the
/// lifetime of the backend instance that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilePosition(u64);

impl FilePosition {
    /// Wrap a raw slot index. Only backends mint these.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        FilePosition(raw)
    }

    /// The raw slot index.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A concrete storage service.
///
/// One method per vocabulary operation, plus [`Backend::list_files`] for
/// file-based series discovery (the one lookup that cannot be addressed
/// through a position). Implementations are synchronous; the handler
/// serializes all access, so no internal locking discipline is required
/// of them beyond what [`Clone`]-able state sharing needs.
///
/// Group paths may contain several `/`-separated segments. A leading `/`
/// anchors resolution at the root of the file containing `at` instead of
/// at `at` itself.
pub trait Backend {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Create `name`, replacing any existing file of that name, and
    /// return the position of its root group.
    fn create_file(&mut self, name: &str) -> Result<FilePosition>;

    /// Open the existing file `name` and return the position of its root
    /// group.
    fn open_file(&mut self, name: &str) -> Result<FilePosition>;

    /// Create the group `path` resolved against `at`, creating missing
    /// intermediate segments, and return its position. Fails if the full
    /// path already exists.
    fn create_path(&mut self, at: FilePosition, path: &str) -> Result<FilePosition>;

    /// Open the existing group `path` resolved against `at` and return
    /// its position.
    fn open_path(&mut self, at: FilePosition, path: &str) -> Result<FilePosition>;

    /// Store `value` under `name` at `at`, replacing any previous value.
    fn write_attribute(&mut self, at: FilePosition, name: &str, value: &Value) -> Result<()>;

    /// Report the datatype and value stored under `name` at `at`.
    fn read_attribute(&mut self, at: FilePosition, name: &str) -> Result<(Datatype, Value)>;

    /// Attribute names at `at`, in listing order.
    fn list_attributes(&mut self, at: FilePosition) -> Result<Vec<String>>;

    /// Sub-group names at `at`, in listing order.
    fn list_paths(&mut self, at: FilePosition) -> Result<Vec<String>>;

    /// Dataset names at `at`, in listing order.
    fn list_datasets(&mut self, at: FilePosition) -> Result<Vec<String>>;

    /// Open the dataset `name` under `at`; returns its position and
    /// descriptor.
    fn open_dataset(&mut self, at: FilePosition, name: &str) -> Result<(FilePosition, Dataset)>;

    /// All file names known to this backend, in listing order.
    fn list_files(&self) -> Result<Vec<String>>;
}
