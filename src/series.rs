//! Series: the root object of an openPMD hierarchy.
//!
//! A series owns the task queue, the root attributes and the container
//! of iterations. Nothing reaches the backend until [`Series::flush`];
//! opening an existing series replays the stored hierarchy back into
//! memory with every attribute clean, so an open followed by a flush
//! writes nothing.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info, warn};

use openpmd_backend::{Backend, BackendError, IOHandler, IOTask, Operation, QueueMetrics};
use openpmd_core::strings::replace_first;
use openpmd_core::{Datatype, Value};

use crate::attributable::{Attributable, Attributed};
use crate::container::Container;
use crate::context::{FlushContext, ReadContext, ReadScope, SeriesScope};
use crate::error::{Error, Result};
use crate::iteration::Iteration;
use crate::writable::NodeAllocator;

/// Group layout iterations are stored under; `%T` stands for the index.
pub(crate) const BASE_PATH: &str = "/data/%T/";

/// Group name meshes live under when none is configured.
pub(crate) const DEFAULT_MESHES_PATH: &str = "meshes/";

/// Group name particle species live under when none is configured.
pub(crate) const DEFAULT_PARTICLES_PATH: &str = "particles/";

/// Version of the openPMD standard written into new series.
const OPENPMD_STANDARD: &str = "1.0.1";

// ============================================================================
// Iteration encoding
// ============================================================================

/// How iterations map onto files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationEncoding {
    /// One file per iteration, named by substituting `%T` in the
    /// series' filename pattern.
    FileBased,
    /// One file holding every iteration as a group under the base path.
    GroupBased,
}

impl Default for IterationEncoding {
    fn default() -> Self {
        IterationEncoding::GroupBased
    }
}

impl fmt::Display for IterationEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IterationEncoding::FileBased => "fileBased",
            IterationEncoding::GroupBased => "groupBased",
        })
    }
}

impl FromStr for IterationEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fileBased" => Ok(IterationEncoding::FileBased),
            "groupBased" => Ok(IterationEncoding::GroupBased),
            other => Err(Error::WrongType {
                expected: "fileBased or groupBased".to_string(),
                actual: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Fluent construction of a [`Series`].
///
/// `backend` and `name` are required; the encoding defaults to
/// group-based. The optional metadata setters mirror the ones on
/// [`Series`] itself.
#[derive(Default)]
pub struct SeriesBuilder {
    backend: Option<Box<dyn Backend>>,
    name: Option<String>,
    encoding: IterationEncoding,
    author: Option<String>,
    software: Option<String>,
    software_version: Option<String>,
}

impl SeriesBuilder {
    /// Backend the series talks to.
    pub fn backend(mut self, backend: Box<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// File name, or filename pattern for file-based series.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// How iterations map onto files.
    pub fn iteration_encoding(mut self, encoding: IterationEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Author recorded in the series metadata.
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Software recorded in the series metadata.
    pub fn software(mut self, software: impl Into<String>) -> Self {
        self.software = Some(software.into());
        self
    }

    /// Software version recorded in the series metadata.
    pub fn software_version(mut self, version: impl Into<String>) -> Self {
        self.software_version = Some(version.into());
        self
    }

    fn into_parts(self) -> Result<(Box<dyn Backend>, String, IterationEncoding, Metadata)> {
        let backend = self
            .backend
            .ok_or_else(|| Error::Logic("series builder needs a backend".to_string()))?;
        let name = self
            .name
            .ok_or_else(|| Error::Logic("series builder needs a file name".to_string()))?;
        let metadata = Metadata {
            author: self.author,
            software: self.software,
            software_version: self.software_version,
        };
        Ok((backend, name, self.encoding, metadata))
    }

    /// Start a new series.
    pub fn create(self) -> Result<Series> {
        let (backend, name, encoding, metadata) = self.into_parts()?;
        let mut series = Series::create(backend, name, encoding);
        metadata.apply(&mut series);
        Ok(series)
    }

    /// Open an existing series and read its structure.
    pub fn open(self) -> Result<Series> {
        let (backend, name, encoding, metadata) = self.into_parts()?;
        let mut series = Series::open(backend, name, encoding)?;
        metadata.apply(&mut series);
        Ok(series)
    }
}

struct Metadata {
    author: Option<String>,
    software: Option<String>,
    software_version: Option<String>,
}

impl Metadata {
    fn apply(self, series: &mut Series) {
        if let Some(author) = self.author {
            series.set_author(author);
        }
        if let Some(software) = self.software {
            series.set_software(software);
        }
        if let Some(version) = self.software_version {
            series.set_software_version(version);
        }
    }
}

// ============================================================================
// Series
// ============================================================================

/// Root of an openPMD hierarchy, bound to one backend.
#[derive(Debug)]
pub struct Series {
    handler: IOHandler,
    root: Attributable,
    /// The iterations of the series, keyed by iteration index.
    pub iterations: Container<Iteration, u64>,
    encoding: IterationEncoding,
    name: String,
}

impl Series {
    /// Fluent construction; see [`SeriesBuilder`].
    pub fn builder() -> SeriesBuilder {
        SeriesBuilder::default()
    }

    /// Start a new series writing through `backend`.
    ///
    /// Nothing reaches the backend until the first [`Series::flush`].
    pub fn create(
        backend: Box<dyn Backend>,
        name: impl Into<String>,
        encoding: IterationEncoding,
    ) -> Series {
        let mut series = Series::prepare(backend, name.into(), encoding);
        series.init_defaults();
        info!(name = %series.name, encoding = %series.encoding, "creating series");
        series
    }

    /// Open an existing series and read its structure into memory.
    ///
    /// Every attribute comes back clean, so flushing an unmodified opened
    /// series writes nothing. Mutations made afterwards flush as appends.
    pub fn open(
        backend: Box<dyn Backend>,
        name: impl Into<String>,
        encoding: IterationEncoding,
    ) -> Result<Series> {
        let mut series = Series::prepare(backend, name.into(), encoding);
        info!(name = %series.name, encoding = %series.encoding, "opening series");
        series.read()?;
        Ok(series)
    }

    fn prepare(backend: Box<dyn Backend>, name: String, encoding: IterationEncoding) -> Series {
        let alloc = NodeAllocator::new();
        let root = Attributable::new(&alloc);
        let mut iterations = Container::new(&alloc);
        iterations.attach(root.writable().id());
        Series {
            handler: IOHandler::new(backend),
            root,
            iterations,
            encoding,
            name,
        }
    }

    fn init_defaults(&mut self) {
        if self.encoding == IterationEncoding::FileBased {
            let placeholders = self.name.matches("%T").count();
            if placeholders != 1 {
                warn!(
                    pattern = %self.name,
                    placeholders,
                    "fileBased filename patterns conventionally contain exactly one %T"
                );
            }
        }
        self.root
            .set("openPMD".to_string(), Value::String(OPENPMD_STANDARD.to_string()));
        self.root
            .set("openPMDextension".to_string(), Value::Uint32(0));
        self.root
            .set("basePath".to_string(), Value::String(BASE_PATH.to_string()));
        self.root.set(
            "iterationEncoding".to_string(),
            Value::String(self.encoding.to_string()),
        );
        let format = match self.encoding {
            IterationEncoding::FileBased => self.name.clone(),
            IterationEncoding::GroupBased => BASE_PATH.to_string(),
        };
        self.root
            .set("iterationFormat".to_string(), Value::String(format));
    }

    // ------------------------------------------------------------------
    // Metadata accessors
    // ------------------------------------------------------------------

    /// File name, or filename pattern for file-based series.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How iterations map onto files.
    pub fn iteration_encoding(&self) -> IterationEncoding {
        self.encoding
    }

    /// Version of the openPMD standard this series declares.
    pub fn openpmd_version(&self) -> Option<&str> {
        self.root.get("openPMD").and_then(Value::as_str)
    }

    /// Declared openPMD extension mask.
    pub fn openpmd_extension(&self) -> Option<u32> {
        self.root.get("openPMDextension").and_then(Value::as_uint32)
    }

    /// Group layout iterations are stored under.
    pub fn base_path(&self) -> &str {
        self.root
            .get("basePath")
            .and_then(Value::as_str)
            .unwrap_or(BASE_PATH)
    }

    /// Expression from which per-iteration storage names derive.
    pub fn iteration_format(&self) -> Option<&str> {
        self.root.get("iterationFormat").and_then(Value::as_str)
    }

    /// Group name meshes live under, with trailing `/`.
    pub fn meshes_path(&self) -> String {
        match self.root.get("meshesPath").and_then(Value::as_str) {
            Some(path) => path.to_string(),
            None => DEFAULT_MESHES_PATH.to_string(),
        }
    }

    /// Fix the group name meshes live under.
    ///
    /// A trailing `/` is appended when missing. The path can be set once;
    /// after it is stored (explicitly or by a flush that defaulted it),
    /// changing it would orphan data already laid out under the old name.
    pub fn set_meshes_path(&mut self, path: impl Into<String>) -> Result<()> {
        if self.root.contains("meshesPath") {
            return Err(Error::Logic(
                "meshesPath is already fixed for this series".to_string(),
            ));
        }
        self.root
            .set("meshesPath".to_string(), Value::String(normalize_path(path.into())));
        Ok(())
    }

    /// Group name particle species live under, with trailing `/`.
    pub fn particles_path(&self) -> String {
        match self.root.get("particlesPath").and_then(Value::as_str) {
            Some(path) => path.to_string(),
            None => DEFAULT_PARTICLES_PATH.to_string(),
        }
    }

    /// Fix the group name particle species live under.
    ///
    /// Same single-set rule as [`Series::set_meshes_path`].
    pub fn set_particles_path(&mut self, path: impl Into<String>) -> Result<()> {
        if self.root.contains("particlesPath") {
            return Err(Error::Logic(
                "particlesPath is already fixed for this series".to_string(),
            ));
        }
        self.root.set(
            "particlesPath".to_string(),
            Value::String(normalize_path(path.into())),
        );
        Ok(())
    }

    /// Author recorded in the series metadata.
    pub fn author(&self) -> Option<&str> {
        self.root.get("author").and_then(Value::as_str)
    }

    /// Record the author in the series metadata.
    pub fn set_author(&mut self, author: impl Into<String>) {
        self.root
            .set("author".to_string(), Value::String(author.into()));
    }

    /// Software recorded in the series metadata.
    pub fn software(&self) -> Option<&str> {
        self.root.get("software").and_then(Value::as_str)
    }

    /// Record the producing software in the series metadata.
    pub fn set_software(&mut self, software: impl Into<String>) {
        self.root
            .set("software".to_string(), Value::String(software.into()));
    }

    /// Software version recorded in the series metadata.
    pub fn software_version(&self) -> Option<&str> {
        self.root.get("softwareVersion").and_then(Value::as_str)
    }

    /// Record the producing software's version in the series metadata.
    pub fn set_software_version(&mut self, version: impl Into<String>) {
        self.root
            .set("softwareVersion".to_string(), Value::String(version.into()));
    }

    /// Snapshot of the task queue's activity counters.
    pub fn metrics(&self) -> QueueMetrics {
        self.handler.metrics()
    }

    // ------------------------------------------------------------------
    // Flush
    // ------------------------------------------------------------------

    /// Dispatch every pending change to the backend.
    pub fn flush(&mut self) -> Result<()> {
        debug!(
            encoding = %self.encoding,
            iterations = self.iterations.len(),
            "flushing series"
        );
        match self.encoding {
            IterationEncoding::FileBased => self.flush_file_based(),
            IterationEncoding::GroupBased => self.flush_group_based(),
        }
    }

    fn flush_group_based(&mut self) -> Result<()> {
        if !self.root.writable().written() {
            let name = replace_first(&self.name, "%T", "");
            self.handler
                .dispatch(self.root.writable().task(Operation::CreateFile { name }))?;
            self.root.writable_mut().set_written(true);
        }
        let iterations_id = self.iterations.attributable().writable().id();
        let mut cx = FlushContext::new(
            &mut self.handler,
            SeriesScope {
                filename: &self.name,
                root: &mut self.root,
                iterations_id,
            },
        );
        let base = replace_first(BASE_PATH, "%T/", "");
        self.iterations.flush(&base, &mut cx)?;
        cx.flush_series_attributes()
    }

    fn flush_file_based(&mut self) -> Result<()> {
        if self.iterations.is_empty() {
            return Err(Error::Logic(
                "a fileBased series cannot be flushed before an iteration exists".to_string(),
            ));
        }
        let iterations_id = self.iterations.attributable().writable().id();
        for (index, iteration) in self.iterations.iter_mut() {
            let label = index.to_string();
            let mut cx = FlushContext::new(
                &mut self.handler,
                SeriesScope {
                    filename: &self.name,
                    root: &mut self.root,
                    iterations_id,
                },
            );
            let mark = cx.enter(&label);
            let result = iteration.flush_file_based(&label, &mut cx);
            cx.exit(mark);
            result?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    fn read(&mut self) -> Result<()> {
        match self.encoding {
            IterationEncoding::FileBased => self.read_file_based(),
            IterationEncoding::GroupBased => self.read_group_based(),
        }
    }

    fn read_group_based(&mut self) -> Result<()> {
        let name = replace_first(&self.name, "%T", "");
        self.handler
            .dispatch(self.root.writable().task(Operation::OpenFile { name }))?;
        self.read_base()?;
        self.root.read_attributes(&mut self.handler)?;
        self.read_iterations_here()
    }

    fn read_file_based(&mut self) -> Result<()> {
        let Some(split) = pattern_split(&self.name) else {
            return Err(Error::Logic(format!(
                "a fileBased series needs a filename pattern containing %T, got `{}`",
                self.name
            )));
        };
        let files: Vec<String> = self
            .handler
            .list_files()?
            .into_iter()
            .filter(|file| split.matches(file))
            .collect();
        if files.is_empty() {
            return Err(Error::Backend(BackendError::NoSuchFile(self.name.clone())));
        }
        debug!(files = files.len(), pattern = %self.name, "discovered series files");
        for file in files {
            self.handler
                .dispatch(self.root.writable().task(Operation::OpenFile { name: file }))?;
            self.read_base()?;
            self.root.read_attributes(&mut self.handler)?;
            self.read_iterations_here()?;
        }
        Ok(())
    }

    /// Validate the required root attributes of the file currently bound
    /// to the root node. Values are checked, not stored; the blanket
    /// attribute read that follows repopulates them.
    fn read_base(&mut self) -> Result<()> {
        let listed;
        let version;
        let extension;
        let base;
        let encoding;
        let format;
        let meshes;
        let particles;
        {
            let mut cx = ReadContext::new(&mut self.handler, ReadScope { root: &self.root });
            let root = self.root.writable();
            listed = cx.list_attributes(root)?;
            version = cx.read_attribute(root, "openPMD")?;
            extension = cx.read_attribute(root, "openPMDextension")?;
            base = cx.read_attribute(root, "basePath")?;
            encoding = cx.read_attribute(root, "iterationEncoding")?;
            format = cx.read_attribute(root, "iterationFormat")?;
            meshes = if listed.iter().any(|a| a == "meshesPath") {
                Some(cx.read_attribute(root, "meshesPath")?)
            } else {
                None
            };
            particles = if listed.iter().any(|a| a == "particlesPath") {
                Some(cx.read_attribute(root, "particlesPath")?)
            } else {
                None
            };
        }

        expect_string("openPMD", version)?;
        let (dtype, value) = extension;
        if value.as_uint32().is_none() {
            return Err(root_violation(format!(
                "attribute `openPMDextension` has type {dtype}, expected Uint32"
            )));
        }
        let base = expect_string("basePath", base)?;
        if base != BASE_PATH {
            return Err(root_violation(format!(
                "unexpected basePath `{base}`, this implementation fixes it at `{BASE_PATH}`"
            )));
        }
        let stored = expect_string("iterationEncoding", encoding)?;
        let stored_encoding: IterationEncoding = stored
            .parse()
            .map_err(|_| root_violation(format!("unknown iterationEncoding `{stored}`")))?;
        if stored_encoding != self.encoding {
            return Err(root_violation(format!(
                "series is {stored_encoding} encoded but was opened as {}",
                self.encoding
            )));
        }
        expect_string("iterationFormat", format)?;
        if let Some(meshes) = meshes {
            expect_string("meshesPath", meshes)?;
        }
        if let Some(particles) = particles {
            expect_string("particlesPath", particles)?;
        }
        Ok(())
    }

    /// Open the base-path group in the file currently bound to the root
    /// node and read every iteration group under it.
    fn read_iterations_here(&mut self) -> Result<()> {
        let root_id = self.root.writable().id();
        let iterations_id = self.iterations.attributable().writable().id();
        let base = replace_first(BASE_PATH, "%T/", "");
        self.handler.dispatch(IOTask::new(
            iterations_id,
            Some(root_id),
            Operation::OpenPath { path: base },
        ))?;
        let mut cx = ReadContext::new(&mut self.handler, ReadScope { root: &self.root });
        self.iterations.read(&mut cx)
    }
}

impl Attributed for Series {
    fn attributable(&self) -> &Attributable {
        &self.root
    }

    fn attributable_mut(&mut self) -> &mut Attributable {
        &mut self.root
    }
}

fn normalize_path(mut path: String) -> String {
    if !path.ends_with('/') {
        path.push('/');
    }
    path
}

fn root_violation(reason: String) -> Error {
    Error::FormatViolation {
        path: "/".to_string(),
        reason,
    }
}

fn expect_string(attribute: &str, (dtype, value): (Datatype, Value)) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(root_violation(format!(
            "attribute `{attribute}` has type {dtype}, expected String"
        ))),
    }
}

/// Prefix and suffix around the first `%T` of a fileBased pattern.
struct PatternSplit<'a> {
    prefix: &'a str,
    suffix: &'a str,
}

impl PatternSplit<'_> {
    /// Whether `file` is the prefix, a non-empty decimal index, and the
    /// suffix.
    fn matches(&self, file: &str) -> bool {
        if file.len() < self.prefix.len() + self.suffix.len() {
            return false;
        }
        if !file.starts_with(self.prefix) || !file.ends_with(self.suffix) {
            return false;
        }
        let middle = &file[self.prefix.len()..file.len() - self.suffix.len()];
        !middle.is_empty() && middle.bytes().all(|b| b.is_ascii_digit())
    }
}

fn pattern_split(pattern: &str) -> Option<PatternSplit<'_>> {
    let at = pattern.find("%T")?;
    Some(PatternSplit {
        prefix: &pattern[..at],
        suffix: &pattern[at + 2..],
    })
}
