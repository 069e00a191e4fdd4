//! In-memory reference backend.
//!
//! Stores files as trees of groups carrying attributes, sub-groups and
//! dataset entries, all in insertion order, so listing order is creation
//! order. State lives behind `Arc<RwLock<...>>` and clones share it: a
//! test typically hands one clone to the series and keeps another for
//! seeding and inspection.

use std::sync::Arc;

use linked_hash_map::LinkedHashMap;
use parking_lot::RwLock;

use openpmd_core::{Dataset, Datatype, Value};

use crate::backend::{Backend, FilePosition};
use crate::error::{BackendError, Result};

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Default)]
struct Group {
    attributes: LinkedHashMap<String, Value>,
    groups: LinkedHashMap<String, Group>,
    datasets: LinkedHashMap<String, DatasetEntry>,
}

impl Group {
    fn child(&self, segments: &[String]) -> Option<&Group> {
        let mut cur = self;
        for seg in segments {
            cur = cur.groups.get(seg)?;
        }
        Some(cur)
    }

    fn child_mut(&mut self, segments: &[String]) -> Option<&mut Group> {
        let mut cur = self;
        for seg in segments {
            cur = cur.groups.get_mut(seg)?;
        }
        Some(cur)
    }
}

#[derive(Debug)]
struct DatasetEntry {
    descriptor: Dataset,
    attributes: LinkedHashMap<String, Value>,
}

/// Where a minted [`FilePosition`] points.
#[derive(Debug, Clone)]
enum Location {
    Group {
        file: String,
        segments: Vec<String>,
    },
    Dataset {
        file: String,
        segments: Vec<String>,
        name: String,
    },
}

impl Location {
    fn display(&self) -> String {
        match self {
            Location::Group { file, segments } => display_path(file, segments),
            Location::Dataset {
                file,
                segments,
                name,
            } => format!("{}/{}", display_path(file, segments), name),
        }
    }
}

fn display_path(file: &str, segments: &[String]) -> String {
    format!("{}:/{}", file, segments.join("/"))
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Default)]
struct MemoryState {
    files: LinkedHashMap<String, Group>,
    locations: Vec<Location>,
}

impl MemoryState {
    fn mint(&mut self, location: Location) -> FilePosition {
        self.locations.push(location);
        FilePosition::from_raw((self.locations.len() - 1) as u64)
    }

    fn location(&self, at: FilePosition) -> Result<&Location> {
        self.locations
            .get(at.raw() as usize)
            .ok_or(BackendError::InvalidHandle)
    }

    /// File name and group segments of a group position.
    fn group_location(&self, at: FilePosition) -> Result<(String, Vec<String>)> {
        let loc = self.location(at)?;
        match loc {
            Location::Group { file, segments } => Ok((file.clone(), segments.clone())),
            Location::Dataset { .. } => Err(BackendError::NoSuchPath(loc.display())),
        }
    }

    fn group(&self, file: &str, segments: &[String]) -> Result<&Group> {
        self.files
            .get(file)
            .and_then(|root| root.child(segments))
            .ok_or_else(|| BackendError::NoSuchPath(display_path(file, segments)))
    }

    fn group_mut(&mut self, file: &str, segments: &[String]) -> Result<&mut Group> {
        self.files
            .get_mut(file)
            .and_then(|root| root.child_mut(segments))
            .ok_or_else(|| BackendError::NoSuchPath(display_path(file, segments)))
    }

    fn attributes(&self, at: FilePosition) -> Result<&LinkedHashMap<String, Value>> {
        let loc = self.location(at)?.clone();
        match loc {
            Location::Group { file, segments } => Ok(&self.group(&file, &segments)?.attributes),
            Location::Dataset {
                file,
                segments,
                name,
            } => {
                let group = self.group(&file, &segments)?;
                group
                    .datasets
                    .get(&name)
                    .map(|entry| &entry.attributes)
                    .ok_or(BackendError::NoSuchDataset(name))
            }
        }
    }

    fn attributes_mut(&mut self, at: FilePosition) -> Result<&mut LinkedHashMap<String, Value>> {
        let loc = self.location(at)?.clone();
        match loc {
            Location::Group { file, segments } => {
                Ok(&mut self.group_mut(&file, &segments)?.attributes)
            }
            Location::Dataset {
                file,
                segments,
                name,
            } => {
                let group = self.group_mut(&file, &segments)?;
                group
                    .datasets
                    .get_mut(&name)
                    .map(|entry| &mut entry.attributes)
                    .ok_or(BackendError::NoSuchDataset(name))
            }
        }
    }
}

// ============================================================================
// Backend
// ============================================================================

/// The in-memory reference [`Backend`].
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryBackend {
    /// Fresh backend with no files.
    pub fn new() -> Self {
        MemoryBackend::default()
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn create_file(&mut self, name: &str) -> Result<FilePosition> {
        let mut state = self.state.write();
        state.files.insert(name.to_string(), Group::default());
        Ok(state.mint(Location::Group {
            file: name.to_string(),
            segments: Vec::new(),
        }))
    }

    fn open_file(&mut self, name: &str) -> Result<FilePosition> {
        let mut state = self.state.write();
        if !state.files.contains_key(name) {
            return Err(BackendError::NoSuchFile(name.to_string()));
        }
        Ok(state.mint(Location::Group {
            file: name.to_string(),
            segments: Vec::new(),
        }))
    }

    fn create_path(&mut self, at: FilePosition, path: &str) -> Result<FilePosition> {
        let mut state = self.state.write();
        let (file, base) = state.group_location(at)?;
        let mut segments = if path.starts_with('/') { Vec::new() } else { base };
        let mut created_any = false;
        {
            let mut cur = state.group_mut(&file, &segments)?;
            for seg in split_segments(path) {
                if !cur.groups.contains_key(&seg) {
                    created_any = true;
                }
                cur = cur.groups.entry(seg.clone()).or_insert_with(Group::default);
                segments.push(seg);
            }
        }
        if !created_any {
            return Err(BackendError::PathExists(display_path(&file, &segments)));
        }
        Ok(state.mint(Location::Group { file, segments }))
    }

    fn open_path(&mut self, at: FilePosition, path: &str) -> Result<FilePosition> {
        let mut state = self.state.write();
        let (file, base) = state.group_location(at)?;
        let mut segments = if path.starts_with('/') { Vec::new() } else { base };
        segments.extend(split_segments(path));
        state.group(&file, &segments)?;
        Ok(state.mint(Location::Group { file, segments }))
    }

    fn write_attribute(&mut self, at: FilePosition, name: &str, value: &Value) -> Result<()> {
        let mut state = self.state.write();
        state
            .attributes_mut(at)?
            .insert(name.to_string(), value.clone());
        Ok(())
    }

    fn read_attribute(&mut self, at: FilePosition, name: &str) -> Result<(Datatype, Value)> {
        let state = self.state.read();
        let value = state
            .attributes(at)?
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::NoSuchAttribute(name.to_string()))?;
        Ok((value.datatype(), value))
    }

    fn list_attributes(&mut self, at: FilePosition) -> Result<Vec<String>> {
        let state = self.state.read();
        Ok(state.attributes(at)?.keys().cloned().collect())
    }

    fn list_paths(&mut self, at: FilePosition) -> Result<Vec<String>> {
        let state = self.state.read();
        let loc = state.location(at)?.clone();
        match loc {
            Location::Group { file, segments } => {
                Ok(state.group(&file, &segments)?.groups.keys().cloned().collect())
            }
            // A dataset has no children.
            Location::Dataset { .. } => Ok(Vec::new()),
        }
    }

    fn list_datasets(&mut self, at: FilePosition) -> Result<Vec<String>> {
        let state = self.state.read();
        let loc = state.location(at)?.clone();
        match loc {
            Location::Group { file, segments } => Ok(state
                .group(&file, &segments)?
                .datasets
                .keys()
                .cloned()
                .collect()),
            Location::Dataset { .. } => Ok(Vec::new()),
        }
    }

    fn open_dataset(&mut self, at: FilePosition, name: &str) -> Result<(FilePosition, Dataset)> {
        let mut state = self.state.write();
        let (file, segments) = state.group_location(at)?;
        let descriptor = state
            .group(&file, &segments)?
            .datasets
            .get(name)
            .map(|entry| entry.descriptor.clone())
            .ok_or_else(|| BackendError::NoSuchDataset(name.to_string()))?;
        let pos = state.mint(Location::Dataset {
            file,
            segments,
            name: name.to_string(),
        });
        Ok((pos, descriptor))
    }

    fn list_files(&self) -> Result<Vec<String>> {
        Ok(self.state.read().files.keys().cloned().collect())
    }
}

// ============================================================================
// Inspection and seeding (tests, tooling)
// ============================================================================

impl MemoryBackend {
    /// File names in creation order.
    pub fn files(&self) -> Vec<String> {
        self.state.read().files.keys().cloned().collect()
    }

    /// Whether a file of this name exists.
    pub fn has_file(&self, name: &str) -> bool {
        self.state.read().files.contains_key(name)
    }

    /// Whether `path` (slash-separated, `""` for the root) names a group
    /// in `file`.
    pub fn has_group(&self, file: &str, path: &str) -> bool {
        let state = self.state.read();
        state.group(file, &split_segments(path)).is_ok()
    }

    /// Attribute value at a group, if present.
    pub fn attribute(&self, file: &str, path: &str, name: &str) -> Option<Value> {
        let state = self.state.read();
        state
            .group(file, &split_segments(path))
            .ok()?
            .attributes
            .get(name)
            .cloned()
    }

    /// Attribute names at a group, in write order.
    pub fn attribute_names(&self, file: &str, path: &str) -> Option<Vec<String>> {
        let state = self.state.read();
        Some(
            state
                .group(file, &split_segments(path))
                .ok()?
                .attributes
                .keys()
                .cloned()
                .collect(),
        )
    }

    /// Sub-group names at a group, in creation order.
    pub fn group_names(&self, file: &str, path: &str) -> Option<Vec<String>> {
        let state = self.state.read();
        Some(
            state
                .group(file, &split_segments(path))
                .ok()?
                .groups
                .keys()
                .cloned()
                .collect(),
        )
    }

    /// Dataset names at a group, in creation order.
    pub fn dataset_names(&self, file: &str, path: &str) -> Option<Vec<String>> {
        let state = self.state.read();
        Some(
            state
                .group(file, &split_segments(path))
                .ok()?
                .datasets
                .keys()
                .cloned()
                .collect(),
        )
    }

    /// Descriptor of a dataset, if present.
    pub fn dataset(&self, file: &str, path: &str, name: &str) -> Option<Dataset> {
        let state = self.state.read();
        state
            .group(file, &split_segments(path))
            .ok()?
            .datasets
            .get(name)
            .map(|entry| entry.descriptor.clone())
    }

    /// Attribute stored on a dataset, if present.
    pub fn dataset_attribute(
        &self,
        file: &str,
        path: &str,
        dataset: &str,
        name: &str,
    ) -> Option<Value> {
        let state = self.state.read();
        state
            .group(file, &split_segments(path))
            .ok()?
            .datasets
            .get(dataset)?
            .attributes
            .get(name)
            .cloned()
    }

    /// Seed a dataset entry into an existing group.
    ///
    /// The task vocabulary has no dataset-create operation; read-path
    /// tests use this to lay out data as a foreign writer would have.
    pub fn insert_dataset(
        &self,
        file: &str,
        path: &str,
        name: &str,
        descriptor: Dataset,
    ) -> Result<()> {
        let mut state = self.state.write();
        let group = state.group_mut(file, &split_segments(path))?;
        group.datasets.insert(
            name.to_string(),
            DatasetEntry {
                descriptor,
                attributes: LinkedHashMap::new(),
            },
        );
        Ok(())
    }
}
