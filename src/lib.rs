//! # openPMD persistence core
//!
//! Backend-agnostic persistence for hierarchical scientific simulation
//! output, following the openPMD standard's object model: a [`Series`]
//! owns [`Iteration`]s keyed by index, each of which owns containers of
//! [`Mesh`]es and [`ParticleSpecies`], which own records down to
//! attribute-bearing components.
//!
//! All storage access is deferred. Mutations collect in memory, and
//! [`Series::flush`] turns them into an explicit queue of I/O tasks
//! dispatched to a pluggable [`Backend`]. Opening an existing series
//! replays the stored hierarchy back into memory.
//!
//! ## Quick Start
//!
//! ```ignore
//! use openpmd::prelude::*;
//!
//! let mut series = Series::create(
//!     Box::new(MemoryBackend::new()),
//!     "sim_%T.h5",
//!     IterationEncoding::FileBased,
//! );
//!
//! let (it, _) = series.iterations.get_or_create(100);
//! it.set_time(0.5f64);
//!
//! let (rho, _) = it.meshes_mut().get_or_create("rho".to_string());
//! let component = rho.scalar()?;
//! component.reset_dataset(Dataset::new(Datatype::Double, vec![64, 64]))?;
//! component.make_constant(0.0f64)?;
//!
//! series.flush()?;
//! ```
//!
//! ## Layers
//!
//! - [`openpmd_core`] - primitive vocabulary: datatypes, attribute
//!   values, dataset descriptors, unit dimensionality
//! - [`openpmd_backend`] - the task queue, its dispatch handler, the
//!   [`Backend`] trait and the in-memory reference backend
//! - this crate - the object model and the flush/read protocol

#![warn(missing_docs)]
#![warn(clippy::all)]

mod attributable;
mod container;
mod context;
mod error;
mod iteration;
mod mesh;
mod particle;
mod patches;
mod record;
mod record_component;
mod series;
mod writable;

pub mod prelude;

// Member crates, re-exported whole for the less common items.
pub use openpmd_backend;
pub use openpmd_core;

pub use attributable::{Attributable, Attribute, Attributed};
pub use container::{Container, ContainerKey};
pub use error::{Error, Result};
pub use iteration::Iteration;
pub use mesh::{DataOrder, Geometry, Mesh};
pub use particle::ParticleSpecies;
pub use patches::{ParticlePatches, PatchRecord};
pub use record::Record;
pub use record_component::{RecordComponent, SCALAR};
pub use series::{IterationEncoding, Series, SeriesBuilder};
pub use writable::Writable;

pub use openpmd_backend::{
    Backend, BackendError, IOHandler, IOTask, MemoryBackend, NodeId, Operation, QueueMetrics,
    TaskOutput,
};
pub use openpmd_core::{Dataset, Datatype, Extent, FloatWidth, Floating, UnitDimension, Value};
