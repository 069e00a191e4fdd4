//! Convenient imports for working with a series.
//!
//! Re-exports the common working set so one import suffices:
//!
//! ```ignore
//! use openpmd::prelude::*;
//!
//! let mut series = Series::create(
//!     Box::new(MemoryBackend::new()),
//!     "run.h5",
//!     IterationEncoding::GroupBased,
//! );
//! series.iterations.get_or_create(0);
//! series.flush()?;
//! ```

// Root object
pub use crate::series::{IterationEncoding, Series, SeriesBuilder};

// Error handling
pub use crate::error::{Error, Result};

// The hierarchy
pub use crate::attributable::Attributed;
pub use crate::container::Container;
pub use crate::iteration::Iteration;
pub use crate::mesh::{DataOrder, Geometry, Mesh};
pub use crate::particle::ParticleSpecies;
pub use crate::patches::{ParticlePatches, PatchRecord};
pub use crate::record::Record;
pub use crate::record_component::{RecordComponent, SCALAR};

// Primitive vocabulary
pub use openpmd_core::{Dataset, Datatype, Extent, FloatWidth, Floating, UnitDimension, Value};

// Backend plumbing
pub use openpmd_backend::{Backend, IOHandler, MemoryBackend, QueueMetrics};
