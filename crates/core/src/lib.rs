//! Core types for the openPMD persistence stack.
//!
//! This crate holds the primitive vocabulary shared by the object model
//! and the backend layer: attribute [`Datatype`]s and [`Value`]s, dataset
//! descriptors, SI unit dimensionality, and the substring substitution
//! helpers the naming scheme is built on. It has no I/O of its own.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dataset;
pub mod datatype;
pub mod strings;
pub mod unit;
pub mod value;

pub use dataset::{Dataset, Extent};
pub use datatype::{Datatype, FloatWidth};
pub use unit::{unit_dimension_array, UnitDimension};
pub use value::{Floating, Value};
