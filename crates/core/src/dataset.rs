//! Dataset descriptors.
//!
//! A record component that holds array data is described by a [`Dataset`]:
//! the element [`Datatype`] plus the n-dimensional [`Extent`]. This layer
//! carries descriptors only; array payload transfer is a backend concern
//! outside the task vocabulary.

use serde::{Deserialize, Serialize};

use crate::datatype::Datatype;

/// Global size of a dataset, one entry per dimension.
///
/// An empty extent describes a zero-dimensional (single-element) dataset.
pub type Extent = Vec<u64>;

/// Shape and element type of a record component's data.
///
/// Once a component carrying this descriptor has been attached to backend
/// storage the descriptor is immutable; the object model enforces that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Element datatype.
    pub dtype: Datatype,
    /// Global extent, slowest-varying dimension first.
    pub extent: Extent,
}

impl Dataset {
    /// Describe a dataset of `dtype` elements with the given extent.
    pub fn new(dtype: Datatype, extent: Extent) -> Self {
        Dataset { dtype, extent }
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.extent.len()
    }

    /// Total number of elements across all dimensions.
    pub fn size(&self) -> u64 {
        self.extent.iter().product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_and_size() {
        let d = Dataset::new(Datatype::Double, vec![4, 8, 2]);
        assert_eq!(d.rank(), 3);
        assert_eq!(d.size(), 64);
    }

    #[test]
    fn test_zero_dimensional() {
        let d = Dataset::new(Datatype::Float, vec![]);
        assert_eq!(d.rank(), 0);
        assert_eq!(d.size(), 1);
    }
}
