//! SI unit dimensionality.

use serde::{Deserialize, Serialize};

/// One axis of the seven-dimensional SI unit system.
///
/// A record's physical dimensionality is a power per axis, persisted as a
/// seven-element double array in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitDimension {
    /// Length (metre).
    L,
    /// Mass (kilogram).
    M,
    /// Time (second).
    T,
    /// Electric current (ampere).
    I,
    /// Thermodynamic temperature (kelvin).
    Theta,
    /// Amount of substance (mole).
    N,
    /// Luminous intensity (candela).
    J,
}

impl UnitDimension {
    /// Position of this axis within the persisted seven-element array.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            UnitDimension::L => 0,
            UnitDimension::M => 1,
            UnitDimension::T => 2,
            UnitDimension::I => 3,
            UnitDimension::Theta => 4,
            UnitDimension::N => 5,
            UnitDimension::J => 6,
        }
    }
}

/// Materialize a sparse powers-per-axis map into the persisted array form.
///
/// Axes not named get power zero.
pub fn unit_dimension_array<I>(powers: I) -> [f64; 7]
where
    I: IntoIterator<Item = (UnitDimension, f64)>,
{
    let mut array = [0.0; 7];
    for (axis, power) in powers {
        array[axis.index()] = power;
    }
    array
}
