//! Attribute datatypes understood by the format layer.
//!
//! Backends report one of these kinds for every stored attribute and
//! dataset. The set is closed and the object model never coerces between
//! kinds: a mismatch is surfaced to the caller, not papered over.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of an attribute or dataset value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Datatype {
    /// Boolean flag.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit unsigned integer.
    Uint32,
    /// 64-bit unsigned integer.
    Uint64,
    /// IEEE 754 single-precision float.
    Float,
    /// IEEE 754 double-precision float.
    Double,
    /// UTF-8 string.
    String,
    /// Vector of 64-bit unsigned integers (extents, shapes).
    VecUint64,
    /// Vector of single-precision floats.
    VecFloat,
    /// Vector of double-precision floats.
    VecDouble,
    /// Vector of UTF-8 strings (axis labels).
    VecString,
    /// Fixed seven-element double array (SI unit dimensionality).
    ArrDouble7,
}

impl Datatype {
    /// Stable spelling used in diagnostics and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Datatype::Bool => "Bool",
            Datatype::Int32 => "Int32",
            Datatype::Int64 => "Int64",
            Datatype::Uint32 => "Uint32",
            Datatype::Uint64 => "Uint64",
            Datatype::Float => "Float",
            Datatype::Double => "Double",
            Datatype::String => "String",
            Datatype::VecUint64 => "VecUint64",
            Datatype::VecFloat => "VecFloat",
            Datatype::VecDouble => "VecDouble",
            Datatype::VecString => "VecString",
            Datatype::ArrDouble7 => "ArrDouble7",
        }
    }

    /// Classify this kind for time-like attributes (`time`, `dt`,
    /// `timeOffset`).
    ///
    /// Those attributes accept either floating width and nothing else.
    /// The result is a closed union, so call sites must spell out what
    /// happens for every unsupported kind instead of falling through a
    /// catch-all.
    #[inline]
    pub fn float_width(self) -> FloatWidth {
        match self {
            Datatype::Float => FloatWidth::Single,
            Datatype::Double => FloatWidth::Double,
            other => FloatWidth::Unsupported(other),
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Floating-point width reported for a time-like attribute.
///
/// There is no coercion between widths: a value stored single-precision
/// stays `f32`, a double-precision one stays `f64`, and every other kind
/// lands in `Unsupported` carrying the offending [`Datatype`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    /// Single precision (`f32`).
    Single,
    /// Double precision (`f64`).
    Double,
    /// The reported kind is not a floating-point scalar.
    Unsupported(Datatype),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_width_classification() {
        assert_eq!(Datatype::Float.float_width(), FloatWidth::Single);
        assert_eq!(Datatype::Double.float_width(), FloatWidth::Double);
        assert_eq!(
            Datatype::Int32.float_width(),
            FloatWidth::Unsupported(Datatype::Int32)
        );
        assert_eq!(
            Datatype::VecDouble.float_width(),
            FloatWidth::Unsupported(Datatype::VecDouble)
        );
    }

    #[test]
    fn test_display_matches_name() {
        assert_eq!(Datatype::Uint64.to_string(), "Uint64");
        assert_eq!(Datatype::ArrDouble7.to_string(), "ArrDouble7");
    }
}
