//! Attribute values.
//!
//! This module defines the canonical [`Value`] type carried by every
//! attribute in the hierarchy and by every `WriteAttribute` /
//! `ReadAttribute` task. One variant exists per [`Datatype`]; there are
//! no implicit conversions between variants.
//!
//! ## Equality Rules
//!
//! - Different kinds are never equal (no type coercion)
//! - `Float(1.0)` != `Double(1.0)`
//! - Floats use IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`

use serde::{Deserialize, Serialize};

use crate::datatype::Datatype;

/// A single attribute value.
///
/// This is the only value model crossing the backend boundary. Backends
/// store and report values of exactly these kinds; the object model never
/// widens, narrows, or reinterprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean flag.
    Bool(bool),

    /// 32-bit signed integer.
    Int32(i32),

    /// 64-bit signed integer.
    Int64(i64),

    /// 32-bit unsigned integer.
    Uint32(u32),

    /// 64-bit unsigned integer.
    Uint64(u64),

    /// Single-precision float.
    /// Supports: NaN, +Inf, -Inf, -0.0, subnormals.
    Float(f32),

    /// Double-precision float.
    /// Supports: NaN, +Inf, -Inf, -0.0, subnormals.
    Double(f64),

    /// UTF-8 encoded string.
    String(String),

    /// Vector of 64-bit unsigned integers (extents, shapes).
    VecUint64(Vec<u64>),

    /// Vector of single-precision floats.
    VecFloat(Vec<f32>),

    /// Vector of double-precision floats.
    VecDouble(Vec<f64>),

    /// Vector of UTF-8 strings (axis labels).
    VecString(Vec<String>),

    /// Seven-element double array (SI unit dimensionality).
    ArrDouble7([f64; 7]),
}

impl Value {
    /// The [`Datatype`] this value carries.
    #[inline]
    pub fn datatype(&self) -> Datatype {
        match self {
            Value::Bool(_) => Datatype::Bool,
            Value::Int32(_) => Datatype::Int32,
            Value::Int64(_) => Datatype::Int64,
            Value::Uint32(_) => Datatype::Uint32,
            Value::Uint64(_) => Datatype::Uint64,
            Value::Float(_) => Datatype::Float,
            Value::Double(_) => Datatype::Double,
            Value::String(_) => Datatype::String,
            Value::VecUint64(_) => Datatype::VecUint64,
            Value::VecFloat(_) => Datatype::VecFloat,
            Value::VecDouble(_) => Datatype::VecDouble,
            Value::VecString(_) => Datatype::VecString,
            Value::ArrDouble7(_) => Datatype::ArrDouble7,
        }
    }

    /// Returns the type name as a string (for error messages).
    pub fn type_name(&self) -> &'static str {
        self.datatype().name()
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i32.
    pub fn as_int32(&self) -> Option<i32> {
        match self {
            Value::Int32(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Value::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as u32.
    pub fn as_uint32(&self) -> Option<u32> {
        match self {
            Value::Uint32(u) => Some(*u),
            _ => None,
        }
    }

    /// Try to get as u64.
    pub fn as_uint64(&self) -> Option<u64> {
        match self {
            Value::Uint64(u) => Some(*u),
            _ => None,
        }
    }

    /// Try to get as f32.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Try to get as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as a u64 slice.
    pub fn as_vec_uint64(&self) -> Option<&[u64]> {
        match self {
            Value::VecUint64(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as an f64 slice.
    pub fn as_vec_double(&self) -> Option<&[f64]> {
        match self {
            Value::VecDouble(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as a string slice vector.
    pub fn as_vec_string(&self) -> Option<&[String]> {
        match self {
            Value::VecString(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as a seven-element double array.
    pub fn as_arr_double7(&self) -> Option<&[f64; 7]> {
        match self {
            Value::ArrDouble7(a) => Some(a),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions from the natural Rust types
// ============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u64>> for Value {
    fn from(v: Vec<u64>) -> Self {
        Value::VecUint64(v)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Value::VecFloat(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::VecDouble(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::VecString(v)
    }
}

impl From<[f64; 7]> for Value {
    fn from(v: [f64; 7]) -> Self {
        Value::ArrDouble7(v)
    }
}

// ============================================================================
// Floating: the closed set of widths for time-like attributes
// ============================================================================

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Floating-point scalar accepted by time-like setters.
///
/// Implemented for `f32` and `f64` only, and sealed, so `time`, `dt` and
/// `timeOffset` accept either width at compile time and nothing else.
pub trait Floating: sealed::Sealed + Copy {
    /// Static label used in mismatch diagnostics.
    const LABEL: &'static str;

    /// Wrap into the matching [`Value`] variant.
    fn into_value(self) -> Value;

    /// Unwrap from the matching [`Value`] variant, without coercion.
    fn from_value(value: &Value) -> Option<Self>;
}

impl Floating for f32 {
    const LABEL: &'static str = "Float";

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }
}

impl Floating for f64 {
    const LABEL: &'static str = "Double";

    fn into_value(self) -> Value {
        Value::Double(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_double()
    }
}
