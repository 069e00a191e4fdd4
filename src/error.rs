//! Unified error types for the series object model.
//!
//! Every variant is fatal to the flush or read call that raised it: the
//! protocol has no local recovery and never rolls back tasks that already
//! executed. Callers decide whether to drop the series or keep using the
//! parts untouched by the failure.

use thiserror::Error;

pub use openpmd_backend::BackendError;

/// All object-model errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A backend operation failed.
    #[error("backend operation failed: {0}")]
    Backend(#[from] BackendError),

    /// Structurally present data violates the format contract.
    ///
    /// The reason names the offending attribute or group; `path` is the
    /// node it was found at.
    #[error("format violation at {path}: {reason}")]
    FormatViolation {
        /// Node path the violation was detected at.
        path: String,
        /// What exactly is wrong.
        reason: String,
    },

    /// A required attribute is absent.
    #[error("missing required attribute `{attribute}` at {path}")]
    MissingAttribute {
        /// Name of the absent attribute.
        attribute: String,
        /// Node path that was read.
        path: String,
    },

    /// Operation illegal in the object's current lifecycle state.
    #[error("invalid operation: {0}")]
    Logic(String),

    /// A typed accessor asked for a kind the stored value does not have.
    #[error("wrong type: expected {expected}, got {actual}")]
    WrongType {
        /// Kind the caller asked for.
        expected: String,
        /// Kind actually stored.
        actual: String,
    },

    /// Invariant breakage inside the library (a bug, not user error).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for object-model operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a format violation.
    pub fn is_format_violation(&self) -> bool {
        matches!(self, Error::FormatViolation { .. })
    }

    /// Check if this is a missing-attribute error.
    pub fn is_missing_attribute(&self) -> bool {
        matches!(self, Error::MissingAttribute { .. })
    }

    /// Check if this is a lifecycle misuse error.
    pub fn is_logic(&self) -> bool {
        matches!(self, Error::Logic(_))
    }

    /// Check if this is a serious/unrecoverable error.
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::Internal(_) | Error::Backend(_))
    }
}
