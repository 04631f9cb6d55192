//! # Error Types
//!
//! This module defines the error type shared by every part of the chord chart core.
//!
//! Editing failures carry enough context (which node, which constraint) for the
//! caller to build a user-facing message. A failed edit never leaves the tree
//! partially modified, so every error here is safe to surface and retry.
//!
//! ## Error Classes
//! - `CapacityExceeded` - a Line already holds `LINE_MAX_MEASURES` measures
//! - `NotFound` - a referenced node, chart, key or chord type does not exist
//! - `InvalidPitch` / `InconsistentOffset` / `InvalidBeatSchema` / `InvalidBeats` /
//!   `InvalidTimeSignature` / `MissingBassPitch` - caller-supplied values rejected at the boundary
//! - `InvalidHierarchy` - a node appended under the wrong kind of parent
//! - `InternalConsistencyFault` - a catalog lookup that cannot fail did fail
//! - `Config` - a catalog or chart document could not be loaded
//! - `Io` - a catalog or chart file could not be read
//!
//! ## Usage
//! ```rust
//! use chordchart::ChartError;
//!
//! let err = ChartError::CapacityExceeded { line: 7, max: 8 };
//! assert_eq!(err.to_string(), "Line 7 already holds the maximum of 8 measures");
//! assert!(!err.is_internal_fault());
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    /// A Line is already at `LINE_MAX_MEASURES`.
    #[error("Line {line} already holds the maximum of {max} measures")]
    CapacityExceeded { line: u32, max: usize },

    /// A referenced entity is absent.
    ///
    /// `kind` names what was looked up ("section", "chord type", "key", ...),
    /// `id` is the identifier the caller supplied.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// A pitch class outside [0, 11].
    #[error("Invalid pitch {value}: pitch classes range from 0 to 11")]
    InvalidPitch { value: i32 },

    /// A section key offset outside (-11, 11].
    #[error("Invalid key distance {value}: must be greater than -11 and at most 11")]
    InconsistentOffset { value: i32 },

    #[error("Invalid beat schema '{schema}': {reason}")]
    InvalidBeatSchema { schema: String, reason: String },

    #[error("Invalid chord duration {value}: a chord lasts at least one beat")]
    InvalidBeats { value: u8 },

    #[error("Invalid time signature {value}: a section has between 1 and 12 beats per measure")]
    InvalidTimeSignature { value: u8 },

    /// Alternative bass switched on without a bass pitch to show.
    #[error("Chord {chord} needs an alternative bass pitch before its bass can be shown")]
    MissingBassPitch { chord: u32 },

    /// A child appended below a parent of the wrong level.
    #[error("A {child} cannot be placed under a {parent}")]
    InvalidHierarchy {
        parent: &'static str,
        child: &'static str,
    },

    /// Catalog lookup failure that should be structurally impossible.
    ///
    /// This is a bug-report condition, never a recoverable user error.
    #[error("Internal consistency fault: {0}")]
    InternalConsistencyFault(String),

    /// Malformed catalog or chart document.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Reading a catalog or chart file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChartError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        ChartError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Build an internal consistency fault and log it.
    ///
    /// Every fault goes through here so none is ever returned unlogged.
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        log::error!("internal consistency fault: {}", message);
        ChartError::InternalConsistencyFault(message)
    }

    /// True for the "this cannot happen" class of failures.
    pub fn is_internal_fault(&self) -> bool {
        matches!(self, ChartError::InternalConsistencyFault(_))
    }
}

impl From<serde_yaml::Error> for ChartError {
    fn from(e: serde_yaml::Error) -> Self {
        ChartError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for ChartError {
    fn from(e: serde_json::Error) -> Self {
        ChartError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = ChartError::not_found("section", 12);
        assert_eq!(err.to_string(), "section '12' not found");
    }

    #[test]
    fn test_internal_fault_is_flagged() {
        assert!(ChartError::internal("missing key note").is_internal_fault());
        assert!(!ChartError::InvalidPitch { value: 12 }.is_internal_fault());
    }

    #[test]
    fn test_io_error_converts() {
        let err: ChartError = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file").into();
        assert!(matches!(err, ChartError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: no such file");
    }
}
