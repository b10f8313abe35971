//! Error types for tetsnap.
//!
//! This module defines all error types used throughout the library.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur while acquiring, stepping or exporting a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh generator could not load, classify or mesh the input surface.
    #[error("mesh acquisition failed: {message}")]
    AcquisitionFailure {
        /// Error message.
        message: String,
    },

    /// The acquired mesh contains no tetrahedra.
    #[error("mesh has no tetrahedral elements")]
    NoVolumeElements,

    /// Node tags are not the contiguous sequence 1..=N.
    #[error("node at position {position} has tag {tag}, expected {}", .position + 1)]
    TagInvariantViolation {
        /// Position of the node in the tag array.
        position: usize,
        /// The tag found at that position.
        tag: usize,
    },

    /// A tetrahedron references a node tag outside 1..=N.
    #[error("tetrahedron {element} references invalid node tag {tag}")]
    InvalidNodeTag {
        /// The element index.
        element: usize,
        /// The invalid tag.
        tag: usize,
    },

    /// A flat array does not split into whole tuples.
    #[error("{name} has length {len}, which is not a multiple of {multiple}")]
    MalformedArray {
        /// Name of the array.
        name: &'static str,
        /// Actual length.
        len: usize,
        /// Required tuple size.
        multiple: usize,
    },

    /// Parallel arrays disagree on the number of nodes.
    #[error("{name} describes {got} nodes, expected {expected}")]
    LengthMismatch {
        /// Name of the offending array.
        name: &'static str,
        /// Expected node count.
        expected: usize,
        /// Node count implied by the array.
        got: usize,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading a file.
    #[error("failed to load {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Invalid configuration file.
    #[error("invalid configuration {path}: {message}")]
    Config {
        /// The configuration file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create an acquisition failure.
    pub fn acquisition<S: Into<String>>(message: S) -> Self {
        MeshError::AcquisitionFailure {
            message: message.into(),
        }
    }

    /// Process exit status for a run terminated by this error.
    ///
    /// | Error | Status |
    /// |-------|--------|
    /// | acquisition failure, unreadable input mesh | 1 |
    /// | no tetrahedra | 2 |
    /// | malformed node/element data | 3 |
    /// | anything else (snapshot I/O, configuration) | 4 |
    pub fn exit_code(&self) -> i32 {
        match self {
            MeshError::AcquisitionFailure { .. } | MeshError::LoadError { .. } => 1,
            MeshError::NoVolumeElements => 2,
            MeshError::TagInvariantViolation { .. }
            | MeshError::InvalidNodeTag { .. }
            | MeshError::MalformedArray { .. }
            | MeshError::LengthMismatch { .. } => 3,
            _ => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_for_fatal_acquisition_errors() {
        let acquisition = MeshError::acquisition("bad stl").exit_code();
        let empty = MeshError::NoVolumeElements.exit_code();
        let tags = MeshError::TagInvariantViolation { position: 0, tag: 2 }.exit_code();
        let io = MeshError::Io(std::io::Error::other("disk full")).exit_code();

        assert_eq!(acquisition, 1);
        assert_eq!(empty, 2);
        assert_eq!(tags, 3);
        assert_eq!(io, 4);
    }

    #[test]
    fn test_tag_violation_message_names_expected_tag() {
        let err = MeshError::TagInvariantViolation { position: 4, tag: 9 };
        assert_eq!(err.to_string(), "node at position 4 has tag 9, expected 5");
    }
}
