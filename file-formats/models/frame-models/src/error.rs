use std::io;
use thiserror::Error;

/// Error types for model decoding and geometry realization
#[derive(Error, Debug)]
pub enum ModelError {
    /// I/O error while reading a model or resource
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The buffer matched neither a known magic nor the voxel probe
    #[error("Unknown model format in '{0}'")]
    UnknownFormat(String),

    /// Declared frame data extends past the end of the buffer
    #[error("Model '{0}' file too short")]
    FileTooShort(String),

    /// Triangle or GL command count is zero or negative
    #[error("Model '{name}' invalid {what} count: {count}")]
    InvalidCommandCount {
        name: String,
        what: &'static str,
        count: i32,
    },

    /// Structural corruption other than the two cases above
    #[error("Model '{name}' is corrupt: {reason}")]
    Corrupt { name: String, reason: String },

    /// The requested resource does not exist in the archive
    #[error("'{0}' not found")]
    NotFound(String),

    /// Realizing GPU geometry failed; the mesh stays unusable
    #[error("Geometry error in '{name}': {reason}")]
    Geometry { name: String, reason: String },
}

impl ModelError {
    pub(crate) fn corrupt(name: &str, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn geometry(name: &str, reason: impl Into<String>) -> Self {
        Self::Geometry {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type using ModelError
pub type Result<T> = std::result::Result<T, ModelError>;
