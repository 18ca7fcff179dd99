//! Error types for the topology core.
//!
//! Numerical edge cases (insufficient overlap, flat variance, degenerate
//! embeddings) are never errors: they resolve to well-defined fallback
//! values inside [`crate::stats`] and [`crate::embedding`]. Only
//! boundary-facing failures live here:
//!
//! - [`ConfigError`]: out-of-range or inconsistent configuration
//! - [`ReplayError`]: unreadable or empty recording
//! - [`RecordError`]: recording file cannot be opened or written

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while validating a [`crate::config::PipelineConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A numeric field is outside its permitted range.
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        /// Name of the offending field (camelCase, as on the wire).
        field: &'static str,
        /// The rejected value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// A field is inconsistent with another field.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Construct an [`ConfigError::Invalid`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors produced while loading a recording for replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The recording could not be read.
    #[error("cannot read recording {path:?}: {source}")]
    Io {
        /// Path of the recording.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The recording contained no valid snapshot lines.
    #[error("recording {path:?} contains no valid snapshots")]
    Empty {
        /// Path of the recording.
        path: PathBuf,
    },
}

/// Errors produced while appending snapshots to a recording.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The recording file could not be opened or written.
    #[error("recording I/O error on {path:?}: {source}")]
    Io {
        /// Path of the recording.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be serialized.
    #[error("snapshot serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
