//! Error types for the wifi-topology-scan crate.

use thiserror::Error;

/// Errors that can occur while acquiring access-point observations.
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    /// The scan backend returned an error.
    #[error("WiFi scan failed: {reason}")]
    ScanFailed {
        /// Human-readable description of what went wrong.
        reason: String,
    },

    /// Failed to execute the scan subprocess.
    #[error("scan process error: {0}")]
    ProcessError(String),
}
