//! Server-level errors.

use thiserror::Error;
use wifi_topology_core::{ConfigError, RecordError, ReplayError};
use wifi_topology_scan::ScanError;

/// Exit code of an analyze run that never observed an access point.
pub const EXIT_NO_OBSERVATIONS: u8 = 2;
/// Exit code of every other failure.
pub const EXIT_FAILURE: u8 = 1;

#[derive(Debug, Error)]
pub enum ServerError {
    /// An analyze run finished without a single access point observed.
    ///
    /// Distinct from an empty-but-observed run: this points at a broken or
    /// unsupported scanner rather than an empty RF environment.
    #[error("no access points observed in {scans} scans over {duration_ms} ms; is the scanner working?")]
    NoObservations { scans: usize, duration_ms: u64 },

    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("scanner error: {0}")]
    Scan(#[from] ScanError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServerError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NoObservations { .. } => EXIT_NO_OBSERVATIONS,
            _ => EXIT_FAILURE,
        }
    }
}
