//! The primary port (driving side) for access-point scanning.

use crate::domain::band::ScanSource;
use crate::domain::observation::RawObservation;
use crate::error::ScanError;

/// Port that abstracts the platform WiFi scanning backend.
///
/// Implementations are synchronous; async drivers wrap [`ScanPort::scan`]
/// in `tokio::task::spawn_blocking`.
pub trait ScanPort: Send + Sync {
    /// Which backend this port reads from. Drives weight derivation for
    /// low-fidelity sources.
    fn source(&self) -> ScanSource;

    /// Perform a scan and return every row the backend reported.
    ///
    /// Rows may be partial or duplicated; callers normalize them with
    /// [`crate::normalize_batch`].
    fn scan(&self) -> Result<Vec<RawObservation>, ScanError>;
}
