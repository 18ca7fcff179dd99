//! Adapter that scans access points on macOS through a CoreWLAN helper
//! binary emitting one JSON object per line:
//!
//! ```json
//! {"ssid":"MyNetwork","bssid":"aa:bb:cc:dd:ee:ff","rssi":-52,"channel":36,"band":"5GHz","security":"WPA2"}
//! ```
//!
//! Recent macOS releases redact BSSIDs to `00:00:00:00:00:00` unless the
//! caller holds the location entitlement. Redacted rows keep an empty
//! identifier here and receive a synthetic one during normalization.

use serde::Deserialize;

use crate::domain::band::ScanSource;
use crate::domain::observation::RawObservation;
use crate::error::ScanError;
use crate::port::ScanPort;

use super::run_tool;

/// Synchronous scanner that runs the CoreWLAN helper.
#[derive(Debug, Clone)]
pub struct CoreWlanScanner {
    /// Path to the helper binary. Defaults to `"mac_wifi"` (on `$PATH`).
    helper_path: String,
}

impl CoreWlanScanner {
    /// Create a scanner with an explicit helper path.
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            helper_path: path.into(),
        }
    }
}

impl Default for CoreWlanScanner {
    fn default() -> Self {
        Self::with_path("mac_wifi")
    }
}

impl ScanPort for CoreWlanScanner {
    fn source(&self) -> ScanSource {
        ScanSource::CoreWlan
    }

    fn scan(&self) -> Result<Vec<RawObservation>, ScanError> {
        let stdout = run_tool(&self.helper_path, &["--scan-once"])?;
        Ok(parse_corewlan_output(&stdout))
    }
}

#[derive(Debug, Deserialize)]
struct HelperLine {
    #[serde(default)]
    ssid: Option<String>,
    #[serde(default)]
    bssid: Option<String>,
    #[serde(default)]
    rssi: Option<f64>,
    #[serde(default)]
    channel: Option<u16>,
    #[serde(default)]
    band: Option<String>,
    #[serde(default)]
    security: Option<String>,
}

/// Parse the helper's JSON-lines output.
///
/// Lines that are not JSON objects (status chatter) or fail to decode are
/// skipped.
pub fn parse_corewlan_output(output: &str) -> Vec<RawObservation> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .filter_map(|line| serde_json::from_str::<HelperLine>(line).ok())
        .map(|h| RawObservation {
            bssid: h.bssid,
            ssid: h.ssid,
            signal_dbm: h.rssi,
            signal_pct: None,
            channel: h.channel,
            freq_mhz: None,
            band: h.band,
            security: h.security,
        })
        .collect()
}
