//! Adapter that scans access points on Windows by invoking
//! `netsh wlan show networks mode=bssid`.
//!
//! netsh only reports a signal *percentage*, so every row it produces is
//! mapped onto the dBm scale during normalization and the source is flagged
//! as low fidelity.

use crate::domain::band::ScanSource;
use crate::domain::observation::RawObservation;
use crate::error::ScanError;
use crate::port::ScanPort;

use super::run_tool;

/// Synchronous scanner that shells out to `netsh`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetshScanner;

impl NetshScanner {
    /// Create a new scanner instance.
    pub fn new() -> Self {
        Self
    }
}

impl ScanPort for NetshScanner {
    fn source(&self) -> ScanSource {
        ScanSource::Netsh
    }

    fn scan(&self) -> Result<Vec<RawObservation>, ScanError> {
        let stdout = run_tool("netsh", &["wlan", "show", "networks", "mode=bssid"])?;
        Ok(parse_netsh_output(&stdout))
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Per-SSID context shared by every BSSID block beneath it.
#[derive(Default)]
struct NetworkContext {
    ssid: String,
    authentication: Option<String>,
}

/// Parse the text output of `netsh wlan show networks mode=bssid`.
///
/// The output nests BSSID blocks under SSID headers:
///
/// ```text
/// SSID 1 : MyNetwork
///     Authentication          : WPA2-Personal
///     BSSID 1                 : aa:bb:cc:dd:ee:ff
///          Signal             : 84%
///          Band               : 5 GHz
///          Channel            : 36
/// ```
///
/// Lines that match no known key are skipped, so interface headers and
/// localized status messages never cause an error.
pub fn parse_netsh_output(output: &str) -> Vec<RawObservation> {
    let mut rows = Vec::new();
    let mut network = NetworkContext::default();
    let mut block: Option<RawObservation> = None;

    for line in output.lines() {
        let Some((key, value)) = split_kv(line.trim()) else {
            continue;
        };
        let key = key.to_ascii_uppercase();

        if key.starts_with("SSID") {
            rows.extend(block.take());
            network = NetworkContext {
                ssid: value.to_owned(),
                authentication: None,
            };
        } else if key.starts_with("BSSID") {
            rows.extend(block.take());
            block = Some(RawObservation {
                bssid: Some(value.to_owned()),
                ssid: Some(network.ssid.clone()),
                security: network.authentication.clone(),
                ..Default::default()
            });
        } else if key.starts_with("AUTHENTICATION") {
            network.authentication = Some(value.to_owned());
        } else if let Some(row) = block.as_mut() {
            if key.starts_with("SIGNAL") {
                row.signal_pct = value.trim_end_matches('%').trim().parse().ok();
            } else if key.starts_with("BAND") {
                row.band = Some(value.to_owned());
            } else if key.starts_with("CHANNEL") {
                row.channel = value.parse().ok().or(row.channel);
            }
        }
    }

    rows.extend(block.take());
    rows
}

/// Split a netsh key-value line on the first `" : "` separator.
///
/// Splitting on space-colon-space keeps the colons inside MAC addresses and
/// SSIDs intact. A trailing `" :"` yields an empty value (hidden SSIDs).
fn split_kv(line: &str) -> Option<(&str, &str)> {
    if let Some(idx) = line.find(" : ") {
        return Some((line[..idx].trim(), line[idx + 3..].trim()));
    }
    line.strip_suffix(" :").map(|key| (key.trim(), ""))
}
