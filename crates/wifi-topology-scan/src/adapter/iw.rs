//! Adapter that scans access points on Linux by invoking `iw dev <iface> scan`.
//!
//! `iw dev <iface> scan` requires `CAP_NET_ADMIN`; `scan dump` reads the
//! kernel's cached results and usually works unprivileged, at the cost of
//! possibly stale rows.

use crate::domain::band::ScanSource;
use crate::domain::observation::RawObservation;
use crate::error::ScanError;
use crate::port::ScanPort;

use super::run_tool;

// ---------------------------------------------------------------------------
// LinuxIwScanner
// ---------------------------------------------------------------------------

/// Synchronous scanner that shells out to `iw`.
#[derive(Debug, Clone)]
pub struct LinuxIwScanner {
    /// Wireless interface name (e.g. `"wlan0"`, `"wlp2s0"`).
    interface: String,
    /// Read cached results (`scan dump`) instead of triggering a scan.
    use_dump: bool,
}

impl LinuxIwScanner {
    /// Create a scanner for a specific wireless interface.
    pub fn with_interface(iface: impl Into<String>) -> Self {
        Self {
            interface: iface.into(),
            use_dump: false,
        }
    }

    /// Use `scan dump` to read cached results without root.
    pub fn use_cached(mut self) -> Self {
        self.use_dump = true;
        self
    }
}

impl Default for LinuxIwScanner {
    fn default() -> Self {
        Self::with_interface("wlan0")
    }
}

impl ScanPort for LinuxIwScanner {
    fn source(&self) -> ScanSource {
        ScanSource::Iw
    }

    fn scan(&self) -> Result<Vec<RawObservation>, ScanError> {
        let mut args = vec!["dev", self.interface.as_str(), "scan"];
        if self.use_dump {
            args.push("dump");
        }
        let stdout = run_tool("iw", &args)?;
        Ok(parse_iw_scan_output(&stdout))
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Fields collected while walking one `BSS` stanza.
#[derive(Default)]
struct BssStanza {
    row: RawObservation,
    rsn: bool,
    wpa: bool,
    sae: bool,
    privacy: bool,
}

impl BssStanza {
    fn finish(mut self) -> RawObservation {
        let security = if self.sae {
            "WPA3"
        } else if self.rsn && self.wpa {
            "WPA/WPA2"
        } else if self.rsn {
            "WPA2"
        } else if self.wpa {
            "WPA"
        } else if self.privacy {
            "WEP"
        } else {
            "open"
        };
        self.row.security = Some(security.to_owned());
        self.row
    }
}

/// Parse the text output of `iw dev <iface> scan [dump]`.
///
/// Stanzas start with `BSS aa:bb:cc:dd:ee:ff(on wlan0)` at column 0 and are
/// followed by tab-indented attribute lines. Unknown lines are ignored.
pub fn parse_iw_scan_output(output: &str) -> Vec<RawObservation> {
    let mut rows = Vec::new();
    let mut current: Option<BssStanza> = None;

    for line in output.lines() {
        if let Some(rest) = line.strip_prefix("BSS ") {
            if let Some(stanza) = current.take() {
                rows.push(stanza.finish());
            }
            let mac_end = rest
                .find(|c: char| !c.is_ascii_hexdigit() && c != ':')
                .unwrap_or(rest.len());
            let mut stanza = BssStanza::default();
            stanza.row.bssid = Some(rest[..mac_end].to_owned());
            current = Some(stanza);
            continue;
        }

        let Some(stanza) = current.as_mut() else {
            continue;
        };
        let trimmed = line.trim();

        if let Some(v) = trimmed.strip_prefix("signal:") {
            stanza.row.signal_dbm = v.trim().trim_end_matches("dBm").trim().parse().ok();
        } else if let Some(v) = trimmed.strip_prefix("freq:") {
            stanza.row.freq_mhz = v.trim().parse::<f64>().ok().map(|f| f.round() as u32);
        } else if let Some(v) = trimmed.strip_prefix("SSID:") {
            stanza.row.ssid = Some(v.trim().to_owned());
        } else if let Some(v) = trimmed.strip_prefix("DS Parameter set: channel") {
            stanza.row.channel = v.trim().parse().ok();
        } else if let Some(v) = trimmed.strip_prefix("* primary channel:") {
            stanza.row.channel = stanza.row.channel.or_else(|| v.trim().parse().ok());
        } else if trimmed.starts_with("RSN:") {
            stanza.rsn = true;
        } else if trimmed.starts_with("WPA:") {
            stanza.wpa = true;
        } else if trimmed.starts_with("* Authentication suites:") && trimmed.contains("SAE") {
            stanza.sae = true;
        } else if trimmed.starts_with("capability:") && trimmed.contains("Privacy") {
            stanza.privacy = true;
        }
    }

    if let Some(stanza) = current.take() {
        rows.push(stanza.finish());
    }

    rows
}
