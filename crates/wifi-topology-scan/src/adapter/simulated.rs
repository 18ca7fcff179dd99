//! Deterministic synthetic access points.
//!
//! Access points are arranged in groups that share a slowly varying latent
//! signal, so the aggregation core sees genuinely correlated windows inside a
//! group and unrelated windows across groups. A hidden network, a redacted
//! BSSID and an occasional missing signal exercise the normalization paths.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::band::ScanSource;
use crate::domain::observation::RawObservation;
use crate::error::ScanError;
use crate::port::ScanPort;

/// One synthetic access point.
struct SimAp {
    bssid: Option<&'static str>,
    ssid: &'static str,
    channel: u16,
    security: &'static str,
    base_dbm: f64,
    group: usize,
    gain: f64,
}

const APS: &[SimAp] = &[
    SimAp { bssid: Some("02:00:00:00:01:01"), ssid: "Atrium", channel: 1, security: "WPA2", base_dbm: -48.0, group: 0, gain: 6.0 },
    SimAp { bssid: Some("02:00:00:00:01:02"), ssid: "Atrium", channel: 36, security: "WPA2", base_dbm: -55.0, group: 0, gain: 5.0 },
    SimAp { bssid: Some("02:00:00:00:01:03"), ssid: "Atrium-Guest", channel: 6, security: "open", base_dbm: -60.0, group: 0, gain: 4.0 },
    SimAp { bssid: Some("02:00:00:00:02:01"), ssid: "Lab", channel: 11, security: "WPA3", base_dbm: -66.0, group: 1, gain: 7.0 },
    SimAp { bssid: Some("02:00:00:00:02:02"), ssid: "Lab", channel: 149, security: "WPA3", base_dbm: -70.0, group: 1, gain: 6.0 },
    SimAp { bssid: Some("02:00:00:00:03:01"), ssid: "", channel: 44, security: "WPA2", base_dbm: -74.0, group: 2, gain: 5.0 },
    SimAp { bssid: None, ssid: "Printer-Direct", channel: 6, security: "WPA2", base_dbm: -78.0, group: 2, gain: 5.0 },
    SimAp { bssid: Some("02:00:00:00:04:01"), ssid: "Neighbour", channel: 1, security: "WPA2", base_dbm: -84.0, group: 3, gain: 2.0 },
];

/// Latent per-group signal periods, in ticks.
const GROUP_PERIODS: [f64; 4] = [17.0, 29.0, 41.0, 7.0];

/// A [`ScanPort`] that produces a reproducible sequence of scans.
///
/// Each call to [`ScanPort::scan`] advances an internal tick counter, so two
/// scanners created with the same seed return identical sequences.
pub struct SimulatedScanner {
    tick: AtomicU64,
    seed: u64,
}

impl SimulatedScanner {
    /// Create a scanner whose noise pattern is derived from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            tick: AtomicU64::new(0),
            seed,
        }
    }

    /// Rows for an explicit tick, without advancing the counter.
    pub fn frame(&self, tick: u64) -> Vec<RawObservation> {
        let t = tick as f64;
        let s = (self.seed % 997) as f64;

        APS.iter()
            .enumerate()
            .map(|(i, ap)| {
                let period = GROUP_PERIODS[ap.group];
                let phase = ap.group as f64 * 1.3 + s * 0.01;
                let latent = (std::f64::consts::TAU * t / period + phase).sin();
                let noise = (i as f64 * 7.3 + t * 13.7 + s).sin() * 1.5;
                let signal = ap.base_dbm + ap.gain * latent + noise;

                // Every 23rd tick the printer row loses its signal reading.
                let signal_dbm = if ap.bssid.is_none() && tick % 23 == 22 {
                    None
                } else {
                    Some(signal)
                };

                RawObservation {
                    bssid: ap.bssid.map(str::to_owned),
                    ssid: Some(ap.ssid.to_owned()),
                    signal_dbm,
                    signal_pct: None,
                    channel: Some(ap.channel),
                    freq_mhz: None,
                    band: None,
                    security: Some(ap.security.to_owned()),
                }
            })
            .collect()
    }
}

impl Default for SimulatedScanner {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ScanPort for SimulatedScanner {
    fn source(&self) -> ScanSource {
        ScanSource::Simulated
    }

    fn scan(&self) -> Result<Vec<RawObservation>, ScanError> {
        let tick = self.tick.fetch_add(1, Ordering::Relaxed);
        Ok(self.frame(tick))
    }
}
