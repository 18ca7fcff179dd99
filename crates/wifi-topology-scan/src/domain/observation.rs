//! Observation value objects and the ingestion-boundary normalizer.
//!
//! Adapters emit loosely-typed [`RawObservation`] rows straight from tool
//! output. [`normalize_batch`] turns one scan's rows into a strict
//! [`ObservationBatch`] that the aggregation core can trust.

use std::collections::HashMap;

use tracing::debug;

use super::band::{freq_to_channel, Band, ScanSource};

/// Label used for networks that do not broadcast an SSID.
pub const HIDDEN_LABEL: &str = "<hidden>";

/// Signal value assigned when a row carries no usable signal measure.
const SIGNAL_FLOOR_DBM: f64 = -100.0;

/// Lowest signal value accepted after normalization.
const SIGNAL_MIN_DBM: f64 = -120.0;

// ---------------------------------------------------------------------------
// RawObservation -- adapter output
// ---------------------------------------------------------------------------

/// One row of scan output exactly as an adapter understood it.
///
/// Every field is optional: tools omit values, redact identifiers and report
/// signal either in dBm or as a percentage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawObservation {
    /// MAC address text, any common separator.
    pub bssid: Option<String>,
    /// Network name.
    pub ssid: Option<String>,
    /// Signal strength in dBm.
    pub signal_dbm: Option<f64>,
    /// Signal quality as a percentage (0-100).
    pub signal_pct: Option<f64>,
    /// 802.11 channel number.
    pub channel: Option<u16>,
    /// Centre frequency in MHz.
    pub freq_mhz: Option<u32>,
    /// Free-form band text (`"2.4 GHz"`).
    pub band: Option<String>,
    /// Security / authentication description.
    pub security: Option<String>,
}

// ---------------------------------------------------------------------------
// Provenance -- Value Object
// ---------------------------------------------------------------------------

/// How much the pipeline should trust a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provenance {
    /// The signal value was inferred, not measured.
    pub estimated: bool,
    /// The identifier was synthesized because the real BSSID was missing.
    pub synthetic_id: bool,
    /// The backend that produced the reading.
    pub source: ScanSource,
}

impl Provenance {
    /// A directly measured reading from `source`.
    pub fn measured(source: ScanSource) -> Self {
        Self {
            estimated: false,
            synthetic_id: false,
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// ApObservation -- normalized observation
// ---------------------------------------------------------------------------

/// A single validated observation of one access point.
#[derive(Debug, Clone, PartialEq)]
pub struct ApObservation {
    /// Canonical lower-case MAC (real or synthesized).
    pub id: String,
    /// SSID, or [`HIDDEN_LABEL`].
    pub label: String,
    /// Signal strength in dBm, clamped to `[-120, 0]`.
    pub signal_dbm: i32,
    /// 802.11 channel number, if known.
    pub channel: Option<u16>,
    /// Frequency band, if known.
    pub band: Option<Band>,
    /// Security / authentication description.
    pub security: String,
    /// Provenance flags used for sample weighting.
    pub provenance: Provenance,
}

impl ApObservation {
    /// Whether the label is the hidden-network sentinel.
    pub fn is_hidden(&self) -> bool {
        self.label == HIDDEN_LABEL
    }

    /// Whether `self` is a better reading than `other` for the same id.
    ///
    /// Measured beats estimated; otherwise the stronger signal wins.
    fn supersedes(&self, other: &ApObservation) -> bool {
        match (self.provenance.estimated, other.provenance.estimated) {
            (false, true) => true,
            (true, false) => false,
            _ => self.signal_dbm > other.signal_dbm,
        }
    }
}

/// All normalized observations from one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationBatch {
    /// Epoch milliseconds at which the scan completed.
    pub timestamp_ms: i64,
    /// The backend that produced the batch.
    pub source: ScanSource,
    /// One observation per distinct id, in first-seen order.
    pub observations: Vec<ApObservation>,
    /// Rows rejected because they carried neither a BSSID nor an SSID.
    pub dropped: usize,
}

impl ObservationBatch {
    /// An empty batch, used when a tick produced no usable scan.
    pub fn empty(source: ScanSource, timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            source,
            observations: Vec::new(),
            dropped: 0,
        }
    }

    /// Number of normalized observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the batch holds no observations.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize one scan's raw rows into a strict batch.
///
/// - Duplicate ids keep the best reading (see [`ApObservation`] ordering).
/// - Missing or redacted MACs get a [`synthetic_id`] from SSID and channel.
/// - Rows with neither MAC nor SSID are dropped.
pub fn normalize_batch(
    source: ScanSource,
    timestamp_ms: i64,
    raws: Vec<RawObservation>,
) -> ObservationBatch {
    let mut observations: Vec<ApObservation> = Vec::with_capacity(raws.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(raws.len());
    let mut dropped = 0usize;

    for raw in raws {
        let Some(obs) = normalize_one(source, raw) else {
            dropped += 1;
            continue;
        };
        match index.get(&obs.id) {
            Some(&slot) => {
                if obs.supersedes(&observations[slot]) {
                    observations[slot] = obs;
                }
            }
            None => {
                index.insert(obs.id.clone(), observations.len());
                observations.push(obs);
            }
        }
    }

    if dropped > 0 {
        debug!(source = %source, dropped, "dropped unidentifiable scan rows");
    }

    ObservationBatch {
        timestamp_ms,
        source,
        observations,
        dropped,
    }
}

fn normalize_one(source: ScanSource, raw: RawObservation) -> Option<ApObservation> {
    let ssid = raw
        .ssid
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    let channel = raw
        .channel
        .filter(|&c| c > 0)
        .or_else(|| raw.freq_mhz.and_then(freq_to_channel));

    let band = raw
        .band
        .as_deref()
        .and_then(Band::parse)
        .or_else(|| raw.freq_mhz.and_then(Band::from_freq_mhz))
        .or_else(|| channel.and_then(Band::from_channel));

    let (id, synthetic) = match raw.bssid.as_deref().and_then(parse_mac) {
        Some(mac) => (mac, false),
        None => {
            let name = ssid.as_deref()?;
            (synthetic_id(name, channel.unwrap_or(0)), true)
        }
    };

    let (signal, estimated) = match (raw.signal_dbm, raw.signal_pct) {
        (Some(dbm), _) if dbm.is_finite() => (dbm, false),
        (_, Some(pct)) if pct.is_finite() => (pct.clamp(0.0, 100.0) / 2.0 - 100.0, false),
        _ => (SIGNAL_FLOOR_DBM, true),
    };

    let security = raw
        .security
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_owned();

    Some(ApObservation {
        id,
        label: ssid.unwrap_or_else(|| HIDDEN_LABEL.to_owned()),
        signal_dbm: signal.clamp(SIGNAL_MIN_DBM, 0.0).round() as i32,
        channel,
        band,
        security,
        provenance: Provenance {
            estimated,
            synthetic_id: synthetic,
            source,
        },
    })
}

/// Parse a MAC address with `:` or `-` separators into canonical
/// lower-case colon form. The all-zero address (platform redaction) is
/// treated as absent.
pub fn parse_mac(text: &str) -> Option<String> {
    let parts: Vec<&str> = text.trim().split([':', '-']).collect();
    if parts.len() != 6 {
        return None;
    }
    let mut bytes = [0u8; 6];
    for (slot, part) in bytes.iter_mut().zip(&parts) {
        if part.len() != 2 {
            return None;
        }
        *slot = u8::from_str_radix(part, 16).ok()?;
    }
    if bytes == [0u8; 6] {
        return None;
    }
    Some(format_mac(bytes))
}

/// Generate a deterministic locally-administered MAC from SSID and channel.
///
/// FNV-1a 64-bit over the SSID bytes and the channel; the locally
/// administered bit is set and the multicast bit cleared so synthesized ids
/// never collide with real OUI allocations.
pub fn synthetic_id(ssid: &str, channel: u16) -> String {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in ssid.as_bytes().iter().chain(channel.to_le_bytes().iter()) {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    let b = hash.to_le_bytes();
    let mut mac = [b[0], b[1], b[2], b[3], b[4], b[5]];
    mac[0] = (mac[0] | 0x02) & 0xFE;
    format_mac(mac)
}

fn format_mac(m: [u8; 6]) -> String {
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        m[0], m[1], m[2], m[3], m[4], m[5]
    )
}
