//! Snapshot wire format.
//!
//! A [`Snapshot`] is the immutable unit handed to every sink: WebSocket
//! clients, the NDJSON recorder and the analysis summary. Field names are
//! camelCase on the wire and identical in recordings, so a recording can be
//! replayed straight back through the transport.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use wifi_topology_scan::{Band, ScanSource};

use crate::edges::Edge;
use crate::embedding::Position;

/// Value of the `type` discriminator on every snapshot line.
pub const SNAPSHOT_TYPE: &str = "snapshot";

/// Decimal places kept for positions on the wire.
pub const POSITION_DECIMALS: i32 = 3;

/// Which driver produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Live,
    Replay,
    Analyze,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Live => "live",
            Self::Replay => "replay",
            Self::Analyze => "analyze",
        })
    }
}

/// Derived per-entity view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApView {
    pub id: String,
    pub label: String,
    pub latest_value: i32,
    pub channel: Option<u16>,
    pub band: Option<Band>,
    pub security: String,
    pub scan_source: ScanSource,
    pub estimated_flag: bool,
    #[serde(default)]
    pub synthetic_id: bool,
    /// Mean provenance weight of the window, `0..1`.
    pub sample_quality: f64,
    pub sample_count: usize,
    pub mean_value: Option<f64>,
    pub variance: f64,
    /// `0..1`; absent below two samples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<f64>,
    pub cluster_id: u32,
    pub cluster_size: usize,
    pub last_seen: i64,
}

/// Configuration echo and diagnostic counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    pub mode: Mode,
    pub scan_source: ScanSource,
    pub scan_interval_ms: u64,
    pub window_size: usize,
    pub edge_threshold: f64,
    pub min_overlap: usize,
    pub max_aps: usize,
    #[serde(default)]
    pub max_edges: usize,
    pub active_ap_count: usize,
    #[serde(default)]
    pub tracked_ap_count: usize,
    #[serde(default)]
    pub distinct_aps_seen: usize,
    #[serde(default)]
    pub edge_count: usize,
    pub cluster_count: usize,
    pub cluster_sizes: Vec<usize>,
    pub recording: bool,
    pub replay: bool,
    #[serde(default)]
    pub tick: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_total: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_path: Option<String>,
}

/// One emitted state unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Always [`SNAPSHOT_TYPE`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Epoch milliseconds; strictly increasing per pipeline.
    pub t: i64,
    pub aps: Vec<ApView>,
    pub positions: BTreeMap<String, Position>,
    pub edges: Vec<Edge>,
    pub meta: SnapshotMeta,
}

impl Snapshot {
    /// Whether this value carries the snapshot discriminator.
    pub fn is_snapshot(&self) -> bool {
        self.kind == SNAPSHOT_TYPE
    }

    /// Copy of `self` stamped for replay.
    ///
    /// `aps`, `positions`, `edges` and `t` are preserved verbatim; only the
    /// metadata mode and replay diagnostics change.
    pub fn for_replay(&self, index: usize, total: usize, speed: f64, path: &str) -> Self {
        let mut out = self.clone();
        out.meta.mode = Mode::Replay;
        out.meta.replay = true;
        out.meta.replay_index = Some(index);
        out.meta.replay_total = Some(total);
        out.meta.replay_speed = Some(speed);
        out.meta.replay_path = Some(path.to_string());
        out
    }

    /// Serialize as a single JSON line (no trailing newline).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn ap(&self, id: &str) -> Option<&ApView> {
        self.aps.iter().find(|ap| ap.id == id)
    }
}
