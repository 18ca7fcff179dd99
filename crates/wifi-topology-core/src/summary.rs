//! Analysis summary: the aggregate produced by a bounded analyze run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wifi_topology_scan::Band;

use crate::metrics::{
    channel_density, most_volatile, recommend_channels, strongest, ChannelDensity, RankedAp,
};
use crate::snapshot::Snapshot;

/// Default length of the strongest / most-volatile lists.
pub const DEFAULT_TOP_N: usize = 5;

/// Default number of recommended channels per band.
pub const DEFAULT_RECOMMENDATIONS: usize = 3;

/// Bookkeeping of one analyze run, supplied by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub started_at_ms: i64,
    pub ended_at_ms: i64,
    pub scan_count: usize,
    pub distinct_aps_seen: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub started_at: i64,
    pub ended_at: i64,
    pub duration_ms: i64,
    pub scan_count: usize,
    pub distinct_aps_seen: usize,
    pub active_ap_count: usize,
    pub cluster_count: usize,
    pub cluster_sizes: Vec<usize>,
    pub strongest: Vec<RankedAp>,
    pub most_volatile: Vec<RankedAp>,
    pub channel_density: ChannelDensity,
    pub recommended_channels: BTreeMap<Band, Vec<u16>>,
    pub security_counts: BTreeMap<String, usize>,
    pub snapshot: Snapshot,
}

impl AnalysisSummary {
    /// Summarize the final snapshot of a run.
    pub fn build(run: RunStats, snapshot: &Snapshot, top_n: usize) -> Self {
        let density = channel_density(snapshot.aps.iter().map(|ap| (ap.band, ap.channel)));
        let recommended = recommend_channels(&density, DEFAULT_RECOMMENDATIONS);

        let mut security_counts = BTreeMap::new();
        for ap in &snapshot.aps {
            *security_counts.entry(ap.security.clone()).or_insert(0) += 1;
        }

        Self {
            started_at: run.started_at_ms,
            ended_at: run.ended_at_ms,
            duration_ms: run.ended_at_ms.saturating_sub(run.started_at_ms).max(0),
            scan_count: run.scan_count,
            distinct_aps_seen: run.distinct_aps_seen,
            active_ap_count: snapshot.aps.len(),
            cluster_count: snapshot.meta.cluster_count,
            cluster_sizes: snapshot.meta.cluster_sizes.clone(),
            strongest: strongest(&snapshot.aps, top_n),
            most_volatile: most_volatile(&snapshot.aps, top_n),
            channel_density: density,
            recommended_channels: recommended,
            security_counts,
            snapshot: snapshot.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::pipeline::TopologyPipeline;
    use crate::snapshot::Mode;
    use wifi_topology_scan::{ApObservation, ObservationBatch, Provenance, ScanSource};

    fn ap(id: &str, dbm: i32, channel: u16, security: &str) -> ApObservation {
        ApObservation {
            id: id.to_string(),
            label: id.to_string(),
            signal_dbm: dbm,
            channel: Some(channel),
            band: None,
            security: security.to_string(),
            provenance: Provenance::measured(ScanSource::Iw),
        }
    }

    #[test]
    fn summary_counts_and_serializes() {
        let mut p = TopologyPipeline::new(PipelineConfig::default(), ScanSource::Iw).unwrap();
        p.ingest(&ObservationBatch {
            timestamp_ms: 10_000,
            source: ScanSource::Iw,
            observations: vec![
                ap("aa", -40, 1, "WPA2"),
                ap("bb", -70, 1, "WPA2"),
                ap("cc", -55, 36, "open"),
            ],
            dropped: 0,
        });
        let snap = p.build_snapshot(10_000, Mode::Analyze);
        let run = RunStats {
            started_at_ms: 1_000,
            ended_at_ms: 11_000,
            scan_count: 1,
            distinct_aps_seen: p.store().distinct_seen(),
        };
        let s = AnalysisSummary::build(run, &snap, 2);

        assert_eq!(s.duration_ms, 10_000);
        assert_eq!(s.active_ap_count, 3);
        assert_eq!(s.strongest.len(), 2);
        assert_eq!(s.strongest[0].id, "aa");
        assert_eq!(s.security_counts["WPA2"], 2);
        assert_eq!(s.channel_density[&Band::Ghz2_4][&1], 2);
        assert_eq!(s.recommended_channels[&Band::Ghz2_4], vec![6, 11, 1]);
        assert_eq!(s.recommended_channels[&Band::Ghz5], vec![40, 44, 48]);

        let v: serde_json::Value = serde_json::to_value(&s).unwrap();
        assert_eq!(v["distinctApsSeen"], 3);
        assert_eq!(v["channelDensity"]["2.4GHz"]["1"], 2);
        assert_eq!(v["snapshot"]["meta"]["mode"], "analyze");
    }
}
