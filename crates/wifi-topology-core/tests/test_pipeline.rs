//! End-to-end scenarios for [`wifi_topology_core::TopologyPipeline`].

use approx::assert_abs_diff_eq;
use wifi_topology_core::config::{ConfigPatch, PipelineConfig};
use wifi_topology_core::snapshot::Mode;
use wifi_topology_core::TopologyPipeline;
use wifi_topology_scan::{
    normalize_batch, ApObservation, Band, ObservationBatch, Provenance, ScanSource,
    SimulatedScanner,
};

fn ap(id: &str, dbm: i32) -> ApObservation {
    ApObservation {
        id: id.to_string(),
        label: id.to_uppercase(),
        signal_dbm: dbm,
        channel: Some(6),
        band: Some(Band::Ghz2_4),
        security: "WPA2".to_string(),
        provenance: Provenance::measured(ScanSource::Iw),
    }
}

fn batch(t: i64, observations: Vec<ApObservation>) -> ObservationBatch {
    ObservationBatch {
        timestamp_ms: t,
        source: ScanSource::Iw,
        observations,
        dropped: 0,
    }
}

// ---------------------------------------------------------------------------
// Correlated pair plus an isolated late arrival
// ---------------------------------------------------------------------------

#[test]
fn identical_pair_forms_single_edge_and_cluster() {
    let mut p = TopologyPipeline::new(PipelineConfig::default(), ScanSource::Iw).unwrap();
    let pattern = [-50, -54, -47, -60, -52, -45, -58, -49, -56, -51, -62, -48];

    for (i, &v) in pattern.iter().enumerate() {
        let t = i as i64 * 2_000;
        let mut obs = vec![ap("aa", v), ap("bb", v)];
        // C shows up for the last three ticks only: overlap 3 < minOverlap 6.
        if i >= pattern.len() - 3 {
            obs.push(ap("cc", -70 + (i as i32 % 2) * 9));
        }
        p.ingest(&batch(t, obs));
    }

    let snap = p.build_snapshot(24_000, Mode::Live);

    assert_eq!(snap.edges.len(), 1, "edges: {:?}", snap.edges);
    let edge = &snap.edges[0];
    assert_eq!((edge.a.as_str(), edge.b.as_str()), ("aa", "bb"));
    assert_abs_diff_eq!(edge.corr, 1.0, epsilon = 1e-9);

    let a = snap.ap("aa").unwrap();
    let b = snap.ap("bb").unwrap();
    let c = snap.ap("cc").unwrap();
    assert_eq!(a.cluster_id, b.cluster_id);
    assert!(a.cluster_id >= 1);
    assert_eq!(a.cluster_size, 2);
    assert_eq!(c.cluster_id, 0);
    assert_eq!(c.cluster_size, 1);
    assert_eq!(snap.meta.cluster_sizes, vec![2]);
    assert_eq!(snap.meta.cluster_count, 1);
}

#[test]
fn every_edge_beats_threshold() {
    let scanner = SimulatedScanner::new(3);
    for threshold in [0.05, 0.3, 0.6, 0.9] {
        let cfg = PipelineConfig {
            edge_threshold: threshold,
            ..Default::default()
        };
        let mut p = TopologyPipeline::new(cfg, ScanSource::Simulated).unwrap();
        for tick in 0..40 {
            let t = tick as i64 * 2_000;
            p.ingest(&normalize_batch(ScanSource::Simulated, t, scanner.frame(tick)));
        }
        let snap = p.build_snapshot(80_000, Mode::Live);
        assert!(snap.edges.iter().all(|e| e.corr > threshold));
        for e in &snap.edges {
            let a = snap.ap(&e.a).unwrap();
            let b = snap.ap(&e.b).unwrap();
            assert_eq!(a.cluster_id, b.cluster_id);
            assert!(a.cluster_id > 0);
        }
    }
}

// ---------------------------------------------------------------------------
// Reconfiguration
// ---------------------------------------------------------------------------

#[test]
fn shrinking_window_truncates_to_most_recent() {
    let mut p = TopologyPipeline::new(PipelineConfig::default(), ScanSource::Iw).unwrap();
    for i in 0..30 {
        p.ingest(&batch(i * 1_000, vec![ap("aa", -30 - i as i32)]));
    }
    assert_eq!(p.store().get("aa").unwrap().sample_count(), 30);

    let patch = ConfigPatch {
        window_size: Some(10),
        ..Default::default()
    };
    p.reconfigure(&patch).unwrap();

    let record = p.store().get("aa").unwrap();
    assert_eq!(record.sample_count(), 10);
    let kept: Vec<i32> = record.raw_samples().collect();
    let expected: Vec<i32> = (20..30).map(|i| -30 - i).collect();
    assert_eq!(kept, expected);

    let snap = p.build_snapshot(30_000, Mode::Live);
    assert_eq!(snap.meta.window_size, 10);
}

// ---------------------------------------------------------------------------
// Determinism and geometry
// ---------------------------------------------------------------------------

fn run_simulation(seed: u64, ticks: u64, smoothing: f64) -> TopologyPipeline {
    let scanner = SimulatedScanner::new(seed);
    let cfg = PipelineConfig {
        smoothing,
        ..Default::default()
    };
    let mut p = TopologyPipeline::new(cfg, ScanSource::Simulated).unwrap();
    for tick in 0..ticks {
        let t = tick as i64 * 2_000;
        p.tick(
            &normalize_batch(ScanSource::Simulated, t, scanner.frame(tick)),
            Mode::Live,
        );
    }
    p
}

#[test]
fn identical_inputs_produce_identical_snapshots() {
    let a = run_simulation(11, 35, 0.35).last_snapshot().unwrap();
    let b = run_simulation(11, 35, 0.35).last_snapshot().unwrap();
    assert_eq!(a.positions, b.positions);
    assert_eq!(a.edges, b.edges);
    assert_eq!(a.aps, b.aps);
}

#[test]
fn unsmoothed_layout_spans_embed_radius() {
    let p = run_simulation(5, 40, 1.0);
    let snap = p.last_snapshot().unwrap();
    let n = snap.positions.len() as f64;
    assert!(n >= 2.0);

    let (mut cx, mut cy, mut cz) = (0.0, 0.0, 0.0);
    for pos in snap.positions.values() {
        cx += pos.x / n;
        cy += pos.y / n;
        cz += pos.z / n;
    }
    let max = snap
        .positions
        .values()
        .map(|pos| ((pos.x - cx).powi(2) + (pos.y - cy).powi(2) + (pos.z - cz).powi(2)).sqrt())
        .fold(0.0, f64::max);
    assert_abs_diff_eq!(max, p.config().embed_radius, epsilon = 1e-2);
}

#[test]
fn simulated_groups_cluster_together() {
    let p = run_simulation(1, 60, 0.35);
    let snap = p.last_snapshot().unwrap();
    let atrium = snap.ap("02:00:00:00:01:01").unwrap();
    let atrium_5g = snap.ap("02:00:00:00:01:02").unwrap();
    assert!(atrium.cluster_id > 0);
    assert_eq!(atrium.cluster_id, atrium_5g.cluster_id);
    assert_eq!(snap.meta.distinct_aps_seen, 8);
}

#[test]
fn stability_reported_only_with_history() {
    let mut p = TopologyPipeline::new(PipelineConfig::default(), ScanSource::Iw).unwrap();
    p.ingest(&batch(0, vec![ap("aa", -50)]));
    let first = p.build_snapshot(0, Mode::Live);
    assert_eq!(first.aps[0].stability, None);

    for i in 1..25 {
        p.ingest(&batch(i * 1_000, vec![ap("aa", -50)]));
    }
    let later = p.build_snapshot(25_000, Mode::Live);
    assert_eq!(later.aps[0].stability, Some(1.0));
}
