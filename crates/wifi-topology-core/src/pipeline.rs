//! Pipeline context: the entity store, position store and configuration of
//! one topology instance, plus the snapshot assembler that runs the
//! statistics, edge, cluster, embedding and metrics stages in order.
//!
//! The context is owned by exactly one driver. Drivers serialize ticks,
//! reconfiguration and replay onto a single timeline, so nothing in here
//! is synchronized.

use std::sync::Arc;

use tracing::debug;
use wifi_topology_scan::{ObservationBatch, ScanSource};

use crate::clusters::detect_clusters;
use crate::config::{ConfigPatch, PipelineConfig};
use crate::edges::select_edges;
use crate::embedding::{embed, PositionStore};
use crate::error::ConfigError;
use crate::metrics::stability_score;
use crate::snapshot::{ApView, Mode, Snapshot, SnapshotMeta, POSITION_DECIMALS, SNAPSHOT_TYPE};
use crate::stats::{build_correlation_matrix, correlation_to_distance};
use crate::store::EntityStore;

/// One topology-inference instance.
#[derive(Debug)]
pub struct TopologyPipeline {
    config: PipelineConfig,
    store: EntityStore,
    positions: PositionStore,
    source: ScanSource,
    ticks: u64,
    last_t: Option<i64>,
    last_snapshot: Option<Arc<Snapshot>>,
    recording: bool,
}

impl TopologyPipeline {
    /// Create a pipeline after validating `config`.
    pub fn new(config: PipelineConfig, source: ScanSource) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store: EntityStore::new(config.window_size, config.evict_after_ms),
            positions: PositionStore::new(),
            config,
            source,
            ticks: 0,
            last_t: None,
            last_snapshot: None,
            recording: false,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    pub fn source(&self) -> ScanSource {
        self.source
    }

    /// Number of ingested ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.last_snapshot.clone()
    }

    /// Whether emitted snapshots advertise an active recording.
    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    /// Apply a configuration patch.
    ///
    /// On error nothing changes. On success a shrunken window truncates
    /// every history immediately.
    pub fn reconfigure(&mut self, patch: &ConfigPatch) -> Result<&PipelineConfig, ConfigError> {
        let next = self.config.merged(patch)?;
        if next.window_size != self.config.window_size {
            self.store.set_window_size(next.window_size);
        }
        if next.evict_after_ms != self.config.evict_after_ms {
            self.store.set_evict_after_ms(next.evict_after_ms);
        }
        self.config = next;
        Ok(&self.config)
    }

    /// Ingest one batch and evict stale entities from both stores.
    ///
    /// Returns the evicted ids.
    pub fn ingest(&mut self, batch: &ObservationBatch) -> Vec<String> {
        self.source = batch.source;
        self.store.ingest(batch);
        let evicted = self.store.evict_stale(batch.timestamp_ms);
        self.positions.release(&evicted);
        self.ticks += 1;
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "evicted stale access points");
        }
        evicted
    }

    /// One live tick: ingest, then emit a snapshot every
    /// `snapshot_every_ticks` ticks.
    pub fn tick(&mut self, batch: &ObservationBatch, mode: Mode) -> Option<Arc<Snapshot>> {
        self.ingest(batch);
        let every = u64::from(self.config.snapshot_every_ticks.max(1));
        if self.ticks % every == 0 {
            Some(self.build_snapshot(batch.timestamp_ms, mode))
        } else {
            None
        }
    }

    /// Run every derivation stage over the current store and emit a
    /// snapshot stamped no earlier than `now_ms`.
    pub fn build_snapshot(&mut self, now_ms: i64, mode: Mode) -> Arc<Snapshot> {
        let cfg = &self.config;
        let ids = self.store.active_ids(cfg.max_aps);

        let mut samples = Vec::with_capacity(ids.len());
        let mut weights = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.store.get(id) {
                Some(record) => {
                    samples.push(record.samples());
                    weights.push(record.weights());
                }
                None => {
                    samples.push(Vec::new());
                    weights.push(Vec::new());
                }
            }
        }

        let corr = build_correlation_matrix(&samples, &weights, cfg.min_overlap);
        let edges = select_edges(
            &ids,
            &corr,
            cfg.max_edges_per_node,
            cfg.edge_threshold,
            cfg.max_edges,
        );
        let clusters = detect_clusters(&ids, &edges, cfg.edge_threshold);

        let distances: Vec<Vec<f64>> = corr
            .iter()
            .map(|row| row.iter().map(|&c| correlation_to_distance(c)).collect())
            .collect();
        let frame = embed(
            &ids,
            &distances,
            self.positions.previous(),
            cfg.embed_radius,
            cfg.smoothing,
        );
        self.positions.update(&frame);

        let aps: Vec<ApView> = ids
            .iter()
            .filter_map(|id| self.store.get(id))
            .map(|r| {
                let variance = r.variance();
                let sample_count = r.sample_count();
                let cluster = clusters.get(r.id());
                ApView {
                    id: r.id().to_string(),
                    label: r.label.clone(),
                    latest_value: r.latest_value,
                    channel: r.channel,
                    band: r.band,
                    security: r.security.clone(),
                    scan_source: r.scan_source,
                    estimated_flag: r.latest_estimated,
                    synthetic_id: r.synthetic_id,
                    sample_quality: (r.sample_quality() * 100.0).round() / 100.0,
                    sample_count,
                    mean_value: r.mean().map(|m| (m * 100.0).round() / 100.0),
                    variance: (variance * 100.0).round() / 100.0,
                    stability: stability_score(variance, sample_count),
                    cluster_id: cluster.id,
                    cluster_size: cluster.size,
                    last_seen: r.last_seen,
                }
            })
            .collect();

        let positions = frame
            .into_iter()
            .map(|(id, p)| (id, p.rounded(POSITION_DECIMALS)))
            .collect();

        let t = match self.last_t {
            Some(prev) if now_ms <= prev => prev + 1,
            _ => now_ms,
        };
        self.last_t = Some(t);

        let meta = SnapshotMeta {
            mode,
            scan_source: self.source,
            scan_interval_ms: cfg.scan_interval_ms,
            window_size: cfg.window_size,
            edge_threshold: cfg.edge_threshold,
            min_overlap: cfg.min_overlap,
            max_aps: cfg.max_aps,
            max_edges: cfg.max_edges,
            active_ap_count: aps.len(),
            tracked_ap_count: self.store.len(),
            distinct_aps_seen: self.store.distinct_seen(),
            edge_count: edges.len(),
            cluster_count: clusters.count(),
            cluster_sizes: clusters.sizes.clone(),
            recording: self.recording,
            replay: mode == Mode::Replay,
            tick: self.ticks,
            replay_index: None,
            replay_total: None,
            replay_speed: None,
            replay_path: None,
        };

        debug!(
            t,
            aps = meta.active_ap_count,
            edges = meta.edge_count,
            clusters = meta.cluster_count,
            "snapshot assembled"
        );

        let snapshot = Arc::new(Snapshot {
            kind: SNAPSHOT_TYPE.to_string(),
            t,
            aps,
            positions,
            edges,
            meta,
        });
        self.last_snapshot = Some(Arc::clone(&snapshot));
        snapshot
    }
}
