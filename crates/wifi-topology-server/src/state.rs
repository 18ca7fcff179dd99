//! Shared application state.
//!
//! One [`TopologyPipeline`] lives behind a single `RwLock`, so live ticks,
//! configuration patches and replay steps are serialized onto one timeline.
//! Snapshots leave the lock as `Arc<Snapshot>` and are fanned out through a
//! broadcast channel.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, watch, RwLock};
use tracing::warn;
use wifi_topology_core::{
    ConfigError, ConfigPatch, PipelineConfig, SnapshotRecorder, Snapshot, TopologyPipeline,
};

/// Capacity of the snapshot broadcast channel; slower clients skip ahead.
pub const BROADCAST_CAPACITY: usize = 64;

/// A running replay task.
#[derive(Debug)]
pub struct ReplayHandle {
    pub path: PathBuf,
    pub speed: f64,
    pub looping: bool,
    /// Entries in the recording.
    pub total: usize,
    /// Distinguishes this replay from any later one.
    pub generation: u64,
    pub stop: watch::Sender<bool>,
}

pub struct AppStateInner {
    pub pipeline: TopologyPipeline,
    pub recorder: Option<SnapshotRecorder>,
    pub replay: Option<ReplayHandle>,
    pub replay_generation: u64,
    pub latest: Option<Arc<Snapshot>>,
    pub tx: broadcast::Sender<Arc<Snapshot>>,
    pub start_time: Instant,
    /// Snapshots published since start.
    pub published: u64,
    /// Root for recording paths supplied over HTTP.
    pub recordings_dir: PathBuf,
}

pub type SharedState = Arc<RwLock<AppStateInner>>;

impl AppStateInner {
    pub fn new(pipeline: TopologyPipeline) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            pipeline,
            recorder: None,
            replay: None,
            replay_generation: 0,
            latest: None,
            tx,
            start_time: Instant::now(),
            published: 0,
            recordings_dir: PathBuf::from("."),
        }
    }

    pub fn with_recordings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.recordings_dir = dir.into();
        self
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }

    pub fn config(&self) -> &PipelineConfig {
        self.pipeline.config()
    }

    pub fn replay_active(&self) -> bool {
        self.replay.is_some()
    }

    /// Validate and apply a configuration patch.
    pub fn reconfigure(&mut self, patch: &ConfigPatch) -> Result<PipelineConfig, ConfigError> {
        self.pipeline.reconfigure(patch).cloned()
    }

    /// Hand a snapshot to every sink.
    ///
    /// Recording failures are logged and close the recorder; they never
    /// interrupt publishing.
    pub fn publish(&mut self, snapshot: Arc<Snapshot>, record: bool) {
        if record {
            if let Some(recorder) = self.recorder.as_mut() {
                if let Err(e) = recorder.append(&snapshot) {
                    warn!("recording stopped: {e}");
                    self.recorder = None;
                    self.pipeline.set_recording(false);
                }
            }
        }
        self.latest = Some(Arc::clone(&snapshot));
        self.published += 1;
        // No receivers is fine.
        let _ = self.tx.send(snapshot);
    }

    pub fn start_recording(&mut self, recorder: SnapshotRecorder) {
        self.recorder = Some(recorder);
        self.pipeline.set_recording(true);
    }

    /// Stop recording; returns the path that was being written.
    pub fn stop_recording(&mut self) -> Option<PathBuf> {
        self.pipeline.set_recording(false);
        self.recorder.take().map(|r| r.path().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wifi_topology_core::snapshot::Mode;
    use wifi_topology_scan::ScanSource;

    fn inner() -> AppStateInner {
        let pipeline =
            TopologyPipeline::new(PipelineConfig::default(), ScanSource::Simulated).unwrap();
        AppStateInner::new(pipeline)
    }

    #[test]
    fn publish_updates_latest_and_broadcasts() {
        let mut s = inner();
        let mut rx = s.tx.subscribe();
        let snap = s.pipeline.build_snapshot(1_000, Mode::Live);
        s.publish(Arc::clone(&snap), true);
        assert_eq!(s.latest.as_ref().unwrap().t, 1_000);
        assert_eq!(rx.try_recv().unwrap().t, 1_000);
        assert_eq!(s.published, 1);
    }

    #[test]
    fn recording_flag_follows_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec.ndjson");
        let mut s = inner();
        s.start_recording(SnapshotRecorder::open(&path).unwrap());
        let snap = s.pipeline.build_snapshot(1_000, Mode::Live);
        assert!(snap.meta.recording);
        s.publish(snap, true);
        assert_eq!(s.stop_recording(), Some(path.clone()));
        assert!(!s.pipeline.build_snapshot(2_000, Mode::Live).meta.recording);
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);
    }
}
