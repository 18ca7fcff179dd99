//! Replay driver.
//!
//! Starting a replay suspends the live driver; the replay task hands the
//! timeline back when it stops, finishes, or is replaced.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::info;
use wifi_topology_core::replay::MIN_REPLAY_SPEED;
use wifi_topology_core::{read_recording, ReplayCursor};

use crate::error::ServerError;
use crate::state::{ReplayHandle, SharedState};

/// Reported replay state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayStatus {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    pub looping: bool,
}

impl ReplayStatus {
    pub fn inactive() -> Self {
        Self {
            active: false,
            path: None,
            speed: None,
            total: None,
            looping: false,
        }
    }
}

/// Normalize a requested replay speed: at least [`MIN_REPLAY_SPEED`],
/// with non-finite values meaning normal speed.
pub fn effective_speed(speed: f64) -> f64 {
    if speed.is_finite() {
        speed.max(MIN_REPLAY_SPEED)
    } else {
        1.0
    }
}

/// Load `path` and start replaying it, replacing any running replay.
///
/// Loading happens before any state changes, so an unreadable or empty
/// recording leaves live mode untouched.
pub async fn start_replay(
    state: &SharedState,
    path: PathBuf,
    speed: f64,
    looping: bool,
) -> Result<ReplayStatus, ServerError> {
    let load_path = path.clone();
    let recording = tokio::task::spawn_blocking(move || read_recording(load_path))
        .await
        .map_err(|e| ServerError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

    let speed = effective_speed(speed);
    let total = recording.len();
    let cursor = ReplayCursor::new(recording, speed, looping);
    let (stop_tx, stop_rx) = watch::channel(false);

    let generation = {
        let mut s = state.write().await;
        if let Some(previous) = s.replay.take() {
            let _ = previous.stop.send(true);
        }
        s.replay_generation += 1;
        let generation = s.replay_generation;
        s.replay = Some(ReplayHandle {
            path: path.clone(),
            speed,
            looping,
            total,
            generation,
            stop: stop_tx,
        });
        generation
    };

    info!(
        "replay started: {} ({} entries, speed {}, loop {})",
        path.display(),
        total,
        speed,
        looping
    );
    tokio::spawn(run_replay(Arc::clone(state), cursor, stop_rx, generation));

    Ok(ReplayStatus {
        active: true,
        path: Some(path.display().to_string()),
        speed: Some(speed),
        total: Some(total),
        looping,
    })
}

/// Stop the running replay, if any. Returns whether one was running.
pub async fn stop_replay(state: &SharedState) -> bool {
    let mut s = state.write().await;
    match s.replay.take() {
        Some(handle) => {
            let _ = handle.stop.send(true);
            info!("replay stopped, resuming live mode");
            true
        }
        None => false,
    }
}

/// Current replay state.
pub async fn replay_status(state: &SharedState) -> ReplayStatus {
    let s = state.read().await;
    match &s.replay {
        Some(h) => ReplayStatus {
            active: true,
            path: Some(h.path.display().to_string()),
            speed: Some(h.speed),
            total: Some(h.total),
            looping: h.looping,
        },
        None => ReplayStatus::inactive(),
    }
}

async fn run_replay(
    state: SharedState,
    mut cursor: ReplayCursor,
    mut stop: watch::Receiver<bool>,
    generation: u64,
) {
    loop {
        if *stop.borrow() {
            return;
        }

        let delay = {
            let mut s = state.write().await;
            // Superseded or stopped while waiting for the lock.
            if s.replay.as_ref().map(|h| h.generation) != Some(generation) {
                return;
            }
            let fallback = s.config().scan_interval_ms;
            match cursor.next_frame(fallback) {
                Some(frame) => {
                    s.publish(Arc::new(frame.snapshot), false);
                    frame.delay_ms
                }
                None => None,
            }
        };

        let Some(delay_ms) = delay else { break };

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    return;
                }
            }
        }
    }

    let mut s = state.write().await;
    if s.replay.as_ref().map(|h| h.generation) == Some(generation) {
        s.replay = None;
        info!("replay finished, resuming live mode");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wifi_topology_core::snapshot::Mode;
    use wifi_topology_core::{PipelineConfig, SnapshotRecorder, TopologyPipeline};
    use wifi_topology_scan::ScanSource;

    use crate::state::AppStateInner;

    fn shared() -> SharedState {
        let pipeline =
            TopologyPipeline::new(PipelineConfig::default(), ScanSource::Simulated).unwrap();
        AppStateInner::new(pipeline).into_shared()
    }

    fn write_recording(path: &std::path::Path, times: &[i64]) {
        let mut p = TopologyPipeline::new(PipelineConfig::default(), ScanSource::Simulated).unwrap();
        let mut rec = SnapshotRecorder::open(path).unwrap();
        for &t in times {
            rec.append(&p.build_snapshot(t, Mode::Live)).unwrap();
        }
    }

    #[tokio::test]
    async fn replay_runs_to_completion_and_resumes_live() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.ndjson");
        write_recording(&path, &[1_000, 1_050, 1_100]);

        let state = shared();
        let mut rx = state.read().await.tx.subscribe();
        let status = start_replay(&state, path, 1.0, false).await.unwrap();
        assert_eq!(status.total, Some(3));
        assert!(state.read().await.replay_active());

        for expected in 0..3usize {
            let snap = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(snap.meta.mode, Mode::Replay);
            assert_eq!(snap.meta.replay_index, Some(expected));
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!state.read().await.replay_active());
    }

    #[test]
    fn speed_is_floored_not_reset() {
        assert_eq!(effective_speed(0.0), MIN_REPLAY_SPEED);
        assert_eq!(effective_speed(-3.0), MIN_REPLAY_SPEED);
        assert_eq!(effective_speed(0.05), MIN_REPLAY_SPEED);
        assert_eq!(effective_speed(2.5), 2.5);
        assert_eq!(effective_speed(f64::NAN), 1.0);
        assert_eq!(effective_speed(f64::INFINITY), 1.0);
    }

    #[tokio::test]
    async fn zero_speed_replays_at_the_floor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slow.ndjson");
        write_recording(&path, &[1_000, 1_100]);

        let state = shared();
        let mut rx = state.read().await.tx.subscribe();
        let status = start_replay(&state, path, 0.0, false).await.unwrap();
        assert_eq!(status.speed, Some(MIN_REPLAY_SPEED));

        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let started = std::time::Instant::now();
        assert_eq!(first.meta.replay_speed, Some(MIN_REPLAY_SPEED));

        // 100 ms recorded at speed 0.1 is 1000 ms of replay.
        let second = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let gap = started.elapsed();
        assert_eq!(second.meta.replay_index, Some(1));
        assert!(gap >= Duration::from_millis(900), "gap {gap:?}");
        assert!(gap < Duration::from_millis(2_000), "gap {gap:?}");
    }

    #[tokio::test]
    async fn status_reports_total_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.ndjson");
        write_recording(&path, &[0, 10_000, 20_000]);

        let state = shared();
        start_replay(&state, path, 1.0, true).await.unwrap();
        let status = replay_status(&state).await;
        assert!(status.active);
        assert_eq!(status.total, Some(3));
        assert!(status.looping);
        stop_replay(&state).await;
    }

    #[tokio::test]
    async fn stop_hands_back_timeline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.ndjson");
        write_recording(&path, &[0, 10_000]);

        let state = shared();
        start_replay(&state, path, 1.0, true).await.unwrap();
        assert!(stop_replay(&state).await);
        assert!(!state.read().await.replay_active());
        assert!(!stop_replay(&state).await);
        assert_eq!(replay_status(&state).await, ReplayStatus::inactive());
    }

    #[tokio::test]
    async fn unreadable_recording_leaves_live_mode() {
        let state = shared();
        let err = start_replay(&state, PathBuf::from("/nonexistent/rec.ndjson"), 1.0, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Replay(_)));
        assert!(!state.read().await.replay_active());
    }
}
