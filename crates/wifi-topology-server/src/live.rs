//! Live tick driver.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info};
use wifi_topology_core::snapshot::Mode;

use crate::scanner::{ScanRunner, SharedScanner};
use crate::state::SharedState;

fn tick_interval(period_ms: u64) -> Interval {
    let mut iv = interval(Duration::from_millis(period_ms));
    iv.set_missed_tick_behavior(MissedTickBehavior::Skip);
    iv
}

/// Scan, ingest and publish on a fixed period until `shutdown` flips.
///
/// The loop is sequential, so a slow scan delays the next tick instead of
/// overlapping it, and a scan that timed out blocks new scans until it
/// returns. Ticks are skipped while a replay owns the timeline, and
/// a changed `scanIntervalMs` takes effect from the next tick.
pub async fn run_live(state: SharedState, scanner: SharedScanner, mut shutdown: watch::Receiver<bool>) {
    let mut period_ms = state.read().await.config().scan_interval_ms;
    let mut ticker = tick_interval(period_ms);
    let mut runner = ScanRunner::new(scanner);
    info!("live driver started ({} ms interval)", period_ms);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        let (timeout_ms, replaying) = {
            let s = state.read().await;
            (s.config().scan_timeout_ms, s.replay_active())
        };
        if replaying {
            continue;
        }

        let batch = runner.scan(Duration::from_millis(timeout_ms)).await;

        let next_period = {
            let mut s = state.write().await;
            // A replay may have started while the scan was in flight.
            if !s.replay_active() {
                if let Some(snapshot) = s.pipeline.tick(&batch, Mode::Live) {
                    debug!(t = snapshot.t, aps = snapshot.aps.len(), "live snapshot");
                    s.publish(snapshot, true);
                }
            }
            s.config().scan_interval_ms
        };

        if next_period != period_ms {
            info!("scan interval changed {} -> {} ms", period_ms, next_period);
            period_ms = next_period;
            ticker = tick_interval(period_ms);
            // The first tick of a fresh interval fires immediately.
            ticker.tick().await;
        }
    }

    info!("live driver stopped");
}
