//! Analyze driver: a bounded headless run that ends in one summary.

use std::time::Duration;

use tokio::time::Instant;
use tracing::info;
use wifi_topology_core::snapshot::Mode;
use wifi_topology_core::summary::{RunStats, DEFAULT_TOP_N};
use wifi_topology_core::{AnalysisSummary, PipelineConfig, TopologyPipeline};

use crate::error::ServerError;
use crate::scanner::{now_ms, ScanRunner, SharedScanner};

/// Scan for `duration`, then build a single snapshot and summary.
///
/// Each iteration scans, then sleeps for whatever remains of the scan
/// interval, never past the overall deadline. Fails with
/// [`ServerError::NoObservations`] if no access point was ever seen; a run
/// whose access points were all evicted again still succeeds.
pub async fn run_analyze(
    scanner: SharedScanner,
    config: PipelineConfig,
    duration: Duration,
) -> Result<AnalysisSummary, ServerError> {
    let mut pipeline = TopologyPipeline::new(config, scanner.source())?;
    let mut runner = ScanRunner::new(scanner);
    let interval = Duration::from_millis(pipeline.config().scan_interval_ms);
    let timeout = Duration::from_millis(pipeline.config().scan_timeout_ms);

    let started_at_ms = now_ms();
    let started = Instant::now();
    let deadline = started + duration;
    let mut scans = 0usize;

    info!("analyzing for {} s", duration.as_secs_f64());

    loop {
        let iteration = Instant::now();
        let batch = runner.scan(timeout).await;
        pipeline.ingest(&batch);
        scans += 1;

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let wait = interval
            .saturating_sub(now - iteration)
            .min(deadline - now);
        tokio::time::sleep(wait).await;
        if Instant::now() >= deadline {
            break;
        }
    }

    let ended_at_ms = now_ms();
    let distinct = pipeline.store().distinct_seen();
    if distinct == 0 {
        return Err(ServerError::NoObservations {
            scans,
            duration_ms: started.elapsed().as_millis() as u64,
        });
    }

    let snapshot = pipeline.build_snapshot(ended_at_ms, Mode::Analyze);
    info!(
        "analysis complete: {} scans, {} distinct APs, {} active",
        scans,
        distinct,
        snapshot.aps.len()
    );

    let run = RunStats {
        started_at_ms,
        ended_at_ms,
        scan_count: scans,
        distinct_aps_seen: distinct,
    };
    Ok(AnalysisSummary::build(run, &snapshot, DEFAULT_TOP_N))
}
