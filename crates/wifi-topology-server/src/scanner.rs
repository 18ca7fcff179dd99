//! Scan backend selection and the timeout-bounded scan step.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wifi_topology_scan::{
    normalize_batch, CoreWlanScanner, LinuxIwScanner, NetshScanner, ObservationBatch,
    RawObservation, ScanError, ScanPort, ScanSource, SimulatedScanner,
};

use crate::cli::{Args, SourceArg};

/// Scanner shared between the live driver and blocking scan tasks.
pub type SharedScanner = Arc<dyn ScanPort>;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

async fn probe(program: &str, args: &[&str]) -> bool {
    match tokio::process::Command::new(program).args(args).output().await {
        Ok(o) => o.status.success(),
        Err(_) => false,
    }
}

/// Resolve `--source auto` by probing the platform tooling.
pub async fn resolve_source(args: &Args) -> SourceArg {
    if args.source != SourceArg::Auto {
        return args.source;
    }
    info!("Auto-detecting scan source...");
    let detected = if cfg!(target_os = "linux") && probe("iw", &["dev"]).await {
        SourceArg::Iw
    } else if cfg!(target_os = "windows") && probe("netsh", &["wlan", "show", "interfaces"]).await {
        SourceArg::Netsh
    } else if cfg!(target_os = "macos") && probe(&args.corewlan_helper, &["--scan-once"]).await {
        SourceArg::Corewlan
    } else {
        SourceArg::Simulate
    };
    info!("  using {detected:?}");
    detected
}

/// Build the scanner for a resolved source.
///
/// Auto-detected `iw` reads cached results so it works without root.
pub fn build_scanner(source: SourceArg, args: &Args) -> SharedScanner {
    match source {
        SourceArg::Iw => {
            let scanner = LinuxIwScanner::with_interface(args.interface.clone());
            if args.source == SourceArg::Auto {
                Arc::new(scanner.use_cached())
            } else {
                Arc::new(scanner)
            }
        }
        SourceArg::Netsh => Arc::new(NetshScanner::new()),
        SourceArg::Corewlan => Arc::new(CoreWlanScanner::with_path(args.corewlan_helper.clone())),
        SourceArg::Simulate | SourceArg::Auto => Arc::new(SimulatedScanner::new(args.seed)),
    }
}

type ScanTask = JoinHandle<Result<Vec<RawObservation>, ScanError>>;

/// Runs scans on the blocking pool, at most one at a time.
///
/// A scan that outlives its timeout cannot be cancelled: the blocking
/// subprocess call keeps running. The runner holds on to that task and
/// skips further scans until it has finished, so a hung backend costs one
/// blocking thread instead of one per tick.
pub struct ScanRunner {
    scanner: SharedScanner,
    in_flight: Option<ScanTask>,
}

impl ScanRunner {
    pub fn new(scanner: SharedScanner) -> Self {
        Self {
            scanner,
            in_flight: None,
        }
    }

    pub fn source(&self) -> ScanSource {
        self.scanner.source()
    }

    /// Whether a timed-out scan is still running.
    pub fn busy(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Run one scan bounded by `timeout`.
    ///
    /// Failures, panics and timeouts all resolve to an empty batch: a bad
    /// tick means "no new observations", never an error. While an earlier
    /// scan is still running no new scan starts and the batch is empty.
    pub async fn scan(&mut self, timeout: Duration) -> ObservationBatch {
        let source = self.scanner.source();

        if self.busy() {
            debug!("previous scan still running, skipping");
            return ObservationBatch::empty(source, now_ms());
        }
        // A late result from a timed-out scan is stale; drop it.
        self.in_flight = None;

        let task_scanner = Arc::clone(&self.scanner);
        let mut task: ScanTask = tokio::task::spawn_blocking(move || task_scanner.scan());

        let raws = match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(Ok(raws))) => raws,
            Ok(Ok(Err(e))) => {
                warn!("scan failed: {e}");
                return ObservationBatch::empty(source, now_ms());
            }
            Ok(Err(join_err)) => {
                warn!("scan task panicked: {join_err}");
                return ObservationBatch::empty(source, now_ms());
            }
            Err(_) => {
                warn!("scan timed out after {} ms", timeout.as_millis());
                self.in_flight = Some(task);
                return ObservationBatch::empty(source, now_ms());
            }
        };

        let batch = normalize_batch(source, now_ms(), raws);
        debug!(
            observations = batch.len(),
            dropped = batch.dropped,
            "scan complete"
        );
        batch
    }
}
