//! Command-line interface.
//!
//! ```bash
//! # Live server with the simulated scanner
//! wifi-topology --source simulate --http-port 8080
//!
//! # Reachable from the LAN, REST recordings kept under ./recordings
//! wifi-topology --bind 0.0.0.0 --recordings-dir recordings
//!
//! # Record a live session
//! wifi-topology --record session.ndjson
//!
//! # Replay a session at double speed, looping
//! wifi-topology --replay session.ndjson --replay-speed 2 --replay-loop
//!
//! # Headless 60 s analysis written as Markdown
//! wifi-topology --analyze 60 --report-format md --out report.md
//! ```

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use wifi_topology_core::{ConfigError, ConfigPatch, PipelineConfig};

use crate::report::ReportFormat;

/// Which scan backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    /// Probe the platform tooling, falling back to simulation.
    Auto,
    /// Linux `iw`.
    Iw,
    /// Windows `netsh wlan`.
    Netsh,
    /// macOS CoreWLAN helper.
    Corewlan,
    /// Deterministic synthetic access points.
    Simulate,
}

/// WiFi topology server
#[derive(Parser, Debug, Clone)]
#[command(name = "wifi-topology")]
#[command(author, version, about = "Live WiFi access-point topology from signal correlation")]
pub struct Args {
    /// Scan backend
    #[arg(long, value_enum, default_value = "auto")]
    pub source: SourceArg,

    /// Wireless interface for the `iw` backend
    #[arg(long, default_value = "wlan0")]
    pub interface: String,

    /// Path of the CoreWLAN helper executable
    #[arg(long, value_name = "PATH", default_value = "mac_wifi")]
    pub corewlan_helper: String,

    /// Seed of the simulated scanner
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Address the HTTP server binds to
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1")]
    pub bind: IpAddr,

    /// HTTP port for the REST API, WebSocket and UI
    #[arg(long, default_value = "8080")]
    pub http_port: u16,

    /// Directory that recording paths given over HTTP are confined to
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub recordings_dir: PathBuf,

    /// Directory of static UI files served under /ui
    #[arg(long, value_name = "DIR")]
    pub ui_path: Option<PathBuf>,

    /// Run headless for SECONDS, print a report and exit
    #[arg(long, value_name = "SECONDS", conflicts_with = "replay")]
    pub analyze: Option<u64>,

    /// Report format for --analyze
    #[arg(long, value_enum, default_value = "md")]
    pub report_format: ReportFormat,

    /// Write the --analyze report to PATH instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Replay a recording at startup
    #[arg(long, value_name = "PATH")]
    pub replay: Option<PathBuf>,

    /// Replay speed multiplier
    #[arg(long, default_value = "1.0")]
    pub replay_speed: f64,

    /// Loop the replay instead of returning to live mode
    #[arg(long)]
    pub replay_loop: bool,

    /// Append every live snapshot to PATH (NDJSON)
    #[arg(long, value_name = "PATH")]
    pub record: Option<PathBuf>,

    /// Live tick period in milliseconds
    #[arg(long, value_name = "MS")]
    pub scan_interval_ms: Option<u64>,

    /// Rolling sample window per access point
    #[arg(long)]
    pub window_size: Option<usize>,

    /// Forget access points unseen for this long
    #[arg(long, value_name = "MS")]
    pub evict_after_ms: Option<u64>,

    /// Maximum access points per snapshot
    #[arg(long)]
    pub max_aps: Option<usize>,

    /// Minimum aligned samples for a correlation
    #[arg(long)]
    pub min_overlap: Option<usize>,

    /// Correlation an edge must exceed
    #[arg(long)]
    pub edge_threshold: Option<f64>,

    /// Maximum edges per snapshot
    #[arg(long)]
    pub max_edges: Option<usize>,

    /// Emit a snapshot every N live ticks
    #[arg(long)]
    pub snapshot_every_ticks: Option<u32>,
}

impl Args {
    /// Configuration overrides given on the command line.
    pub fn config_patch(&self) -> ConfigPatch {
        ConfigPatch {
            scan_interval_ms: self.scan_interval_ms,
            window_size: self.window_size,
            evict_after_ms: self.evict_after_ms,
            max_aps: self.max_aps,
            min_overlap: self.min_overlap,
            edge_threshold: self.edge_threshold,
            max_edges: self.max_edges,
            snapshot_every_ticks: self.snapshot_every_ticks,
            ..Default::default()
        }
    }

    /// Default configuration with the command-line overrides applied.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        PipelineConfig::default().merged(&self.config_patch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let args = Args::try_parse_from(["wifi-topology"]).unwrap();
        assert_eq!(args.source, SourceArg::Auto);
        assert_eq!(args.http_port, 8080);
        assert!(args.bind.is_loopback());
        assert_eq!(args.recordings_dir, PathBuf::from("."));
        assert!(args.analyze.is_none());
        assert_eq!(args.pipeline_config().unwrap(), PipelineConfig::default());
    }

    #[test]
    fn overrides_flow_into_config() {
        let args = Args::try_parse_from([
            "wifi-topology",
            "--source",
            "simulate",
            "--window-size",
            "12",
            "--edge-threshold",
            "0.75",
            "--analyze",
            "5",
            "--report-format",
            "json",
        ])
        .unwrap();
        let cfg = args.pipeline_config().unwrap();
        assert_eq!(cfg.window_size, 12);
        assert_eq!(cfg.edge_threshold, 0.75);
        assert_eq!(args.analyze, Some(5));
        assert_eq!(args.report_format, ReportFormat::Json);
    }

    #[test]
    fn bind_address_parses() {
        let args = Args::try_parse_from(["wifi-topology", "--bind", "0.0.0.0"]).unwrap();
        assert!(args.bind.is_unspecified());
        assert!(Args::try_parse_from(["wifi-topology", "--bind", "not-an-ip"]).is_err());
    }

    #[test]
    fn out_of_range_override_is_rejected() {
        let args = Args::try_parse_from(["wifi-topology", "--scan-interval-ms", "50"]).unwrap();
        assert!(args.pipeline_config().is_err());
    }

    #[test]
    fn analyze_conflicts_with_replay() {
        assert!(Args::try_parse_from(["wifi-topology", "--analyze", "5", "--replay", "x.ndjson"]).is_err());
    }
}
