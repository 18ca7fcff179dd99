//! # wifi-topology-server
//!
//! Drivers and transport around [`wifi_topology_core`]:
//!
//! - [`live`] -- fixed-interval scan / ingest / publish loop
//! - [`replay`] -- paced playback of NDJSON recordings
//! - [`analyze`] -- bounded headless run ending in an
//!   [`AnalysisSummary`](wifi_topology_core::AnalysisSummary)
//! - [`http`] -- axum router: WebSocket stream, REST control, static UI
//! - [`report`] -- Markdown / JSON rendering of analysis summaries
//! - [`cli`] -- command-line arguments
//!
//! All drivers share one [`state::SharedState`], so live ticks, replay
//! steps and configuration changes never interleave.

pub mod analyze;
pub mod cli;
pub mod error;
pub mod http;
pub mod live;
pub mod replay;
pub mod report;
pub mod scanner;
pub mod state;

pub use cli::{Args, SourceArg};
pub use error::ServerError;
pub use state::{AppStateInner, SharedState};
