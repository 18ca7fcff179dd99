//! # wifi-topology-core
//!
//! Streaming aggregation and topology inference over WiFi access-point
//! observations.
//!
//! Each tick an [`ObservationBatch`](wifi_topology_scan::ObservationBatch)
//! flows through:
//!
//! ```text
//! EntityStore (ingest + evict)
//!   -> stats::build_correlation_matrix
//!   -> edges::select_edges
//!   -> clusters::detect_clusters
//!   -> embedding::embed (classical MDS + stabilization + smoothing)
//!   -> metrics
//!   -> Snapshot
//! ```
//!
//! [`TopologyPipeline`] owns the mutable state of one instance. Snapshots are
//! immutable and shared as `Arc<Snapshot>` with every sink.
//!
//! ## Modules
//!
//! - [`config`] -- pipeline configuration and validated patches
//! - [`stats`] -- mean, variance, weighted Pearson, correlation matrix
//! - [`store`] -- rolling per-entity windows and provenance weights
//! - [`edges`] / [`clusters`] -- sparse graph and connected components
//! - [`embedding`] -- 3D spatial embedding and the position store
//! - [`metrics`] -- stability score, channel density and recommendations
//! - [`snapshot`] / [`pipeline`] / [`summary`] -- assembled outputs
//! - [`replay`] / [`record`] -- NDJSON recordings

pub mod clusters;
pub mod config;
pub mod edges;
pub mod embedding;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod record;
pub mod replay;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod summary;

pub use clusters::{detect_clusters, ClusterAssignment, Clustering};
pub use config::{ConfigPatch, PipelineConfig};
pub use edges::{select_edges, Edge};
pub use embedding::{embed, Position, PositionStore};
pub use error::{ConfigError, RecordError, ReplayError};
pub use metrics::RankedAp;
pub use pipeline::TopologyPipeline;
pub use record::SnapshotRecorder;
pub use replay::{read_recording, replay_delay_ms, Recording, ReplayCursor, ReplayFrame};
pub use snapshot::{ApView, Mode, Snapshot, SnapshotMeta};
pub use store::{EntityRecord, EntityStore};
pub use summary::{AnalysisSummary, RunStats};
