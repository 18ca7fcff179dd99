//! # wifi-topology-scan
//!
//! Observation boundary for the WiFi topology pipeline.
//!
//! This crate owns everything between the operating system's scan tooling
//! and the aggregation core:
//!
//! - **Domain types**: [`RawObservation`], [`ApObservation`], [`ObservationBatch`],
//!   [`Band`], [`ScanSource`], [`Provenance`]
//! - **Port**: [`ScanPort`] -- trait abstracting the platform scan backend
//! - **Adapters**: [`LinuxIwScanner`], [`NetshScanner`], [`CoreWlanScanner`]
//!   and the deterministic [`SimulatedScanner`]
//!
//! Adapters only ever produce [`RawObservation`] rows. Every row passes
//! through [`normalize_batch`] before it reaches the entity store, so the
//! core never sees a duplicate id, a missing identifier, or an unclamped
//! signal value.

pub mod adapter;
pub mod domain;
pub mod error;
pub mod port;

pub use adapter::{
    parse_corewlan_output, parse_iw_scan_output, parse_netsh_output, CoreWlanScanner,
    LinuxIwScanner, NetshScanner, SimulatedScanner,
};
pub use domain::band::{Band, ScanSource};
pub use domain::observation::{
    normalize_batch, synthetic_id, ApObservation, ObservationBatch, Provenance, RawObservation,
    HIDDEN_LABEL,
};
pub use error::ScanError;
pub use port::ScanPort;
