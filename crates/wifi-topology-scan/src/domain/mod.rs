//! Domain types for the observation boundary.

pub mod band;
pub mod observation;

pub use band::{Band, ScanSource};
pub use observation::{
    normalize_batch, synthetic_id, ApObservation, ObservationBatch, Provenance, RawObservation,
    HIDDEN_LABEL,
};
