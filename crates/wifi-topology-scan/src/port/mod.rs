//! Port definitions for observation acquisition.
//!
//! The scan backend is hidden behind [`ScanPort`] so that platform adapters,
//! the simulated source and test doubles can be swapped transparently by the
//! drivers.

mod scan_port;

pub use scan_port::ScanPort;
