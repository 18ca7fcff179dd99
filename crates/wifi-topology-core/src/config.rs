//! Pipeline configuration.
//!
//! [`PipelineConfig`] is the single source of truth for every tunable of the
//! aggregation pipeline. It is serializable so the server can expose it over
//! HTTP and embed it in snapshot metadata.
//!
//! Runtime changes arrive as a [`ConfigPatch`]. A patch is merged into a copy
//! of the active configuration and validated as a whole; the pipeline only
//! swaps the copy in when validation succeeds, so a rejected patch never
//! leaves a half-applied configuration behind.
//!
//! ```rust
//! use wifi_topology_core::config::{ConfigPatch, PipelineConfig};
//!
//! let cfg = PipelineConfig::default();
//! cfg.validate().expect("default config is valid");
//!
//! let bad = ConfigPatch { window_size: Some(4), ..Default::default() };
//! assert!(cfg.merged(&bad).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Complete configuration for one pipeline instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Live tick period in milliseconds. Range **[300, 10000]**, default **2000**.
    pub scan_interval_ms: u64,

    /// Rolling sample cap per entity. Range **[8, 240]**, default **30**.
    ///
    /// Shrinking it truncates existing histories immediately.
    pub window_size: usize,

    /// Staleness cutoff after which an entity is removed. Default **30000**.
    pub evict_after_ms: u64,

    /// Cap on active entities per snapshot, ranked by latest signal.
    /// Default **64**.
    pub max_aps: usize,

    /// Minimum aligned-sample count for a correlation to be computed at all.
    /// Default **6**, never larger than `window_size`.
    pub min_overlap: usize,

    /// Strict lower bound for an edge or cluster link.
    /// Range **[0.05, 0.98]**, default **0.6**.
    pub edge_threshold: f64,

    /// Global cap on retained edges per snapshot. Default **200**.
    pub max_edges: usize,

    /// Strongest partners kept per node before merging. Default **3**.
    pub max_edges_per_node: usize,

    /// Radius of the embedding after rescale. Default **10.0**.
    pub embed_radius: f64,

    /// Fraction of the way each position moves toward its new target per
    /// snapshot. Range **(0, 1]**, default **0.35**.
    pub smoothing: f64,

    /// Emit a snapshot every N live ticks. Default **1**.
    pub snapshot_every_ticks: u32,

    /// Scan timeout after which a tick counts as "no new observations".
    /// Default **8000**.
    pub scan_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 2_000,
            window_size: 30,
            evict_after_ms: 30_000,
            max_aps: 64,
            min_overlap: 6,
            edge_threshold: 0.6,
            max_edges: 200,
            max_edges_per_node: 3,
            embed_radius: 10.0,
            smoothing: 0.35,
            snapshot_every_ticks: 1,
            scan_timeout_ms: 8_000,
        }
    }
}

impl PipelineConfig {
    /// Validate every field and cross-field constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("scanIntervalMs", self.scan_interval_ms as f64, 300.0, 10_000.0)?;
        check_range("windowSize", self.window_size as f64, 8.0, 240.0)?;
        check_range("evictAfterMs", self.evict_after_ms as f64, 1_000.0, 3_600_000.0)?;
        check_range("maxAps", self.max_aps as f64, 2.0, 512.0)?;
        check_range("minOverlap", self.min_overlap as f64, 2.0, 240.0)?;
        check_range("edgeThreshold", self.edge_threshold, 0.05, 0.98)?;
        check_range("maxEdges", self.max_edges as f64, 1.0, 5_000.0)?;
        check_range("maxEdgesPerNode", self.max_edges_per_node as f64, 1.0, 32.0)?;
        check_range("snapshotEveryTicks", f64::from(self.snapshot_every_ticks), 1.0, 100.0)?;
        check_range("scanTimeoutMs", self.scan_timeout_ms as f64, 100.0, 60_000.0)?;

        if !(self.embed_radius > 0.0 && self.embed_radius <= 1_000.0) {
            return Err(ConfigError::invalid("embedRadius", "must be in (0, 1000]"));
        }
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(ConfigError::invalid("smoothing", "must be in (0, 1]"));
        }
        if self.min_overlap > self.window_size {
            return Err(ConfigError::invalid(
                "minOverlap",
                format!(
                    "{} exceeds windowSize {}; no correlation could ever be computed",
                    self.min_overlap, self.window_size
                ),
            ));
        }
        Ok(())
    }

    /// Return a validated copy of `self` with `patch` applied.
    pub fn merged(&self, patch: &ConfigPatch) -> Result<Self, ConfigError> {
        let mut next = self.clone();
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = patch.$field { next.$field = v; })*
            };
        }
        apply!(
            scan_interval_ms,
            window_size,
            evict_after_ms,
            max_aps,
            min_overlap,
            edge_threshold,
            max_edges,
            max_edges_per_node,
            embed_radius,
            smoothing,
            snapshot_every_ticks,
            scan_timeout_ms,
        );
        next.validate()?;
        Ok(next)
    }
}

/// A partial configuration update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigPatch {
    pub scan_interval_ms: Option<u64>,
    pub window_size: Option<usize>,
    pub evict_after_ms: Option<u64>,
    pub max_aps: Option<usize>,
    pub min_overlap: Option<usize>,
    pub edge_threshold: Option<f64>,
    pub max_edges: Option<usize>,
    pub max_edges_per_node: Option<usize>,
    pub embed_radius: Option<f64>,
    pub smoothing: Option<f64>,
    pub snapshot_every_ticks: Option<u32>,
    pub scan_timeout_ms: Option<u64>,
}

impl ConfigPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn scan_interval_bounds() {
        let cfg = PipelineConfig::default();
        for bad in [299, 10_001] {
            let patch = ConfigPatch {
                scan_interval_ms: Some(bad),
                ..Default::default()
            };
            assert!(matches!(
                cfg.merged(&patch),
                Err(ConfigError::OutOfRange { field: "scanIntervalMs", .. })
            ));
        }
        let ok = ConfigPatch {
            scan_interval_ms: Some(300),
            ..Default::default()
        };
        assert_eq!(cfg.merged(&ok).unwrap().scan_interval_ms, 300);
    }

    #[test]
    fn edge_threshold_bounds() {
        let cfg = PipelineConfig::default();
        for bad in [0.01, 0.99, f64::NAN] {
            let patch = ConfigPatch {
                edge_threshold: Some(bad),
                ..Default::default()
            };
            assert!(cfg.merged(&patch).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn min_overlap_cannot_exceed_window() {
        let cfg = PipelineConfig::default();
        let patch = ConfigPatch {
            window_size: Some(8),
            min_overlap: Some(9),
            ..Default::default()
        };
        assert!(matches!(
            cfg.merged(&patch),
            Err(ConfigError::Invalid { field: "minOverlap", .. })
        ));
    }

    #[test]
    fn rejected_patch_leaves_source_untouched() {
        let cfg = PipelineConfig::default();
        let patch = ConfigPatch {
            window_size: Some(10),
            edge_threshold: Some(5.0),
            ..Default::default()
        };
        assert!(cfg.merged(&patch).is_err());
        assert_eq!(cfg, PipelineConfig::default());
    }

    #[test]
    fn patch_deserializes_camel_case_and_rejects_unknown() {
        let patch: ConfigPatch =
            serde_json::from_str(r#"{"windowSize": 12, "edgeThreshold": 0.7}"#).unwrap();
        assert_eq!(patch.window_size, Some(12));
        assert_eq!(patch.edge_threshold, Some(0.7));
        assert!(serde_json::from_str::<ConfigPatch>(r#"{"bogus": 1}"#).is_err());
        assert!(ConfigPatch::default().is_empty());
    }
}
