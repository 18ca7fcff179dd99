//! Entity state store.
//!
//! One [`EntityRecord`] per tracked access point, keyed by its stable id.
//! Each record keeps a bounded FIFO window of signal samples plus a parallel
//! window of provenance weights. The store never orders, correlates or
//! embeds anything; it only ingests batches and evicts stale records.

use std::collections::{HashMap, HashSet, VecDeque};

use wifi_topology_scan::{ApObservation, Band, ObservationBatch, Provenance, ScanSource, HIDDEN_LABEL};

use crate::stats;

// ---------------------------------------------------------------------------
// Sample weights
// ---------------------------------------------------------------------------

/// Weight of a reading whose signal value was inferred.
pub const WEIGHT_ESTIMATED: f64 = 0.12;
/// Weight of a reading whose identifier was synthesized.
pub const WEIGHT_SYNTHETIC_ID: f64 = 0.35;
/// Weight of a reading from a coarse (percentage-only) scan source.
pub const WEIGHT_LOW_FIDELITY: f64 = 0.45;
/// Weight of a directly measured reading.
pub const WEIGHT_DIRECT: f64 = 1.0;

/// Derive a sample weight from provenance.
///
/// The least trustworthy applicable property wins, so the ordering
/// estimated < synthetic id < low fidelity < direct always holds.
pub fn sample_weight(provenance: &Provenance) -> f64 {
    let mut w = WEIGHT_DIRECT;
    if provenance.source.is_low_fidelity() {
        w = w.min(WEIGHT_LOW_FIDELITY);
    }
    if provenance.synthetic_id {
        w = w.min(WEIGHT_SYNTHETIC_ID);
    }
    if provenance.estimated {
        w = w.min(WEIGHT_ESTIMATED);
    }
    w.clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// EntityRecord -- Entity
// ---------------------------------------------------------------------------

/// Rolling state of one tracked access point.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    id: String,
    /// Human-readable name; never regresses to [`HIDDEN_LABEL`] once known.
    pub label: String,
    samples: VecDeque<i32>,
    weights: VecDeque<f64>,
    /// Most recent signal value in dBm.
    pub latest_value: i32,
    /// Weight of the most recent sample.
    pub latest_weight: f64,
    /// Whether the most recent value was inferred rather than measured.
    pub latest_estimated: bool,
    /// Whether the id was synthesized on the most recent observation.
    pub synthetic_id: bool,
    /// Backend of the most recent observation.
    pub scan_source: ScanSource,
    /// Epoch ms of the most recent observation.
    pub last_seen: i64,
    /// Epoch ms of the first observation.
    pub first_seen: i64,
    pub channel: Option<u16>,
    pub band: Option<Band>,
    pub security: String,
}

impl EntityRecord {
    fn new(obs: &ApObservation, now_ms: i64, window: usize) -> Self {
        Self {
            id: obs.id.clone(),
            label: obs.label.clone(),
            samples: VecDeque::with_capacity(window),
            weights: VecDeque::with_capacity(window),
            latest_value: obs.signal_dbm,
            latest_weight: sample_weight(&obs.provenance),
            latest_estimated: obs.provenance.estimated,
            synthetic_id: obs.provenance.synthetic_id,
            scan_source: obs.provenance.source,
            last_seen: now_ms,
            first_seen: now_ms,
            channel: obs.channel,
            band: obs.band,
            security: obs.security.clone(),
        }
    }

    fn record(&mut self, obs: &ApObservation, now_ms: i64, window: usize) {
        let weight = sample_weight(&obs.provenance);

        self.latest_value = obs.signal_dbm;
        self.latest_weight = weight;
        self.latest_estimated = obs.provenance.estimated;
        self.synthetic_id = obs.provenance.synthetic_id;
        self.scan_source = obs.provenance.source;
        self.last_seen = now_ms;
        self.channel = obs.channel;
        self.band = obs.band;
        self.security = obs.security.clone();

        if !(obs.is_hidden() && self.label != HIDDEN_LABEL) {
            self.label = obs.label.clone();
        }

        self.samples.push_back(obs.signal_dbm);
        self.weights.push_back(weight);
        self.truncate(window);
    }

    /// Keep only the `window` most recent samples.
    fn truncate(&mut self, window: usize) {
        while self.samples.len() > window {
            self.samples.pop_front();
        }
        while self.weights.len() > window {
            self.weights.pop_front();
        }
    }

    /// Stable identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of samples currently held.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Samples oldest-first as floating point.
    pub fn samples(&self) -> Vec<f64> {
        self.samples.iter().map(|&v| f64::from(v)).collect()
    }

    /// Raw integer samples oldest-first.
    pub fn raw_samples(&self) -> impl Iterator<Item = i32> + '_ {
        self.samples.iter().copied()
    }

    /// Sample weights oldest-first, parallel to [`EntityRecord::samples`].
    pub fn weights(&self) -> Vec<f64> {
        self.weights.iter().copied().collect()
    }

    /// Mean of the windowed samples, `None` when the window is empty.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            None
        } else {
            Some(stats::mean(&self.samples()))
        }
    }

    /// Sample variance of the window (0 for fewer than two samples).
    pub fn variance(&self) -> f64 {
        stats::variance(&self.samples())
    }

    /// Mean provenance weight of the window, in `[0, 1]`.
    pub fn sample_quality(&self) -> f64 {
        if self.weights.is_empty() {
            0.0
        } else {
            stats::mean(&self.weights()).clamp(0.0, 1.0)
        }
    }
}

// ---------------------------------------------------------------------------
// EntityStore -- Aggregate Root
// ---------------------------------------------------------------------------

/// All tracked entities plus window and staleness policy.
#[derive(Debug, Clone)]
pub struct EntityStore {
    records: HashMap<String, EntityRecord>,
    seen: HashSet<String>,
    window_size: usize,
    evict_after_ms: u64,
}

impl EntityStore {
    pub fn new(window_size: usize, evict_after_ms: u64) -> Self {
        Self {
            records: HashMap::new(),
            seen: HashSet::new(),
            window_size: window_size.max(1),
            evict_after_ms,
        }
    }

    /// Ingest every observation of `batch`, stamped with its timestamp.
    ///
    /// Does not evict; call [`EntityStore::evict_stale`] afterwards.
    pub fn ingest(&mut self, batch: &ObservationBatch) {
        let now = batch.timestamp_ms;
        let window = self.window_size;
        for obs in &batch.observations {
            match self.records.get_mut(&obs.id) {
                Some(record) => record.record(obs, now, window),
                None => {
                    let mut record = EntityRecord::new(obs, now, window);
                    record.record(obs, now, window);
                    self.seen.insert(obs.id.clone());
                    self.records.insert(obs.id.clone(), record);
                }
            }
        }
    }

    /// Remove every record unseen for longer than `evict_after_ms`.
    ///
    /// Returns the evicted ids (sorted) so companion stores can release
    /// their entries.
    pub fn evict_stale(&mut self, now_ms: i64) -> Vec<String> {
        let cutoff = self.evict_after_ms as i64;
        let mut stale: Vec<String> = self
            .records
            .values()
            .filter(|r| now_ms.saturating_sub(r.last_seen) > cutoff)
            .map(|r| r.id.clone())
            .collect();
        stale.sort();
        for id in &stale {
            self.records.remove(id);
        }
        stale
    }

    /// Change the rolling window bound, truncating every history now.
    pub fn set_window_size(&mut self, window_size: usize) {
        self.window_size = window_size.max(1);
        for record in self.records.values_mut() {
            record.truncate(self.window_size);
        }
    }

    pub fn set_evict_after_ms(&mut self, evict_after_ms: u64) {
        self.evict_after_ms = evict_after_ms;
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn get(&self, id: &str) -> Option<&EntityRecord> {
        self.records.get(id)
    }

    pub fn records(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct ids observed since the store was created,
    /// including ids that have since been evicted.
    pub fn distinct_seen(&self) -> usize {
        self.seen.len()
    }

    /// Up to `max` ids ranked by latest signal (strongest first, ties by id),
    /// returned sorted by id so matrix indices are deterministic.
    pub fn active_ids(&self, max: usize) -> Vec<String> {
        let mut ranked: Vec<&EntityRecord> = self.records.values().collect();
        ranked.sort_by(|a, b| b.latest_value.cmp(&a.latest_value).then_with(|| a.id.cmp(&b.id)));
        let mut ids: Vec<String> = ranked.into_iter().take(max).map(|r| r.id.clone()).collect();
        ids.sort();
        ids
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(id: &str, label: &str, dbm: i32) -> ApObservation {
        ApObservation {
            id: id.to_string(),
            label: label.to_string(),
            signal_dbm: dbm,
            channel: Some(6),
            band: Some(Band::Ghz2_4),
            security: "WPA2".to_string(),
            provenance: Provenance::measured(ScanSource::Iw),
        }
    }

    fn batch(t: i64, observations: Vec<ApObservation>) -> ObservationBatch {
        ObservationBatch {
            timestamp_ms: t,
            source: ScanSource::Iw,
            observations,
            dropped: 0,
        }
    }

    #[test]
    fn weight_ordering_is_monotonic() {
        let direct = Provenance::measured(ScanSource::Iw);
        let low = Provenance::measured(ScanSource::Netsh);
        let synthetic = Provenance {
            synthetic_id: true,
            ..direct
        };
        let estimated = Provenance {
            estimated: true,
            ..low
        };
        assert_eq!(sample_weight(&direct), 1.0);
        assert_eq!(sample_weight(&low), 0.45);
        assert_eq!(sample_weight(&synthetic), 0.35);
        assert_eq!(sample_weight(&estimated), 0.12);
    }

    #[test]
    fn ingest_creates_and_appends() {
        let mut store = EntityStore::new(30, 30_000);
        store.ingest(&batch(1_000, vec![obs("aa", "Home", -50)]));
        store.ingest(&batch(2_000, vec![obs("aa", "Home", -55)]));
        let r = store.get("aa").unwrap();
        assert_eq!(r.sample_count(), 2);
        assert_eq!(r.latest_value, -55);
        assert_eq!(r.last_seen, 2_000);
        assert_eq!(r.first_seen, 1_000);
        assert_eq!(r.samples(), vec![-50.0, -55.0]);
        assert_eq!(r.weights(), vec![1.0, 1.0]);
    }

    #[test]
    fn window_evicts_oldest_first() {
        let mut store = EntityStore::new(8, 30_000);
        for i in 0..12 {
            store.ingest(&batch(i * 100, vec![obs("aa", "Home", -40 - i as i32)]));
        }
        let r = store.get("aa").unwrap();
        assert_eq!(r.sample_count(), 8);
        assert_eq!(r.weights().len(), 8);
        assert_eq!(r.raw_samples().next(), Some(-44));
    }

    #[test]
    fn hidden_label_never_overrides_known_label() {
        let mut store = EntityStore::new(30, 30_000);
        store.ingest(&batch(0, vec![obs("aa", "Home", -50)]));
        store.ingest(&batch(1, vec![obs("aa", HIDDEN_LABEL, -50)]));
        assert_eq!(store.get("aa").unwrap().label, "Home");
        store.ingest(&batch(2, vec![obs("aa", "Home-5G", -50)]));
        assert_eq!(store.get("aa").unwrap().label, "Home-5G");

        store.ingest(&batch(3, vec![obs("bb", HIDDEN_LABEL, -70)]));
        store.ingest(&batch(4, vec![obs("bb", "Revealed", -70)]));
        assert_eq!(store.get("bb").unwrap().label, "Revealed");
    }

    #[test]
    fn stale_records_are_evicted() {
        let mut store = EntityStore::new(30, 1_000);
        store.ingest(&batch(0, vec![obs("aa", "A", -50), obs("bb", "B", -60)]));
        store.ingest(&batch(900, vec![obs("bb", "B", -61)]));
        assert!(store.evict_stale(1_000).is_empty());
        assert_eq!(store.evict_stale(1_001), vec!["aa".to_string()]);
        assert!(store.get("aa").is_none());
        assert!(store.get("bb").is_some());
        assert_eq!(store.distinct_seen(), 2);
    }

    #[test]
    fn shrinking_window_truncates_immediately() {
        let mut store = EntityStore::new(30, 60_000);
        for i in 0..30 {
            store.ingest(&batch(i, vec![obs("aa", "A", -30 - i as i32)]));
        }
        assert_eq!(store.get("aa").unwrap().sample_count(), 30);
        store.set_window_size(10);
        let r = store.get("aa").unwrap();
        assert_eq!(r.sample_count(), 10);
        let kept: Vec<i32> = r.raw_samples().collect();
        assert_eq!(kept, (20..30).map(|i| -30 - i).collect::<Vec<i32>>());
    }

    #[test]
    fn active_ids_rank_by_latest_signal() {
        let mut store = EntityStore::new(30, 60_000);
        store.ingest(&batch(
            0,
            vec![obs("cc", "C", -80), obs("aa", "A", -40), obs("bb", "B", -60)],
        ));
        assert_eq!(store.active_ids(2), vec!["aa".to_string(), "bb".to_string()]);
        assert_eq!(store.active_ids(10).len(), 3);
    }
}
