//! Derived metrics.
//!
//! Diagnostics computed from the entity store and snapshot views. Nothing
//! here feeds back into correlation, clustering or embedding.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use wifi_topology_scan::Band;

use crate::snapshot::ApView;

/// Variance (dBm^2) at which stability reaches zero.
pub const STABILITY_VAR_REF: f64 = 100.0;
/// Sample count at which the confidence boost saturates.
pub const STABILITY_COUNT_REF: f64 = 20.0;

/// Non-overlapping 20 MHz channels per band, used as recommendation
/// candidates alongside the channels actually observed.
pub const CHANNEL_PLAN_2_4: &[u16] = &[1, 6, 11];
pub const CHANNEL_PLAN_5: &[u16] = &[36, 40, 44, 48, 149, 153, 157, 161, 165];
pub const CHANNEL_PLAN_6: &[u16] = &[5, 21, 37, 53, 69, 85];

/// Per-band, per-channel entity counts.
pub type ChannelDensity = BTreeMap<Band, BTreeMap<u16, usize>>;

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Stability score in `[0, 1]`, rounded to two decimals.
///
/// Variance at or above [`STABILITY_VAR_REF`] scores 0 at any sample
/// count. Otherwise the score is absent below two samples, where a zero
/// variance says nothing about stability.
pub fn stability_score(variance: f64, sample_count: usize) -> Option<f64> {
    let var_norm = (variance / STABILITY_VAR_REF).clamp(0.0, 1.0);
    if var_norm >= 1.0 {
        return Some(0.0);
    }
    if sample_count < 2 {
        return None;
    }
    let count_boost = (sample_count as f64 / STABILITY_COUNT_REF).clamp(0.0, 1.0);
    Some(round2(((1.0 - var_norm) * count_boost).clamp(0.0, 1.0)))
}

/// Band from explicit metadata, else inferred from the channel number.
pub fn normalized_band(band: Option<Band>, channel: Option<u16>) -> Option<Band> {
    band.or_else(|| channel.and_then(Band::from_channel))
}

/// Count entities per channel within each band.
///
/// Entries without a channel, or whose band cannot be determined, are
/// skipped.
pub fn channel_density<I>(entries: I) -> ChannelDensity
where
    I: IntoIterator<Item = (Option<Band>, Option<u16>)>,
{
    let mut density = ChannelDensity::new();
    for (band, channel) in entries {
        let Some(channel) = channel else { continue };
        let Some(band) = normalized_band(band, Some(channel)) else {
            continue;
        };
        *density.entry(band).or_default().entry(channel).or_insert(0) += 1;
    }
    density
}

/// Standard channel plan of `band`.
pub fn channel_plan(band: Band) -> &'static [u16] {
    match band {
        Band::Ghz2_4 => CHANNEL_PLAN_2_4,
        Band::Ghz5 => CHANNEL_PLAN_5,
        Band::Ghz6 => CHANNEL_PLAN_6,
    }
}

/// The `limit` least occupied channels of every observed band, lowest
/// channel number first on ties.
pub fn recommend_channels(density: &ChannelDensity, limit: usize) -> BTreeMap<Band, Vec<u16>> {
    density
        .iter()
        .map(|(&band, counts)| {
            let candidates: BTreeSet<u16> = channel_plan(band)
                .iter()
                .copied()
                .chain(counts.keys().copied())
                .collect();
            let mut ranked: Vec<(usize, u16)> = candidates
                .into_iter()
                .map(|ch| (counts.get(&ch).copied().unwrap_or(0), ch))
                .collect();
            ranked.sort_unstable();
            let picks = ranked.into_iter().take(limit).map(|(_, ch)| ch).collect();
            (band, picks)
        })
        .collect()
}

/// Condensed entry for strongest / most-volatile rankings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedAp {
    pub id: String,
    pub label: String,
    pub channel: Option<u16>,
    pub band: Option<Band>,
    pub latest_value: i32,
    pub mean_value: Option<f64>,
    pub variance: f64,
    pub sample_count: usize,
}

impl From<&ApView> for RankedAp {
    fn from(ap: &ApView) -> Self {
        Self {
            id: ap.id.clone(),
            label: ap.label.clone(),
            channel: ap.channel,
            band: ap.band,
            latest_value: ap.latest_value,
            mean_value: ap.mean_value,
            variance: ap.variance,
            sample_count: ap.sample_count,
        }
    }
}

/// Top `n` entities by mean signal (latest when no mean exists).
pub fn strongest(aps: &[ApView], n: usize) -> Vec<RankedAp> {
    let level = |ap: &ApView| ap.mean_value.unwrap_or(f64::from(ap.latest_value));
    let mut sorted: Vec<&ApView> = aps.iter().collect();
    sorted.sort_by(|a, b| level(b).total_cmp(&level(a)).then_with(|| a.id.cmp(&b.id)));
    sorted.into_iter().take(n).map(RankedAp::from).collect()
}

/// Top `n` entities by variance, more samples first on ties.
pub fn most_volatile(aps: &[ApView], n: usize) -> Vec<RankedAp> {
    let mut sorted: Vec<&ApView> = aps.iter().collect();
    sorted.sort_by(|a, b| {
        b.variance
            .total_cmp(&a.variance)
            .then_with(|| b.sample_count.cmp(&a.sample_count))
            .then_with(|| a.id.cmp(&b.id))
    });
    sorted.into_iter().take(n).map(RankedAp::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wifi_topology_scan::ScanSource;

    fn view(id: &str, mean: Option<f64>, latest: i32, variance: f64, count: usize) -> ApView {
        ApView {
            id: id.to_string(),
            label: id.to_uppercase(),
            latest_value: latest,
            channel: Some(6),
            band: Some(Band::Ghz2_4),
            security: "WPA2".to_string(),
            scan_source: ScanSource::Iw,
            estimated_flag: false,
            synthetic_id: false,
            sample_quality: 1.0,
            sample_count: count,
            mean_value: mean,
            variance,
            stability: stability_score(variance, count),
            cluster_id: 0,
            cluster_size: 1,
            last_seen: 0,
        }
    }

    #[test]
    fn stability_boundaries() {
        assert_eq!(stability_score(0.0, 20), Some(1.0));
        assert_eq!(stability_score(0.0, 200), Some(1.0));
        assert_eq!(stability_score(100.0, 20), Some(0.0));
        assert_eq!(stability_score(450.0, 3), Some(0.0));
        assert_eq!(stability_score(0.0, 1), None);
        assert_eq!(stability_score(100.0, 1), Some(0.0));
        assert_eq!(stability_score(250.0, 0), Some(0.0));
        assert_eq!(stability_score(99.0, 1), None);
    }

    #[test]
    fn stability_rounds_to_two_decimals() {
        // (1 - 0.12345) * 1.0
        assert_eq!(stability_score(12.345, 20), Some(0.88));
        // (1 - 0.4) * 0.5
        assert_eq!(stability_score(40.0, 10), Some(0.3));
    }

    #[test]
    fn density_infers_band_from_channel() {
        let d = channel_density(vec![
            (None, Some(6)),
            (Some(Band::Ghz2_4), Some(6)),
            (None, Some(36)),
            (None, None),
            (None, Some(0)),
        ]);
        assert_eq!(d[&Band::Ghz2_4][&6], 2);
        assert_eq!(d[&Band::Ghz5][&36], 1);
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn recommendations_prefer_empty_then_lowest() {
        let d = channel_density(vec![
            (None, Some(1)),
            (None, Some(1)),
            (None, Some(6)),
            (None, Some(3)),
        ]);
        let rec = recommend_channels(&d, 2);
        // 11 is empty; 3 and 6 tie at one, 3 is lower.
        assert_eq!(rec[&Band::Ghz2_4], vec![11, 3]);
        assert!(!rec.contains_key(&Band::Ghz5));
    }

    #[test]
    fn strongest_uses_mean_then_latest() {
        let aps = vec![
            view("a", Some(-70.0), -40, 1.0, 5),
            view("b", None, -50, 0.0, 0),
            view("c", Some(-45.0), -80, 1.0, 5),
        ];
        let ids: Vec<String> = strongest(&aps, 2).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn volatile_ties_break_on_sample_count() {
        let aps = vec![
            view("a", Some(-60.0), -60, 9.0, 4),
            view("b", Some(-60.0), -60, 9.0, 12),
            view("c", Some(-60.0), -60, 25.0, 2),
        ];
        let ids: Vec<String> = most_volatile(&aps, 3).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }
}
