//! Signal statistics.
//!
//! Pure numeric primitives over rolling signal windows. Nothing in here
//! fails: insufficient overlap and flat series resolve to a correlation of
//! `0.0`, which callers read as "no evidence of a relation".

/// Arithmetic mean. Returns `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with Bessel's correction. Returns `0.0` for `n < 2`.
pub fn variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mu = mean(values);
    values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / (n - 1) as f64
}

/// Weighted mean. Non-positive weights are excluded; returns `0.0` when
/// the total weight is not positive.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut total = 0.0;
    for (&v, &w) in values.iter().zip(weights) {
        if w > 0.0 && w.is_finite() {
            sum += v * w;
            total += w;
        }
    }
    if total > 0.0 {
        sum / total
    } else {
        0.0
    }
}

/// Weighted Pearson correlation over the shared trailing overlap of two
/// series.
///
/// Per-pair weights combine as `sqrt(wx * wy)`. Returns `0.0` when fewer than
/// `min_overlap` usable pairs exist or either weighted variance is not
/// positive. The result is clamped to `[-1, 1]`.
pub fn weighted_pearson(xs: &[f64], ys: &[f64], wx: &[f64], wy: &[f64], min_overlap: usize) -> f64 {
    let overlap = xs.len().min(ys.len()).min(wx.len()).min(wy.len());
    if overlap == 0 || overlap < min_overlap {
        return 0.0;
    }

    let xs = &xs[xs.len() - overlap..];
    let ys = &ys[ys.len() - overlap..];
    let wx = &wx[wx.len() - overlap..];
    let wy = &wy[wy.len() - overlap..];

    let mut pairs: Vec<(f64, f64, f64)> = Vec::with_capacity(overlap);
    for i in 0..overlap {
        let w = (wx[i] * wy[i]).sqrt();
        if w.is_finite() && w > 0.0 && xs[i].is_finite() && ys[i].is_finite() {
            pairs.push((xs[i], ys[i], w));
        }
    }
    if pairs.is_empty() || pairs.len() < min_overlap {
        return 0.0;
    }

    let total: f64 = pairs.iter().map(|p| p.2).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let mx = pairs.iter().map(|p| p.0 * p.2).sum::<f64>() / total;
    let my = pairs.iter().map(|p| p.1 * p.2).sum::<f64>() / total;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for &(x, y, w) in &pairs {
        let dx = x - mx;
        let dy = y - my;
        cov += w * dx * dy;
        var_x += w * dx * dx;
        var_y += w * dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return 0.0;
    }

    let r = cov / (var_x * var_y).sqrt();
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Symmetric `n x n` correlation matrix with a unit diagonal.
///
/// Only the upper triangle is computed; the lower triangle is mirrored.
pub fn build_correlation_matrix(
    samples: &[Vec<f64>],
    weights: &[Vec<f64>],
    min_overlap: usize,
) -> Vec<Vec<f64>> {
    let n = samples.len();
    let mut m = vec![vec![0.0; n]; n];
    for i in 0..n {
        m[i][i] = 1.0;
        for j in (i + 1)..n {
            let (wi, wj) = match (weights.get(i), weights.get(j)) {
                (Some(wi), Some(wj)) => (wi.as_slice(), wj.as_slice()),
                _ => continue,
            };
            let r = weighted_pearson(&samples[i], &samples[j], wi, wj, min_overlap);
            m[i][j] = r;
            m[j][i] = r;
        }
    }
    m
}

/// Map a correlation to a dissimilarity in `[0, 2]`.
pub fn correlation_to_distance(corr: f64) -> f64 {
    1.0 - corr.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ones(n: usize) -> Vec<f64> {
        vec![1.0; n]
    }

    #[test]
    fn variance_short_series_is_zero() {
        assert_eq!(variance(&[]), 0.0);
        assert_eq!(variance(&[-42.0]), 0.0);
    }

    #[test]
    fn variance_uses_bessel_correction() {
        // mean 5, squared deviations sum 32, n-1 = 7
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_abs_diff_eq!(variance(&v), 32.0 / 7.0, epsilon = 1e-12);
    }

    #[test]
    fn weighted_mean_skips_non_positive_weights() {
        let v = [10.0, 20.0, 1000.0];
        let w = [1.0, 1.0, 0.0];
        assert_abs_diff_eq!(weighted_mean(&v, &w), 15.0, epsilon = 1e-12);
        assert_eq!(weighted_mean(&v, &[0.0, -1.0, 0.0]), 0.0);
    }

    #[test]
    fn pearson_below_overlap_is_exactly_zero() {
        let xs = [-50.0, -52.0, -49.0];
        let ys = [-60.0, -62.0, -59.0];
        assert_eq!(weighted_pearson(&xs, &ys, &ones(3), &ones(3), 4), 0.0);
    }

    #[test]
    fn pearson_identical_series_is_one() {
        let xs = [-50.0, -55.0, -48.0, -60.0, -52.0, -47.0];
        let r = weighted_pearson(&xs, &xs, &ones(6), &ones(6), 6);
        assert_abs_diff_eq!(r, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn pearson_inverse_series_is_minus_one() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ys = [6.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        let r = weighted_pearson(&xs, &ys, &ones(6), &ones(6), 2);
        assert_abs_diff_eq!(r, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn pearson_constant_series_is_zero() {
        let xs = [-50.0; 8];
        let ys = [-40.0, -41.0, -42.0, -43.0, -44.0, -45.0, -46.0, -47.0];
        assert_eq!(weighted_pearson(&xs, &ys, &ones(8), &ones(8), 2), 0.0);
    }

    #[test]
    fn pearson_aligns_trailing_overlap() {
        // The longer series has unrelated leading samples; only the tail counts.
        let xs = [0.0, 100.0, -100.0, 1.0, 2.0, 3.0, 4.0];
        let ys = [10.0, 20.0, 30.0, 40.0];
        let r = weighted_pearson(&xs, &ys, &ones(7), &ones(4), 4);
        assert_abs_diff_eq!(r, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn pearson_zero_weights_reduce_usable_pairs() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [1.0, 2.0, 3.0, 4.0];
        let wx = [1.0, 0.0, 1.0, 1.0];
        assert_eq!(weighted_pearson(&xs, &ys, &wx, &ones(4), 4), 0.0);
        assert_abs_diff_eq!(
            weighted_pearson(&xs, &ys, &wx, &ones(4), 3),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn pearson_is_symmetric() {
        let xs = [-50.0, -58.0, -47.0, -61.0, -52.0, -49.0, -55.0];
        let ys = [-70.0, -66.0, -72.0, -64.0, -69.0, -71.0, -65.0];
        let wx = [1.0, 0.5, 1.0, 0.12, 1.0, 1.0, 0.35];
        let wy = [0.45, 1.0, 1.0, 1.0, 0.45, 1.0, 1.0];
        let a = weighted_pearson(&xs, &ys, &wx, &wy, 3);
        let b = weighted_pearson(&ys, &xs, &wy, &wx, 3);
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        assert!((-1.0..=1.0).contains(&a));
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let samples = vec![
            vec![-50.0, -52.0, -49.0, -55.0, -51.0],
            vec![-60.0, -63.0, -58.0, -66.0, -61.0],
            vec![-70.0, -68.0, -71.0, -69.0, -72.0],
        ];
        let weights = vec![ones(5), ones(5), ones(5)];
        let m = build_correlation_matrix(&samples, &weights, 3);
        for i in 0..3 {
            assert_eq!(m[i][i], 1.0);
            for j in 0..3 {
                assert_eq!(m[i][j], m[j][i]);
            }
        }
        assert!(m[0][1] > 0.9);
    }

    #[test]
    fn single_series_matrix() {
        let m = build_correlation_matrix(&[vec![-50.0]], &[vec![1.0]], 2);
        assert_eq!(m, vec![vec![1.0]]);
    }

    #[test]
    fn distance_mapping() {
        assert_eq!(correlation_to_distance(1.0), 0.0);
        assert_eq!(correlation_to_distance(-1.0), 2.0);
        assert_eq!(correlation_to_distance(3.0), 0.0);
        let mut prev = f64::INFINITY;
        for k in -10..=10 {
            let d = correlation_to_distance(k as f64 / 10.0);
            assert!(d < prev);
            prev = d;
        }
    }
}
