//! Spatial embedder.
//!
//! Projects entities into 3D from a pairwise distance matrix with classical
//! multidimensional scaling, then keeps consecutive frames visually stable:
//!
//! 1. classical MDS (double-centred squared distances, top-3 eigenpairs)
//! 2. deterministic id-hash fallback when the solve is numerically flat
//! 3. per-axis sign stabilization against the previous frame
//! 4. recentre on the centroid and rescale to the target radius
//! 5. exponential smoothing toward the new target
//!
//! The layout is a similarity space, not a floor plan.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};

/// Output dimensionality.
pub const DIMENSIONS: usize = 3;

/// Eigenvalues and coordinates at or below this are treated as zero.
const EPSILON: f64 = 1e-9;

/// Radius band of the fallback sphere shell, before rescaling.
const FALLBACK_RADIUS_MIN: f64 = 0.6;
const FALLBACK_RADIUS_MAX: f64 = 1.0;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A point in the embedding space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(v: [f64; DIMENSIONS]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn to_array(self) -> [f64; DIMENSIONS] {
        [self.x, self.y, self.z]
    }

    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Self) -> f64 {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z).norm()
    }

    /// Move `fraction` of the way from `self` toward `target`.
    pub fn lerp(self, target: Self, fraction: f64) -> Self {
        Self::new(
            self.x + (target.x - self.x) * fraction,
            self.y + (target.y - self.y) * fraction,
            self.z + (target.z - self.z) * fraction,
        )
    }

    /// Round every coordinate to `decimals` places.
    pub fn rounded(self, decimals: i32) -> Self {
        let f = 10f64.powi(decimals);
        Self::new(
            (self.x * f).round() / f,
            (self.y * f).round() / f,
            (self.z * f).round() / f,
        )
    }
}

// ---------------------------------------------------------------------------
// Classical MDS
// ---------------------------------------------------------------------------

/// Classical (Torgerson) MDS into [`DIMENSIONS`] axes.
///
/// Axes whose eigenvalue is not above [`EPSILON`] contribute zero. Each
/// eigenvector is sign-normalized so its largest-magnitude component is
/// positive, which makes the solve deterministic for identical input.
/// Fewer than two points yield the trivial embedding.
pub fn classical_mds(distances: &[Vec<f64>]) -> Vec<[f64; DIMENSIONS]> {
    let n = distances.len();
    if n < 2 {
        return vec![[0.0; DIMENSIONS]; n];
    }

    let squared = DMatrix::from_fn(n, n, |i, j| {
        let d = distances[i].get(j).copied().unwrap_or(0.0);
        if d.is_finite() {
            d * d
        } else {
            0.0
        }
    });

    // B = -1/2 J D^2 J, expanded so no dense J is materialized.
    let row_means: Vec<f64> = (0..n).map(|i| squared.row(i).sum() / n as f64).collect();
    let grand_mean = row_means.iter().sum::<f64>() / n as f64;
    let b = DMatrix::from_fn(n, n, |i, j| {
        -0.5 * (squared[(i, j)] - row_means[i] - row_means[j] + grand_mean)
    });

    let eigen = SymmetricEigen::new(b);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&p, &q| {
        eigen.eigenvalues[q]
            .total_cmp(&eigen.eigenvalues[p])
            .then_with(|| p.cmp(&q))
    });

    let mut coords = vec![[0.0; DIMENSIONS]; n];
    for (axis, &col) in order.iter().take(DIMENSIONS).enumerate() {
        let lambda = eigen.eigenvalues[col];
        if lambda.is_nan() || lambda <= EPSILON {
            continue;
        }
        let scale = lambda.sqrt();
        let vector = eigen.eigenvectors.column(col);

        let mut pivot = 0;
        for i in 1..n {
            if vector[i].abs() > vector[pivot].abs() {
                pivot = i;
            }
        }
        let sign = if vector[pivot] < 0.0 { -1.0 } else { 1.0 };

        for (i, coord) in coords.iter_mut().enumerate() {
            coord[axis] = sign * vector[i] * scale;
        }
    }
    coords
}

fn is_degenerate(coords: &[[f64; DIMENSIONS]]) -> bool {
    coords
        .iter()
        .all(|c| c.iter().all(|v| !v.is_finite() || v.abs() <= EPSILON))
}

// ---------------------------------------------------------------------------
// Deterministic fallback
// ---------------------------------------------------------------------------

fn fnv1a64(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn unit_interval(state: &mut u64) -> f64 {
    (splitmix64(state) >> 11) as f64 / (1u64 << 53) as f64
}

/// Deterministic position on a sphere shell derived only from `id`.
pub fn fallback_position(id: &str) -> Position {
    let mut state = fnv1a64(id);
    let theta = unit_interval(&mut state) * std::f64::consts::TAU;
    let cos_phi = 2.0 * unit_interval(&mut state) - 1.0;
    let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
    let r = FALLBACK_RADIUS_MIN + (FALLBACK_RADIUS_MAX - FALLBACK_RADIUS_MIN) * unit_interval(&mut state);
    Position::new(r * sin_phi * theta.cos(), r * sin_phi * theta.sin(), r * cos_phi)
}

// ---------------------------------------------------------------------------
// Frame pipeline
// ---------------------------------------------------------------------------

/// Flip any axis whose orientation disagrees with the previous frame.
fn stabilize_signs(
    ids: &[String],
    coords: &mut [[f64; DIMENSIONS]],
    previous: &BTreeMap<String, Position>,
) {
    for axis in 0..DIMENSIONS {
        let mut shared = 0usize;
        let mut dot = 0.0;
        for (id, coord) in ids.iter().zip(coords.iter()) {
            if let Some(prev) = previous.get(id) {
                shared += 1;
                dot += prev.to_array()[axis] * coord[axis];
            }
        }
        if shared >= 2 && dot < 0.0 {
            for coord in coords.iter_mut() {
                coord[axis] = -coord[axis];
            }
        }
    }
}

/// Subtract the centroid and scale so the farthest point sits at `radius`.
fn recenter_and_rescale(coords: &mut [[f64; DIMENSIONS]], radius: f64) {
    if coords.is_empty() {
        return;
    }
    let n = coords.len() as f64;
    let mut centroid = [0.0; DIMENSIONS];
    for c in coords.iter() {
        for axis in 0..DIMENSIONS {
            centroid[axis] += c[axis] / n;
        }
    }
    let mut max_dist: f64 = 0.0;
    for c in coords.iter_mut() {
        for axis in 0..DIMENSIONS {
            c[axis] -= centroid[axis];
        }
        max_dist = max_dist.max(Position::from_array(*c).norm());
    }
    if max_dist > EPSILON {
        let scale = radius / max_dist;
        for c in coords.iter_mut() {
            for v in c.iter_mut() {
                *v *= scale;
            }
        }
    }
}

/// Embed `ids` from an aligned distance matrix.
///
/// `previous` supplies last frame's positions for sign stabilization and
/// smoothing; ids without a previous position snap straight to their target.
/// The caller persists the result (see [`PositionStore`]).
pub fn embed(
    ids: &[String],
    distances: &[Vec<f64>],
    previous: &BTreeMap<String, Position>,
    radius: f64,
    smoothing: f64,
) -> BTreeMap<String, Position> {
    let n = ids.len().min(distances.len());
    let ids = &ids[..n];

    let mut coords = classical_mds(&distances[..n]);
    if n >= 2 && is_degenerate(&coords) {
        tracing::debug!(entities = n, "flat MDS solve, using id-hash fallback layout");
        coords = ids.iter().map(|id| fallback_position(id).to_array()).collect();
    }

    stabilize_signs(ids, &mut coords, previous);
    recenter_and_rescale(&mut coords, radius);

    let smoothing = smoothing.clamp(0.0, 1.0);
    ids.iter()
        .zip(coords)
        .map(|(id, c)| {
            let target = Position::from_array(c);
            let pos = match previous.get(id) {
                Some(prev) => prev.lerp(target, smoothing),
                None => target,
            };
            (id.clone(), pos)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// PositionStore
// ---------------------------------------------------------------------------

/// Previous-frame positions, keyed by entity id.
///
/// Entries outlive frames in which their entity is inactive and are removed
/// only when the entity store evicts the entity.
#[derive(Debug, Clone, Default)]
pub struct PositionStore {
    positions: BTreeMap<String, Position>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    /// Merge a freshly embedded frame into the store.
    pub fn update(&mut self, frame: &BTreeMap<String, Position>) {
        for (id, pos) in frame {
            self.positions.insert(id.clone(), *pos);
        }
    }

    /// Drop entries for evicted entities.
    pub fn release<'a>(&mut self, ids: impl IntoIterator<Item = &'a String>) {
        for id in ids {
            self.positions.remove(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
