//! Small k-means for 2D feature vectors.
//!
//! Seeding is deterministic (farthest point from the mean, then farthest from
//! the already chosen centers), so repeated runs on the same data give the
//! same partition.
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct KMeansParams {
    pub max_iters: usize,
    /// Stop once no center moves more than this.
    pub tolerance: f32,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            max_iters: 20,
            tolerance: 1e-3,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KMeansResult {
    pub centers: Vec<Vector2<f32>>,
    /// Cluster index per input point.
    pub labels: Vec<usize>,
}

impl KMeansResult {
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.centers.len()];
        for &l in &self.labels {
            sizes[l] += 1;
        }
        sizes
    }
}

/// Partition `points` into at most `k` clusters.
///
/// `k` is clamped to the number of points. Returns `None` for empty input or
/// `k == 0`.
pub fn kmeans(points: &[Vector2<f32>], k: usize, params: &KMeansParams) -> Option<KMeansResult> {
    let k = k.min(points.len());
    if k == 0 {
        return None;
    }

    let mut centers = seed_centers(points, k);
    let mut labels = vec![0usize; points.len()];

    for _ in 0..params.max_iters.max(1) {
        // Assignment step.
        let mut changed = false;
        for (i, p) in points.iter().enumerate() {
            let best = nearest(&centers, p);
            if labels[i] != best {
                labels[i] = best;
                changed = true;
            }
        }

        // Update step; an empty cluster keeps its previous center.
        let mut sums = vec![Vector2::<f32>::zeros(); k];
        let mut counts = vec![0usize; k];
        for (p, &l) in points.iter().zip(labels.iter()) {
            sums[l] += p;
            counts[l] += 1;
        }
        let mut shift = 0.0f32;
        for c in 0..k {
            if counts[c] > 0 {
                let next = sums[c] / counts[c] as f32;
                shift = shift.max((next - centers[c]).norm());
                centers[c] = next;
            }
        }

        if !changed && shift <= params.tolerance {
            break;
        }
    }

    Some(KMeansResult { centers, labels })
}

fn nearest(centers: &[Vector2<f32>], p: &Vector2<f32>) -> usize {
    let mut best = 0usize;
    let mut best_d = f32::INFINITY;
    for (c, center) in centers.iter().enumerate() {
        let d = (p - center).norm_squared();
        if d < best_d {
            best_d = d;
            best = c;
        }
    }
    best
}

fn seed_centers(points: &[Vector2<f32>], k: usize) -> Vec<Vector2<f32>> {
    let mean = points.iter().fold(Vector2::zeros(), |acc, p| acc + p) / points.len() as f32;
    let mut centers: Vec<Vector2<f32>> = Vec::with_capacity(k);

    let mut reference = vec![mean];
    while centers.len() < k {
        let far = points
            .iter()
            .map(|p| {
                let d = reference
                    .iter()
                    .map(|c| (p - c).norm_squared())
                    .fold(f32::INFINITY, f32::min);
                (d, *p)
            })
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, p)| p);
        let Some(far) = far else { break };
        centers.push(far);
        if centers.len() == 1 {
            reference.clear();
        }
        reference.push(far);
    }
    centers
}
