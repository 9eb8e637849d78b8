//! Size-consistency clustering of square candidates.

use chess_vision_core::{kmeans, KMeansParams, Square};
use log::debug;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Expected relative size tolerance between real board cells.
    pub rate: f32,
    /// Number of sub-groups per split.
    pub k: usize,
    pub kmeans: KMeansParams,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            rate: 0.25,
            k: 3,
            kmeans: KMeansParams::default(),
        }
    }
}

impl ClusterParams {
    /// Largest accepted max/min area ratio inside one group.
    pub fn ratio_threshold(&self) -> f32 {
        let rate = self.rate.clamp(0.0, 0.99);
        (1.0 + rate) / (1.0 - rate)
    }
}

fn area_spread(group: &[Square]) -> f32 {
    let (lo, hi) = group
        .iter()
        .fold((f32::INFINITY, 0.0f32), |(lo, hi), s| (lo.min(s.area), hi.max(s.area)));
    if lo > 0.0 {
        hi / lo
    } else {
        f32::INFINITY
    }
}

fn mean_area(group: &[Square]) -> f32 {
    group.iter().map(|s| s.area).sum::<f32>() / group.len().max(1) as f32
}

fn within_ratio(a: f32, b: f32, threshold: f32) -> bool {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    lo > 0.0 && hi / lo <= threshold
}

/// Split candidates into groups of mutually consistent size.
///
/// The first group is the primary one (the board cells); the remaining
/// groups are outliers in the order they were split off.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all, fields(squares = squares.len())))]
pub fn cluster_squares(squares: &[Square], params: &ClusterParams) -> Vec<Vec<Square>> {
    if squares.is_empty() {
        return Vec::new();
    }
    let threshold = params.ratio_threshold();
    let mut primary: Vec<Square> = squares.to_vec();
    let mut outliers: Vec<Vec<Square>> = Vec::new();

    while primary.len() >= 3 && area_spread(&primary) > threshold {
        let features: Vec<Vector2<f32>> = primary
            .iter()
            .map(|s| Vector2::new(s.width, s.height))
            .collect();
        let Some(res) = kmeans(&features, params.k, &params.kmeans) else {
            break;
        };

        let mut groups: Vec<Vec<Square>> = vec![Vec::new(); res.centers.len()];
        for (sq, &label) in primary.iter().zip(res.labels.iter()) {
            groups[label].push(*sq);
        }
        groups.retain(|g| !g.is_empty());
        groups.sort_by(|a, b| b.len().cmp(&a.len()));

        let reference = mean_area(&groups[0]);
        let mut next_primary = Vec::with_capacity(primary.len());
        for group in groups {
            if within_ratio(mean_area(&group), reference, threshold) {
                next_primary.extend(group);
            } else {
                outliers.push(group);
            }
        }

        if next_primary.len() >= primary.len() {
            break;
        }
        debug!(
            "cluster split: {} -> {} squares, {} outlier groups",
            primary.len(),
            next_primary.len(),
            outliers.len()
        );
        primary = next_primary;
    }

    let mut out = Vec::with_capacity(outliers.len() + 1);
    out.push(primary);
    out.extend(outliers);
    out
}
