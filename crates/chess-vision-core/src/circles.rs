//! Circle detection by gradient voting.
//!
//! Every pixel with a strong gradient votes for centers at integer distances
//! along both gradient directions. Accumulator peaks become center
//! candidates; the radius of each candidate is the distance band around it
//! with the widest angular coverage of edge pixels.

use image::{GrayImage, ImageBuffer, Luma};
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

const SECTORS: usize = 64;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CircleParams {
    /// Smallest radius searched (pixels).
    pub min_radius: f32,
    /// Largest radius searched (pixels).
    pub max_radius: f32,
    /// Minimum distance between two detected centers (pixels).
    pub min_distance: f32,
    /// Gradient magnitude threshold (fraction of max gradient).
    pub grad_threshold: f32,
    /// Minimum accumulator value for a center (fraction of max).
    pub min_vote_frac: f32,
    /// Gaussian sigma for accumulator smoothing; `0` disables smoothing.
    pub accum_sigma: f32,
    /// Fraction of the 64 angular sectors that must contain edge pixels.
    pub min_support: f32,
    /// Minimum `|cos|` between an edge pixel's gradient and its radial
    /// direction for the pixel to count towards coverage.
    ///
    /// A straight edge tangent to the band is only radial near the tangent
    /// point, so raising this shrinks the coverage a square outline earns.
    pub min_alignment: f32,
    /// Optional cap on the number of circles returned.
    pub max_circles: Option<usize>,
}

impl Default for CircleParams {
    fn default() -> Self {
        Self {
            min_radius: 5.0,
            max_radius: 30.0,
            min_distance: 10.0,
            grad_threshold: 0.2,
            min_vote_frac: 0.3,
            accum_sigma: 1.0,
            min_support: 0.5,
            min_alignment: 0.7,
            max_circles: None,
        }
    }
}

impl CircleParams {
    /// Same thresholds with a new radius range and center spacing.
    pub fn with_geometry(&self, min_radius: f32, max_radius: f32, min_distance: f32) -> Self {
        Self {
            min_radius,
            max_radius,
            min_distance,
            ..self.clone()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point2<f32>,
    pub radius: f32,
    /// Smoothed accumulator value at the center.
    pub score: f32,
    /// Fraction of angular sectors covered by edge pixels at `radius`.
    pub coverage: f32,
}

impl Circle {
    pub fn area(&self) -> f32 {
        std::f32::consts::PI * self.radius * self.radius
    }
}

struct GradientField {
    w: usize,
    h: usize,
    /// Unit gradient per pixel; `None` below the magnitude threshold.
    dirs: Vec<Option<(f32, f32)>>,
}

impl GradientField {
    fn new(gray: &GrayImage, grad_threshold: f32) -> Option<Self> {
        let (w, h) = gray.dimensions();
        let gx = imageproc::gradients::horizontal_scharr(gray);
        let gy = imageproc::gradients::vertical_scharr(gray);

        let mags: Vec<f32> = gx
            .as_raw()
            .iter()
            .zip(gy.as_raw().iter())
            .map(|(&a, &b)| (a as f32).hypot(b as f32))
            .collect();
        let max_mag = mags.iter().cloned().fold(0.0f32, f32::max);
        if max_mag < 1e-6 {
            return None;
        }
        let threshold = grad_threshold * max_mag;

        let dirs = mags
            .iter()
            .zip(gx.as_raw().iter().zip(gy.as_raw().iter()))
            .map(|(&m, (&a, &b))| (m >= threshold).then(|| (a as f32 / m, b as f32 / m)))
            .collect();
        Some(Self {
            w: w as usize,
            h: h as usize,
            dirs,
        })
    }
}

/// Detect circles in a grayscale (or edge) image.
///
/// Returns circles sorted by score, highest first.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(gray, params), fields(width = gray.width(), height = gray.height()))
)]
pub fn detect_circles(gray: &GrayImage, params: &CircleParams) -> Vec<Circle> {
    let (w, h) = gray.dimensions();
    if w < 4 || h < 4 || params.max_radius < params.min_radius || params.max_radius < 1.0 {
        return Vec::new();
    }
    let Some(field) = GradientField::new(gray, params.grad_threshold) else {
        return Vec::new();
    };

    let Some(accum) = vote(&field, params) else {
        return Vec::new();
    };
    let peaks = find_peaks(&accum, field.w, field.h, params);

    let mut circles: Vec<Circle> = peaks
        .into_iter()
        .filter_map(|(center, score)| {
            estimate_radius(&field, center, params).map(|(radius, coverage)| Circle {
                center,
                radius,
                score,
                coverage,
            })
        })
        .collect();

    circles.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if let Some(max) = params.max_circles {
        circles.truncate(max);
    }
    debug!("circles: {} accepted", circles.len());
    circles
}

fn vote(field: &GradientField, params: &CircleParams) -> Option<Vec<f32>> {
    let (w, h) = (field.w, field.h);
    let mut accum = vec![0.0f32; w * h];
    let r_lo = params.min_radius.max(1.0).round() as i32;
    let r_hi = params.max_radius.round() as i32;

    for y in 0..h {
        for x in 0..w {
            let Some((dx, dy)) = field.dirs[y * w + x] else {
                continue;
            };
            for r in r_lo..=r_hi {
                let r = r as f32;
                for sign in [1.0f32, -1.0] {
                    let vx = (x as f32 + sign * dx * r).round();
                    let vy = (y as f32 + sign * dy * r).round();
                    if vx >= 0.0 && vy >= 0.0 && (vx as usize) < w && (vy as usize) < h {
                        accum[vy as usize * w + vx as usize] += 1.0;
                    }
                }
            }
        }
    }

    if params.accum_sigma <= 0.0 {
        return Some(accum);
    }
    let img = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(w as u32, h as u32, accum)?;
    Some(imageproc::filter::gaussian_blur_f32(&img, params.accum_sigma).into_raw())
}

/// Non-maximum suppression over a disc of radius `min_distance`; neighbors
/// outside the image are ignored rather than skipping border pixels.
fn find_peaks(
    accum: &[f32],
    w: usize,
    h: usize,
    params: &CircleParams,
) -> Vec<(Point2<f32>, f32)> {
    let max_val = accum.iter().cloned().fold(0.0f32, f32::max);
    if max_val < 1e-6 {
        return Vec::new();
    }
    let vote_threshold = params.min_vote_frac * max_val;
    let r = params.min_distance.max(1.0);
    let ri = r.ceil() as i64;

    let mut offsets = Vec::new();
    for dy in -ri..=ri {
        for dx in -ri..=ri {
            if (dx != 0 || dy != 0) && ((dx * dx + dy * dy) as f32) <= r * r {
                offsets.push((dx, dy));
            }
        }
    }

    let mut peaks = Vec::new();
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let idx = y as usize * w + x as usize;
            let val = accum[idx];
            if val < vote_threshold {
                continue;
            }
            let dominated = offsets.iter().any(|&(dx, dy)| {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                    return false;
                }
                let nidx = ny as usize * w + nx as usize;
                accum[nidx] > val || (accum[nidx] == val && nidx < idx)
            });
            if !dominated {
                peaks.push((refine_peak(accum, w, h, x, y), val));
            }
        }
    }
    peaks
}

/// Weighted centroid of the 3x3 neighborhood.
fn refine_peak(accum: &[f32], w: usize, h: usize, x: i64, y: i64) -> Point2<f32> {
    let mut sw = 0.0f32;
    let mut sx = 0.0f32;
    let mut sy = 0.0f32;
    for ny in (y - 1).max(0)..=(y + 1).min(h as i64 - 1) {
        for nx in (x - 1).max(0)..=(x + 1).min(w as i64 - 1) {
            let v = accum[ny as usize * w + nx as usize];
            sw += v;
            sx += v * nx as f32;
            sy += v * ny as f32;
        }
    }
    if sw > 0.0 {
        Point2::new(sx / sw, sy / sw)
    } else {
        Point2::new(x as f32, y as f32)
    }
}

fn estimate_radius(
    field: &GradientField,
    center: Point2<f32>,
    params: &CircleParams,
) -> Option<(f32, f32)> {
    let r_lo = params.min_radius.max(1.0).round() as usize;
    let r_hi = params.max_radius.round() as usize;
    let bins = r_hi + 2;
    let mut masks = vec![0u64; bins + 1];
    let mut counts = vec![0usize; bins + 1];
    let mut hits: Vec<f32> = Vec::new();

    let reach = (r_hi + 1) as f32;
    let x0 = (center.x - reach).floor().max(0.0) as usize;
    let y0 = (center.y - reach).floor().max(0.0) as usize;
    let x1 = ((center.x + reach).ceil() as usize).min(field.w - 1);
    let y1 = ((center.y + reach).ceil() as usize).min(field.h - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let Some((gx, gy)) = field.dirs[y * field.w + x] else {
                continue;
            };
            let ox = x as f32 - center.x;
            let oy = y as f32 - center.y;
            let d = ox.hypot(oy);
            if d < 0.5 || d > reach {
                continue;
            }
            if ((ox * gx + oy * gy) / d).abs() < params.min_alignment {
                continue;
            }
            let bin = d.round() as usize;
            if bin > bins {
                continue;
            }
            let angle = oy.atan2(ox).rem_euclid(std::f32::consts::TAU);
            let sector = ((angle / std::f32::consts::TAU) * SECTORS as f32) as usize % SECTORS;
            masks[bin] |= 1u64 << sector;
            counts[bin] += 1;
            hits.push(d);
        }
    }

    let mut best: Option<(usize, u32, usize)> = None;
    for r in r_lo..=r_hi {
        let mask = masks[r - 1] | masks[r] | masks[r + 1];
        let cover = mask.count_ones();
        let pixels = counts[r - 1] + counts[r] + counts[r + 1];
        let better = match best {
            None => true,
            Some((_, c, p)) => cover > c || (cover == c && pixels > p),
        };
        if better {
            best = Some((r, cover, pixels));
        }
    }
    let (r, cover, _) = best?;
    let coverage = cover as f32 / SECTORS as f32;
    if coverage < params.min_support {
        return None;
    }

    let band: Vec<f32> = hits
        .into_iter()
        .filter(|d| (d - r as f32).abs() <= 1.5)
        .collect();
    if band.is_empty() {
        return None;
    }
    let radius = band.iter().sum::<f32>() / band.len() as f32;
    Some((radius, coverage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_circle_mut;

    fn disc_image(w: u32, h: u32, discs: &[(i32, i32, i32)]) -> GrayImage {
        let mut img = GrayImage::from_pixel(w, h, Luma([20]));
        for &(x, y, r) in discs {
            draw_filled_circle_mut(&mut img, (x, y), r, Luma([230]));
        }
        img
    }

    #[test]
    fn finds_single_disc() {
        let img = disc_image(120, 120, &[(60, 55, 20)]);
        let params = CircleParams {
            min_radius: 10.0,
            max_radius: 30.0,
            min_distance: 15.0,
            ..CircleParams::default()
        };
        let circles = detect_circles(&img, &params);
        assert!(!circles.is_empty());
        let c = circles[0];
        assert!((c.center.x - 60.0).abs() < 2.0, "center {:?}", c.center);
        assert!((c.center.y - 55.0).abs() < 2.0, "center {:?}", c.center);
        assert!((c.radius - 20.0).abs() < 2.0, "radius {}", c.radius);
        assert!(c.coverage > 0.8);
    }

    #[test]
    fn finds_two_separated_discs() {
        let img = disc_image(200, 100, &[(50, 50, 18), (150, 50, 18)]);
        let params = CircleParams {
            min_radius: 12.0,
            max_radius: 24.0,
            min_distance: 20.0,
            ..CircleParams::default()
        };
        let mut circles = detect_circles(&img, &params);
        circles.sort_by(|a, b| a.center.x.total_cmp(&b.center.x));
        assert_eq!(circles.len(), 2, "{circles:?}");
        assert!((circles[0].center.x - 50.0).abs() < 2.0);
        assert!((circles[1].center.x - 150.0).abs() < 2.0);
    }

    #[test]
    fn flat_image_has_no_circles() {
        let img = GrayImage::from_pixel(64, 64, Luma([128]));
        assert!(detect_circles(&img, &CircleParams::default()).is_empty());
    }

    #[test]
    fn square_outline_is_rejected_at_tight_alignment() {
        let mut img = GrayImage::from_pixel(50, 50, Luma([0]));
        for i in 0..50 {
            for t in [6, 43] {
                img.put_pixel(t, i, Luma([255]));
                img.put_pixel(i, t, Luma([255]));
            }
        }
        let params = CircleParams {
            min_radius: 10.0,
            max_radius: 27.0,
            min_distance: 12.0,
            min_support: 0.75,
            min_alignment: 0.9,
            ..CircleParams::default()
        };
        assert!(detect_circles(&img, &params).is_empty());

        let ring = {
            let mut img = GrayImage::from_pixel(50, 50, Luma([0]));
            imageproc::drawing::draw_hollow_circle_mut(&mut img, (25, 25), 18, Luma([255]));
            img
        };
        let circles = detect_circles(&ring, &params);
        assert!(!circles.is_empty());
        assert!((circles[0].radius - 18.0).abs() < 2.0, "{circles:?}");
    }

    #[test]
    fn straight_edge_is_not_a_circle() {
        let mut img = GrayImage::from_pixel(100, 100, Luma([20]));
        for y in 0..100 {
            for x in 50..100 {
                img.put_pixel(x, y, Luma([230]));
            }
        }
        let params = CircleParams {
            min_radius: 10.0,
            max_radius: 20.0,
            ..CircleParams::default()
        };
        assert!(detect_circles(&img, &params).is_empty());
    }
}
