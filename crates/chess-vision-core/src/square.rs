use crate::Homography;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_4, PI, TAU};

/// Polygon slot of the top-left vertex.
pub const TL: usize = 0;
/// Polygon slot of the bottom-left vertex.
pub const BL: usize = 1;
/// Polygon slot of the bottom-right vertex.
pub const BR: usize = 2;
/// Polygon slot of the top-right vertex.
pub const TR: usize = 3;

/// A quadrilateral candidate for one board cell.
///
/// Squares are plain values: grid placement is stored by the grid that
/// references them, never on the square itself.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Square {
    /// Reference corner (the top-left polygon vertex).
    pub position: Point2<f32>,
    /// Mean length of the top and bottom edges.
    pub width: f32,
    /// Mean length of the left and right edges.
    pub height: f32,
    pub area: f32,
    /// Vertices wound top-left, bottom-left, bottom-right, top-right.
    pub polygon: [Point2<f32>; 4],
}

impl Square {
    /// Build a square from four vertices given in any order.
    ///
    /// Returns `None` for degenerate input (coincident vertices or zero area).
    pub fn from_vertices(points: [Point2<f32>; 4]) -> Option<Self> {
        let polygon = order_quad(points)?;
        let area = polygon_area(&polygon);
        if area <= f32::EPSILON {
            return None;
        }
        let width = 0.5 * (dist(polygon[TL], polygon[TR]) + dist(polygon[BL], polygon[BR]));
        let height = 0.5 * (dist(polygon[TL], polygon[BL]) + dist(polygon[TR], polygon[BR]));
        Some(Self {
            position: polygon[TL],
            width,
            height,
            area,
            polygon,
        })
    }

    /// Axis-aligned square with its top-left corner at `(x, y)`.
    pub fn axis_aligned(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            position: Point2::new(x, y),
            width,
            height,
            area: width * height,
            polygon: [
                Point2::new(x, y),
                Point2::new(x, y + height),
                Point2::new(x + width, y + height),
                Point2::new(x + width, y),
            ],
        }
    }

    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            f32::INFINITY
        }
    }

    pub fn center(&self) -> Point2<f32> {
        centroid(&self.polygon)
    }

    /// Mean angle (radians) of the top and bottom edges against the x axis.
    pub fn horizontal_angle(&self) -> f32 {
        let top = edge_angle(self.polygon[TL], self.polygon[TR]);
        let bottom = edge_angle(self.polygon[BL], self.polygon[BR]);
        0.5 * (top + bottom)
    }

    /// Map the polygon through `h`.
    ///
    /// Width, height and area are kept as measured; only the vertices and the
    /// reference corner move.
    pub fn transformed(&self, h: &Homography) -> Self {
        let polygon = self.polygon.map(|p| h.apply(p));
        Self {
            position: polygon[TL],
            polygon,
            ..*self
        }
    }

    /// Polygon vertices expressed relative to the top-left vertex.
    pub fn local_shape(&self) -> [Point2<f32>; 4] {
        let o = self.polygon[TL];
        self.polygon.map(|p| Point2::new(p.x - o.x, p.y - o.y))
    }
}

/// Sort four vertices into TL, BL, BR, TR order.
///
/// Each vertex is classified by the quadrant it occupies around the centroid
/// (image coordinates, y pointing down). The vertex closest to the top-left
/// diagonal starts the cycle, which then runs counter-clockwise on screen.
pub fn order_quad(points: [Point2<f32>; 4]) -> Option<[Point2<f32>; 4]> {
    for i in 0..4 {
        for j in (i + 1)..4 {
            if dist(points[i], points[j]) <= f32::EPSILON {
                return None;
            }
        }
    }

    let c = centroid(&points);
    let mut by_angle: Vec<(f32, Point2<f32>)> = points
        .iter()
        .map(|p| ((p.y - c.y).atan2(p.x - c.x), *p))
        .collect();
    by_angle.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    // Top-left quadrant sits at -3π/4 with y pointing down.
    let tl_dir = -3.0 * FRAC_PI_4;
    let start = by_angle
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            angular_dist(a.0, tl_dir)
                .partial_cmp(&angular_dist(b.0, tl_dir))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)?;

    // Ascending angle runs TL, TR, BR, BL; walk it backwards from TL.
    Some([
        by_angle[start].1,
        by_angle[(start + 3) % 4].1,
        by_angle[(start + 2) % 4].1,
        by_angle[(start + 1) % 4].1,
    ])
}

/// Whether a closed polygon is strictly convex.
pub fn is_convex(points: &[Point2<f32>]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f32;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = points[(i + 2) % n];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross.abs() <= f32::EPSILON {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Absolute shoelace area of a closed polygon.
pub fn polygon_area(points: &[Point2<f32>]) -> f32 {
    let n = points.len();
    let mut acc = 0.0f32;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        acc += a.x * b.y - b.x * a.y;
    }
    0.5 * acc.abs()
}

pub fn centroid(points: &[Point2<f32>]) -> Point2<f32> {
    let n = points.len().max(1) as f32;
    let (sx, sy) = points
        .iter()
        .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point2::new(sx / n, sy / n)
}

#[inline]
pub fn dist(a: Point2<f32>, b: Point2<f32>) -> f32 {
    (a - b).norm()
}

#[inline]
fn edge_angle(from: Point2<f32>, to: Point2<f32>) -> f32 {
    (to.y - from.y).atan2(to.x - from.x)
}

fn angular_dist(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(TAU);
    if d > PI {
        TAU - d
    } else {
        d
    }
}
