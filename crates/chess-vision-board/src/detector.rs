//! Square candidate detection.
//!
//! Both strategies trace closed contours, simplify them with Douglas-Peucker
//! and keep convex, roughly square quadrilaterals. They differ only in the
//! binary image the contours are traced on.

use chess_vision_core::{binarize, edge_map, is_convex, polygon_area, EdgeParams, Square};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Acceptance rules for a traced contour.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SquareFilterParams {
    /// Minimum enclosed polygon area (pixels²).
    pub min_area: f32,
    pub min_aspect: f32,
    pub max_aspect: f32,
    /// Douglas-Peucker epsilon as a fraction of the contour perimeter.
    pub approx_epsilon_frac: f64,
}

impl Default for SquareFilterParams {
    fn default() -> Self {
        Self {
            min_area: 300.0,
            min_aspect: 0.85,
            max_aspect: 1.15,
            approx_epsilon_frac: 0.02,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorStrategy {
    /// Contours of a thickened Canny edge map (cell interiors are holes).
    #[default]
    Edges,
    /// Contours of bright blobs after a global threshold.
    Threshold,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectorParams {
    pub strategy: DetectorStrategy,
    pub edges: EdgeParams,
    /// Threshold used by [`DetectorStrategy::Threshold`].
    pub threshold: u8,
    pub filter: SquareFilterParams,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            strategy: DetectorStrategy::Edges,
            edges: EdgeParams::default(),
            threshold: 110,
            filter: SquareFilterParams::default(),
        }
    }
}

impl DetectorParams {
    /// Instantiate the configured strategy.
    pub fn build(&self) -> Box<dyn BoardDetector> {
        match self.strategy {
            DetectorStrategy::Edges => Box::new(EdgeContourDetector {
                edges: self.edges.clone(),
                filter: self.filter.clone(),
            }),
            DetectorStrategy::Threshold => Box::new(ThresholdContourDetector {
                threshold: self.threshold,
                filter: self.filter.clone(),
            }),
        }
    }
}

/// Finds candidate board cells in a grayscale frame.
pub trait BoardDetector {
    fn name(&self) -> &'static str;

    fn detect_squares(&self, gray: &GrayImage) -> Vec<Square>;
}

#[derive(Clone, Debug, Default)]
pub struct EdgeContourDetector {
    pub edges: EdgeParams,
    pub filter: SquareFilterParams,
}

impl BoardDetector for EdgeContourDetector {
    fn name(&self) -> &'static str {
        "edges"
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, gray), fields(width = gray.width(), height = gray.height()))
    )]
    fn detect_squares(&self, gray: &GrayImage) -> Vec<Square> {
        let edges = edge_map(gray, &self.edges);
        squares_from_binary(&edges, &self.filter, true)
    }
}

#[derive(Clone, Debug)]
pub struct ThresholdContourDetector {
    pub threshold: u8,
    pub filter: SquareFilterParams,
}

impl BoardDetector for ThresholdContourDetector {
    fn name(&self) -> &'static str {
        "threshold"
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, gray), fields(width = gray.width(), height = gray.height()))
    )]
    fn detect_squares(&self, gray: &GrayImage) -> Vec<Square> {
        let binary = binarize(gray, self.threshold);
        squares_from_binary(&binary, &self.filter, false)
    }
}

/// Trace contours of a binary image and keep the square-looking ones.
pub fn squares_from_binary(
    binary: &GrayImage,
    filter: &SquareFilterParams,
    include_holes: bool,
) -> Vec<Square> {
    let contours: Vec<Contour<i32>> = find_contours(binary);
    let traced = contours.len();
    let squares: Vec<Square> = contours
        .iter()
        .filter(|c| include_holes || c.border_type == BorderType::Outer)
        .filter_map(|c| square_from_contour(&c.points, filter))
        .collect();
    debug!("{traced} contours, {} square candidates", squares.len());
    squares
}

/// Apply the polygon, convexity, area and aspect filters to one contour.
pub fn square_from_contour(points: &[Point<i32>], filter: &SquareFilterParams) -> Option<Square> {
    if points.len() < 4 {
        return None;
    }
    let epsilon = filter.approx_epsilon_frac * arc_length(points, true);
    let approx = approximate_polygon_dp(points, epsilon, true);
    let poly = simplify_closed(
        approx
            .iter()
            .map(|p| Point2::new(p.x as f32, p.y as f32))
            .collect(),
        epsilon as f32,
    );

    let quad: [Point2<f32>; 4] = poly.try_into().ok()?;
    if !is_convex(&quad) || polygon_area(&quad) < filter.min_area {
        return None;
    }
    let square = Square::from_vertices(quad)?;
    let aspect = square.aspect_ratio();
    (filter.min_aspect..=filter.max_aspect)
        .contains(&aspect)
        .then_some(square)
}

/// Drop repeated vertices and vertices closer than `epsilon` to the chord
/// of their neighbours, until nothing changes.
///
/// Douglas-Peucker keeps the contour start point unconditionally, which
/// leaves a spurious vertex in the middle of an edge when tracing starts
/// there.
fn simplify_closed(mut poly: Vec<Point2<f32>>, epsilon: f32) -> Vec<Point2<f32>> {
    poly.dedup();
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    loop {
        let n = poly.len();
        if n <= 3 {
            return poly;
        }
        let redundant = (0..n).find(|&i| {
            let prev = poly[(i + n - 1) % n];
            let next = poly[(i + 1) % n];
            chord_distance(poly[i], prev, next) <= epsilon
        });
        match redundant {
            Some(i) => {
                poly.remove(i);
            }
            None => return poly,
        }
    }
}

fn chord_distance(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let ab = b - a;
    let len = ab.norm();
    if len <= f32::EPSILON {
        return (p - a).norm();
    }
    let ap = p - a;
    (ab.x * ap.y - ab.y * ap.x).abs() / len
}
