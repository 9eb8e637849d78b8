//! Per-cell occupancy and piece color on the rectified board.
//!
//! A piece is expected to show up as a round outline near the middle of its
//! cell. The brightness of the disc inside that outline decides the color;
//! mid-range readings fall back to thresholds that depend on the cell's own
//! shade, since a dark cell pulls the measured mean down and a light cell
//! pushes it up.

use crate::grid::BOARD_SIZE;
use chess_vision_core::{
    crop_rgb, detect_circles, dist, edge_map, mean_rgb_in_disc, rgb_to_hsv, to_gray, Binarize,
    Circle, CircleParams, EdgeParams,
};
use chess_vision_state::{Cell, LabelGrid, Position};
use image::RgbImage;
use log::trace;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierParams {
    /// Median filter radius applied before edge detection; `0` disables it.
    pub median_radius: u32,
    pub edges: EdgeParams,
    /// Voting thresholds; radii and spacing come from the cell size.
    pub circles: CircleParams,
    pub min_radius_frac: f32,
    pub max_radius_frac: f32,
    pub min_distance_frac: f32,
    /// Circles larger than this fraction of the cell area are rejected.
    pub max_area_frac: f32,
    /// A circle is kept only if `center_offset_factor * offset <= radius`,
    /// where `offset` is the distance from its center to the cell center.
    pub center_offset_factor: f32,
    /// Fraction of the circle radius averaged for the piece color.
    pub sample_radius_frac: f32,
    /// Brightness (HSV value, 0..255) above which a piece is white.
    pub white_threshold: f32,
    /// Brightness below which a piece is black.
    pub black_threshold: f32,
    /// In-between readings on a dark cell are white only above this.
    pub dark_cell_white_threshold: f32,
    /// In-between readings on a light cell are white above this.
    pub light_cell_white_threshold: f32,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            median_radius: 2,
            edges: EdgeParams {
                binarize: Binarize::Otsu,
                dilate_radius: 0,
                ..EdgeParams::default()
            },
            circles: CircleParams {
                min_support: 0.75,
                min_alignment: 0.92,
                ..CircleParams::default()
            },
            min_radius_frac: 0.2,
            max_radius_frac: 1.0 / 1.8,
            min_distance_frac: 0.25,
            max_area_frac: 0.85,
            center_offset_factor: 1.3,
            sample_radius_frac: 0.9,
            white_threshold: 140.0,
            black_threshold: 80.0,
            dark_cell_white_threshold: 160.0,
            light_cell_white_threshold: 100.0,
        }
    }
}

impl ClassifierParams {
    /// Map a disc brightness to a piece color given the cell shade.
    pub fn color_from_value(&self, value: f32, is_dark_cell: bool) -> Position {
        if value > self.white_threshold {
            Position::White
        } else if value < self.black_threshold {
            Position::Black
        } else {
            let cut = if is_dark_cell {
                self.dark_cell_white_threshold
            } else {
                self.light_cell_white_threshold
            };
            if value > cut {
                Position::White
            } else {
                Position::Black
            }
        }
    }
}

/// The circle taken as the piece outline, if any.
pub fn piece_circle(cell: &RgbImage, params: &ClassifierParams) -> Option<Circle> {
    let (w, h) = cell.dimensions();
    if w < 8 || h < 8 {
        return None;
    }
    let size = w.min(h) as f32;
    let mut gray = to_gray(cell);
    if params.median_radius > 0 {
        gray = imageproc::filter::median_filter(&gray, params.median_radius, params.median_radius);
    }
    let edges = edge_map(&gray, &params.edges);
    let circle_params = params.circles.with_geometry(
        params.min_radius_frac * size,
        params.max_radius_frac * size,
        params.min_distance_frac * size,
    );

    let center = Point2::new(w as f32 * 0.5, h as f32 * 0.5);
    let max_area = params.max_area_frac * (w * h) as f32;
    detect_circles(&edges, &circle_params)
        .into_iter()
        .filter(|c| c.area() <= max_area)
        .filter(|c| params.center_offset_factor * dist(center, c.center) <= c.radius)
        .max_by(|a, b| a.radius.total_cmp(&b.radius))
}

/// Classify one rectified cell image.
pub fn classify_cell(cell: &RgbImage, is_dark_cell: bool, params: &ClassifierParams) -> Position {
    let Some(circle) = piece_circle(cell, params) else {
        return Position::Empty;
    };
    let Some(rgb) = mean_rgb_in_disc(cell, circle.center, circle.radius * params.sample_radius_frac)
    else {
        return Position::Empty;
    };
    let value = rgb_to_hsv(rgb)[2];
    let label = params.color_from_value(value, is_dark_cell);
    trace!(
        "cell circle r={:.1} at ({:.1}, {:.1}), V={value:.0} -> {label:?}",
        circle.radius,
        circle.center.x,
        circle.center.y
    );
    label
}

/// Pixel bounds `[x0, x1) x [y0, y1)` of a cell in the rectified image.
///
/// Row 0 (rank 1) is at the bottom of the image.
pub fn cell_bounds(dx: f32, dy: f32, cell: Cell) -> (u32, u32, u32, u32) {
    let x0 = cell.col as f32 * dx;
    let y0 = (BOARD_SIZE - 1 - cell.row) as f32 * dy;
    (
        x0.round().max(0.0) as u32,
        y0.round().max(0.0) as u32,
        (x0 + dx).round().max(0.0) as u32,
        (y0 + dy).round().max(0.0) as u32,
    )
}

/// Classify all 64 cells of a rectified board.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(rectified, params), fields(width = rectified.width()))
)]
pub fn classify_board(rectified: &RgbImage, dx: f32, dy: f32, params: &ClassifierParams) -> LabelGrid {
    let mut labels = [[Position::Empty; BOARD_SIZE]; BOARD_SIZE];
    for (row, line) in labels.iter_mut().enumerate() {
        for (col, label) in line.iter_mut().enumerate() {
            let cell = Cell::new(row, col);
            let (x0, y0, x1, y1) = cell_bounds(dx, dy, cell);
            let img = crop_rgb(rectified, x0, y0, x1, y1);
            *label = classify_cell(&img, cell.is_dark(), params);
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::draw_filled_circle_mut;

    const CELL: u32 = 120;

    fn cell_with_disc(background: u8, disc: Option<u8>) -> RgbImage {
        let mut img = RgbImage::from_pixel(CELL, CELL, Rgb([background; 3]));
        if let Some(v) = disc {
            draw_filled_circle_mut(&mut img, (60, 60), 45, Rgb([v; 3]));
        }
        img
    }

    #[test]
    fn plain_cell_is_empty() {
        let params = ClassifierParams::default();
        assert_eq!(classify_cell(&cell_with_disc(200, None), false, &params), Position::Empty);
        assert_eq!(classify_cell(&cell_with_disc(40, None), true, &params), Position::Empty);
    }

    #[test]
    fn bright_disc_is_white() {
        let img = cell_with_disc(50, Some(240));
        assert_eq!(classify_cell(&img, true, &ClassifierParams::default()), Position::White);
    }

    #[test]
    fn bright_disc_on_light_cell_is_white() {
        let params = ClassifierParams::default();
        for (background, disc) in [(200, 245), (180, 250), (150, 240)] {
            let img = cell_with_disc(background, Some(disc));
            assert_eq!(
                classify_cell(&img, false, &params),
                Position::White,
                "disc {disc} on {background}"
            );
        }
    }

    #[test]
    fn dark_disc_is_black() {
        let params = ClassifierParams::default();
        let img = cell_with_disc(200, Some(20));
        assert_eq!(classify_cell(&img, false, &params), Position::Black);
        let on_dark = cell_with_disc(60, Some(15));
        assert_eq!(classify_cell(&on_dark, true, &params), Position::Black);
    }

    /// Grid lines left inside the crop by an imperfect rectification.
    fn cell_with_rim_lines(size: u32, background: u8) -> RgbImage {
        let mut img = RgbImage::from_pixel(size, size, Rgb([background; 3]));
        for i in 0..size {
            for t in 0..6 {
                img.put_pixel(t, i, Rgb([0; 3]));
                img.put_pixel(i, size - 1 - t, Rgb([0; 3]));
            }
            for t in 0..3 {
                img.put_pixel(size - 1 - t, i, Rgb([0; 3]));
                img.put_pixel(i, t, Rgb([0; 3]));
            }
        }
        img
    }

    #[test]
    fn rim_lines_are_not_a_piece() {
        let params = ClassifierParams::default();
        for size in [50, 60, 120] {
            let img = cell_with_rim_lines(size, 220);
            assert_eq!(classify_cell(&img, false, &params), Position::Empty, "{size} px");
            let two_sides = {
                let mut img = RgbImage::from_pixel(size, size, Rgb([220; 3]));
                for i in 0..size {
                    for t in 0..6 {
                        img.put_pixel(t, i, Rgb([0; 3]));
                        img.put_pixel(i, size - 1 - t, Rgb([0; 3]));
                    }
                }
                img
            };
            assert_eq!(classify_cell(&two_sides, false, &params), Position::Empty, "{size} px");
        }
    }

    #[test]
    fn piece_inside_rim_lines_is_found() {
        let mut img = cell_with_rim_lines(50, 220);
        draw_filled_circle_mut(&mut img, (25, 25), 16, Rgb([20; 3]));
        assert_eq!(
            classify_cell(&img, false, &ClassifierParams::default()),
            Position::Black
        );
    }

    #[test]
    fn mid_brightness_depends_on_cell_shade() {
        let params = ClassifierParams::default();
        let on_light = cell_with_disc(220, Some(105));
        assert_eq!(classify_cell(&on_light, false, &params), Position::White);
        let on_dark = cell_with_disc(30, Some(120));
        assert_eq!(classify_cell(&on_dark, true, &params), Position::Black);
    }

    #[test]
    fn off_center_circle_is_ignored() {
        let mut img = RgbImage::from_pixel(CELL, CELL, Rgb([200; 3]));
        draw_filled_circle_mut(&mut img, (28, 28), 26, Rgb([20; 3]));
        assert_eq!(
            classify_cell(&img, false, &ClassifierParams::default()),
            Position::Empty
        );
    }

    #[test]
    fn value_thresholds() {
        let p = ClassifierParams::default();
        assert_eq!(p.color_from_value(200.0, true), Position::White);
        assert_eq!(p.color_from_value(50.0, false), Position::Black);
        assert_eq!(p.color_from_value(120.0, true), Position::Black);
        assert_eq!(p.color_from_value(120.0, false), Position::White);
        assert_eq!(p.color_from_value(90.0, false), Position::Black);
    }

    #[test]
    fn cell_bounds_put_rank_one_at_the_bottom() {
        assert_eq!(cell_bounds(150.0, 150.0, Cell::new(0, 0)), (0, 1050, 150, 1200));
        assert_eq!(cell_bounds(150.0, 150.0, Cell::new(7, 7)), (1050, 0, 1200, 150));
    }

    #[test]
    fn board_labels_follow_cell_layout() {
        let pitch = 100u32;
        let mut img = RgbImage::from_fn(8 * pitch, 8 * pitch, |x, y| {
            let (c, r) = (x / pitch, 7 - y / pitch);
            if (r + c) % 2 == 0 {
                Rgb([60; 3])
            } else {
                Rgb([200; 3])
            }
        });
        // a white piece on e2 (row 1, col 4), a black one on d7 (row 6, col 3)
        draw_filled_circle_mut(&mut img, (450, 650), 38, Rgb([245; 3]));
        draw_filled_circle_mut(&mut img, (350, 150), 38, Rgb([15; 3]));
        let labels = classify_board(&img, pitch as f32, pitch as f32, &ClassifierParams::default());
        assert_eq!(labels[1][4], Position::White);
        assert_eq!(labels[6][3], Position::Black);
        let occupied = labels.iter().flatten().filter(|p| **p != Position::Empty).count();
        assert_eq!(occupied, 2);
    }
}
