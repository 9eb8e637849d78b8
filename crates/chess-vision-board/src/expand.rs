//! Best-effort recovery of missing border cells.
//!
//! Cells covered by pieces rarely survive square detection, so trailing rows
//! and columns of the grid are often empty. [`CircleGapFiller`] looks for
//! round piece tops beyond the populated span and synthesizes a square under
//! each one, shaped like its populated neighbours. The result is a plausible
//! guess, not an exact reconstruction.

use crate::grid::{Grid, BOARD_SIZE};
use chess_vision_core::{
    crop_rgb, detect_circles, edge_map, to_gray, CircleParams, EdgeParams, Square,
};
use image::RgbImage;
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Squares after gap filling together with the grid rebuilt from them.
#[derive(Clone, Debug)]
pub struct GapFill {
    pub squares: Vec<Square>,
    pub grid: Grid,
    /// Number of synthesized squares.
    pub added: usize,
}

/// Strategy for completing a grid whose border rows or columns are empty.
pub trait GapFiller {
    fn fill(&self, image: &RgbImage, squares: &[Square], grid: &Grid) -> GapFill;
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CircleGapFillerParams {
    pub edges: EdgeParams,
    /// Thresholds for circle detection; radii and spacing are derived from
    /// the cell size below.
    pub circles: CircleParams,
    /// Minimum center spacing as a fraction of the cell size.
    pub min_distance_frac: f32,
    pub min_radius_frac: f32,
    pub max_radius_frac: f32,
}

impl Default for CircleGapFillerParams {
    fn default() -> Self {
        Self {
            edges: EdgeParams {
                close_radius: 0,
                ..EdgeParams::default()
            },
            circles: CircleParams::default(),
            min_distance_frac: 0.5,
            min_radius_frac: 0.35,
            max_radius_frac: 0.5,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CircleGapFiller {
    pub params: CircleGapFillerParams,
}

impl CircleGapFiller {
    pub fn new(params: CircleGapFillerParams) -> Self {
        Self { params }
    }
}

fn unchanged(squares: &[Square], grid: &Grid) -> GapFill {
    GapFill {
        squares: squares.to_vec(),
        grid: grid.clone(),
        added: 0,
    }
}

impl GapFiller for CircleGapFiller {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(squares = squares.len()))
    )]
    fn fill(&self, image: &RgbImage, squares: &[Square], grid: &Grid) -> GapFill {
        let Some(close) = grid.closest_coords() else {
            return unchanged(squares, grid);
        };
        let stats = grid.empty_stats();
        let (mw, mh) = (grid.mean_width, grid.mean_height);
        if mw <= 0.0 || mh <= 0.0 {
            return unchanged(squares, grid);
        }

        let (w, h) = (image.width() as f32, image.height() as f32);
        let ext_x = stats.empty_cols as f32 * mw;
        let ext_y = stats.empty_rows as f32 * mh;
        let x0 = (close.x - ext_x).max(0.0).floor();
        let y0 = (close.y - ext_y).max(0.0).floor();
        let x1 = (stats.far_x + ext_x).min(w).ceil();
        let y1 = (stats.far_y + ext_y).min(h).ceil();
        if x1 - x0 < 4.0 || y1 - y0 < 4.0 {
            return unchanged(squares, grid);
        }

        let window = crop_rgb(image, x0 as u32, y0 as u32, x1 as u32, y1 as u32);
        let edges = edge_map(&to_gray(&window), &self.params.edges);
        let cell = 0.5 * (mw + mh);
        let circle_params = self.params.circles.with_geometry(
            self.params.min_radius_frac * cell,
            self.params.max_radius_frac * cell,
            self.params.min_distance_frac * cell,
        );
        let circles = detect_circles(&edges, &circle_params);

        let last_col = BOARD_SIZE - 1 - stats.empty_cols.min(BOARD_SIZE - 1);
        let last_row = BOARD_SIZE - 1 - stats.empty_rows.min(BOARD_SIZE - 1);
        let col_template = |c: usize| Grid::mean_shape(grid.col(c));
        let row_template = |r: usize| Grid::mean_shape(grid.row(r));

        let mut added = Vec::new();
        for circle in &circles {
            let c = Point2::new(circle.center.x + x0, circle.center.y + y0);
            let in_x = c.x >= close.x && c.x <= stats.far_x;
            let in_y = c.y >= close.y && c.y <= stats.far_y;
            if in_x && in_y {
                continue;
            }
            let template = if !in_x {
                col_template(if c.x < close.x { 0 } else { last_col })
            } else {
                row_template(if c.y < close.y { 0 } else { last_row })
            };
            let Some(shape) = template else {
                continue;
            };
            let tl = Point2::new(c.x - 0.5 * mw, c.y - 0.5 * mh);
            if let Some(sq) = Square::from_vertices(shape.map(|p| Point2::new(tl.x + p.x, tl.y + p.y))) {
                added.push(sq);
            }
        }

        debug!(
            "gap filler: {} circles in {}x{} window, {} squares added",
            circles.len(),
            x1 - x0,
            y1 - y0,
            added.len()
        );
        if added.is_empty() {
            return unchanged(squares, grid);
        }
        let count = added.len();
        let mut all = squares.to_vec();
        all.extend(added);
        let grid = Grid::build(&all);
        GapFill {
            squares: all,
            grid,
            added: count,
        }
    }
}
