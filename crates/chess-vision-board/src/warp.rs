//! Perspective rectification of the board from its fitted outer edges.

use crate::error::{BoardSide, GeometryError};
use crate::grid::{Grid, BOARD_SIZE};
use chess_vision_core::{homography_from_4pt, warp_perspective_rgb, Line, LineError, BL, BR, TL, TR};
use image::RgbImage;
use log::{debug, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct WarpParams {
    /// Side length of the rectified board image (pixels).
    pub target_size: u32,
    /// Minimum sine of the angle between two intersected sides.
    pub parallel_eps: f64,
}

impl Default for WarpParams {
    fn default() -> Self {
        Self {
            target_size: 1200,
            parallel_eps: 0.05,
        }
    }
}

#[derive(Clone, Debug)]
pub struct WarpedBoard {
    pub image: RgbImage,
    /// Outer board corners in the source image: left-top, left-bottom,
    /// bottom-right, right-top.
    pub corners: [Point2<f32>; 4],
    pub mean_dx: f32,
    pub mean_dy: f32,
}

/// Rim points along each board side, two per populated border cell.
pub fn side_points(grid: &Grid) -> [(BoardSide, Vec<Point2<f32>>); 4] {
    let last = BOARD_SIZE - 1;
    let collect = |squares: Vec<&chess_vision_core::Square>, a: usize, b: usize| {
        squares
            .into_iter()
            .flat_map(|s| [s.polygon[a], s.polygon[b]])
            .collect::<Vec<_>>()
    };
    [
        (BoardSide::Left, collect(grid.col(0).collect(), TL, BL)),
        (BoardSide::Top, collect(grid.row(0).collect(), TL, TR)),
        (BoardSide::Right, collect(grid.col(last).collect(), TR, BR)),
        (BoardSide::Bottom, collect(grid.row(last).collect(), BL, BR)),
    ]
}

/// Corner targets in the rectified image for the image-space corners
/// left-top, left-bottom, bottom-right, right-top.
pub fn target_corners(size: f32, is_white_sided: bool) -> [Point2<f32>; 4] {
    let s = size;
    if is_white_sided {
        [
            Point2::new(0.0, 0.0),
            Point2::new(0.0, s),
            Point2::new(s, s),
            Point2::new(s, 0.0),
        ]
    } else {
        [
            Point2::new(s, s),
            Point2::new(s, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(0.0, s),
        ]
    }
}

/// Intersections left-top, left-bottom, bottom-right, right-top.
fn board_corners(
    lines: &[(BoardSide, Line)],
    eps: f64,
) -> Result<[Point2<f32>; 4], GeometryError> {
    let meet = |a: &(BoardSide, Line), b: &(BoardSide, Line)| {
        a.1.intersect(&b.1, eps)
            .map_err(|_| GeometryError::ParallelLines {
                first: a.0,
                second: b.0,
            })
    };
    let [left, top, right, bottom] = lines else {
        return Err(GeometryError::HomographyFailed);
    };
    Ok([
        meet(left, top)?,
        meet(left, bottom)?,
        meet(bottom, right)?,
        meet(right, top)?,
    ])
}

/// Fit the four board sides, intersect them and warp the board to a square.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(image, grid, params), fields(squares = grid.count()))
)]
pub fn warp_board(
    image: &RgbImage,
    grid: &Grid,
    is_white_sided: bool,
    params: &WarpParams,
) -> Result<WarpedBoard, GeometryError> {
    let sides = side_points(grid);
    let mut lines = Vec::with_capacity(4);
    for (side, pts) in &sides {
        let line = Line::fit(pts).map_err(|e| match e {
            LineError::TooFewPoints(_) | LineError::Parallel { .. } => {
                GeometryError::SideUnderdetermined { side: *side }
            }
        })?;
        lines.push((*side, line));
    }
    let corners = board_corners(&lines, params.parallel_eps)
        .inspect_err(|e| warn!("board corners: {e}"))?;
    debug!("board corners: {corners:?}");

    let size = params.target_size.max(BOARD_SIZE as u32);
    let targets = target_corners(size as f32, is_white_sided);
    let h_src_from_dst =
        homography_from_4pt(&targets, &corners).ok_or(GeometryError::HomographyFailed)?;

    let pitch = size as f32 / BOARD_SIZE as f32;
    Ok(WarpedBoard {
        image: warp_perspective_rgb(image, &h_src_from_dst, size, size),
        corners,
        mean_dx: pitch,
        mean_dy: pitch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_vision_core::Square;
    use image::Rgb;

    fn board_grid(x0: f32, y0: f32, pitch: f32) -> Grid {
        let mut squares = Vec::new();
        for r in 0..8 {
            for c in 0..8 {
                squares.push(Square::axis_aligned(
                    x0 + pitch * c as f32,
                    y0 + pitch * r as f32,
                    pitch,
                    pitch,
                ));
            }
        }
        Grid::build(&squares)
    }

    fn close(a: Point2<f32>, b: Point2<f32>) -> bool {
        (a - b).norm() < 0.5
    }

    #[test]
    fn corners_of_a_rectangular_grid() {
        let grid = board_grid(20.0, 30.0, 50.0);
        let img = RgbImage::new(500, 500);
        let params = WarpParams {
            target_size: 400,
            ..WarpParams::default()
        };
        let warped = warp_board(&img, &grid, true, &params).expect("warp");
        let expected = [
            Point2::new(20.0, 30.0),
            Point2::new(20.0, 430.0),
            Point2::new(420.0, 430.0),
            Point2::new(420.0, 30.0),
        ];
        for (c, e) in warped.corners.iter().zip(expected.iter()) {
            assert!(close(*c, *e), "{c:?} vs {e:?}");
        }
        assert_eq!(warped.mean_dx, 50.0);
        assert_eq!(warped.mean_dy, 50.0);
        assert_eq!(warped.image.dimensions(), (400, 400));
    }

    #[test]
    fn side_orientation_flips_the_board() {
        let grid = board_grid(20.0, 30.0, 50.0);
        let mut img = RgbImage::from_pixel(500, 500, Rgb([0, 0, 0]));
        for y in 32..48 {
            for x in 22..38 {
                img.put_pixel(x, y, Rgb([255, 0, 0]));
            }
        }
        let params = WarpParams {
            target_size: 400,
            ..WarpParams::default()
        };
        let white = warp_board(&img, &grid, true, &params).expect("warp");
        assert_eq!(white.image.get_pixel(10, 10).0, [255, 0, 0]);
        let black = warp_board(&img, &grid, false, &params).expect("warp");
        assert_eq!(black.image.get_pixel(390, 390).0, [255, 0, 0]);
        assert_eq!(black.image.get_pixel(10, 10).0, [0, 0, 0]);
    }

    #[test]
    fn parallel_sides_are_a_geometry_error() {
        let degenerate = Square {
            position: Point2::new(0.0, 0.0),
            width: 10.0,
            height: 10.0,
            area: 100.0,
            polygon: [
                Point2::new(0.0, 0.0),
                Point2::new(0.0, 10.0),
                Point2::new(10.0, 10.0),
                Point2::new(0.0, -10.0),
            ],
        };
        let mut grid = Grid::empty();
        grid.cells[0][0] = Some(degenerate);
        grid.cells[7][7] = Some(Square::axis_aligned(70.0, 70.0, 10.0, 10.0));
        let err = warp_board(&RgbImage::new(100, 100), &grid, true, &WarpParams::default())
            .expect_err("parallel");
        assert_eq!(
            err,
            GeometryError::ParallelLines {
                first: BoardSide::Left,
                second: BoardSide::Top
            }
        );
    }

    #[test]
    fn missing_side_is_reported() {
        let mut grid = Grid::empty();
        grid.cells[0][0] = Some(Square::axis_aligned(0.0, 0.0, 10.0, 10.0));
        let err = warp_board(&RgbImage::new(50, 50), &grid, true, &WarpParams::default())
            .expect_err("underdetermined");
        assert_eq!(
            err,
            GeometryError::SideUnderdetermined {
                side: BoardSide::Right
            }
        );
    }
}
