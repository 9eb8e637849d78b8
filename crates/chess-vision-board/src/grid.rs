//! 8x8 placement of aligned squares.

use chess_vision_core::{Square, BR, TL};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

pub const BOARD_SIZE: usize = 8;

/// Sparse 8x8 grid of squares in image orientation (row 0 at the top).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub cells: [[Option<Square>; BOARD_SIZE]; BOARD_SIZE],
    /// Mean width of the squares the grid was built from.
    pub mean_width: f32,
    /// Mean height of the squares the grid was built from.
    pub mean_height: f32,
}

/// Trailing empty rows/columns and how far the populated part reaches.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmptyStats {
    /// Empty rows counted from row 7 upwards.
    pub empty_rows: usize,
    /// Empty columns counted from column 7 leftwards.
    pub empty_cols: usize,
    /// Largest bottom-right x in the last populated column.
    pub far_x: f32,
    /// Largest bottom-right y in the last populated row.
    pub far_y: f32,
}

/// Accumulate rounded steps along one axis; indices saturate at 7.
fn assign_axis(values: &[f32], pitch: f32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut out = vec![0usize; values.len()];
    let mut running = 0i64;
    for pair in order.windows(2) {
        let step = if pitch > 0.0 {
            ((values[pair[1]] - values[pair[0]]) / pitch).round() as i64
        } else {
            0
        };
        running += step.max(0);
        out[pair[1]] = running.min(BOARD_SIZE as i64 - 1) as usize;
    }
    out
}

impl Grid {
    pub fn empty() -> Self {
        Self {
            cells: [[None; BOARD_SIZE]; BOARD_SIZE],
            mean_width: 0.0,
            mean_height: 0.0,
        }
    }

    /// Place squares by accumulated row/column steps.
    ///
    /// Rows step by the mean square width and columns by the mean height.
    /// When two squares land on the same cell the later one in `squares`
    /// wins.
    pub fn build(squares: &[Square]) -> Self {
        if squares.is_empty() {
            return Self::empty();
        }
        let n = squares.len() as f32;
        let mean_width = squares.iter().map(|s| s.width).sum::<f32>() / n;
        let mean_height = squares.iter().map(|s| s.height).sum::<f32>() / n;

        let ys: Vec<f32> = squares.iter().map(|s| s.position.y).collect();
        let xs: Vec<f32> = squares.iter().map(|s| s.position.x).collect();
        let rows = assign_axis(&ys, mean_width);
        let cols = assign_axis(&xs, mean_height);

        let mut cells = [[None; BOARD_SIZE]; BOARD_SIZE];
        for (i, sq) in squares.iter().enumerate() {
            cells[rows[i]][cols[i]] = Some(*sq);
        }
        Self {
            cells,
            mean_width,
            mean_height,
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<&Square> {
        self.cells.get(row)?.get(col)?.as_ref()
    }

    pub fn row(&self, row: usize) -> impl Iterator<Item = &Square> + '_ {
        self.cells[row].iter().flatten()
    }

    pub fn col(&self, col: usize) -> impl Iterator<Item = &Square> + '_ {
        self.cells.iter().filter_map(move |r| r[col].as_ref())
    }

    pub fn squares(&self) -> impl Iterator<Item = &Square> + '_ {
        self.cells.iter().flatten().flatten()
    }

    pub fn count(&self) -> usize {
        self.squares().count()
    }

    /// Whether row 0, row 7, column 0 or column 7 holds no square.
    pub fn borders_empty(&self) -> bool {
        let last = BOARD_SIZE - 1;
        self.row(0).next().is_none()
            || self.row(last).next().is_none()
            || self.col(0).next().is_none()
            || self.col(last).next().is_none()
    }

    pub fn empty_stats(&self) -> EmptyStats {
        let mut stats = EmptyStats {
            empty_rows: 0,
            empty_cols: 0,
            far_x: 0.0,
            far_y: 0.0,
        };
        for r in (0..BOARD_SIZE).rev() {
            match self.row(r).map(|s| s.polygon[BR].y).reduce(f32::max) {
                Some(y) => {
                    stats.far_y = y;
                    break;
                }
                None => stats.empty_rows += 1,
            }
        }
        for c in (0..BOARD_SIZE).rev() {
            match self.col(c).map(|s| s.polygon[BR].x).reduce(f32::max) {
                Some(x) => {
                    stats.far_x = x;
                    break;
                }
                None => stats.empty_cols += 1,
            }
        }
        stats
    }

    /// Smallest top-left x over column 0 and smallest top-left y over row 0.
    pub fn closest_coords(&self) -> Option<Point2<f32>> {
        let x = self.col(0).map(|s| s.polygon[TL].x).reduce(f32::min)?;
        let y = self.row(0).map(|s| s.polygon[TL].y).reduce(f32::min)?;
        Some(Point2::new(x, y))
    }

    /// Mean polygon (relative to its top-left vertex) over the given squares.
    pub fn mean_shape<'a>(squares: impl Iterator<Item = &'a Square>) -> Option<[Point2<f32>; 4]> {
        let mut acc: [Point2<f32>; 4] = [Point2::origin(); 4];
        let mut n = 0usize;
        for sq in squares {
            for (a, p) in acc.iter_mut().zip(sq.local_shape()) {
                a.x += p.x;
                a.y += p.y;
            }
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(acc.map(|p| Point2::new(p.x / n as f32, p.y / n as f32)))
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in &self.cells {
            let line: Vec<&str> = row
                .iter()
                .map(|c| if c.is_some() { "**" } else { "__" })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}
