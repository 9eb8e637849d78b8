use crate::classify::cell_bounds;
use crate::grid::BOARD_SIZE;
use chess_vision_state::{format_labels, Cell, LabelGrid, Position};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use nalgebra::Point2;

const HIGHLIGHT: Rgb<u8> = Rgb([40, 220, 40]);

/// A rectified board with per-cell labels. Immutable once produced.
#[derive(Clone, Debug)]
pub struct Chessboard {
    pub image: RgbImage,
    pub mean_dx: f32,
    pub mean_dy: f32,
    /// `positions[row][col]`, row 0 = rank 1.
    pub positions: LabelGrid,
}

impl Chessboard {
    pub fn position(&self, cell: Cell) -> Position {
        self.positions
            .get(cell.row)
            .and_then(|r| r.get(cell.col))
            .copied()
            .unwrap_or_default()
    }

    /// Cell outline in the rectified image: top-left, bottom-left,
    /// bottom-right, top-right.
    pub fn cell_corners(&self, cell: Cell) -> [Point2<f32>; 4] {
        let x = cell.col as f32 * self.mean_dx;
        let y = (BOARD_SIZE - 1 - cell.row) as f32 * self.mean_dy;
        [
            Point2::new(x, y),
            Point2::new(x, y + self.mean_dy),
            Point2::new(x + self.mean_dx, y + self.mean_dy),
            Point2::new(x + self.mean_dx, y),
        ]
    }

    /// Labels as eight lines of `W`/`B`/`.`, rank 8 first.
    pub fn labels_text(&self) -> String {
        format_labels(&self.positions)
    }

    /// Copy of the rectified image with the given cells outlined.
    pub fn annotated(&self, cells: &[Cell]) -> RgbImage {
        let mut out = self.image.clone();
        for &cell in cells {
            let (x0, y0, x1, y1) = cell_bounds(self.mean_dx, self.mean_dy, cell);
            // Two nested outlines for a 2px border.
            for inset in 0..2u32 {
                let w = x1.saturating_sub(x0 + 2 * inset);
                let h = y1.saturating_sub(y0 + 2 * inset);
                if w == 0 || h == 0 {
                    continue;
                }
                let rect = Rect::at((x0 + inset) as i32, (y0 + inset) as i32).of_size(w, h);
                draw_hollow_rect_mut(&mut out, rect, HIGHLIGHT);
            }
        }
        out
    }
}
