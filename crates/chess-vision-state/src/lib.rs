//! Chess state bookkeeping for the vision pipeline: FEN parsing, cell and
//! move types, and inference of the opponent's move from occupancy labels.

mod error;
mod infer;
mod moves;
mod piece;
mod state;

pub use error::{FenError, LabelError, MoveInferenceError};
pub use infer::{changed_cells, is_changed, MoveInferencer};
pub use moves::{Cell, Move, MoveKind};
pub use piece::{Color, Piece, PieceKind, Position};
pub use state::{CastleSide, ChessboardState, START_FEN};

/// Occupancy labels indexed `[row][col]` with row 0 = rank 1.
pub type LabelGrid = [[Position; 8]; 8];

/// Parse 64 labels (`W`, `B`, `.`) listed rank 8 first, files a to h.
///
/// Whitespace and `/` separators are ignored.
pub fn parse_labels(text: &str) -> Result<LabelGrid, LabelError> {
    let labels: Vec<Position> = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '/')
        .map(|c| Position::from_label(c).ok_or(LabelError::BadLabel(c)))
        .collect::<Result<_, _>>()?;
    if labels.len() != 64 {
        return Err(LabelError::Length(labels.len()));
    }
    let mut grid = [[Position::Empty; 8]; 8];
    for (i, label) in labels.into_iter().enumerate() {
        grid[7 - i / 8][i % 8] = label;
    }
    Ok(grid)
}

/// Inverse of [`parse_labels`]: eight lines, rank 8 first.
pub fn format_labels(grid: &LabelGrid) -> String {
    grid.iter()
        .rev()
        .map(|row| row.iter().map(|p| p.label()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}
