use crate::moves::Cell;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    #[error("expected 6 space-separated FEN fields, got {0}")]
    FieldCount(usize),
    #[error("expected 8 ranks, got {0}")]
    RankCount(usize),
    #[error("rank {rank} does not describe exactly 8 files")]
    RankWidth { rank: usize },
    #[error("invalid piece letter `{0}`")]
    BadPiece(char),
    #[error("invalid side to move `{0}`")]
    BadSide(String),
    #[error("invalid castling rights `{0}`")]
    BadCastling(String),
    #[error("invalid en-passant square `{0}`")]
    BadEnPassant(String),
    #[error("invalid {field} `{value}`")]
    BadCounter { field: &'static str, value: String },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    #[error("expected 64 cell labels, got {0}")]
    Length(usize),
    #[error("invalid cell label `{0}` (expected W, B or .)")]
    BadLabel(char),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveInferenceError {
    #[error("board change matches no move (from: {}, to: {})", cells(.from), cells(.to))]
    Unresolved { from: Vec<Cell>, to: Vec<Cell> },
}

fn cells(cells: &[Cell]) -> String {
    if cells.is_empty() {
        return "-".to_string();
    }
    cells
        .iter()
        .map(Cell::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
