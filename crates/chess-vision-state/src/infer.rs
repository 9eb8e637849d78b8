//! Infer the opponent's move from the last known state and a fresh set of
//! cell labels.

use crate::error::MoveInferenceError;
use crate::moves::{Cell, Move, MoveKind};
use crate::piece::{Color, Piece, Position};
use crate::state::ChessboardState;
use crate::LabelGrid;
use log::debug;

/// Whether a cell's label disagrees with the piece that stood there.
pub fn is_changed(old: Option<Piece>, new: Position) -> bool {
    match new {
        Position::White => old.map(|p| p.color) != Some(Color::White),
        Position::Black => old.map(|p| p.color) != Some(Color::Black),
        Position::Empty => old.is_some(),
    }
}

/// Cells whose label differs from the state, in row-major order.
pub fn changed_cells(state: &ChessboardState, labels: &LabelGrid) -> Vec<Cell> {
    let mut out = Vec::new();
    for (row, (pieces, labels)) in state.grid.iter().zip(labels.iter()).enumerate() {
        for (col, (old, new)) in pieces.iter().zip(labels.iter()).enumerate() {
            if is_changed(*old, *new) {
                out.push(Cell::new(row, col));
            }
        }
    }
    out
}

/// Reads the opponent's half-move off the board for a bot playing `bot_side`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveInferencer {
    pub bot_side: Color,
}

impl MoveInferencer {
    pub fn new(bot_side: Color) -> Self {
        Self { bot_side }
    }

    pub fn enemy(&self) -> Color {
        self.bot_side.opposite()
    }

    /// Split the changed cells into the enemy's source and target cells.
    pub fn split_changes(
        &self,
        state: &ChessboardState,
        labels: &LabelGrid,
    ) -> (Vec<Cell>, Vec<Cell>) {
        let enemy = self.enemy();
        let mut from = Vec::new();
        let mut to = Vec::new();
        for cell in changed_cells(state, labels) {
            let new = labels[cell.row][cell.col];
            if new.color() == Some(enemy) {
                to.push(cell);
            } else if state.piece_at(cell).map(|p| p.color) == Some(enemy) {
                from.push(cell);
            }
        }
        (from, to)
    }

    pub fn infer(
        &self,
        state: &ChessboardState,
        labels: &LabelGrid,
    ) -> Result<Move, MoveInferenceError> {
        let (from, to) = self.split_changes(state, labels);
        debug!("move inference: from {from:?} to {to:?}");

        if let ([f], [t]) = (from.as_slice(), to.as_slice()) {
            return Ok(Move::new(*f, *t));
        }
        if let Some(mv) = self.castling(&from, &to) {
            return Ok(mv);
        }
        Err(MoveInferenceError::Unresolved { from, to })
    }

    fn castling(&self, from: &[Cell], to: &[Cell]) -> Option<Move> {
        if from.len() != 2 || to.len() != 2 {
            return None;
        }
        let row = self.enemy().back_rank();
        if from.iter().chain(to.iter()).any(|c| c.row != row) {
            return None;
        }
        let mut from_cols = [from[0].col, from[1].col];
        let mut to_cols = [to[0].col, to[1].col];
        from_cols.sort_unstable();
        to_cols.sort_unstable();

        match (from_cols, to_cols) {
            ([0, 4], [2, 3]) => Some(Move::castle(row, MoveKind::CastleLong)),
            ([4, 7], [5, 6]) => Some(Move::castle(row, MoveKind::CastleShort)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::START_FEN;

    fn state(fen: &str) -> ChessboardState {
        fen.parse().expect("fen")
    }

    #[test]
    fn pawn_push_by_white() {
        let before = state(START_FEN);
        let mut labels = before.labels();
        labels[1][4] = Position::Empty;
        labels[3][4] = Position::White;

        let mv = MoveInferencer::new(Color::Black)
            .infer(&before, &labels)
            .expect("move");
        assert_eq!(mv.from, Cell::new(1, 4));
        assert_eq!(mv.to, Cell::new(3, 4));
        assert_eq!(mv.notation(), "e2e4");
    }

    #[test]
    fn capture_is_a_single_move() {
        let before = state("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 2");
        let mut labels = before.labels();
        labels[4][3] = Position::Empty;
        labels[3][4] = Position::Black;
        let mv = MoveInferencer::new(Color::White)
            .infer(&before, &labels)
            .expect("move");
        assert_eq!(mv.uci(), "d5e4");
    }

    #[test]
    fn white_short_castling() {
        let before = state("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let mut labels = before.labels();
        labels[0][4] = Position::Empty;
        labels[0][7] = Position::Empty;
        labels[0][5] = Position::White;
        labels[0][6] = Position::White;
        let mv = MoveInferencer::new(Color::Black)
            .infer(&before, &labels)
            .expect("castling");
        assert_eq!(mv.notation(), "O-O");
        assert_eq!(mv.uci(), "e1g1");
    }

    #[test]
    fn black_long_castling() {
        let before = state("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1");
        let mut labels = before.labels();
        labels[7][0] = Position::Empty;
        labels[7][4] = Position::Empty;
        labels[7][2] = Position::Black;
        labels[7][3] = Position::Black;
        let mv = MoveInferencer::new(Color::White)
            .infer(&before, &labels)
            .expect("castling");
        assert_eq!(mv.notation(), "O-O-O");
        assert_eq!(mv.uci(), "e8c8");
    }

    #[test]
    fn castling_pattern_off_the_back_rank_is_unresolved() {
        let before = state("8/8/8/8/8/8/r3k2r/8 b - - 0 1");
        let mut labels = before.labels();
        labels[1][4] = Position::Empty;
        labels[1][7] = Position::Empty;
        labels[1][5] = Position::Black;
        labels[1][6] = Position::Black;
        let err = MoveInferencer::new(Color::White)
            .infer(&before, &labels)
            .expect_err("unresolved");
        let MoveInferenceError::Unresolved { from, to } = err;
        assert_eq!(from.len(), 2);
        assert_eq!(to.len(), 2);
    }

    #[test]
    fn three_vacated_cells_are_unresolved() {
        let before = state(START_FEN);
        let mut labels = before.labels();
        labels[1][0] = Position::Empty;
        labels[1][1] = Position::Empty;
        labels[1][2] = Position::Empty;
        let err = MoveInferencer::new(Color::Black)
            .infer(&before, &labels)
            .expect_err("unresolved");
        assert_eq!(
            err,
            MoveInferenceError::Unresolved {
                from: vec![Cell::new(1, 0), Cell::new(1, 1), Cell::new(1, 2)],
                to: vec![],
            }
        );
        assert!(err.to_string().contains("a2,b2,c2"));
    }

    #[test]
    fn unchanged_board_is_unresolved() {
        let before = state(START_FEN);
        let err = MoveInferencer::new(Color::White).infer(&before, &before.labels());
        assert!(err.is_err());
        assert!(changed_cells(&before, &before.labels()).is_empty());
    }
}
