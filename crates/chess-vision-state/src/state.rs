//! Board state in Forsyth-Edwards notation.

use crate::error::FenError;
use crate::moves::Cell;
use crate::piece::{Color, Piece, Position};
use crate::LabelGrid;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastleSide {
    /// King side (`O-O`).
    Short,
    /// Queen side (`O-O-O`).
    Long,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChessboardState {
    /// `grid[row][col]`, row 0 = rank 1, col 0 = file a.
    pub grid: [[Option<Piece>; 8]; 8],
    pub side_to_move: Color,
    /// Castling rights as in FEN (`KQkq` subset); empty when none.
    pub castling: String,
    pub en_passant: Option<Cell>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

impl Default for ChessboardState {
    fn default() -> Self {
        Self::start()
    }
}

impl ChessboardState {
    /// The standard initial position (same as parsing [`START_FEN`]).
    pub fn start() -> Self {
        use crate::piece::PieceKind::*;
        const BACK: [crate::piece::PieceKind; 8] =
            [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];

        let mut grid = [[None; 8]; 8];
        for (col, &kind) in BACK.iter().enumerate() {
            grid[0][col] = Some(Piece::new(kind, Color::White));
            grid[1][col] = Some(Piece::new(Pawn, Color::White));
            grid[6][col] = Some(Piece::new(Pawn, Color::Black));
            grid[7][col] = Some(Piece::new(kind, Color::Black));
        }
        Self {
            grid,
            side_to_move: Color::White,
            castling: "KQkq".to_string(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    pub fn piece_at(&self, cell: Cell) -> Option<Piece> {
        *self.grid.get(cell.row)?.get(cell.col)?
    }

    pub fn can_castle(&self, color: Color, side: CastleSide) -> bool {
        let flag = match (color, side) {
            (Color::White, CastleSide::Short) => 'K',
            (Color::White, CastleSide::Long) => 'Q',
            (Color::Black, CastleSide::Short) => 'k',
            (Color::Black, CastleSide::Long) => 'q',
        };
        self.castling.contains(flag)
    }

    /// Occupancy/color labels as the vision pipeline would report them.
    pub fn labels(&self) -> LabelGrid {
        self.grid.map(|row| row.map(Position::of_piece))
    }

    pub fn to_fen(&self) -> String {
        self.to_string()
    }

    /// Board diagram, rank 8 first, `.` for empty squares.
    pub fn diagram(&self) -> String {
        let mut out = String::new();
        for row in self.grid.iter().rev() {
            let line: Vec<String> = row
                .iter()
                .map(|p| p.map_or('.', |p| p.to_fen_char()).to_string())
                .collect();
            let _ = writeln!(out, "{}", line.join(" "));
        }
        out
    }
}

fn parse_counter(field: &'static str, value: &str) -> Result<u32, FenError> {
    value.parse().map_err(|_| FenError::BadCounter {
        field,
        value: value.to_string(),
    })
}

impl FromStr for ChessboardState {
    type Err = FenError;

    fn from_str(fen: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        let [placement, side, castling, ep, halfmove, fullmove] = fields[..] else {
            return Err(FenError::FieldCount(fields.len()));
        };

        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::RankCount(ranks.len()));
        }
        let mut grid = [[None; 8]; 8];
        for (i, rank) in ranks.iter().enumerate() {
            let row = 7 - i;
            let mut col = 0usize;
            for c in rank.chars() {
                if let Some(n) = c.to_digit(10) {
                    if n == 0 {
                        return Err(FenError::RankWidth { rank: row + 1 });
                    }
                    col += n as usize;
                } else {
                    let piece = Piece::from_fen_char(c).ok_or(FenError::BadPiece(c))?;
                    if col >= 8 {
                        return Err(FenError::RankWidth { rank: row + 1 });
                    }
                    grid[row][col] = Some(piece);
                    col += 1;
                }
                if col > 8 {
                    return Err(FenError::RankWidth { rank: row + 1 });
                }
            }
            if col != 8 {
                return Err(FenError::RankWidth { rank: row + 1 });
            }
        }

        let side_to_move = match side {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::BadSide(other.to_string())),
        };

        let castling = if castling == "-" {
            String::new()
        } else if !castling.is_empty() && castling.chars().all(|c| "KQkq".contains(c)) {
            castling.to_string()
        } else {
            return Err(FenError::BadCastling(castling.to_string()));
        };

        let en_passant = if ep == "-" {
            None
        } else {
            let cell = Cell::from_algebraic(ep)
                .filter(|c| c.row == 2 || c.row == 5)
                .ok_or_else(|| FenError::BadEnPassant(ep.to_string()))?;
            Some(cell)
        };

        Ok(Self {
            grid,
            side_to_move,
            castling,
            en_passant,
            halfmove_clock: parse_counter("halfmove clock", halfmove)?,
            fullmove_number: parse_counter("fullmove number", fullmove)?,
        })
    }
}

impl std::fmt::Display for ChessboardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, row) in self.grid.iter().rev().enumerate() {
            if i > 0 {
                f.write_char('/')?;
            }
            let mut empty = 0;
            for cell in row {
                match cell {
                    Some(p) => {
                        if empty > 0 {
                            write!(f, "{empty}")?;
                            empty = 0;
                        }
                        f.write_char(p.to_fen_char())?;
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                write!(f, "{empty}")?;
            }
        }
        let side = match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        };
        let castling = if self.castling.is_empty() {
            "-"
        } else {
            self.castling.as_str()
        };
        let ep = self
            .en_passant
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        write!(
            f,
            " {side} {castling} {ep} {} {}",
            self.halfmove_clock, self.fullmove_number
        )
    }
}
