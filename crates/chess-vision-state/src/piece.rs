use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Row index of this side's home rank (0 = rank 1).
    pub fn back_rank(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Color::White => "white",
            Color::Black => "black",
        })
    }
}

impl std::str::FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "white" | "w" => Ok(Color::White),
            "black" | "b" => Ok(Color::Black),
            other => Err(format!("unknown side `{other}` (expected white or black)")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    pub fn new(kind: PieceKind, color: Color) -> Self {
        Self { kind, color }
    }

    /// FEN letter: upper case for white, lower case for black.
    pub fn from_fen_char(c: char) -> Option<Self> {
        let kind = match c.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return None,
        };
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Self { kind, color })
    }

    pub fn to_fen_char(self) -> char {
        let c = match self.kind {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        };
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }
}

/// Per-cell label produced by the vision pipeline: occupancy plus color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    White,
    Black,
    #[default]
    Empty,
}

impl Position {
    pub fn of_piece(piece: Option<Piece>) -> Self {
        match piece.map(|p| p.color) {
            Some(Color::White) => Position::White,
            Some(Color::Black) => Position::Black,
            None => Position::Empty,
        }
    }

    pub fn color(self) -> Option<Color> {
        match self {
            Position::White => Some(Color::White),
            Position::Black => Some(Color::Black),
            Position::Empty => None,
        }
    }

    /// `W`, `B` or `.`.
    pub fn label(self) -> char {
        match self {
            Position::White => 'W',
            Position::Black => 'B',
            Position::Empty => '.',
        }
    }

    pub fn from_label(c: char) -> Option<Self> {
        match c {
            'W' | 'w' => Some(Position::White),
            'B' | 'b' => Some(Position::Black),
            '.' | '-' | '_' => Some(Position::Empty),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fen_letters_round_trip() {
        for c in "pnbrqkPNBRQK".chars() {
            let piece = Piece::from_fen_char(c).expect("piece");
            assert_eq!(piece.to_fen_char(), c);
        }
        assert!(Piece::from_fen_char('x').is_none());
        assert_eq!(
            Piece::from_fen_char('N'),
            Some(Piece::new(PieceKind::Knight, Color::White))
        );
    }

    #[test]
    fn position_labels() {
        assert_eq!(Position::from_label('W'), Some(Position::White));
        assert_eq!(Position::Black.label(), 'B');
        assert_eq!(Position::from_label('?'), None);
        assert_eq!(
            Position::of_piece(Some(Piece::new(PieceKind::King, Color::Black))),
            Position::Black
        );
    }
}
