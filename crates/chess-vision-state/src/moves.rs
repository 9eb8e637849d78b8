use serde::{Deserialize, Serialize};

const FILES: &[u8; 8] = b"abcdefgh";

/// Board cell; row 0 is rank 1 and column 0 is file a.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Parse a square name such as `e3`.
    pub fn from_algebraic(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let col = FILES.iter().position(|&f| f == bytes[0].to_ascii_lowercase())?;
        let rank = (bytes[1] as char).to_digit(10)? as usize;
        (1..=8).contains(&rank).then(|| Self::new(rank - 1, col))
    }

    /// Dark squares have an even `row + col` (a1 is dark).
    pub fn is_dark(self) -> bool {
        (self.row + self.col) % 2 == 0
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let file = FILES.get(self.col).map_or('?', |&b| b as char);
        write!(f, "{}{}", file, self.row + 1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    Normal,
    CastleShort,
    CastleLong,
}

/// A half-move seen on the board. For castling `from`/`to` are the king's
/// cells.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub from: Cell,
    pub to: Cell,
    pub kind: MoveKind,
}

impl Move {
    pub fn new(from: Cell, to: Cell) -> Self {
        Self {
            from,
            to,
            kind: MoveKind::Normal,
        }
    }

    pub fn castle(row: usize, kind: MoveKind) -> Self {
        let to_col = match kind {
            MoveKind::CastleLong => 2,
            _ => 6,
        };
        Self {
            from: Cell::new(row, 4),
            to: Cell::new(row, to_col),
            kind,
        }
    }

    /// `e2e4`, or `O-O` / `O-O-O` for castling.
    pub fn notation(&self) -> String {
        match self.kind {
            MoveKind::Normal => self.uci(),
            MoveKind::CastleShort => "O-O".to_string(),
            MoveKind::CastleLong => "O-O-O".to_string(),
        }
    }

    /// Coordinate form understood by UCI engines (`e1g1` for short castling).
    pub fn uci(&self) -> String {
        format!("{}{}", self.from, self.to)
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.notation())
    }
}
