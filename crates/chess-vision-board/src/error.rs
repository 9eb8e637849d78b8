/// Board geometry could not be established for a frame.
///
/// None of these are fatal: the caller is expected to retry on a new frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("image is empty")]
    EmptyImage,
    #[error("no square candidates found")]
    NoSquares,
    #[error("board border rows/columns are still empty after gap filling")]
    BordersEmpty,
    #[error("{first} and {second} board sides are (nearly) parallel")]
    ParallelLines {
        first: BoardSide,
        second: BoardSide,
    },
    #[error("{side} board side has too few points for a line fit")]
    SideUnderdetermined { side: BoardSide },
    #[error("perspective transform to the rectified board is degenerate")]
    HomographyFailed,
}

/// One of the four outer board edges in image orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BoardSide {
    Left,
    Top,
    Right,
    Bottom,
}

impl std::fmt::Display for BoardSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BoardSide::Left => "left",
            BoardSide::Top => "top",
            BoardSide::Right => "right",
            BoardSide::Bottom => "bottom",
        };
        f.write_str(name)
    }
}
