//! Physical chessboard recognition from a single camera frame.
//!
//! The pipeline is strictly forward:
//!
//! 1. [`BoardDetector`] finds square-like quadrilaterals,
//! 2. [`cluster_squares`] keeps the group of mutually consistent size,
//! 3. [`align_board`] levels the frame so rows run horizontally,
//! 4. [`Grid::build`] places squares on the 8x8 lattice,
//! 5. a [`GapFiller`] guesses missing border cells,
//! 6. [`warp_board`] rectifies the board from its fitted outer edges,
//! 7. [`classify_board`] labels each cell white, black or empty.
//!
//! [`BoardRecognizer`] drives all of it from [`BoardRecognitionParams`].
//!
//! ```no_run
//! use chess_vision_board::BoardRecognizer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let frame = image::open("frame.png")?.to_rgb8();
//! match BoardRecognizer::default().recognize(&frame, true) {
//!     Ok(board) => println!("{}", board.labels_text()),
//!     Err(e) => eprintln!("retry with the next frame: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

mod chessboard;
mod classify;
mod cluster;
mod detector;
mod error;
mod expand;
mod grid;
mod params;
mod pipeline;
mod rotation;
mod warp;

pub use chessboard::Chessboard;
pub use classify::{cell_bounds, classify_board, classify_cell, piece_circle, ClassifierParams};
pub use cluster::{cluster_squares, ClusterParams};
pub use detector::{
    square_from_contour, squares_from_binary, BoardDetector, DetectorParams, DetectorStrategy,
    EdgeContourDetector, SquareFilterParams, ThresholdContourDetector,
};
pub use error::{BoardSide, GeometryError};
pub use expand::{CircleGapFiller, CircleGapFillerParams, GapFill, GapFiller};
pub use grid::{EmptyStats, Grid, BOARD_SIZE};
pub use params::BoardRecognitionParams;
pub use pipeline::{BoardRecognizer, RecognitionReport};
pub use rotation::{align_board, mean_horizontal_angle, AlignedBoard};
pub use warp::{side_points, target_corners, warp_board, WarpParams, WarpedBoard};

pub use chess_vision_core::Square;
pub use chess_vision_state::{Cell, LabelGrid, Position};
