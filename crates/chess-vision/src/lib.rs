//! Facade crate for the `chess-vision-*` workspace.
//!
//! - [`board`]: frame to rectified board with per-cell labels.
//! - [`state`]: FEN state, moves and move inference.
//! - [`core`]: geometry and image primitives, logging setup.
//! - [`detect`]: one-call helpers from an image file or `DynamicImage`.
//! - [`tracker`]: turn-by-turn game tracking against a chess engine.
//!
//! ## Quickstart
//!
//! ```no_run
//! use chess_vision::detect::detect_board_path;
//! use chess_vision::BoardRecognitionParams;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let board = detect_board_path("frame.jpg", true, &BoardRecognitionParams::default())?;
//! println!("{}", board.labels_text());
//! # Ok(())
//! # }
//! ```

pub use chess_vision_board as board;
pub use chess_vision_core as core;
pub use chess_vision_state as state;

pub use chess_vision_board::{BoardRecognitionParams, BoardRecognizer, Chessboard, GeometryError};
pub use chess_vision_state::{Cell, ChessboardState, Color, LabelGrid, Move, Position};

pub mod detect;
pub mod tracker;
