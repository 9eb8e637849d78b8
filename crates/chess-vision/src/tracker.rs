//! Turn-by-turn game tracking: read the opponent's move off a frame, check
//! it with an engine, answer with the engine's move.

use chess_vision_board::{BoardRecognizer, Chessboard, GeometryError};
use chess_vision_state::{
    changed_cells, Cell, ChessboardState, Color, FenError, Move, MoveInferenceError,
    MoveInferencer,
};
use image::RgbImage;
use log::{debug, info, warn};

/// Outcome of the position from the engine's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Checkmate,
    Stalemate,
}

/// Authoritative chess rules and play, typically a UCI engine process.
///
/// Moves are passed in UCI coordinate form (`e2e4`, `e1g1`).
pub trait ChessEngine {
    fn is_move_correct(&mut self, uci: &str) -> bool;

    fn make_move(&mut self, uci: &str);

    /// Current position as a FEN string.
    fn fen(&mut self) -> String;

    fn best_move(&mut self) -> Option<String>;

    fn game_status(&mut self) -> GameStatus {
        GameStatus::Ongoing
    }
}

/// Asks whoever sits at the board whether an inferred move is right.
pub trait MoveConfirmer {
    fn confirm(&mut self, mv: &Move, board: &Chessboard) -> bool;
}

/// Accepts every inferred move.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysConfirm;

impl MoveConfirmer for AlwaysConfirm {
    fn confirm(&mut self, _mv: &Move, _board: &Chessboard) -> bool {
        true
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TrackError {
    #[error("board not found: {0}")]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Inference(#[from] MoveInferenceError),

    #[error("move {0} was rejected")]
    Rejected(Move),

    #[error("engine rejected move {0} as illegal")]
    IllegalMove(String),

    #[error("engine returned an unreadable position: {0}")]
    Fen(#[from] FenError),

    #[error("engine has no move to play")]
    NoBestMove,
}

impl TrackError {
    /// Cells worth highlighting for the player, if any.
    pub fn cells(&self) -> Vec<Cell> {
        match self {
            TrackError::Inference(MoveInferenceError::Unresolved { from, to }) => {
                from.iter().chain(to.iter()).copied().collect()
            }
            TrackError::Rejected(mv) => vec![mv.from, mv.to],
            _ => Vec::new(),
        }
    }
}

/// Game state held between frames.
///
/// The logical position is replaced wholesale with the engine's FEN after
/// every accepted half-move. If that FEN cannot be parsed the engine has
/// already moved on, so the position is re-read from the engine before the
/// next frame or bot move.
pub struct GameTracker<E: ChessEngine> {
    engine: E,
    inferencer: MoveInferencer,
    recognizer: BoardRecognizer,
    state: ChessboardState,
    stale: bool,
}

impl<E: ChessEngine> GameTracker<E> {
    pub fn new(
        mut engine: E,
        bot_side: Color,
        recognizer: BoardRecognizer,
    ) -> Result<Self, TrackError> {
        let state = engine.fen().parse()?;
        Ok(Self {
            engine,
            inferencer: MoveInferencer::new(bot_side),
            recognizer,
            state,
            stale: false,
        })
    }

    #[inline]
    pub fn state(&self) -> &ChessboardState {
        &self.state
    }

    #[inline]
    pub fn bot_side(&self) -> Color {
        self.inferencer.bot_side
    }

    #[inline]
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Frames are rectified white-side-down when the bot plays white.
    pub fn is_white_sided(&self) -> bool {
        self.bot_side() == Color::White
    }

    /// Whether the opponent moves next.
    pub fn awaiting_opponent(&self) -> bool {
        self.state.side_to_move != self.bot_side()
    }

    /// Recognize the board in `frame` and apply the opponent's move.
    pub fn process_frame(
        &mut self,
        frame: &RgbImage,
        confirmer: &mut dyn MoveConfirmer,
    ) -> Result<Move, TrackError> {
        let board = self.recognizer.recognize(frame, self.is_white_sided())?;
        self.process_board(&board, confirmer)
    }

    /// Apply the opponent's move read off an already recognized board.
    pub fn process_board(
        &mut self,
        board: &Chessboard,
        confirmer: &mut dyn MoveConfirmer,
    ) -> Result<Move, TrackError> {
        self.sync()?;
        let mv = self
            .inferencer
            .infer(&self.state, &board.positions)
            .inspect_err(|e| {
                let changed = changed_cells(&self.state, &board.positions);
                warn!("{e} ({} changed cells)", changed.len());
            })?;

        if !confirmer.confirm(&mv, board) {
            return Err(TrackError::Rejected(mv));
        }
        let uci = mv.uci();
        if !self.engine.is_move_correct(&uci) {
            warn!("illegal move {mv}");
            return Err(TrackError::IllegalMove(uci));
        }
        self.apply(&uci)?;
        info!("opponent played {mv}");
        Ok(mv)
    }

    /// Let the engine answer and record its move. Returns the move in UCI form.
    pub fn make_bot_move(&mut self) -> Result<String, TrackError> {
        self.sync()?;
        let uci = self.engine.best_move().ok_or(TrackError::NoBestMove)?;
        self.apply(&uci)?;
        info!("bot played {uci}");
        Ok(uci)
    }

    pub fn game_status(&mut self) -> GameStatus {
        self.engine.game_status()
    }

    /// Re-read the position from the engine after an unreadable FEN.
    pub fn sync(&mut self) -> Result<(), TrackError> {
        if self.stale {
            self.state = self.engine.fen().parse()?;
            self.stale = false;
            info!("position re-read from the engine");
        }
        Ok(())
    }

    fn apply(&mut self, uci: &str) -> Result<(), TrackError> {
        self.engine.make_move(uci);
        self.stale = true;
        self.state = self.engine.fen().parse()?;
        self.stale = false;
        debug!("position after {uci}:\n{}", self.state.diagram());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_vision_state::{Position, START_FEN};

    /// Engine stand-in that walks through a scripted list of positions.
    struct ScriptedEngine {
        legal: Vec<&'static str>,
        positions: Vec<&'static str>,
        played: Vec<String>,
        reply: Option<&'static str>,
    }

    impl ChessEngine for ScriptedEngine {
        fn is_move_correct(&mut self, uci: &str) -> bool {
            self.legal.contains(&uci)
        }

        fn make_move(&mut self, uci: &str) {
            self.played.push(uci.to_string());
        }

        fn fen(&mut self) -> String {
            self.positions[self.played.len().min(self.positions.len() - 1)].to_string()
        }

        fn best_move(&mut self) -> Option<String> {
            self.reply.map(str::to_string)
        }
    }

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
    const AFTER_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2";

    fn engine() -> ScriptedEngine {
        ScriptedEngine {
            legal: vec!["e2e4"],
            positions: vec![START_FEN, AFTER_E4, AFTER_E5],
            played: Vec::new(),
            reply: Some("e7e5"),
        }
    }

    fn board_after_e4() -> Chessboard {
        let mut positions = ChessboardState::start().labels();
        positions[1][4] = Position::Empty;
        positions[3][4] = Position::White;
        Chessboard {
            image: RgbImage::new(8, 8),
            mean_dx: 1.0,
            mean_dy: 1.0,
            positions,
        }
    }

    struct Refuse;

    impl MoveConfirmer for Refuse {
        fn confirm(&mut self, _mv: &Move, _board: &Chessboard) -> bool {
            false
        }
    }

    #[test]
    fn opponent_move_then_bot_reply() {
        let mut tracker =
            GameTracker::new(engine(), Color::Black, BoardRecognizer::default()).expect("tracker");
        assert!(!tracker.is_white_sided());
        assert!(tracker.awaiting_opponent());

        let mv = tracker
            .process_board(&board_after_e4(), &mut AlwaysConfirm)
            .expect("move");
        assert_eq!(mv.uci(), "e2e4");
        assert_eq!(tracker.state().to_fen(), AFTER_E4);

        let reply = tracker.make_bot_move().expect("reply");
        assert_eq!(reply, "e7e5");
        assert_eq!(tracker.state().to_fen(), AFTER_E5);
        assert_eq!(tracker.engine_mut().played, vec!["e2e4", "e7e5"]);
        assert_eq!(tracker.game_status(), GameStatus::Ongoing);
    }

    #[test]
    fn rejected_move_keeps_state() {
        let mut tracker =
            GameTracker::new(engine(), Color::Black, BoardRecognizer::default()).expect("tracker");
        let err = tracker
            .process_board(&board_after_e4(), &mut Refuse)
            .expect_err("rejected");
        assert!(matches!(err, TrackError::Rejected(_)));
        assert_eq!(err.cells(), vec![Cell::new(1, 4), Cell::new(3, 4)]);
        assert_eq!(tracker.state().to_fen(), START_FEN);
    }

    #[test]
    fn illegal_move_is_not_played() {
        let mut eng = engine();
        eng.legal.clear();
        let mut tracker =
            GameTracker::new(eng, Color::Black, BoardRecognizer::default()).expect("tracker");
        let err = tracker
            .process_board(&board_after_e4(), &mut AlwaysConfirm)
            .expect_err("illegal");
        assert!(matches!(err, TrackError::IllegalMove(ref m) if m == "e2e4"));
        assert!(tracker.engine_mut().played.is_empty());
    }

    #[test]
    fn unresolved_change_reports_cells() {
        let mut tracker =
            GameTracker::new(engine(), Color::Black, BoardRecognizer::default()).expect("tracker");
        let mut board = board_after_e4();
        board.positions[1][3] = Position::Empty;
        board.positions[1][2] = Position::Empty;
        let err = tracker
            .process_board(&board, &mut AlwaysConfirm)
            .expect_err("unresolved");
        assert!(matches!(err, TrackError::Inference(_)));
        assert_eq!(err.cells().len(), 4);
    }

    #[test]
    fn blank_frame_is_a_geometry_error() {
        let mut tracker =
            GameTracker::new(engine(), Color::White, BoardRecognizer::default()).expect("tracker");
        let err = tracker
            .process_frame(&RgbImage::new(32, 32), &mut AlwaysConfirm)
            .expect_err("no board");
        assert!(matches!(err, TrackError::Geometry(GeometryError::NoSquares)));
    }

    #[test]
    fn garbage_fen_from_engine_is_reported() {
        let mut eng = engine();
        eng.positions = vec!["not a fen"];
        let err = GameTracker::new(eng, Color::White, BoardRecognizer::default())
            .err()
            .expect("fen error");
        assert!(matches!(err, TrackError::Fen(_)));
    }

    #[test]
    fn unreadable_fen_after_a_move_is_re_read_later() {
        let mut eng = engine();
        eng.positions = vec![START_FEN, "not a fen", AFTER_E5];
        let mut tracker =
            GameTracker::new(eng, Color::Black, BoardRecognizer::default()).expect("tracker");
        let err = tracker
            .process_board(&board_after_e4(), &mut AlwaysConfirm)
            .expect_err("bad fen");
        assert!(matches!(err, TrackError::Fen(_)));
        assert_eq!(tracker.engine_mut().played, vec!["e2e4"]);

        tracker.engine_mut().positions[1] = AFTER_E4;
        let reply = tracker.make_bot_move().expect("reply");
        assert_eq!(reply, "e7e5");
        assert_eq!(tracker.state().to_fen(), AFTER_E5);
    }

    #[test]
    fn missing_reply_is_an_error() {
        let mut eng = engine();
        eng.reply = None;
        let mut tracker =
            GameTracker::new(eng, Color::White, BoardRecognizer::default()).expect("tracker");
        assert!(matches!(tracker.make_bot_move(), Err(TrackError::NoBestMove)));
    }
}
