//! chess-vision CLI: board recognition and move inference.

use chess_vision::board::{BoardRecognitionParams, BoardRecognizer};
use chess_vision::detect::load_image;
use chess_vision::state::{format_labels, parse_labels, ChessboardState, Color, MoveInferencer};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "chess-vision")]
#[command(about = "Recognize a physical chessboard in a photo and infer moves between positions")]
#[command(version)]
struct Cli {
    /// Log level when CHESS_VISION_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    log_level: LevelFilter,

    /// Emit tracing spans as JSON (requires the `tracing` feature).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize the board in an image and print per-cell labels.
    Detect(DetectArgs),

    /// Infer the opponent's move from a FEN and a label grid.
    Infer(InferArgs),

    /// Print the default recognition parameters as JSON.
    Params,
}

#[derive(Debug, Clone, Args)]
struct DetectArgs {
    /// Path to the input image.
    image: PathBuf,

    /// JSON file with recognition parameters (missing fields use defaults).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rectify as seen from the black side.
    #[arg(long)]
    black_sided: bool,

    /// Print labels and stage diagnostics as JSON.
    #[arg(long)]
    json: bool,

    /// Write the rectified board image here.
    #[arg(long)]
    rectified: Option<PathBuf>,

    /// Write the rectified board with occupied cells outlined here.
    #[arg(long)]
    annotate: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SideArg {
    White,
    Black,
}

impl From<SideArg> for Color {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::White => Color::White,
            SideArg::Black => Color::Black,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct InferArgs {
    /// Position before the opponent moved.
    #[arg(long)]
    fen: String,

    /// 64 labels (`W`, `B`, `.`), rank 8 first; `/` and spaces are ignored.
    #[arg(long)]
    labels: String,

    /// Side the bot plays; the move is inferred for the other side.
    #[arg(long, value_enum)]
    bot_side: SideArg,
}

#[derive(Serialize)]
struct DetectOutput<'a> {
    labels: Vec<String>,
    mean_dx: f32,
    mean_dy: f32,
    report: &'a chess_vision::board::RecognitionReport,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    init_logging(cli.log_level, cli.log_json)?;

    match cli.command {
        Commands::Detect(args) => run_detect(&args),
        Commands::Infer(args) => run_infer(&args),
        Commands::Params => run_params(),
    }
}

#[cfg(feature = "tracing")]
fn init_logging(_level: LevelFilter, json: bool) -> CliResult<()> {
    chess_vision::core::init_tracing(json);
    Ok(())
}

#[cfg(not(feature = "tracing"))]
fn init_logging(level: LevelFilter, json: bool) -> CliResult<()> {
    if json {
        return Err("--log-json requires the `tracing` feature".into());
    }
    chess_vision::core::init_from_env(level)?;
    Ok(())
}

fn load_params(config: Option<&PathBuf>) -> CliResult<BoardRecognitionParams> {
    match config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            Ok(BoardRecognitionParams::from_json(&text)?)
        }
        None => Ok(BoardRecognitionParams::default()),
    }
}

fn run_detect(args: &DetectArgs) -> CliResult<()> {
    let params = load_params(args.config.as_ref())?;
    let image = load_image(&args.image)?.to_rgb8();
    let (report, result) =
        BoardRecognizer::new(params).recognize_with_report(&image, !args.black_sided);

    let board = match result {
        Ok(board) => board,
        Err(e) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            return Err(e.into());
        }
    };

    if let Some(path) = &args.rectified {
        board.image.save(path)?;
    }
    if let Some(path) = &args.annotate {
        let occupied: Vec<_> = (0..8)
            .flat_map(|row| (0..8).map(move |col| chess_vision::Cell::new(row, col)))
            .filter(|&cell| board.position(cell).color().is_some())
            .collect();
        board.annotated(&occupied).save(path)?;
    }

    if args.json {
        let out = DetectOutput {
            labels: board.labels_text().lines().map(str::to_string).collect(),
            mean_dx: board.mean_dx,
            mean_dy: board.mean_dy,
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", board.labels_text());
    }
    Ok(())
}

fn run_infer(args: &InferArgs) -> CliResult<()> {
    let state: ChessboardState = args.fen.parse()?;
    let labels = parse_labels(&args.labels)?;
    log::debug!("position:\n{}", state.diagram());
    log::debug!("labels:\n{}", format_labels(&labels));

    let mv = MoveInferencer::new(args.bot_side.into()).infer(&state, &labels)?;
    println!("{mv}");
    if mv.notation() != mv.uci() {
        println!("{}", mv.uci());
    }
    Ok(())
}

fn run_params() -> CliResult<()> {
    println!("{}", BoardRecognitionParams::default().to_json()?);
    Ok(())
}
