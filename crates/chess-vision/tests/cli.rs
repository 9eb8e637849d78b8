use assert_cmd::Command;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use predicates::prelude::*;

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn cli() -> Command {
    Command::cargo_bin("chess-vision").expect("binary")
}

#[test]
fn infer_prints_the_move() {
    cli()
        .args([
            "infer",
            "--fen",
            START_FEN,
            "--labels",
            "BBBBBBBB/BBBBBBBB/......../......../....W.../......../WWWW.WWW/WWWWWWWW",
            "--bot-side",
            "black",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("e2e4"));
}

#[test]
fn infer_prints_castling_and_its_uci_form() {
    cli()
        .args([
            "infer",
            "--fen",
            "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1",
            "--labels",
            "B...B..B ........ ........ ........ ........ ........ ........ W....WW.",
            "--bot-side",
            "black",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("O-O").and(predicate::str::contains("e1g1")));
}

#[test]
fn infer_fails_on_unresolved_change() {
    cli()
        .args([
            "infer",
            "--fen",
            START_FEN,
            "--labels",
            "BBBBBBBB/BBBBBBBB/......../......../......../......../...WWWWW/WWWWWWWW",
            "--bot-side",
            "black",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("matches no move"));
}

#[test]
fn infer_rejects_short_labels() {
    cli()
        .args(["infer", "--fen", START_FEN, "--labels", "WWB", "--bot-side", "white"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected 64 cell labels"));
}

#[test]
fn params_prints_defaults() {
    cli()
        .arg("params")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"white_threshold\": 140.0")
                .and(predicate::str::contains("\"target_size\": 1200")),
        );
}

#[test]
fn detect_reports_missing_image() {
    cli()
        .args(["detect", "/nonexistent/board.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("board.png"));
}

fn board_image() -> RgbImage {
    let (origin, cell, pitch) = (82u32, 56u32, 60u32);
    let mut img = RgbImage::from_pixel(640, 640, Rgb([0, 0, 0]));
    for r in 0..8u32 {
        for c in 0..8u32 {
            let rect = Rect::at((origin + c * pitch) as i32, (origin + r * pitch) as i32)
                .of_size(cell, cell);
            draw_filled_rect_mut(&mut img, rect, Rgb([220; 3]));
        }
    }
    // a dark piece on a1 (bottom-left cell)
    let center = ((origin + cell / 2) as i32, (origin + 7 * pitch + cell / 2) as i32);
    draw_filled_circle_mut(&mut img, center, 22, Rgb([20; 3]));
    img
}

#[test]
fn detect_synthetic_board_with_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image_path = dir.path().join("board.png");
    board_image().save(&image_path).expect("save");
    let config_path = dir.path().join("params.json");
    std::fs::write(
        &config_path,
        r#"{ "detector": { "strategy": "threshold" }, "warp": { "target_size": 400 } }"#,
    )
    .expect("config");
    let annotated = dir.path().join("annotated.png");

    cli()
        .arg("detect")
        .arg(&image_path)
        .arg("--config")
        .arg(&config_path)
        .arg("--annotate")
        .arg(&annotated)
        .assert()
        .success()
        .stdout(predicate::str::ends_with("B.......\n"));
    assert!(annotated.exists());
}
