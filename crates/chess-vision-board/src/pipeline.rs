use crate::chessboard::Chessboard;
use crate::classify::classify_board;
use crate::cluster::cluster_squares;
use crate::detector::BoardDetector;
use crate::error::GeometryError;
use crate::expand::{CircleGapFiller, GapFiller};
use crate::grid::Grid;
use crate::params::BoardRecognitionParams;
use crate::rotation::align_board;
use crate::warp::warp_board;
use chess_vision_core::to_gray;
use image::RgbImage;
use log::{debug, info, warn};
use nalgebra::Point2;
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Per-stage diagnostics of one recognition run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RecognitionReport {
    pub detector: &'static str,
    pub candidates: usize,
    /// Size of the primary cluster.
    pub kept: usize,
    pub outlier_groups: usize,
    /// Rotation applied before grid assembly (degrees).
    pub rotation_deg: f32,
    pub grid_cells: usize,
    pub gap_filled: usize,
    /// Outer board corners in the rotated frame, once found.
    pub corners: Option<[Point2<f32>; 4]>,
    pub grid: Option<Grid>,
}

/// Frame-to-labels pipeline: detect, cluster, align, grid, fill, warp,
/// classify.
pub struct BoardRecognizer {
    params: BoardRecognitionParams,
    detector: Box<dyn BoardDetector>,
    gap_filler: Box<dyn GapFiller>,
}

impl BoardRecognizer {
    pub fn new(params: BoardRecognitionParams) -> Self {
        let detector = params.detector.build();
        let gap_filler = Box::new(CircleGapFiller::new(params.gap_filler.clone()));
        Self {
            params,
            detector,
            gap_filler,
        }
    }

    /// Replace the configured square detector.
    pub fn with_detector(mut self, detector: Box<dyn BoardDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Replace the border gap-filling heuristic.
    pub fn with_gap_filler(mut self, gap_filler: Box<dyn GapFiller>) -> Self {
        self.gap_filler = gap_filler;
        self
    }

    #[inline]
    pub fn params(&self) -> &BoardRecognitionParams {
        &self.params
    }

    /// Recognize the board in a frame.
    ///
    /// `is_white_sided` selects the rectified orientation: `true` when the
    /// white pieces start at the bottom of the frame.
    pub fn recognize(
        &self,
        image: &RgbImage,
        is_white_sided: bool,
    ) -> Result<Chessboard, GeometryError> {
        self.recognize_with_report(image, is_white_sided).1
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, image),
            fields(width = image.width(), height = image.height(), detector = self.detector.name())
        )
    )]
    pub fn recognize_with_report(
        &self,
        image: &RgbImage,
        is_white_sided: bool,
    ) -> (RecognitionReport, Result<Chessboard, GeometryError>) {
        let mut report = RecognitionReport {
            detector: self.detector.name(),
            ..RecognitionReport::default()
        };
        let result = self.run(image, is_white_sided, &mut report);
        match &result {
            Ok(board) => info!(
                "board recognized: {} occupied cells",
                board.positions.iter().flatten().filter(|p| p.color().is_some()).count()
            ),
            Err(e) => warn!("board not recognized: {e}"),
        }
        (report, result)
    }

    fn run(
        &self,
        image: &RgbImage,
        is_white_sided: bool,
        report: &mut RecognitionReport,
    ) -> Result<Chessboard, GeometryError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(GeometryError::EmptyImage);
        }

        let candidates = self.detector.detect_squares(&to_gray(image));
        report.candidates = candidates.len();
        let mut groups = cluster_squares(&candidates, &self.params.cluster).into_iter();
        let primary = groups.next().unwrap_or_default();
        report.kept = primary.len();
        report.outlier_groups = groups.len();
        if primary.is_empty() {
            return Err(GeometryError::NoSquares);
        }
        debug!(
            "{}: {} candidates, {} in primary cluster",
            report.detector,
            candidates.len(),
            primary.len()
        );

        let aligned = align_board(image, &primary);
        report.rotation_deg = aligned.angle.to_degrees();

        let mut grid = Grid::build(&aligned.squares);
        if grid.borders_empty() && self.params.fill_gaps {
            let filled = self.gap_filler.fill(&aligned.image, &aligned.squares, &grid);
            report.gap_filled = filled.added;
            grid = filled.grid;
        }
        report.grid_cells = grid.count();
        debug!("grid:\n{grid}");
        if grid.borders_empty() {
            report.grid = Some(grid);
            return Err(GeometryError::BordersEmpty);
        }

        let warped = warp_board(&aligned.image, &grid, is_white_sided, &self.params.warp);
        report.grid = Some(grid);
        let warped = warped?;
        report.corners = Some(warped.corners);

        let positions = classify_board(
            &warped.image,
            warped.mean_dx,
            warped.mean_dy,
            &self.params.classifier,
        );
        Ok(Chessboard {
            image: warped.image,
            mean_dx: warped.mean_dx,
            mean_dy: warped.mean_dy,
            positions,
        })
    }
}

impl Default for BoardRecognizer {
    fn default() -> Self {
        Self::new(BoardRecognitionParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::GapFill;
    use chess_vision_core::Square;
    use image::Rgb;

    struct NoFill;

    impl GapFiller for NoFill {
        fn fill(&self, _image: &RgbImage, squares: &[Square], grid: &Grid) -> GapFill {
            GapFill {
                squares: squares.to_vec(),
                grid: grid.clone(),
                added: 0,
            }
        }
    }

    #[test]
    fn empty_image_is_rejected() {
        let err = BoardRecognizer::default()
            .recognize(&RgbImage::new(0, 0), true)
            .expect_err("empty");
        assert_eq!(err, GeometryError::EmptyImage);
    }

    #[test]
    fn blank_frame_has_no_squares() {
        let img = RgbImage::from_pixel(200, 200, Rgb([128, 128, 128]));
        let (report, result) = BoardRecognizer::default().recognize_with_report(&img, true);
        assert_eq!(result.expect_err("no board"), GeometryError::NoSquares);
        assert_eq!(report.candidates, 0);
    }

    #[test]
    fn lone_square_leaves_borders_empty() {
        let mut img = RgbImage::from_pixel(200, 200, Rgb([0, 0, 0]));
        for y in 60..120 {
            for x in 60..120 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let mut params = BoardRecognitionParams::default();
        params.detector.strategy = crate::detector::DetectorStrategy::Threshold;
        let recognizer = BoardRecognizer::new(params).with_gap_filler(Box::new(NoFill));
        let (report, result) = recognizer.recognize_with_report(&img, true);
        assert_eq!(result.expect_err("incomplete"), GeometryError::BordersEmpty);
        assert_eq!(report.kept, 1);
        assert_eq!(report.grid_cells, 1);
    }
}
