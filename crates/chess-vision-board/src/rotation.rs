use chess_vision_core::{rotate_rgb, Homography, Square};
use image::RgbImage;
use log::debug;
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Frame and squares rotated so that board rows run horizontally.
#[derive(Clone, Debug)]
pub struct AlignedBoard {
    pub image: RgbImage,
    pub squares: Vec<Square>,
    /// Angle (radians) the input was rotated by.
    pub angle: f32,
}

/// Mean horizontal-edge angle over all squares.
pub fn mean_horizontal_angle(squares: &[Square]) -> Option<f32> {
    if squares.is_empty() {
        return None;
    }
    Some(squares.iter().map(Square::horizontal_angle).sum::<f32>() / squares.len() as f32)
}

/// Rotate the frame and every polygon about the image center so the mean
/// horizontal edge becomes level.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(squares = squares.len()))
)]
pub fn align_board(image: &RgbImage, squares: &[Square]) -> AlignedBoard {
    let angle = mean_horizontal_angle(squares).map_or(0.0, |a| -a);
    let center = Point2::new(image.width() as f32 / 2.0, image.height() as f32 / 2.0);
    debug!("rotating by {:.2} deg", angle.to_degrees());

    let h = Homography::rotation_about(center, angle);
    AlignedBoard {
        image: rotate_rgb(image, center, angle),
        squares: squares.iter().map(|s| s.transformed(&h)).collect(),
        angle,
    }
}
