use chess_vision_board::{BoardRecognitionParams, BoardRecognizer, Chessboard, GeometryError};
use image::DynamicImage;
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level detection helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Load an image file as RGB.
pub fn load_image(path: impl AsRef<Path>) -> Result<DynamicImage, DetectError> {
    let path = path.as_ref();
    image::open(path).map_err(|source| DetectError::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// Recognize the board in a decoded image.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(image, params), fields(width = image.width(), height = image.height()))
)]
pub fn detect_board(
    image: &DynamicImage,
    is_white_sided: bool,
    params: &BoardRecognitionParams,
) -> Result<Chessboard, DetectError> {
    let recognizer = BoardRecognizer::new(params.clone());
    Ok(recognizer.recognize(&image.to_rgb8(), is_white_sided)?)
}

/// Load an image file and recognize the board in it.
pub fn detect_board_path(
    path: impl AsRef<Path>,
    is_white_sided: bool,
    params: &BoardRecognitionParams,
) -> Result<Chessboard, DetectError> {
    let image = load_image(path)?;
    detect_board(&image, is_white_sided, params)
}
