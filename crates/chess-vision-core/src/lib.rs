//! Core geometry and image primitives for physical chessboard recognition.
//!
//! Nothing here knows about chess: squares are plain quadrilaterals, circles
//! are plain circles. The board-level pipeline lives in `chess-vision-board`.

mod circles;
mod edges;
mod homography;
mod kmeans;
mod line;
mod logger;
mod pixels;
mod square;

pub use circles::{detect_circles, Circle, CircleParams};
pub use edges::{binarize, edge_map, Binarize, EdgeParams};
pub use homography::{homography_from_4pt, rotate_rgb, warp_perspective_rgb, Homography};
pub use kmeans::{kmeans, KMeansParams, KMeansResult};
pub use line::{Line, LineError};
pub use pixels::{crop_rgb, mean_rgb_in_disc, rgb_to_hsv, sample_bilinear_rgb, to_gray};
pub use square::{
    centroid, dist, is_convex, order_quad, polygon_area, Square, BL, BR, TL, TR,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, level_from_env, LOG_ENV};
