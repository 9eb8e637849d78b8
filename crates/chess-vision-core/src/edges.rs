//! Edge-map preprocessing shared by square and circle detection.

use image::GrayImage;
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use serde::{Deserialize, Serialize};

/// Thresholding applied before Canny.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Binarize {
    Off,
    /// `gray > t` becomes white.
    Fixed(u8),
    /// Threshold at the image's own Otsu level, so a bright disc on a light
    /// background still separates.
    Otsu,
}

impl Binarize {
    pub fn apply(self, gray: &GrayImage) -> GrayImage {
        match self {
            Binarize::Off => gray.clone(),
            Binarize::Fixed(t) => binarize(gray, t),
            Binarize::Otsu => binarize(gray, otsu_level(gray)),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct EdgeParams {
    pub binarize: Binarize,
    /// Gaussian pre-blur sigma; `0` disables it.
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Chebyshev radius of the thickening dilation; `0` disables it.
    pub dilate_radius: u8,
    /// Chebyshev radius of the final closing; `0` disables it.
    pub close_radius: u8,
}

impl Default for EdgeParams {
    fn default() -> Self {
        Self {
            binarize: Binarize::Fixed(110),
            blur_sigma: 0.8,
            canny_low: 60.0,
            canny_high: 140.0,
            dilate_radius: 1,
            close_radius: 1,
        }
    }
}

/// Binary threshold: pixels strictly brighter than `threshold` become 255.
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] > threshold { 255 } else { 0 };
    }
    out
}

/// Threshold, blur, Canny, then thicken with dilation and closing.
pub fn edge_map(gray: &GrayImage, params: &EdgeParams) -> GrayImage {
    let mut img = params.binarize.apply(gray);
    if params.blur_sigma > 0.0 {
        img = imageproc::filter::gaussian_blur_f32(&img, params.blur_sigma);
    }
    let mut edges = imageproc::edges::canny(&img, params.canny_low, params.canny_high);
    if params.dilate_radius > 0 {
        edges = imageproc::morphology::dilate(&edges, Norm::LInf, params.dilate_radius);
    }
    if params.close_radius > 0 {
        edges = imageproc::morphology::close(&edges, Norm::LInf, params.close_radius);
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn binarize_is_strict() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([[109, 110, 111][x as usize]]));
        let b = binarize(&img, 110);
        assert_eq!(b.as_raw(), &vec![0, 0, 255]);
    }

    #[test]
    fn edge_map_outlines_a_bright_block() {
        let mut img = GrayImage::from_pixel(60, 60, Luma([30]));
        for y in 20..40 {
            for x in 20..40 {
                img.put_pixel(x, y, Luma([220]));
            }
        }
        let edges = edge_map(&img, &EdgeParams::default());
        assert_eq!(edges.get_pixel(5, 5).0[0], 0);
        assert_eq!(edges.get_pixel(30, 30).0[0], 0);
        let on_border = (18..=22).any(|x| edges.get_pixel(x, 30).0[0] == 255);
        assert!(on_border);
    }

    #[test]
    fn flat_image_has_no_edges() {
        let img = GrayImage::from_pixel(32, 32, Luma([200]));
        let edges = edge_map(&img, &EdgeParams::default());
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn otsu_separates_bright_on_light() {
        let mut img = GrayImage::from_pixel(60, 60, Luma([200]));
        for y in 20..40 {
            for x in 20..40 {
                img.put_pixel(x, y, Luma([245]));
            }
        }
        let fixed = EdgeParams::default();
        assert!(edge_map(&img, &fixed).pixels().all(|p| p.0[0] == 0));

        let otsu = EdgeParams {
            binarize: Binarize::Otsu,
            ..EdgeParams::default()
        };
        let edges = edge_map(&img, &otsu);
        assert!((18..=22).any(|x| edges.get_pixel(x, 30).0[0] == 255));
        assert_eq!(edges.get_pixel(30, 30).0[0], 0);
    }
}
