use image::{GrayImage, RgbImage};
use nalgebra::Point2;

#[inline]
fn get_rgb(src: &RgbImage, x: i64, y: i64) -> [f32; 3] {
    if x < 0 || y < 0 || x >= src.width() as i64 || y >= src.height() as i64 {
        return [0.0; 3];
    }
    src.get_pixel(x as u32, y as u32).0.map(|c| c as f32)
}

/// Bilinear RGB sample; out-of-image neighbours read as black.
#[inline]
pub fn sample_bilinear_rgb(src: &RgbImage, x: f32, y: f32) -> [f32; 3] {
    if !x.is_finite() || !y.is_finite() {
        return [0.0; 3];
    }
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_rgb(src, x0, y0);
    let p10 = get_rgb(src, x0 + 1, y0);
    let p01 = get_rgb(src, x0, y0 + 1);
    let p11 = get_rgb(src, x0 + 1, y0 + 1);

    let mut out = [0.0f32; 3];
    for c in 0..3 {
        let a = p00[c] + fx * (p10[c] - p00[c]);
        let b = p01[c] + fx * (p11[c] - p01[c]);
        out[c] = a + fy * (b - a);
    }
    out
}

/// Luma conversion.
pub fn to_gray(img: &RgbImage) -> GrayImage {
    image::imageops::grayscale(img)
}

/// Copy the sub-image `[x0, x1) × [y0, y1)`, clamped to the image bounds.
pub fn crop_rgb(img: &RgbImage, x0: u32, y0: u32, x1: u32, y1: u32) -> RgbImage {
    let x1 = x1.min(img.width());
    let y1 = y1.min(img.height());
    let x0 = x0.min(x1);
    let y0 = y0.min(y1);
    image::imageops::crop_imm(img, x0, y0, x1 - x0, y1 - y0).to_image()
}

/// Mean color of the pixels inside the disc `|p - center| <= radius`.
///
/// Returns `None` when the disc covers no pixel of the image.
pub fn mean_rgb_in_disc(img: &RgbImage, center: Point2<f32>, radius: f32) -> Option<[f32; 3]> {
    if radius.is_nan() || radius <= 0.0 || img.width() == 0 || img.height() == 0 {
        return None;
    }
    let r2 = radius * radius;
    let x0 = (center.x - radius).floor().max(0.0) as u32;
    let y0 = (center.y - radius).floor().max(0.0) as u32;
    let x1 = ((center.x + radius).ceil().max(0.0) as u32).min(img.width().saturating_sub(1));
    let y1 = ((center.y + radius).ceil().max(0.0) as u32).min(img.height().saturating_sub(1));

    let mut sum = [0.0f64; 3];
    let mut count = 0usize;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 - center.x;
            let dy = y as f32 - center.y;
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let px = img.get_pixel(x, y).0;
            for c in 0..3 {
                sum[c] += px[c] as f64;
            }
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    let n = count as f64;
    Some(sum.map(|s| (s / n) as f32))
}

/// Convert RGB in `[0, 255]` to HSV with hue in degrees `[0, 360)` and
/// saturation/value in `[0, 255]`.
pub fn rgb_to_hsv(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let saturation = if max <= f32::EPSILON {
        0.0
    } else {
        255.0 * delta / max
    };
    [hue, saturation, max]
}
