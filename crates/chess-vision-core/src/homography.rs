use crate::pixels::sample_bilinear_rgb;
use image::{Rgb, RgbImage};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};

/// Projective 2D transform acting on pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn translation(dx: f32, dy: f32) -> Self {
        Self::new(Matrix3::new(
            1.0, 0.0, dx as f64, //
            0.0, 1.0, dy as f64, //
            0.0, 0.0, 1.0,
        ))
    }

    /// Rotation by `angle` radians about `center`.
    ///
    /// With image coordinates (y down) a positive angle turns clockwise on screen.
    pub fn rotation_about(center: Point2<f32>, angle: f32) -> Self {
        let (s, c) = (angle as f64).sin_cos();
        let cx = center.x as f64;
        let cy = center.y as f64;
        Self::new(Matrix3::new(
            c,
            -s,
            cx - c * cx + s * cy, //
            s,
            c,
            cy - s * cx - c * cy, //
            0.0,
            0.0,
            1.0,
        ))
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn normalize_points4(pts: &[Point2<f32>; 4]) -> ([Point2<f64>; 4], Matrix3<f64>) {
    let (cx, cy) = pts
        .iter()
        .fold((0.0f64, 0.0f64), |(x, y), p| (x + p.x as f64, y + p.y as f64));
    let cx = cx / 4.0;
    let cy = cy / 4.0;

    let mean_dist = pts
        .iter()
        .map(|p| ((p.x as f64 - cx).powi(2) + (p.y as f64 - cy).powi(2)).sqrt())
        .sum::<f64>()
        / 4.0;

    let t = hartley_normalization(cx, cy, mean_dist);
    let out = pts.map(|p| {
        let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
        Point2::new(v[0], v[1])
    });
    (out, t)
}

/// Compute H such that `dst ~ H * src` from four correspondences.
///
/// Corner order must be consistent between `src` and `dst`. Returns `None`
/// when three of the points are collinear (the system is singular).
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    // Unknowns: [h11 h12 h13 h21 h22 h23 h31 h32], with h33 = 1
    let (src_n, t_src) = normalize_points4(src);
    let (dst_n, t_dst) = normalize_points4(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for k in 0..4 {
        let x = src_n[k].x;
        let y = src_n[k].y;
        let u = dst_n[k].x;
        let v = dst_n[k].y;

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let lu = a.lu();
    if lu.determinant().abs() < 1e-10 {
        return None;
    }
    let x = lu.solve(&b)?;

    let hn = Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );

    // H = T_dst^{-1} * Hn * T_src
    let h = t_dst.try_inverse()? * hn * t_src;
    let s = h[(2, 2)];
    if s.abs() < 1e-12 || !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(Homography::new(h / s))
}

/// Warp a color image: every output pixel is mapped into the source through
/// `h_src_from_dst` and sampled bilinearly. Pixels mapping outside the source
/// are black.
pub fn warp_perspective_rgb(
    src: &RgbImage,
    h_src_from_dst: &Homography,
    out_w: u32,
    out_h: u32,
) -> RgbImage {
    let mut out = RgbImage::new(out_w, out_h);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let ps = h_src_from_dst.apply(Point2::new(x as f32, y as f32));
        let v = sample_bilinear_rgb(src, ps.x, ps.y);
        *px = Rgb(v.map(|c| c.round().clamp(0.0, 255.0) as u8));
    }
    out
}

/// Rotate an image about `center` so that a source point `p` lands on
/// `rotation_about(center, angle).apply(p)`. Output size equals input size.
pub fn rotate_rgb(src: &RgbImage, center: Point2<f32>, angle: f32) -> RgbImage {
    let h_src_from_dst = Homography::rotation_about(center, -angle);
    warp_perspective_rgb(src, &h_src_from_dst, src.width(), src.height())
}
