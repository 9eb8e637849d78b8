//! Least-squares line fitting and guarded intersection.

use nalgebra::{Matrix2, Point2, SymmetricEigen};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum LineError {
    #[error("need at least 2 distinct points to fit a line (got {0})")]
    TooFewPoints(usize),
    #[error("lines are parallel (|det| = {det:.3e})")]
    Parallel { det: f64 },
}

/// Line in normal form `a*x + b*y = c` with `a² + b² = 1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Line {
    /// Orthogonal least-squares fit (total least squares).
    ///
    /// Unlike `y = kx + b` regression this stays well conditioned for
    /// vertical point clouds such as the left and right board edges.
    pub fn fit(points: &[Point2<f32>]) -> Result<Self, LineError> {
        if points.len() < 2 {
            return Err(LineError::TooFewPoints(points.len()));
        }
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0f64, 0.0f64), |(x, y), p| (x + p.x as f64, y + p.y as f64));
        let (mx, my) = (sx / n, sy / n);

        let mut sxx = 0.0f64;
        let mut sxy = 0.0f64;
        let mut syy = 0.0f64;
        for p in points {
            let dx = p.x as f64 - mx;
            let dy = p.y as f64 - my;
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
        }
        if sxx + syy <= 1e-12 {
            return Err(LineError::TooFewPoints(1));
        }

        // The normal is the eigenvector of the scatter matrix with the
        // smallest eigenvalue.
        let eig = SymmetricEigen::new(Matrix2::new(sxx, sxy, sxy, syy));
        let k = if eig.eigenvalues[0] <= eig.eigenvalues[1] {
            0
        } else {
            1
        };
        let normal = eig.eigenvectors.column(k);
        let norm = normal.norm();
        let (a, b) = (normal[0] / norm, normal[1] / norm);
        Ok(Self {
            a,
            b,
            c: a * mx + b * my,
        })
    }

    /// Signed distance of `p` from the line.
    pub fn distance(&self, p: Point2<f32>) -> f64 {
        self.a * p.x as f64 + self.b * p.y as f64 - self.c
    }

    /// Intersection point.
    ///
    /// Since both normals are unit length, `|det|` is the sine of the angle
    /// between the lines; anything below `min_sin` is reported as parallel.
    pub fn intersect(&self, other: &Line, min_sin: f64) -> Result<Point2<f32>, LineError> {
        let det = self.a * other.b - other.a * self.b;
        if !det.is_finite() || det.abs() < min_sin {
            return Err(LineError::Parallel { det });
        }
        let x = (self.c * other.b - other.c * self.b) / det;
        let y = (self.a * other.c - other.a * self.c) / det;
        Ok(Point2::new(x as f32, y as f32))
    }
}
