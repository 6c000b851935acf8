pub mod bboxes;
pub mod mesh;
pub mod point;
pub mod polygon;
pub mod triangles;
pub mod vector;

/// Geometric precision
pub const EPS: f64 = 1e-13;

/// Approximate comparison of floating point values with [`EPS`].
pub trait IsClose {
    fn is_close(&self, other: f64) -> bool;
}

impl IsClose for f64 {
    fn is_close(&self, other: f64) -> bool {
        (self - other).abs() < EPS
    }
}
