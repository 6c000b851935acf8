use crate::Point;
use crate::geom::vector::Vector;
use serde::{Deserialize, Serialize};

/// Type for holding vertex indices for a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriangleIndex(pub usize, pub usize, pub usize);

impl TriangleIndex {
    pub fn as_array(&self) -> [usize; 3] {
        [self.0, self.1, self.2]
    }

    /// The three directed edges `(0,1)`, `(1,2)`, `(2,0)`.
    pub fn edges(&self) -> [(usize, usize); 3] {
        [(self.0, self.1), (self.1, self.2), (self.2, self.0)]
    }

    /// Same triangle with opposite winding.
    pub fn flipped(&self) -> Self {
        Self(self.0, self.2, self.1)
    }
}

impl From<[usize; 3]> for TriangleIndex {
    fn from(v: [usize; 3]) -> Self {
        Self(v[0], v[1], v[2])
    }
}

/// Area of the triangle `(p0, p1, p2)` in 3D.
pub fn triangle_area(p0: Point, p1: Point, p2: Point) -> f64 {
    (p1 - p0).cross(&(p2 - p0)).length() * 0.5
}

/// Signed area of the projection onto the xy plane.
///
/// Positive for counter-clockwise triangles seen from +z.
pub fn signed_area_xy(p0: Point, p1: Point, p2: Point) -> f64 {
    0.5 * ((p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y))
}

pub fn triangle_centroid(p0: Point, p1: Point, p2: Point) -> Point {
    Point::new(
        (p0.x + p1.x + p2.x) / 3.0,
        (p0.y + p1.y + p2.y) / 3.0,
        (p0.z + p1.z + p2.z) / 3.0,
    )
}

/// Unit normal of the triangle following the right-hand rule.
pub fn triangle_normal(p0: Point, p1: Point, p2: Point) -> Option<Vector> {
    Vector::normal(p0, p1, p2)
}

/// Cotangent of the interior angle at `apex` between the edges towards `a` and `b`.
pub fn cot_angle(apex: Point, a: Point, b: Point) -> f64 {
    let va = a - apex;
    let vb = b - apex;
    let sin = va.cross(&vb).length();
    if sin < 1e-30 {
        return 0.0;
    }
    va.dot(&vb) / sin
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_area() {
        let a = triangle_area(
            Point::new(0., 0., 0.),
            Point::new(2., 0., 0.),
            Point::new(0., 1., 5.),
        );
        assert!((a - 0.5 * (1.0f64 + 25.0).sqrt() * 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_signed_area_xy() {
        let p0 = Point::xy(0., 0.);
        let p1 = Point::xy(1., 0.);
        let p2 = Point::xy(0., 1.);
        assert_eq!(signed_area_xy(p0, p1, p2), 0.5);
        assert_eq!(signed_area_xy(p0, p2, p1), -0.5);
    }

    #[test]
    fn test_cot_angle() {
        // Right angle
        let c = cot_angle(Point::xy(0., 0.), Point::xy(1., 0.), Point::xy(0., 1.));
        assert!(c.abs() < 1e-12);
        // 45 degrees
        let c = cot_angle(Point::xy(0., 0.), Point::xy(1., 0.), Point::xy(1., 1.));
        assert!((c - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_flipped_and_edges() {
        let t = TriangleIndex(0, 1, 2);
        assert_eq!(t.flipped(), TriangleIndex(0, 2, 1));
        assert_eq!(t.edges(), [(0, 1), (1, 2), (2, 0)]);
    }
}
