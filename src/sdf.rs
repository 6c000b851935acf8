//! Signed distance fields used as collision geometry.
//!
//! Sign convention: the distance is positive in the free region and
//! negative inside the solid. The normal points toward the free region.

use crate::{Point, Vector};
use std::fmt::Debug;

/// A shape described by its signed distance.
pub trait Sdf: Debug + Send + Sync {
    /// Returns the signed distance of `p` and the unit normal toward the free region.
    fn projection(&self, p: Point) -> (f64, Vector);

    fn signed_distance(&self, p: Point) -> f64 {
        self.projection(p).0
    }

    fn clone_box(&self) -> Box<dyn Sdf>;

    /// Downcast hook used by the drawing code.
    fn as_sphere(&self) -> Option<&SdfSphere> {
        None
    }

    fn as_plane(&self) -> Option<&SdfPlane> {
        None
    }

    fn as_collection(&self) -> Option<&SdfCollection> {
        None
    }
}

impl Clone for Box<dyn Sdf> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Sphere collider.
///
/// With `is_out = true` the inside of the sphere is solid and things are kept
/// outside of it. With `is_out = false` everything outside is solid, so the
/// sphere acts as a container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SdfSphere {
    pub radius: f64,
    pub center: Point,
    pub is_out: bool,
}

impl SdfSphere {
    pub fn new(radius: f64, center: [f64; 3], is_out: bool) -> Self {
        Self {
            radius,
            center: Point::from(center),
            is_out,
        }
    }
}

impl Sdf for SdfSphere {
    fn projection(&self, p: Point) -> (f64, Vector) {
        let dir = p - self.center;
        let len = dir.length();
        // Any direction works at the center
        let n = dir.normalize().unwrap_or(Vector::new(0., 0., 1.));
        if self.is_out {
            (len - self.radius, n)
        } else {
            (self.radius - len, -n)
        }
    }

    fn clone_box(&self) -> Box<dyn Sdf> {
        Box::new(*self)
    }

    fn as_sphere(&self) -> Option<&SdfSphere> {
        Some(self)
    }
}

/// Half-space collider; the side opposite to `normal` is solid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SdfPlane {
    pub origin: Point,
    normal: Vector,
}

impl SdfPlane {
    /// Returns None for a zero-length normal.
    pub fn new(origin: Point, normal: Vector) -> Option<Self> {
        Some(Self {
            origin,
            normal: normal.normalize()?,
        })
    }

    pub fn normal(&self) -> Vector {
        self.normal
    }
}

impl Sdf for SdfPlane {
    fn projection(&self, p: Point) -> (f64, Vector) {
        ((p - self.origin).dot(&self.normal), self.normal)
    }

    fn clone_box(&self) -> Box<dyn Sdf> {
        Box::new(*self)
    }

    fn as_plane(&self) -> Option<&SdfPlane> {
        Some(self)
    }
}

/// Union of colliders. The closest member (smallest signed distance) wins.
#[derive(Debug, Clone, Default)]
pub struct SdfCollection {
    pub list_sdf: Vec<Box<dyn Sdf>>,
}

impl SdfCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: Sdf + 'static>(&mut self, sdf: S) {
        self.list_sdf.push(Box::new(sdf));
    }

    pub fn len(&self) -> usize {
        self.list_sdf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list_sdf.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Sdf> {
        self.list_sdf.iter().map(|s| s.as_ref())
    }
}

impl Sdf for SdfCollection {
    /// An empty collection is infinitely far from everything.
    fn projection(&self, p: Point) -> (f64, Vector) {
        self.list_sdf
            .iter()
            .map(|s| s.projection(p))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .unwrap_or((f64::INFINITY, Vector::new(0., 0., 1.)))
    }

    fn clone_box(&self) -> Box<dyn Sdf> {
        Box::new(self.clone())
    }

    fn as_collection(&self) -> Option<&SdfCollection> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_solid_inside() {
        let s = SdfSphere::new(0.55, [0.0, 0.5, -1.0], true);
        let (d, n) = s.projection(Point::new(0.0, 0.5, 0.0));
        assert!((d - 0.45).abs() < 1e-12);
        assert!(n.is_close(&Vector::new(0., 0., 1.)));
        // Center is deep inside the solid
        assert!((s.signed_distance(s.center) + 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_sphere_container() {
        let s = SdfSphere::new(1.0, [0.0, 0.0, 0.0], false);
        let (d, n) = s.projection(Point::new(0.25, 0.0, 0.0));
        assert!((d - 0.75).abs() < 1e-12);
        // Normal points back toward the center, the free side
        assert!(n.is_close(&Vector::new(-1., 0., 0.)));
        assert!(s.signed_distance(Point::new(2.0, 0.0, 0.0)) < 0.0);
    }

    #[test]
    fn test_plane() {
        let plane = SdfPlane::new(Point::new(0., 0., -1.), Vector::new(0., 0., 2.)).unwrap();
        assert!((plane.signed_distance(Point::origin()) - 1.0).abs() < 1e-12);
        assert!(plane.signed_distance(Point::new(5., 5., -3.)) < 0.0);
        assert!(SdfPlane::new(Point::origin(), Vector::zero()).is_none());
    }

    #[test]
    fn test_collection_takes_closest() {
        let mut c = SdfCollection::new();
        assert!(c.is_empty());
        assert!(c.signed_distance(Point::origin()).is_infinite());
        c.push(SdfSphere::new(0.5, [0.0, 0.0, -2.0], true));
        c.push(SdfPlane::new(Point::new(0., 0., -1.), Vector::new(0., 0., 1.)).unwrap());
        assert_eq!(c.len(), 2);
        let (d, _) = c.projection(Point::origin());
        assert!((d - 1.0).abs() < 1e-12);
        let (d, _) = c.projection(Point::new(0., 0., -1.4));
        assert!((d + 0.4).abs() < 1e-12);
        let c2 = c.clone();
        assert_eq!(c2.len(), 2);
        assert!(c2.iter().next().unwrap().as_sphere().is_some());
    }

    #[test]
    fn test_nested_collection() {
        let mut inner = SdfCollection::new();
        inner.push(SdfSphere::new(0.5, [0.0, 0.0, -2.0], true));
        let mut outer = SdfCollection::new();
        outer.push(inner);
        let member = outer.iter().next().unwrap();
        assert!(member.as_sphere().is_none());
        assert_eq!(member.as_collection().map(|c| c.len()), Some(1));
        assert!((outer.signed_distance(Point::origin()) - 1.5).abs() < 1e-12);
    }
}
