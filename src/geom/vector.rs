use crate::Point;
use crate::geom::EPS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Vector {
    pub fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    pub fn zero() -> Self {
        Self::new(0., 0., 0.)
    }

    pub fn from_points(beg: Point, end: Point) -> Self {
        Self {
            dx: end.x - beg.x,
            dy: end.y - beg.y,
            dz: end.z - beg.z,
        }
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            dx: self.dy * other.dz - self.dz * other.dy,
            dy: self.dz * other.dx - self.dx * other.dz,
            dz: self.dx * other.dy - self.dy * other.dx,
        }
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.dx * other.dx + self.dy * other.dy + self.dz * other.dz
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn is_close(&self, other: &Self) -> bool {
        (self.dx - other.dx).abs() < EPS
            && (self.dy - other.dy).abs() < EPS
            && (self.dz - other.dz).abs() < EPS
    }

    /// Unit vector in the same direction, `None` when the length is below `EPS`.
    pub fn normalize(&self) -> Option<Self> {
        let len = self.length();
        (len >= EPS).then(|| *self * (1.0 / len))
    }

    /// Unit normal of the triangle `pt0, pt1, pt2` following the right hand rule.
    pub fn normal(pt0: Point, pt1: Point, pt2: Point) -> Option<Self> {
        let v01 = pt1 - pt0;
        let v02 = pt2 - pt0;
        v01.cross(&v02).normalize()
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(2); // Default 2 decimals
        write!(
            f,
            "Vector({:.prec$}, {:.prec$}, {:.prec$})",
            self.dx,
            self.dy,
            self.dz,
            prec = prec
        )
    }
}

impl Add for Vector {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            dx: self.dx + other.dx,
            dy: self.dy + other.dy,
            dz: self.dz + other.dz,
        }
    }
}

impl Sub for Vector {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            dx: self.dx - other.dx,
            dy: self.dy - other.dy,
            dz: self.dz - other.dz,
        }
    }
}

impl Mul<f64> for Vector {
    type Output = Self;
    fn mul(self, other: f64) -> Self {
        Self {
            dx: self.dx * other,
            dy: self.dy * other,
            dz: self.dz * other,
        }
    }
}

impl Neg for Vector {
    type Output = Self;
    fn neg(self) -> Self {
        self * -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_products() {
        let vx = Vector::new(1., 0., 0.);
        let vy = Vector::new(0., 1., 0.);
        assert_eq!(vx.cross(&vy), Vector::new(0., 0., 1.));
        assert_eq!(vy.cross(&vx), -Vector::new(0., 0., 1.));
        assert_eq!(vx.dot(&vy), 0.0);
        assert_eq!(Vector::new(3., 4., 0.).length(), 5.0);
    }

    #[test]
    fn test_normalize() {
        let v = Vector::new(0., 0., -4.);
        assert_eq!(v.normalize(), Some(Vector::new(0., 0., -1.)));
        assert!(Vector::zero().normalize().is_none());
    }

    #[test]
    fn test_normal_of_ccw_triangle_points_up() {
        let p0 = Point::xy(-1., -1.);
        let p1 = Point::xy(1., -1.);
        let p2 = Point::xy(1., 1.);
        let vn = Vector::normal(p0, p1, p2).unwrap();
        assert!(vn.is_close(&Vector::new(0., 0., 1.)));
        assert!(Vector::normal(p0, p2, p1).unwrap().is_close(&Vector::new(0., 0., -1.)));
        assert!(Vector::normal(p0, p0, p1).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{:.1}", Vector::new(0.5, 1., -2.)), "Vector(0.5, 1.0, -2.0)");
    }
}
