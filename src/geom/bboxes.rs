use crate::geom::EPS;
use crate::geom::point::Point;

/// Returns the min and max corners of the box holding all points `pts`.
///
/// Returns None for an empty slice.
pub fn bounding_box(pts: &[Point]) -> Option<(Point, Point)> {
    let first = *pts.first()?;
    let (pmin, pmax) = pts.iter().skip(1).fold((first, first), |(lo, hi), p| {
        (
            Point::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
            Point::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
        )
    });
    Some((pmin, pmax))
}

/// Length of the bounding box diagonal (0 for an empty slice).
pub fn bbox_diagonal(pts: &[Point]) -> f64 {
    bounding_box(pts).map_or(0.0, |(pmin, pmax)| pmin.distance(&pmax))
}

/// Checks whether two bounding boxes overlap.
///
/// Takes min and max corners of each bbox.
/// Returns true if boxes overlap (including touching).
pub fn are_bboxes_overlapping(min1: Point, max1: Point, min2: Point, max2: Point) -> bool {
    // Boxes don't overlap if separated along any axis
    if max1.x < min2.x - EPS || min1.x > max2.x + EPS {
        return false;
    }
    if max1.y < min2.y - EPS || min1.y > max2.y + EPS {
        return false;
    }
    if max1.z < min2.z - EPS || min1.z > max2.z + EPS {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box() {
        let pts = vec![
            Point::new(1., -2., 0.),
            Point::new(-1., 3., 0.5),
            Point::new(0., 0., -4.),
        ];
        let (pmin, pmax) = bounding_box(&pts).unwrap();
        assert!(pmin.is_close(&Point::new(-1., -2., -4.)));
        assert!(pmax.is_close(&Point::new(1., 3., 0.5)));
    }

    #[test]
    fn test_bounding_box_empty() {
        assert!(bounding_box(&[]).is_none());
        assert_eq!(bbox_diagonal(&[]), 0.0);
    }

    #[test]
    fn test_bboxes_overlapping() {
        let o = Point::origin();
        let one = Point::new(1., 1., 1.);
        let two = Point::new(2., 2., 2.);
        let three = Point::new(3., 3., 3.);
        assert!(are_bboxes_overlapping(o, one, one, two));
        assert!(!are_bboxes_overlapping(o, one, two, three));
    }
}
