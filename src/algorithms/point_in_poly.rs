/*
This code is part of the geocodec library.
License: MIT
*/

use crate::structures::Point2D;

/// Tests if a point is Left|On|Right of an infinite line,
/// based on http://geomalgorithms.com/a03-_inclusion.html.
///
/// Return: >0 for p2 left of the line through p0 and p1
///         =0 for p2 on the line
///         <0 for p2 right of the line
fn is_left(p0: &Point2D, p1: &Point2D, p2: &Point2D) -> f64 {
    (p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y)
}

/// Iterates over the edges of a ring stored as a flat `[x0, y0, x1, y1, ...]`
/// slice. The closing edge is included whether or not the ring repeats its
/// first vertex.
fn edges(xy: &[f64]) -> impl Iterator<Item = (Point2D, Point2D)> + '_ {
    let n = xy.len() / 2;
    (0..n).map(move |i| {
        let j = if i + 1 < n { i + 1 } else { 0 };
        (Point2D::from_xy(xy, i), Point2D::from_xy(xy, j))
    })
}

/// Winding number test for a point in a ring. Points exactly on the boundary
/// may land on either side; see `point_on_ring_boundary`.
pub fn point_in_ring(p: &Point2D, xy: &[f64]) -> bool {
    if xy.len() < 6 {
        return false;
    }
    let mut wn = 0i32;
    for (a, b) in edges(xy) {
        if a.y <= p.y {
            // an upward crossing with p left of the edge
            if b.y > p.y && is_left(&a, &b, p) > 0f64 {
                wn += 1i32;
            }
        } else if b.y <= p.y && is_left(&a, &b, p) < 0f64 {
            // a downward crossing with p right of the edge
            wn -= 1i32;
        }
    }
    wn != 0i32
}

/// Exact test for a point lying on one of the ring's edges (or vertices).
pub fn point_on_ring_boundary(p: &Point2D, xy: &[f64]) -> bool {
    for (a, b) in edges(xy) {
        if is_left(&a, &b, p) == 0f64
            && p.x >= a.x.min(b.x)
            && p.x <= a.x.max(b.x)
            && p.y >= a.y.min(b.y)
            && p.y <= a.y.max(b.y)
        {
            return true;
        }
    }
    false
}

/// Ring membership with the boundary counted as inside.
pub fn point_in_or_on_ring(p: &Point2D, xy: &[f64]) -> bool {
    point_in_ring(p, xy) || point_on_ring_boundary(p, xy)
}

#[cfg(test)]
mod test {
    use super::{point_in_or_on_ring, point_in_ring, point_on_ring_boundary};
    use crate::structures::Point2D;

    const TRIANGLE: [f64; 8] = [0.0, 0.0, 5.0, 0.0, 5.0, 5.0, 0.0, 0.0];

    #[test]
    fn test_point_in_ring() {
        // point inside
        assert!(point_in_ring(&Point2D::new(4.0, 2.0), &TRIANGLE));
        // point outside
        assert_eq!(point_in_ring(&Point2D::new(12.0, 12.0), &TRIANGLE), false);
        // open rings are closed implicitly
        assert!(point_in_ring(&Point2D::new(4.0, 2.0), &TRIANGLE[..6]));
    }

    #[test]
    fn test_boundary_points() {
        let p = Point2D::new(5.0, 3.0);
        assert!(point_on_ring_boundary(&p, &TRIANGLE));
        assert!(point_in_or_on_ring(&p, &TRIANGLE));
        assert!(point_in_or_on_ring(&Point2D::new(0.0, 0.0), &TRIANGLE));
        assert!(!point_on_ring_boundary(&Point2D::new(6.0, 3.0), &TRIANGLE));
    }
}
