use super::signed_area;

/// Checks whether a ring, given as a flat `[x0, y0, x1, y1, ...]` slice, runs
/// in clockwise order. Rings with fewer than three vertices, or no area, are
/// not clockwise.
pub fn is_clockwise_order(xy: &[f64]) -> bool {
    signed_area(xy) < 0f64
}
