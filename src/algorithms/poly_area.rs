/*
This code is part of the geocodec library.
License: MIT
*/

/// Calculates the signed area of a ring given as a flat `[x0, y0, x1, y1, ...]`
/// slice, using the shoelace formula in y-up coordinates. Negative values mean
/// the vertices run clockwise. The ring may or may not repeat its first vertex.
pub fn signed_area(xy: &[f64]) -> f64 {
    let num_vertices = xy.len() / 2;
    if num_vertices < 3 {
        return 0f64;
    }
    let mut area = 0f64;
    for i in 0..num_vertices {
        let j = if i + 1 < num_vertices { i + 1 } else { 0 };
        area += xy[2 * i] * xy[2 * j + 1] - xy[2 * j] * xy[2 * i + 1];
    }
    area / 2.0f64
}

/// Calculates the (unsigned) area of a ring.
pub fn polygon_area(xy: &[f64]) -> f64 {
    signed_area(xy).abs()
}
