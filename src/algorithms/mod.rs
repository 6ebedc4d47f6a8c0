// private sub-module defined in other files
mod is_clockwise_order;
mod point_in_poly;
mod poly_area;

// exports identifiers from private sub-modules in the current module namespace
pub use self::is_clockwise_order::is_clockwise_order;
pub use self::point_in_poly::{point_in_or_on_ring, point_in_ring, point_on_ring_boundary};
pub use self::poly_area::{polygon_area, signed_area};
