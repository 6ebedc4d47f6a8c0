// private sub-module defined in other files
mod extent;
mod point2d;

// exports identifiers from private sub-modules in the current module namespace
pub use self::extent::{Extent, Range};
pub use self::point2d::{Coordinate, Point2D};
