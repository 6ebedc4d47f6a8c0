/*
This code is part of the geocodec library.
License: MIT
*/
use std::fmt;

/// A 2-D point, with x and y fields.
#[derive(Default, Copy, Clone, Debug)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(x: {}, y: {})", self.x, self.y)
    }
}

impl Point2D {
    /// Creates a new Point2D,
    pub fn new(x: f64, y: f64) -> Point2D {
        Point2D { x, y }
    }

    /// Reads the `index`-th vertex out of a flat `[x0, y0, x1, y1, ...]` slice.
    pub fn from_xy(xy: &[f64], index: usize) -> Point2D {
        Point2D::new(xy[2 * index], xy[2 * index + 1])
    }
}

impl PartialEq for Point2D {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

/// A vertex with optional elevation and measure, as exposed by materialized
/// geometries.
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub m: Option<f64>,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Coordinate {
        Coordinate {
            x,
            y,
            z: None,
            m: None,
        }
    }

    pub fn new_z(x: f64, y: f64, z: f64) -> Coordinate {
        Coordinate {
            x,
            y,
            z: Some(z),
            m: None,
        }
    }

    pub fn with_m(mut self, m: f64) -> Coordinate {
        self.m = Some(m);
        self
    }

    pub fn xy(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {}", self.x, self.y)?;
        if let Some(z) = self.z {
            write!(f, ", z: {}", z)?;
        }
        if let Some(m) = self.m {
            write!(f, ", m: {}", m)?;
        }
        write!(f, ")")
    }
}
