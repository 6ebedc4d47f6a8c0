/*
This code is part of the geocodec library.
License: MIT
*/
use std::f64;

/// The bounds of a single optional axis (M or Z).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Range {
        Range { min, max }
    }

    /// Interprets a (min, max) pair read from disk. Legacy writers mark an unused
    /// axis either with NaN or with swapped extremes (min = f64::MAX,
    /// max = f64::MIN); both come back as `None`.
    pub fn from_raw(min: f64, max: f64) -> Option<Range> {
        if min.is_nan() || max.is_nan() || min > max {
            return None;
        }
        Some(Range { min, max })
    }

    /// The pair written for a carried axis that has no values.
    pub fn inactive_sentinel() -> (f64, f64) {
        (f64::MAX, f64::MIN)
    }

    /// Grows an optional range to include `value`. NaN values are ignored.
    pub fn include(range: Option<Range>, value: f64) -> Option<Range> {
        if value.is_nan() {
            return range;
        }
        match range {
            None => Some(Range::new(value, value)),
            Some(r) => Some(Range::new(r.min.min(value), r.max.max(value))),
        }
    }

    /// Union of two optional ranges.
    pub fn union(a: Option<Range>, b: Option<Range>) -> Option<Range> {
        match (a, b) {
            (Some(a), Some(b)) => Some(Range::new(a.min.min(b.min), a.max.max(b.max))),
            (Some(a), None) => Some(a),
            (None, b) => b,
        }
    }

    /// Range over a slice of values, skipping NaN.
    pub fn of(values: &[f64]) -> Option<Range> {
        values.iter().fold(None, |r, v| Range::include(r, *v))
    }
}

/// An axis-aligned bounding box with optional measure and elevation ranges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub m: Option<Range>,
    pub z: Option<Range>,
}

impl Default for Extent {
    fn default() -> Extent {
        Extent::empty()
    }
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Extent {
        let (x1, x2) = if min_x < max_x {
            (min_x, max_x)
        } else {
            (max_x, min_x)
        };
        let (y1, y2) = if min_y < max_y {
            (min_y, max_y)
        } else {
            (max_y, min_y)
        };
        Extent {
            min_x: x1,
            min_y: y1,
            max_x: x2,
            max_y: y2,
            m: None,
            z: None,
        }
    }

    /// An extent that contains nothing; expanding it by any point yields that point.
    pub fn empty() -> Extent {
        Extent {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
            m: None,
            z: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Bounds of a flat `[x0, y0, x1, y1, ...]` slice.
    pub fn of_xy(xy: &[f64]) -> Extent {
        let mut extent = Extent::empty();
        for p in xy.chunks_exact(2) {
            extent.expand_to_include(p[0], p[1]);
        }
        extent
    }

    pub fn get_width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn get_height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        if self.is_empty() {
            return 0f64;
        }
        self.get_width() * self.get_height()
    }

    pub fn expand_to_include(&mut self, x: f64, y: f64) {
        if x < self.min_x {
            self.min_x = x;
        }
        if x > self.max_x {
            self.max_x = x;
        }
        if y < self.min_y {
            self.min_y = y;
        }
        if y > self.max_y {
            self.max_y = y;
        }
    }

    pub fn expand_to(&mut self, other: &Extent) {
        if other.is_empty() {
            return;
        }
        self.expand_to_include(other.min_x, other.min_y);
        self.expand_to_include(other.max_x, other.max_y);
        self.m = Range::union(self.m, other.m);
        self.z = Range::union(self.z, other.z);
    }

    /// True when the two boxes share at least one point (edges included).
    pub fn intersects(&self, other: &Extent) -> bool {
        !(self.max_y < other.min_y
            || self.max_x < other.min_x
            || self.min_y > other.max_y
            || self.min_x > other.max_x)
    }

    /// True when `other` lies within this box (edges included).
    pub fn contains(&self, other: &Extent) -> bool {
        other.max_y <= self.max_y
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.min_x >= self.min_x
    }

    pub fn is_point_in_box(&self, x: f64, y: f64) -> bool {
        !(self.max_y < y || self.max_x < x || self.min_y > y || self.min_x > x)
    }
}
