/*
This code is part of the geocodec library.
License: MIT
*/

//! Codecs for ESRI Shapefile geometry and index files (.shp/.shx) and for OGC
//! Well-Known Binary geometries.
//!
//! Records are decoded into a single vertex arena per file; `ShapeView`s borrow
//! from it and `Geometry` values are only built when a feature is requested.

pub mod algorithms;
pub mod configs;
pub mod error;
pub mod io_utils;
pub mod progress;
pub mod structures;
pub mod vector;

pub use crate::configs::{Configs, UnmatchedHolePolicy};
pub use crate::error::{Result, ShapefileError};
pub use crate::progress::{CancelFlag, LogProgress, NoProgress, ProgressHandler};
