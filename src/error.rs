/*
This code is part of the geocodec library.
License: MIT
*/
use thiserror::Error;

/// The error type for every fallible operation in this library.
///
/// # Error Categories
///
/// ## Format errors (fatal for the file being opened)
/// - [`ShapefileError::Format`] - header file-code mismatch, inconsistent index, bad WKB tag
/// - [`ShapefileError::UnrecognizedShapeType`] - shape type code outside the ESRI table
/// - [`ShapefileError::TruncatedRecord`] - record shorter than its declared layout
///
/// ## Usage errors
/// - [`ShapefileError::OutOfBounds`] - requested record/offset beyond what the file declares
/// - [`ShapefileError::NotSupported`] - recognized but unimplemented geometry (MultiPatch,
///   mixed WKB collections read through a single-kind decoder)
/// - [`ShapefileError::InvariantViolation`] - the caller broke a model invariant
///
/// ## Environment
/// - [`ShapefileError::Io`] - filesystem failures, propagated as-is
/// - [`ShapefileError::Config`] - settings file could not be (de)serialized
/// - [`ShapefileError::Cancelled`] - a progress handler asked to stop
#[derive(Error, Debug)]
pub enum ShapefileError {
    /// The bytes do not follow the expected layout.
    #[error("Format error: {0}")]
    Format(String),

    /// A shape type code that is not part of the Shapefile specification.
    #[error("Unrecognized shape type code {0}")]
    UnrecognizedShapeType(i32),

    /// A record ended before all of its mandatory fields could be read.
    #[error("Record {record_number} is truncated: expected {expected} bytes, found {available}")]
    TruncatedRecord {
        record_number: i32,
        expected: usize,
        available: usize,
    },

    /// An index or offset lies outside the declared bounds.
    #[error("Index {index} is out of bounds (length {len})")]
    OutOfBounds { index: usize, len: usize },

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Operation cancelled")]
    Cancelled,

    /// Wraps an error raised while decoding one record of a bulk scan.
    #[error("Record {record_number}: {source}")]
    Record {
        record_number: i32,
        #[source]
        source: Box<ShapefileError>,
    },

    #[error("{0}")]
    Config(#[from] serde_json::Error),
}

impl ShapefileError {
    /// Attaches a record number to an error, unless it already carries one.
    pub fn in_record(self, record_number: i32) -> ShapefileError {
        match self {
            ShapefileError::Record { .. } | ShapefileError::TruncatedRecord { .. } => self,
            other => ShapefileError::Record {
                record_number,
                source: Box::new(other),
            },
        }
    }

    /// The record number this error refers to, if any.
    pub fn record_number(&self) -> Option<i32> {
        match self {
            ShapefileError::Record { record_number, .. }
            | ShapefileError::TruncatedRecord { record_number, .. } => Some(*record_number),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShapefileError>;
