/*
This code is part of the geocodec library.
License: MIT
*/

/*
Shapefiles are the only container format; WKB geometries decode into the same
shape model.
*/

// private sub-module defined in other files
mod feature;
pub mod shapefile;
mod wkb;

// exports identifiers from private sub-modules in the current module namespace
pub use self::feature::{materialize, Feature, Geometry, GeometryKind, PolygonGeometry};
pub use self::shapefile::attributes::{
    AttributeField, AttributeSource, AttributeTable, DateData, FieldData,
};
pub use self::shapefile::geometry::{
    CoordinateType, PartRange, Shape, ShapeRange, ShapeType, ShapeView, VertexStore,
};
pub use self::shapefile::header::ShapefileHeader;
pub use self::shapefile::index::ShapeHeader;
pub use self::shapefile::projection::{PrjFile, ProjectionStore};
pub use self::shapefile::reader::ShapeReader;
pub use self::shapefile::writer::ShapefileWriter;
pub use self::shapefile::Shapefile;
pub use self::wkb::{ShapePacks, WkbDecoder};
