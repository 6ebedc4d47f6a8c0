/*
This code is part of the geocodec library.
License: MIT
*/
use super::companion_paths;
use super::geometry::{ShapeType, ShapeView};
use super::header::ShapefileHeader;
use super::index::{IndexWriter, ShapeHeader};
use super::record::write_record;
use crate::configs::Configs;
use crate::error::{Result, ShapefileError};
use crate::io_utils::{BufferedBinaryWriter, ByteOrderWriter, Endianness};
use crate::structures::{Extent, Range};
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

/// Appends records to a .shp/.shx pair. Both headers are written as
/// placeholders up front and patched by `finish` with the final lengths and
/// bounds, so whatever was appended before `finish` forms a consistent file.
pub struct ShapefileWriter<W: Write + Seek> {
    shp: ByteOrderWriter<BufferedBinaryWriter<W>>,
    index: IndexWriter<BufferedBinaryWriter<W>>,
    header: ShapefileHeader,
}

impl ShapefileWriter<File> {
    /// Creates (or truncates) the .shp at `path` and its .shx sibling.
    pub fn create<P: AsRef<Path>>(
        path: P,
        shape_type: ShapeType,
        configs: &Configs,
    ) -> Result<ShapefileWriter<File>> {
        let (shp_path, shx_path) = companion_paths(path.as_ref())?;
        let shp = File::create(shp_path)?;
        let shx = File::create(shx_path)?;
        ShapefileWriter::new(shp, shx, shape_type, configs.buffer_size)
    }
}

impl<W: Write + Seek> ShapefileWriter<W> {
    pub fn new(shp: W, shx: W, shape_type: ShapeType, window_size: usize) -> Result<ShapefileWriter<W>> {
        let header = ShapefileHeader::new(shape_type);
        let mut shp = ByteOrderWriter::new(
            BufferedBinaryWriter::with_window_size(shp, window_size),
            Endianness::BigEndian,
        );
        header.write_to(&mut shp)?;
        let mut shx = ByteOrderWriter::new(
            BufferedBinaryWriter::with_window_size(shx, window_size),
            Endianness::BigEndian,
        );
        header.write_to(&mut shx)?;
        Ok(ShapefileWriter {
            shp,
            index: IndexWriter::new(shx),
            header,
        })
    }

    pub fn shape_type(&self) -> ShapeType {
        self.header.shape_type
    }

    pub fn num_records(&self) -> usize {
        self.index.entries().len()
    }

    /// Appends one record and its index entry. Returns the record number.
    pub fn write_shape(&mut self, view: &ShapeView) -> Result<i32> {
        let shape_type = view.shape_type();
        if !shape_type.is_null() && shape_type != self.header.shape_type {
            return Err(ShapefileError::InvariantViolation(format!(
                "cannot write a {} record to a {} file",
                shape_type, self.header.shape_type
            )));
        }
        let record_number = self.num_records() as i32 + 1;
        let content_length = write_record(&mut self.shp, record_number, view)?;
        self.index.append(content_length)?;

        if !shape_type.is_null() && view.num_points() > 0 {
            let mut extent = Extent::of_xy(view.xy);
            extent.z = view.z.and_then(Range::of);
            extent.m = view.m.and_then(Range::of);
            self.header.extent.expand_to(&extent);
        }
        Ok(record_number)
    }

    /// Patches both headers and flushes. Returns the .shp header and the
    /// index entries written.
    pub fn finish(mut self) -> Result<(ShapefileHeader, Vec<ShapeHeader>)> {
        self.header.file_length = self.index.shp_length();
        self.shp.seek(0)?;
        self.header.write_to(&mut self.shp)?;
        self.shp.flush()?;

        let mut shx_header = self.header.clone();
        shx_header.file_length = self.index.shx_length();
        let (mut shx, entries) = self.index.into_inner();
        shx.seek(0)?;
        shx_header.write_to(&mut shx)?;
        shx.flush()?;

        tracing::debug!(
            "wrote {} records ({} bytes of shape data)",
            entries.len(),
            self.header.file_length as usize * 2
        );
        Ok((self.header, entries))
    }
}
