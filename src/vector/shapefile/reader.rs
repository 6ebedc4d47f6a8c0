/*
This code is part of the geocodec library.
License: MIT
*/
use super::companion_paths;
use super::geometry::{Shape, VertexStore};
use super::header::ShapefileHeader;
use super::index::{read_index, ShapeHeader};
use super::record::{read_record, read_summary};
use crate::configs::Configs;
use crate::error::{Result, ShapefileError};
use crate::io_utils::{BufferedBinaryReader, ByteBlock, ByteOrderReader, Endianness};
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

/// Streams the records of a shapefile one at a time, without building the
/// shared vertex arena.
///
/// Each item is either a shape or the error raised by that record, tagged with
/// its record number. Positions come from the index, so iteration carries on
/// with the next record after an error.
pub struct ShapeReader<R: Read + Seek> {
    reader: ByteOrderReader<BufferedBinaryReader<R>>,
    header: ShapefileHeader,
    index: Vec<ShapeHeader>,
    next: usize,
    block: ByteBlock,
}

impl ShapeReader<File> {
    pub fn open<P: AsRef<Path>>(path: P, configs: &Configs) -> Result<ShapeReader<File>> {
        let (shp_path, shx_path) = companion_paths(path.as_ref())?;
        ShapeReader::new(
            File::open(shp_path)?,
            File::open(shx_path)?,
            configs,
        )
    }
}

impl<R: Read + Seek> ShapeReader<R> {
    pub fn new(shp: R, shx: R, configs: &Configs) -> Result<ShapeReader<R>> {
        let mut shx = ByteOrderReader::new(
            BufferedBinaryReader::with_window_size(shx, configs.buffer_size)?,
            Endianness::BigEndian,
        )?;
        let shx_header = ShapefileHeader::read_from(&mut shx, configs.strict_file_code)?;
        let index = read_index(&mut shx, &shx_header)?;

        let mut reader = ByteOrderReader::new(
            BufferedBinaryReader::with_window_size(shp, configs.buffer_size)?,
            Endianness::BigEndian,
        )?;
        let header = ShapefileHeader::read_from(&mut reader, configs.strict_file_code)?;
        Ok(ShapeReader {
            reader,
            header,
            index,
            next: 0,
            block: ByteBlock::with_capacity(1024),
        })
    }

    pub fn header(&self) -> &ShapefileHeader {
        &self.header
    }

    pub fn num_records(&self) -> usize {
        self.index.len()
    }

    /// Continues iteration at the given 0-based record.
    pub fn seek_record(&mut self, record: usize) {
        self.next = record.min(self.index.len());
    }

    /// Reads the record at the given 0-based position.
    pub fn read_shape(&mut self, record: usize) -> Result<Shape> {
        let record_number = record as i32 + 1;
        self.read_shape_inner(record)
            .map_err(|e| e.in_record(record_number))
    }

    fn read_shape_inner(&mut self, record: usize) -> Result<Shape> {
        let entry = *self.index.get(record).ok_or(ShapefileError::OutOfBounds {
            index: record,
            len: self.index.len(),
        })?;
        let end = entry.byte_offset() + entry.record_bytes();
        if end > self.reader.len() {
            return Err(ShapefileError::OutOfBounds {
                index: end,
                len: self.reader.len(),
            });
        }
        let summary = read_summary(
            &mut self.reader,
            &entry,
            record as i32 + 1,
            self.header.shape_type,
        )?;
        let mut vertices = VertexStore::allocate(self.header.shape_type, summary.num_points);
        let range = read_record(&mut self.reader, &summary, &mut self.block, &mut vertices, 0)?;
        Ok(Shape {
            range,
            vertices,
            attributes: None,
        })
    }
}

impl<R: Read + Seek> Iterator for ShapeReader<R> {
    type Item = Result<Shape>;

    fn next(&mut self) -> Option<Result<Shape>> {
        if self.next >= self.index.len() {
            return None;
        }
        let record = self.next;
        self.next += 1;
        Some(self.read_shape(record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.index.len() - self.next;
        (remaining, Some(remaining))
    }
}
