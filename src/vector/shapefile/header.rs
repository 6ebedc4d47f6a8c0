/*
This code is part of the geocodec library.
License: MIT
*/
use super::geometry::ShapeType;
use crate::error::{Result, ShapefileError};
use crate::io_utils::{ByteOrderReader, ByteOrderWriter, Endianness};
use crate::structures::{Extent, Range};
use std::fmt;
use std::io::prelude::*;
use std::io::Cursor;

pub const FILE_CODE: i32 = 9994;
pub const VERSION: i32 = 1000;
pub const HEADER_BYTES: usize = 100;

/// The 100-byte header shared by .shp and .shx files.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapefileHeader {
    pub file_code: i32,
    /// In 16-bit words, header included.
    pub file_length: i32,
    pub version: i32,
    pub shape_type: ShapeType,
    pub extent: Extent,
}

impl ShapefileHeader {
    pub fn new(shape_type: ShapeType) -> ShapefileHeader {
        ShapefileHeader {
            file_code: FILE_CODE,
            file_length: (HEADER_BYTES / 2) as i32,
            version: VERSION,
            shape_type,
            extent: Extent::empty(),
        }
    }

    /// Parses a header, rejecting any file code other than 9994.
    pub fn parse(bytes: &[u8; HEADER_BYTES]) -> Result<ShapefileHeader> {
        let mut reader = ByteOrderReader::new(Cursor::new(&bytes[..]), Endianness::BigEndian)?;
        ShapefileHeader::read_from(&mut reader, true)
    }

    pub fn serialize(&self) -> [u8; HEADER_BYTES] {
        let mut writer = ByteOrderWriter::new(
            Cursor::new(Vec::with_capacity(HEADER_BYTES)),
            Endianness::BigEndian,
        );
        let mut bytes = [0u8; HEADER_BYTES];
        // writes into a Vec cannot fail
        if self.write_to(&mut writer).is_ok() {
            bytes.copy_from_slice(&writer.into_inner().into_inner()[..HEADER_BYTES]);
        }
        bytes
    }

    /// Reads the header from the start of the file. With `strict_file_code`
    /// unset a wrong file code is only logged.
    pub fn read_from<R: Read + Seek>(
        reader: &mut ByteOrderReader<R>,
        strict_file_code: bool,
    ) -> Result<ShapefileHeader> {
        if reader.len() < HEADER_BYTES {
            return Err(ShapefileError::Format(format!(
                "file is {} bytes, shorter than the {}-byte header",
                reader.len(),
                HEADER_BYTES
            )));
        }
        reader.seek(0)?;
        reader.set_byte_order(Endianness::BigEndian);
        let file_code = reader.read_i32()?;
        if file_code != FILE_CODE {
            if strict_file_code {
                return Err(ShapefileError::Format(format!(
                    "file code is {}, expected {}",
                    file_code, FILE_CODE
                )));
            }
            tracing::warn!("unexpected file code {}", file_code);
        }
        // 20 unused bytes
        reader.inc_pos(20)?;
        let file_length = reader.read_i32()?;

        reader.set_byte_order(Endianness::LittleEndian);
        let version = reader.read_i32()?;
        if version != VERSION {
            tracing::warn!("unexpected shapefile version {}", version);
        }
        let shape_type = ShapeType::from_int(reader.read_i32()?)?;

        let min_x = reader.read_f64()?;
        let min_y = reader.read_f64()?;
        let max_x = reader.read_f64()?;
        let max_y = reader.read_f64()?;
        let z_min = reader.read_f64()?;
        let z_max = reader.read_f64()?;
        let m_min = reader.read_f64()?;
        let m_max = reader.read_f64()?;

        // a header without records carries an all-zero box for an empty extent
        let no_box = file_length <= (HEADER_BYTES / 2) as i32
            && [min_x, min_y, max_x, max_y].iter().all(|v| *v == 0f64);
        let mut extent = Extent {
            min_x,
            min_y,
            max_x,
            max_y,
            z: if shape_type.has_z() {
                Range::from_raw(z_min, z_max)
            } else {
                None
            },
            m: if shape_type.has_m() {
                Range::from_raw(m_min, m_max)
            } else {
                None
            },
        };
        if no_box {
            extent = Extent {
                z: extent.z,
                m: extent.m,
                ..Extent::empty()
            };
        }

        Ok(ShapefileHeader {
            file_code,
            file_length,
            version,
            shape_type,
            extent,
        })
    }

    /// Writes the header at the writer's current position.
    pub fn write_to<W: Write>(&self, writer: &mut ByteOrderWriter<W>) -> Result<()> {
        writer.set_byte_order(Endianness::BigEndian);
        writer.write_i32(self.file_code)?;
        for _ in 0..5 {
            writer.write_i32(0i32)?;
        }
        writer.write_i32(self.file_length)?;

        writer.set_byte_order(Endianness::LittleEndian);
        writer.write_i32(self.version)?;
        writer.write_i32(self.shape_type.to_int())?;

        let e = &self.extent;
        if e.is_empty() {
            writer.write_f64_slice(&[0f64; 4])?;
        } else {
            writer.write_f64_slice(&[e.min_x, e.min_y, e.max_x, e.max_y])?;
        }
        let axis = |carried: bool, range: Option<Range>| match (carried, range) {
            (false, _) => (0f64, 0f64),
            (true, Some(r)) => (r.min, r.max),
            (true, None) => Range::inactive_sentinel(),
        };
        let (z_min, z_max) = axis(self.shape_type.has_z(), e.z);
        let (m_min, m_max) = axis(self.shape_type.has_m(), e.m);
        writer.write_f64_slice(&[z_min, z_max, m_min, m_max])?;
        Ok(())
    }

    /// Number of records an index file of this length holds.
    pub fn num_index_records(&self) -> usize {
        (self.file_length.max(50) as usize - 50) / 4
    }
}

impl fmt::Display for ShapefileHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "file_code: {}\nfile_length: {}\nversion: {}\nshape_type: {}\nx_min: {}\nx_max: {}\ny_min: {}\ny_max: {}\nz: {:?}\nm: {:?}",
            self.file_code,
            self.file_length,
            self.version,
            self.shape_type,
            self.extent.min_x,
            self.extent.max_x,
            self.extent.min_y,
            self.extent.max_y,
            self.extent.z,
            self.extent.m
        )
    }
}
