/*
This code is part of the geocodec library.
License: MIT
*/
use super::header::ShapefileHeader;
use crate::error::{Result, ShapefileError};
use crate::io_utils::{ByteOrderReader, ByteOrderWriter, Endianness};
use std::io::prelude::*;

/// One .shx entry. Both fields are in 16-bit words.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ShapeHeader {
    pub offset: i32,
    pub content_length: i32,
}

impl ShapeHeader {
    pub fn byte_offset(&self) -> usize {
        self.offset.max(0) as usize * 2
    }

    /// Bytes taken by the record in the .shp, header included.
    pub fn record_bytes(&self) -> usize {
        8 + self.content_length.max(0) as usize * 2
    }
}

/// Reads every index entry following the 100-byte header.
pub fn read_index<R: Read + Seek>(
    reader: &mut ByteOrderReader<R>,
    header: &ShapefileHeader,
) -> Result<Vec<ShapeHeader>> {
    let len = reader.len();
    if len < 100 {
        return Err(ShapefileError::Format(format!(
            "index file is {} bytes, shorter than its header",
            len
        )));
    }
    if (len - 100) % 8 != 0 {
        return Err(ShapefileError::Format(
            "index file ends with a partial entry".to_string(),
        ));
    }
    if header.file_length as usize * 2 != len {
        tracing::warn!(
            "index header declares {} bytes, file holds {}",
            header.file_length as usize * 2,
            len
        );
    }
    let num_records = (len - 100) / 8;
    let mut entries = Vec::with_capacity(num_records);
    reader.seek(100)?;
    reader.set_byte_order(Endianness::BigEndian);
    for i in 0..num_records {
        let offset = reader.read_i32()?;
        let content_length = reader.read_i32()?;
        if offset < 50 || content_length < 2 {
            return Err(ShapefileError::Format(format!(
                "index entry {} is invalid (offset {}, content length {})",
                i + 1,
                offset,
                content_length
            )));
        }
        entries.push(ShapeHeader {
            offset,
            content_length,
        });
    }
    Ok(entries)
}

/// Rejects entries whose record would run past the end of a .shp of
/// `shp_len` bytes. Runs before any record is seeked to.
pub fn validate_against(index: &[ShapeHeader], shp_len: usize) -> Result<()> {
    for (i, entry) in index.iter().enumerate() {
        let end = entry.byte_offset() + entry.record_bytes();
        if end > shp_len {
            return Err(ShapefileError::OutOfBounds {
                index: end,
                len: shp_len,
            }
            .in_record(i as i32 + 1));
        }
    }
    Ok(())
}

/// Writes .shx entries for records appended one after another, keeping the
/// running offset.
pub struct IndexWriter<W: Write> {
    writer: ByteOrderWriter<W>,
    next_offset: i32,
    entries: Vec<ShapeHeader>,
}

impl<W: Write> IndexWriter<W> {
    /// Wraps a sink positioned just after the (placeholder) 100-byte header.
    pub fn new(writer: ByteOrderWriter<W>) -> IndexWriter<W> {
        IndexWriter {
            writer,
            next_offset: 50,
            entries: vec![],
        }
    }

    /// Records a shape of `content_length` words and writes its entry.
    pub fn append(&mut self, content_length: i32) -> Result<ShapeHeader> {
        let entry = ShapeHeader {
            offset: self.next_offset,
            content_length,
        };
        self.writer.set_byte_order(Endianness::BigEndian);
        self.writer.write_i32(entry.offset)?;
        self.writer.write_i32(entry.content_length)?;
        self.next_offset += content_length + 4;
        self.entries.push(entry);
        Ok(entry)
    }

    pub fn entries(&self) -> &[ShapeHeader] {
        &self.entries
    }

    /// Length of the .shp described so far, in words.
    pub fn shp_length(&self) -> i32 {
        self.next_offset
    }

    /// Length of the .shx written so far, in words.
    pub fn shx_length(&self) -> i32 {
        50 + 4 * self.entries.len() as i32
    }

    pub fn into_inner(self) -> (ByteOrderWriter<W>, Vec<ShapeHeader>) {
        (self.writer, self.entries)
    }
}

#[cfg(test)]
mod test {
    use super::{read_index, validate_against, IndexWriter, ShapeHeader};
    use crate::io_utils::{ByteOrderReader, ByteOrderWriter, Endianness};
    use crate::vector::shapefile::geometry::ShapeType;
    use crate::vector::shapefile::header::ShapefileHeader;
    use std::io::Cursor;

    fn write_index(lengths: &[i32]) -> Vec<u8> {
        let mut header = ShapefileHeader::new(ShapeType::Point);
        header.file_length = 50 + 4 * lengths.len() as i32;
        let mut bytes = header.serialize().to_vec();
        let mut index = IndexWriter::new(ByteOrderWriter::new(Vec::new(), Endianness::BigEndian));
        for len in lengths {
            index.append(*len).unwrap();
        }
        let (writer, _) = index.into_inner();
        bytes.extend(writer.into_inner());
        bytes
    }

    #[test]
    fn test_running_offsets() {
        let bytes = write_index(&[10, 2, 10]);
        assert_eq!(bytes.len(), 100 + 8 * 3);
        let mut reader = ByteOrderReader::new(Cursor::new(bytes), Endianness::BigEndian).unwrap();
        let header = ShapefileHeader::read_from(&mut reader, true).unwrap();
        let entries = read_index(&mut reader, &header).unwrap();
        let offsets: Vec<i32> = entries.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![50, 64, 70]);
        assert_eq!(entries[1].content_length, 2);
    }

    #[test]
    fn test_header_only_index() {
        let bytes = write_index(&[]);
        let mut reader = ByteOrderReader::new(Cursor::new(bytes), Endianness::BigEndian).unwrap();
        let header = ShapefileHeader::read_from(&mut reader, true).unwrap();
        assert!(read_index(&mut reader, &header).unwrap().is_empty());
    }

    #[test]
    fn test_partial_entry() {
        let mut bytes = write_index(&[10]);
        bytes.extend_from_slice(&[0, 0, 0, 50]);
        let mut reader = ByteOrderReader::new(Cursor::new(bytes), Endianness::BigEndian).unwrap();
        let header = ShapefileHeader::read_from(&mut reader, true).unwrap();
        assert!(read_index(&mut reader, &header).is_err());
    }

    #[test]
    fn test_validate_against() {
        let index = vec![
            ShapeHeader {
                offset: 50,
                content_length: 10,
            },
            ShapeHeader {
                offset: 64,
                content_length: 10,
            },
        ];
        assert!(validate_against(&index, 156).is_ok());
        let err = validate_against(&index, 150).unwrap_err();
        assert_eq!(err.record_number(), Some(2));
    }
}
