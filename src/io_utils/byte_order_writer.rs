/*
This code is part of the geocodec library.
License: MIT
*/
use super::byte_order_reader::Endianness;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use std::io::prelude::*;
use std::io::{Error, SeekFrom};

pub struct ByteOrderWriter<W: Write> {
    is_le: bool,
    writer: W,
    num_bytes_written: usize,
}

impl<W: Write> ByteOrderWriter<W> {
    pub fn new(writer: W, byte_order: Endianness) -> ByteOrderWriter<W> {
        ByteOrderWriter::<W> {
            writer,
            is_le: byte_order == Endianness::LittleEndian,
            num_bytes_written: 0,
        }
    }

    pub fn get_num_bytes_written(&self) -> usize {
        self.num_bytes_written
    }

    pub fn set_byte_order(&mut self, byte_order: Endianness) {
        self.is_le = byte_order == Endianness::LittleEndian;
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), Error> {
        self.num_bytes_written += 1;
        self.writer.write_u8(value)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.num_bytes_written += bytes.len();
        self.writer.write_all(bytes)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), Error> {
        self.num_bytes_written += 4;
        if self.is_le {
            self.writer.write_i32::<LittleEndian>(value)
        } else {
            self.writer.write_i32::<BigEndian>(value)
        }
    }

    pub fn write_f64(&mut self, value: f64) -> Result<(), Error> {
        self.num_bytes_written += 8;
        if self.is_le {
            self.writer.write_f64::<LittleEndian>(value)
        } else {
            self.writer.write_f64::<BigEndian>(value)
        }
    }

    pub fn write_f64_slice(&mut self, values: &[f64]) -> Result<(), Error> {
        for v in values {
            self.write_f64(*v)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.writer.flush()
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Seek> ByteOrderWriter<W> {
    /// Moves the write cursor. Used to patch header fields once the final
    /// lengths are known.
    pub fn seek(&mut self, position: usize) -> Result<(), Error> {
        self.writer.seek(SeekFrom::Start(position as u64))?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::ByteOrderWriter;
    use crate::io_utils::Endianness;
    use std::io::Cursor;

    #[test]
    fn test_mixed_endian_output() {
        let mut bow = ByteOrderWriter::new(Cursor::new(vec![]), Endianness::BigEndian);
        bow.write_i32(9994).unwrap();
        bow.set_byte_order(Endianness::LittleEndian);
        bow.write_i32(1000).unwrap();
        assert_eq!(bow.get_num_bytes_written(), 8);
        let bytes = bow.into_inner().into_inner();
        assert_eq!(&bytes[0..4], &[0, 0, 0x27, 0x0a]);
        assert_eq!(&bytes[4..8], &1000i32.to_le_bytes());
    }

    #[test]
    fn test_seek_patches_in_place() {
        let mut bow = ByteOrderWriter::new(Cursor::new(vec![]), Endianness::BigEndian);
        bow.write_i32(0).unwrap();
        bow.write_i32(7).unwrap();
        bow.seek(0).unwrap();
        bow.write_i32(42).unwrap();
        let bytes = bow.into_inner().into_inner();
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[0..4], &42i32.to_be_bytes());
    }
}
