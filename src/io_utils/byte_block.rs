/*
This code is part of the geocodec library.
License: MIT
*/
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use super::Endianness;

/// A reusable byte buffer that only ever grows. Record payloads are read into the
/// same block one after another, so the allocation happens once per file rather
/// than once per record.
#[derive(Debug, Default, Clone)]
pub struct ByteBlock {
    data: Vec<u8>,
    len: usize,
}

impl ByteBlock {
    pub fn with_capacity(capacity: usize) -> ByteBlock {
        ByteBlock {
            data: vec![0u8; capacity],
            len: 0,
        }
    }

    /// Resizes the logical length to `len`, growing the allocation (by doubling)
    /// only when needed, and returns the writable slice.
    pub fn reset(&mut self, len: usize) -> &mut [u8] {
        if len > self.data.len() {
            let mut capacity = self.data.len().max(64);
            while capacity < len {
                capacity *= 2;
            }
            self.data.resize(capacity, 0u8);
        }
        self.len = len;
        &mut self.data[..len]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Reads an i32 at `offset`, or `None` when it would run past the block.
    pub fn i32_at(&self, offset: usize, byte_order: Endianness) -> Option<i32> {
        let bytes = self.as_slice().get(offset..offset + 4)?;
        Some(match byte_order {
            Endianness::LittleEndian => LittleEndian::read_i32(bytes),
            Endianness::BigEndian => BigEndian::read_i32(bytes),
        })
    }

    pub fn f64_at(&self, offset: usize, byte_order: Endianness) -> Option<f64> {
        let bytes = self.as_slice().get(offset..offset + 8)?;
        Some(match byte_order {
            Endianness::LittleEndian => LittleEndian::read_f64(bytes),
            Endianness::BigEndian => BigEndian::read_f64(bytes),
        })
    }

    /// Copies `dst.len()` little-endian i32 values starting at `offset`.
    pub fn read_i32_into(&self, offset: usize, dst: &mut [i32]) -> Option<()> {
        let bytes = self.as_slice().get(offset..offset + dst.len() * 4)?;
        LittleEndian::read_i32_into(bytes, dst);
        Some(())
    }

    /// Copies `dst.len()` little-endian doubles starting at `offset`.
    pub fn read_f64_into(&self, offset: usize, dst: &mut [f64]) -> Option<()> {
        let bytes = self.as_slice().get(offset..offset + dst.len() * 8)?;
        LittleEndian::read_f64_into(bytes, dst);
        Some(())
    }
}

#[cfg(test)]
mod test {
    use super::ByteBlock;
    use crate::io_utils::Endianness;

    #[test]
    fn test_grows_but_never_shrinks() {
        let mut block = ByteBlock::with_capacity(16);
        block.reset(100);
        let cap = block.capacity();
        assert!(cap >= 100);
        block.reset(10);
        assert_eq!(block.len(), 10);
        assert_eq!(block.capacity(), cap);
    }

    #[test]
    fn test_typed_access_is_bounds_checked() {
        let mut block = ByteBlock::default();
        let buf = block.reset(12);
        buf[0..4].copy_from_slice(&5i32.to_le_bytes());
        buf[4..12].copy_from_slice(&1.25f64.to_le_bytes());
        assert_eq!(block.i32_at(0, Endianness::LittleEndian), Some(5));
        assert_eq!(block.f64_at(4, Endianness::LittleEndian), Some(1.25));
        assert_eq!(block.f64_at(8, Endianness::LittleEndian), None);
        let mut dst = [0f64; 2];
        assert!(block.read_f64_into(4, &mut dst).is_none());
    }
}
