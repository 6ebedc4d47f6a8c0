/*
This code is part of the geocodec library.
License: MIT

Windowed file access. Shapefiles can run to several gigabytes, so neither
side loads a whole file or issues a system call per primitive: reads are
served from a window loaded in one call, and writes accumulate in a window
that is flushed in one call.
*/
use super::ByteBlock;
use std::io::prelude::*;
use std::io::{Error, ErrorKind, Result, SeekFrom};

pub const DEFAULT_WINDOW_SIZE: usize = 1 << 20;

fn resolve_seek(pos: SeekFrom, current: u64, len: u64) -> Result<u64> {
    let target = match pos {
        SeekFrom::Start(p) => p as i128,
        SeekFrom::Current(delta) => current as i128 + delta as i128,
        SeekFrom::End(delta) => len as i128 + delta as i128,
    };
    if target < 0 {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "attempt to seek before the start of the stream",
        ));
    }
    Ok(target as u64)
}

/// A seekable reader that serves reads from a window of the underlying source.
pub struct BufferedBinaryReader<R: Read + Seek> {
    inner: R,
    window: ByteBlock,
    window_start: u64,
    pos: u64,
    len: u64,
    window_size: usize,
    windows_loaded: usize,
}

impl<R: Read + Seek> BufferedBinaryReader<R> {
    pub fn new(inner: R) -> Result<BufferedBinaryReader<R>> {
        BufferedBinaryReader::with_window_size(inner, DEFAULT_WINDOW_SIZE)
    }

    pub fn with_window_size(mut inner: R, window_size: usize) -> Result<BufferedBinaryReader<R>> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(BufferedBinaryReader {
            inner,
            window: ByteBlock::default(),
            window_start: 0,
            pos: 0,
            len,
            window_size: window_size.max(8),
            windows_loaded: 0,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Number of windows pulled from the underlying source so far.
    pub fn windows_loaded(&self) -> usize {
        self.windows_loaded
    }

    fn window_end(&self) -> u64 {
        self.window_start + self.window.len() as u64
    }

    fn load_window(&mut self) -> Result<()> {
        let n = (self.len - self.pos).min(self.window_size as u64) as usize;
        self.inner.seek(SeekFrom::Start(self.pos))?;
        let buf = self.window.reset(n);
        self.inner.read_exact(buf)?;
        self.window_start = self.pos;
        self.windows_loaded += 1;
        Ok(())
    }
}

impl<R: Read + Seek> Read for BufferedBinaryReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || self.pos >= self.len {
            return Ok(0);
        }
        if self.pos < self.window_start || self.pos >= self.window_end() {
            if buf.len() >= self.window_size {
                // large block reads bypass the window
                let n = ((self.len - self.pos) as usize).min(buf.len());
                self.inner.seek(SeekFrom::Start(self.pos))?;
                self.inner.read_exact(&mut buf[..n])?;
                self.pos += n as u64;
                return Ok(n);
            }
            self.load_window()?;
        }
        let offset = (self.pos - self.window_start) as usize;
        let available = &self.window.as_slice()[offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Read + Seek> Seek for BufferedBinaryReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.pos = resolve_seek(pos, self.pos, self.len)?;
        Ok(self.pos)
    }
}

/// A seekable writer that accumulates output in a window and flushes it to the
/// underlying sink in one call. Seeking flushes first, so header fields can be
/// patched after the records are written.
pub struct BufferedBinaryWriter<W: Write + Seek> {
    inner: W,
    window: Vec<u8>,
    window_start: u64,
    window_size: usize,
}

impl<W: Write + Seek> BufferedBinaryWriter<W> {
    pub fn new(inner: W) -> BufferedBinaryWriter<W> {
        BufferedBinaryWriter::with_window_size(inner, DEFAULT_WINDOW_SIZE)
    }

    pub fn with_window_size(inner: W, window_size: usize) -> BufferedBinaryWriter<W> {
        let window_size = window_size.max(8);
        BufferedBinaryWriter {
            inner,
            window: Vec::with_capacity(window_size),
            window_start: 0,
            window_size,
        }
    }

    pub fn position(&self) -> u64 {
        self.window_start + self.window.len() as u64
    }

    fn flush_window(&mut self) -> Result<()> {
        if !self.window.is_empty() {
            self.inner.write_all(&self.window)?;
            self.window_start += self.window.len() as u64;
            self.window.clear();
        }
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: Write + Seek> Write for BufferedBinaryWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.window.extend_from_slice(buf);
        if self.window.len() >= self.window_size {
            self.flush_window()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        self.flush_window()?;
        self.inner.flush()
    }
}

impl<W: Write + Seek> Seek for BufferedBinaryWriter<W> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let current = self.position();
        self.flush_window()?;
        let len = self.inner.seek(SeekFrom::End(0))?;
        let target = resolve_seek(pos, current, len)?;
        self.window_start = self.inner.seek(SeekFrom::Start(target))?;
        Ok(self.window_start)
    }
}

impl<W: Write + Seek> Drop for BufferedBinaryWriter<W> {
    fn drop(&mut self) {
        // errors here have nowhere to go; explicit flush() reports them
        let _ = self.flush();
    }
}
