//! Little-endian cursors over in-memory course buffers.
//!
//! [`ByteReader`] never reads past the end of its slice: every read checks the
//! remaining length first and fails with [`KmpError::OutOfBounds`]. Seeking
//! anywhere is allowed, the check happens on the next read.
//!
//! [`ByteWriter`] grows on demand. Seeking past the current end and writing
//! zero-fills the gap, which is what lets the writer reserve header fields and
//! offset slots and patch them later.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::{Cursor, Write};

use crate::error::{KmpError, Result};
use crate::section::{TAG_LEN, Tag};

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn take(&mut self, wanted: usize) -> Result<&'a [u8]> {
        let bytes = self.peek(wanted)?;
        self.pos += wanted;
        Ok(bytes)
    }

    fn peek(&self, wanted: usize) -> Result<&'a [u8]> {
        let data = self.data;
        let end = self
            .pos
            .checked_add(wanted)
            .filter(|end| *end <= data.len())
            .ok_or(KmpError::OutOfBounds {
                offset: self.pos,
                wanted,
                len: data.len(),
            })?;
        Ok(&data[self.pos..end])
    }

    pub fn read_tag(&mut self) -> Result<Tag> {
        let mut raw = [0u8; TAG_LEN];
        raw.copy_from_slice(self.take(TAG_LEN)?);
        Ok(Tag::new(raw))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    /// Reads a u16 without advancing the cursor.
    pub fn peek_u16(&self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.peek(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }
}

#[derive(Debug, Default)]
pub struct ByteWriter {
    inner: Cursor<Vec<u8>>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of everything written so far, including zero-filled gaps.
    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    pub fn position(&self) -> usize {
        self.inner.position() as usize
    }

    pub fn set_position(&mut self, pos: usize) {
        self.inner.set_position(pos as u64);
    }

    /// Moves the cursor forward by `len` bytes without writing anything yet.
    pub fn skip(&mut self, len: usize) {
        let pos = self.position() + len;
        self.set_position(pos);
    }

    pub fn write_tag(&mut self, tag: Tag) -> Result<()> {
        self.inner.write_all(tag.as_bytes())?;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.inner.write_u16::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.inner.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.inner.write_i32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}
