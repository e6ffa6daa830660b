//! Bounds-checked big-endian reader over an in-memory archive.
//!
//! Every read either returns a complete value and advances, or fails and
//! leaves the position untouched.

use byteorder::{BigEndian, ByteOrder};

use super::error::ParseError;

/// Sequential reader over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a cursor starting at `pos`.
    ///
    /// A position past the end is allowed; the first read will fail.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ParseError> {
        let available = self.remaining();
        if len > available {
            return Err(ParseError::TruncatedInput {
                offset: self.pos,
                needed: len,
                available,
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..self.pos])
    }

    pub fn read_u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ParseError> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, ParseError> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    /// Read a null-terminated byte string, consuming the terminator.
    ///
    /// The returned slice excludes the terminator.
    pub fn read_cstr(&mut self) -> Result<&'a [u8], ParseError> {
        let rest = self.data.get(self.pos..).unwrap_or_default();
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(ParseError::UnterminatedString { offset: self.pos })?;
        self.pos += end + 1;
        Ok(&rest[..end])
    }
}
