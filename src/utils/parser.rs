//! Cursor over a metadata byte range.

use crate::{
    utils::io::{read_le_at, CilIO},
    Error::OutOfBounds,
    Result,
};

/// A forward-only reader over a borrowed byte slice.
///
/// Keeps the current position and offers the ECMA-335 compressed integer encoding used by
/// blob lengths (II.23.2).
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a parser positioned at the start of `data`
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Current position within the data
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Whether any unread bytes remain
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Skip `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if that would move past the end.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(OutOfBounds),
        }
    }

    /// Read a little-endian `T` and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough bytes remain.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read `len` raw bytes and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let start = self.position;
        self.advance_by(len)?;
        Ok(&self.data[start..self.position])
    }

    /// Read an ECMA-335 compressed unsigned integer.
    ///
    /// # Errors
    /// Returns an error if the data is truncated or the lead byte is not a valid encoding.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        // 1-byte encoding: 0xxxxxxx
        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        // 2-byte encoding: 10xxxxxx xxxxxxxx
        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            return Ok(((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte));
        }

        // 4-byte encoding: 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            return Ok(((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3);
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }
}
