//! Binary heap (`#Blob`).
//!
//! # Reference
//! - [ECMA-335 II.24.2.4](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{utils::Parser, Error::OutOfBounds, Result};

/// '#Blob' holds length-prefixed byte sequences: public keys, tokens and hash values for the
/// assembly tables, and signatures for everything else.
///
/// * If the first byte of the blob is 0bbbbbbb, the blob holds bbbbbbb bytes.
/// * If the first two bytes are 10bbbbbb and x, the blob holds (bbbbbb << 8 + x) bytes.
/// * If the first four bytes are 110bbbbb, x, y and z, the blob holds
///   (bbbbb << 24 + x << 16 + y << 8 + z) bytes.
///
/// # Examples
///
/// ```rust
/// use evalscope::metadata::streams::Blob;
/// let data = &[0u8, 0x03, 0x41, 0x42, 0x43];
/// let blob = Blob::from(data)?;
/// assert_eq!(blob.get(1)?, &[0x41, 0x42, 0x43]);
/// # Ok::<(), evalscope::Error>(())
/// ```
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Create a `Blob` view over the heap bytes.
    ///
    /// # Errors
    /// Returns an error if the heap is empty or doesn't start with the empty blob.
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Invalid memory for #Blob heap"));
        }

        Ok(Blob { data })
    }

    /// Get the blob starting at `index`, without its length prefix.
    ///
    /// # Errors
    /// Returns an error if the index or the encoded length point outside the heap.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(&self.data[index..]);
        let len = parser.read_compressed_uint()? as usize;
        parser.read_bytes(len)
    }
}
