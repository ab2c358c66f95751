//! Identifier heap (`#Strings`).
//!
//! # Reference
//! - [ECMA-335 II.24.2.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use std::ffi::CStr;

use crate::{Error::OutOfBounds, Result};

/// '#Strings' holds the NUL-terminated UTF-8 identifiers referenced from the metadata tables,
/// such as module names, assembly names and cultures.
///
/// # Examples
///
/// ```rust
/// use evalscope::metadata::streams::Strings;
/// let data = &[0u8, b'H', b'e', b'l', b'l', b'o', 0u8];
/// let strings = Strings::from(data)?;
/// assert_eq!(strings.get(1)?, "Hello");
/// assert_eq!(strings.get(0)?, "");
/// # Ok::<(), evalscope::Error>(())
/// ```
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Create a `Strings` view over the heap bytes.
    ///
    /// # Errors
    /// Returns an error if the heap is empty or does not start with the mandatory empty string.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #Strings heap is empty"));
        }

        Ok(Strings { data })
    }

    /// Get the identifier starting at `index`.
    ///
    /// # Errors
    /// Returns an error if the index is out of bounds, the string is not terminated, or it is not
    /// valid UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        CStr::from_bytes_until_nul(&self.data[index..])
            .ok()
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| malformed_error!("Invalid string at index - {}", index))
    }
}
