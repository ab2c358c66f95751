//! GUID heap (`#GUID`).
//!
//! # Reference
//! - [ECMA-335 II.24.2.5](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{Error::OutOfBounds, Result};

/// '#GUID' is a sequence of 128-bit GUIDs, addressed by a 1-based index.
///
/// Index `0` is the "no GUID" marker used by optional columns such as `EncId`; [`Guid::get`]
/// returns the nil GUID for it.
///
/// # Examples
///
/// ```rust
/// use evalscope::metadata::streams::Guid;
/// let data = [0x11u8; 16];
/// let heap = Guid::from(&data)?;
/// assert_eq!(heap.get(1)?.to_bytes(), [0x11; 16]);
/// assert!(heap.get(0)?.to_bytes().iter().all(|b| *b == 0));
/// # Ok::<(), evalscope::Error>(())
/// ```
pub struct Guid<'a> {
    data: &'a [u8],
}

impl<'a> Guid<'a> {
    /// Create a `Guid` view over the heap bytes.
    ///
    /// # Errors
    /// Returns an error if the heap is not a whole number of GUIDs.
    pub fn from(data: &'a [u8]) -> Result<Guid<'a>> {
        if data.len() % 16 != 0 {
            return Err(malformed_error!(
                "#GUID heap size is not a multiple of 16 - {}",
                data.len()
            ));
        }

        Ok(Guid { data })
    }

    /// Number of GUIDs stored in the heap
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / 16
    }

    /// True if the heap holds no GUIDs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the GUID at the 1-based `index`, or the nil GUID for index `0`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the index is past the end of the heap.
    pub fn get(&self, index: usize) -> Result<uguid::Guid> {
        if index == 0 {
            return Ok(uguid::Guid::ZERO);
        }

        let start = (index - 1).checked_mul(16).ok_or(OutOfBounds)?;
        let bytes = self.data.get(start..start + 16).ok_or(OutOfBounds)?;

        let mut buffer = [0u8; 16];
        buffer.copy_from_slice(bytes);

        Ok(uguid::Guid::from_bytes(buffer))
    }
}
