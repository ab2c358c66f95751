//! Stream headers of the metadata root.
//!
//! Each header names one stream and locates it relative to the start of the metadata. The
//! header's on-disk length depends on its name, which is NUL-terminated and padded to a 4-byte
//! boundary.
//!
//! # Reference
//! - [ECMA-335 II.24.2.2](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{utils::read_le, Error::OutOfBounds, Result};

/// Stream names a metadata root may legally declare
const VALID_NAMES: [&str; 8] = [
    "#Strings", "#US", "#Blob", "#GUID", "#~", "#-", "#Pdb", "#JTD",
];

/// Longest stream name, terminator included
const MAX_NAME_LEN: usize = 32;

/// Name, position and length of a single metadata stream.
///
/// # Examples
///
/// ```rust
/// use evalscope::metadata::streams::StreamHeader;
/// let header = StreamHeader::from(&[
///     0x6C, 0x00, 0x00, 0x00,
///     0x10, 0x00, 0x00, 0x00,
///     b'#', b'~', 0x00, 0x00,
/// ])?;
/// assert_eq!(header.name, "#~");
/// assert_eq!(header.encoded_len(), 12);
/// # Ok::<(), evalscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of this stream in bytes
    pub size: u32,
    /// Name of the stream
    pub name: String,
}

impl StreamHeader {
    /// Parse a stream header from the start of `data`.
    ///
    /// # Errors
    /// Returns an error if the data is too short, the name is not terminated within 32 bytes, or
    /// the name is not a known stream.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(OutOfBounds);
        }

        let name_area = &data[8..data.len().min(8 + MAX_NAME_LEN)];
        let Some(name_len) = name_area.iter().position(|byte| *byte == 0) else {
            return Err(malformed_error!("Stream header name is not terminated"));
        };

        let name = String::from_utf8_lossy(&name_area[..name_len]).into_owned();
        if !VALID_NAMES.contains(&name.as_str()) {
            return Err(malformed_error!("Invalid stream header name - {}", name));
        }

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name,
        })
    }

    /// Number of bytes this header occupies, name padding included
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        8 + ((self.name.len() + 1 + 3) & !3)
    }
}
