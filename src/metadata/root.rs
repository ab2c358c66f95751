//! Metadata root header and stream directory.
//!
//! The metadata root is the first thing a debuggee hands us for a module: the `BSJB` signature,
//! the runtime version string, and the directory of streams (`#~`, `#Strings`, `#GUID`, ...).
//! Everything else in this crate locates its data through [`Root`].
//!
//! # References
//!
//! - [ECMA-335 II.24.2.1: Metadata root](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    metadata::streams::StreamHeader,
    utils::{read_le, read_le_at},
    Error::OutOfBounds,
    Result,
};

/// The MAGIC value indicating the CIL header
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// Upper bound on the number of streams a metadata root may declare.
///
/// Five ECMA-335 streams plus the uncompressed-tables, portable PDB and JIT-tables streams.
const MAX_STREAMS: u16 = 8;

/// The header of the present Metadata, providing the version string and the stream directory.
///
/// # Example
/// ```rust
/// use evalscope::metadata::root::Root;
/// let root = Root::read(&[
///            0x42, 0x53, 0x4A, 0x42,
///            0x01, 0x00,
///            0x01, 0x00,
///            0x00, 0x00, 0x00, 0x00,
///            0x04, 0x00, 0x00, 0x00,
///            b'v', b'4', 0x00, 0x00,
///            0x00, 0x00,
///            0x01, 0x00,
///            0x1C, 0x00, 0x00, 0x00, // StreamHeader
///            0x04, 0x00, 0x00, 0x00,
///            0x23, 0x7E, 0x00, 0x00,
///            0x00, 0x00, 0x00, 0x00,
///        ])?;
/// assert_eq!(root.version, "v4");
/// # Ok::<(), evalscope::Error>(())
/// ```
pub struct Root {
    /// Magic signature for physical metadata: 0x424A5342
    pub signature: u32,
    /// `MajorVersion`
    pub major_version: u16,
    /// `MinorVersion`
    pub minor_version: u16,
    /// Number of bytes allocated to hold the version string, padding included
    pub length: u32,
    /// 'VersionString', without trailing padding
    pub version: String,
    /// Reserved, always 0
    pub flags: u16,
    /// Streams
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Reads a [`Root`] metadata header from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The complete metadata range, starting at the signature
    ///
    /// # Errors
    /// Returns an error if the data is too short, the signature is invalid, or a stream header
    /// points outside of `data`.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(OutOfBounds);
        }

        let signature = read_le::<u32>(data)?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - {}",
                signature
            ));
        }

        let mut offset = 12;
        let length = read_le_at::<u32>(data, &mut offset)?;
        let version_end = usize::try_from(length)
            .ok()
            .and_then(|length| length.checked_add(16))
            .ok_or_else(|| malformed_error!("Version string length too large - {}", length))?;
        if version_end > data.len() {
            return Err(OutOfBounds);
        }

        let version_bytes = &data[16..version_end];
        let version_len = version_bytes
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(version_bytes.len());
        let version = String::from_utf8_lossy(&version_bytes[..version_len]).into_owned();

        let mut offset = version_end;
        let flags = read_le_at::<u16>(data, &mut offset)?;
        let stream_count = read_le_at::<u16>(data, &mut offset)?;
        if stream_count == 0 || stream_count > MAX_STREAMS {
            return Err(malformed_error!("Invalid stream count - {}", stream_count));
        }

        let mut stream_headers = Vec::with_capacity(usize::from(stream_count));
        for _ in 0..stream_count {
            if offset >= data.len() {
                return Err(OutOfBounds);
            }

            let header = StreamHeader::from(&data[offset..])?;
            match header.offset.checked_add(header.size) {
                Some(end) if end as usize <= data.len() => {}
                Some(_) => return Err(OutOfBounds),
                None => {
                    return Err(malformed_error!(
                        "Stream offset and size cause integer overflow - {} + {}",
                        header.offset,
                        header.size
                    ))
                }
            }

            offset += header.encoded_len();
            stream_headers.push(header);
        }

        Ok(Root {
            signature,
            major_version: read_le::<u16>(&data[4..])?,
            minor_version: read_le::<u16>(&data[6..])?,
            length,
            version,
            flags,
            stream_headers,
        })
    }

    /// Look up a stream by name
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|header| header.name == name)
    }

    /// Borrow the bytes of the named stream out of `data`
    #[must_use]
    pub fn stream_data<'a>(&self, data: &'a [u8], name: &str) -> Option<&'a [u8]> {
        let header = self.stream(name)?;
        let start = header.offset as usize;
        data.get(start..start + header.size as usize)
    }
}
