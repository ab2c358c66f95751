//! Bounds-checked little-endian reads over borrowed metadata.
//!
//! Debuggee metadata is read in place: every helper here takes a byte slice and an offset and
//! either returns the decoded value or [`crate::Error::OutOfBounds`]. Nothing panics on short
//! or hostile input, which matters because the bytes come straight out of another process.

use crate::{Error::OutOfBounds, Result};

/// Primitive types that can be decoded from metadata in little-endian order.
pub trait CilIO: Sized {
    /// Fixed-size byte array backing this type
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Decode from little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_cil_io {
    ($($ty:ty),*) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_cil_io!(u8, u16, u32, u64, i32);

/// Reads a `T` from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Reads a `T` at `offset` and advances `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Reads a 2- or 4-byte index, depending on `is_large`, promoted to `u32`.
///
/// Heap and table indexes in the `#~` stream change width with the size of what they index.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the index does not fit in `data`.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    let res = if is_large {
        read_le_at::<u32>(data, offset)?
    } else {
        u32::from(read_le_at::<u16>(data, offset)?)
    };

    Ok(res)
}
