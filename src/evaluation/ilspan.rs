//! Half-open IL offset ranges.

use std::fmt;

use crate::{Error, Result};

/// A half-open range `[start, end)` of IL offsets within a method body.
///
/// # Examples
///
/// ```rust
/// use evalscope::evaluation::ILSpan;
///
/// let span = ILSpan::new(10, 20)?;
/// assert!(span.contains(10));
/// assert!(!span.contains(20));
/// assert_eq!(span.to_string(), "[10, 20)");
/// assert!(ILSpan::new(5, 4).is_err());
/// # Ok::<(), evalscope::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ILSpan {
    start: u32,
    end: u32,
}

impl ILSpan {
    /// The span covering every offset a method body can have
    pub const MAX: ILSpan = ILSpan {
        start: 0,
        end: u32::MAX,
    };

    /// Create the span `[start, end)`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSpan`] if `start > end`.
    pub fn new(start: u32, end: u32) -> Result<ILSpan> {
        if start > end {
            return Err(Error::InvalidSpan { start, end });
        }

        Ok(ILSpan { start, end })
    }

    /// The span holding only `offset`
    #[must_use]
    pub fn single(offset: u32) -> ILSpan {
        ILSpan {
            start: offset,
            end: offset.saturating_add(1),
        }
    }

    pub(crate) fn new_unchecked(start: u32, end: u32) -> ILSpan {
        debug_assert!(start <= end);
        ILSpan { start, end }
    }

    /// Inclusive start offset
    #[must_use]
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Exclusive end offset
    #[must_use]
    pub fn end(&self) -> u32 {
        self.end
    }

    /// True if `start <= offset < end`
    #[must_use]
    pub fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }

    /// True if the span holds no offsets
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Number of offsets in the span
    #[must_use]
    pub fn len(&self) -> u32 {
        self.end - self.start
    }
}

impl fmt::Display for ILSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
