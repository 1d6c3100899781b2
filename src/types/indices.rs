//! Strongly-typed depth index.
//!
//! Time positions are plain `usize` throughout the detection code, so the
//! depth axis gets its own newtype to keep the two from being swapped.

use std::fmt;

/// Row index into the depth axis of a [`TemperatureGrid`](crate::grid::TemperatureGrid).
///
/// # Example
///
/// ```
/// use coldpulse_rs::types::DepthIndex;
///
/// let row = DepthIndex::new(1);
/// assert_eq!(row.get(), 1);
/// assert_eq!(format!("{}", row), "D1");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct DepthIndex(usize);

impl DepthIndex {
    /// Create a new index.
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the raw index value.
    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for DepthIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

impl From<usize> for DepthIndex {
    #[inline]
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl From<DepthIndex> for usize {
    #[inline]
    fn from(idx: DepthIndex) -> usize {
        idx.0
    }
}
