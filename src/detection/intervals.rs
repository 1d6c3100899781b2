//! Interval sets stored as parallel start/end arrays.

use log::warn;

use crate::error::{DetectionError, DetectionResult};

/// A set of `[start, end)` time-index intervals.
///
/// Stored as two parallel arrays. Every stage of the pipeline consumes one
/// set and returns a new one; an empty set is a valid value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntervalSet {
    starts: Vec<usize>,
    ends: Vec<usize>,
}

impl IntervalSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from parallel arrays.
    ///
    /// # Errors
    /// `InvariantViolation` if the lengths differ or any start exceeds its end.
    pub fn from_parts(starts: Vec<usize>, ends: Vec<usize>) -> DetectionResult<Self> {
        if starts.len() != ends.len() {
            return Err(DetectionError::InvariantViolation(format!(
                "{} starts but {} ends",
                starts.len(),
                ends.len()
            )));
        }
        if let Some(i) = starts.iter().zip(&ends).position(|(s, e)| s > e) {
            return Err(DetectionError::InvariantViolation(format!(
                "interval {} has start {} after end {}",
                i, starts[i], ends[i]
            )));
        }
        Ok(Self { starts, ends })
    }

    /// Build from `(start, end)` pairs.
    ///
    /// # Errors
    /// `InvariantViolation` if any start exceeds its end.
    pub fn from_pairs(pairs: &[(usize, usize)]) -> DetectionResult<Self> {
        let (starts, ends) = pairs.iter().copied().unzip();
        Self::from_parts(starts, ends)
    }

    /// Parallel arrays of equal length whose ordering is checked later with
    /// [`drop_inverted`](Self::drop_inverted).
    pub(crate) fn from_unchecked(starts: Vec<usize>, ends: Vec<usize>) -> Self {
        debug_assert_eq!(starts.len(), ends.len());
        Self { starts, ends }
    }

    /// Append an interval. Callers guarantee `start <= end`.
    pub fn push(&mut self, start: usize, end: usize) {
        debug_assert!(start <= end);
        self.starts.push(start);
        self.ends.push(end);
    }

    /// Number of intervals.
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    /// True if the set holds no interval.
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Start indices.
    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    /// End indices.
    pub fn ends(&self) -> &[usize] {
        &self.ends
    }

    /// Iterate over `(start, end)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.starts.iter().copied().zip(self.ends.iter().copied())
    }

    /// New set holding the intervals for which `keep` returns true.
    pub fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(usize, usize) -> bool,
    {
        let mut out = Self::new();
        for (s, e) in self.iter() {
            if keep(s, e) {
                out.push(s, e);
            }
        }
        out
    }

    /// Presence indicator over `n` samples: true inside any `[start, end)`.
    pub fn presence(&self, n: usize) -> Vec<bool> {
        let mut present = vec![false; n];
        for (s, e) in self.iter() {
            let e = e.min(n);
            if s < e {
                present[s..e].iter_mut().for_each(|p| *p = true);
            }
        }
        present
    }

    /// Maximal runs of `true` as `[start, end)` intervals.
    ///
    /// A run reaching the last sample ends at `present.len()`.
    pub fn from_presence(present: &[bool]) -> Self {
        let mut out = Self::new();
        let mut start = None;
        for (i, &p) in present.iter().enumerate() {
            match (start, p) {
                (None, true) => start = Some(i),
                (Some(s), false) => {
                    out.push(s, i);
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            out.push(s, present.len());
        }
        out
    }

    /// Union of the intervals as disjoint, non-touching, sorted intervals.
    ///
    /// Overlapping or adjacent intervals fuse. Empty intervals vanish.
    pub fn merge_overlaps(&self, n: usize) -> Self {
        Self::from_presence(&self.presence(n))
    }

    /// Remove intervals whose start lies after their end, logging each one
    /// as an invariant violation.
    pub fn drop_inverted(&self) -> Self {
        let mut out = Self::new();
        for (i, (s, e)) in self.iter().enumerate() {
            if s > e {
                let err = DetectionError::InvariantViolation(format!(
                    "refined interval {} has start {} after end {}",
                    i, s, e
                ));
                warn!("{}; interval dropped", err);
            } else {
                out.push(s, e);
            }
        }
        out
    }

    /// Verify `starts.len() == ends.len()` and `start <= end` everywhere.
    ///
    /// # Errors
    /// `InvariantViolation` describing the first failure.
    pub fn check(&self) -> DetectionResult<()> {
        Self::from_parts(self.starts.clone(), self.ends.clone()).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_rejects_inconsistent_arrays() {
        assert!(IntervalSet::from_parts(vec![1, 2], vec![3]).is_err());
        assert!(IntervalSet::from_parts(vec![5], vec![3]).is_err());
        assert!(IntervalSet::from_parts(vec![3], vec![3]).is_ok());
    }

    #[test]
    fn test_presence_round_trip() {
        let set = IntervalSet::from_pairs(&[(1, 3), (6, 8)]).unwrap();
        let present = set.presence(8);
        assert_eq!(
            present,
            vec![false, true, true, false, false, false, true, true]
        );
        assert_eq!(IntervalSet::from_presence(&present), set);
    }

    #[test]
    fn test_merge_overlaps() {
        let set = IntervalSet::from_pairs(&[(5, 9), (0, 3), (2, 4), (8, 12), (15, 15)]).unwrap();
        let merged = set.merge_overlaps(20);
        assert_eq!(merged, IntervalSet::from_pairs(&[(0, 4), (5, 12)]).unwrap());
    }

    #[test]
    fn test_merge_adjacent_and_covering_last_sample() {
        let set = IntervalSet::from_pairs(&[(0, 2), (2, 5), (7, 10)]).unwrap();
        let merged = set.merge_overlaps(10);
        assert_eq!(merged, IntervalSet::from_pairs(&[(0, 5), (7, 10)]).unwrap());
    }

    #[test]
    fn test_drop_inverted() {
        let set = IntervalSet::from_unchecked(vec![0, 9, 12], vec![4, 7, 15]);
        assert!(set.check().is_err());
        let clean = set.drop_inverted();
        assert_eq!(clean, IntervalSet::from_pairs(&[(0, 4), (12, 15)]).unwrap());
    }

    #[test]
    fn test_filtered() {
        let set = IntervalSet::from_pairs(&[(0, 1), (2, 6), (7, 8)]).unwrap();
        let long = set.filtered(|s, e| e - s >= 2);
        assert_eq!(long.starts(), &[2]);
        assert_eq!(long.ends(), &[6]);
    }
}
