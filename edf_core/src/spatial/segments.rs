//! Contiguous batch groups.

use core::ops::Range;

use crate::error::{EdfCoreError, Result};

/// Contiguous runs of equal batch ids in a non-decreasing batch vector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchSegments {
    groups: Vec<(i64, Range<usize>)>,
}

impl BatchSegments {
    /// Split a batch vector into runs, rejecting decreasing ids.
    pub fn from_batch(batch: &[i64]) -> Result<Self> {
        let mut groups: Vec<(i64, Range<usize>)> = Vec::new();
        for (i, &b) in batch.iter().enumerate() {
            match groups.last_mut() {
                Some((id, range)) if *id == b => range.end = i + 1,
                Some((id, _)) if *id > b => {
                    return Err(EdfCoreError::NonMonotonicBatch { position: i })
                }
                _ => groups.push((b, i..i + 1)),
            }
        }
        Ok(Self { groups })
    }

    /// `(batch id, index range)` per group, in order.
    #[inline]
    pub fn groups(&self) -> &[(i64, Range<usize>)] {
        &self.groups
    }

    /// Number of groups.
    #[inline]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Index range of batch `id`, if present.
    pub fn find(&self, id: i64) -> Option<Range<usize>> {
        self.groups
            .binary_search_by_key(&id, |(b, _)| *b)
            .ok()
            .map(|i| self.groups[i].1.clone())
    }
}
