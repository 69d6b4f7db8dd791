//! Binary-search index over a qualifier-sorted column list.
//!
//! Two lookups share one search loop:
//! - **exact**: the column whose qualifier equals the target.
//! - **prefix**: any column whose qualifier starts with `target.`; the hit is
//!   then widened by scanning outward to the full contiguous span of
//!   descendants. Sortedness guarantees the span is contiguous.
//!
//! Cost is O(log n) to find a hit plus O(k) to widen it, where k is the
//! number of descendants (bounded by the nested record's leaf count).

use std::cmp::Ordering;

use crate::error::{CodecError, Result};
use crate::qualifier::descendant_prefix;
use crate::row::Column;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchMode {
    Exact,
    Prefix,
}

/// Read-only view of a sorted column list.
#[derive(Debug, Clone, Copy)]
pub struct ColumnIndex<'a> {
    columns: &'a [Column],
}

impl<'a> ColumnIndex<'a> {
    /// Wrap `columns`, verifying they are strictly ascending by qualifier.
    pub fn new(columns: &'a [Column]) -> Result<Self> {
        if let Some(position) = columns
            .windows(2)
            .position(|pair| pair[0].qualifier >= pair[1].qualifier)
        {
            tracing::warn!(
                position = position + 1,
                "column list is not sorted by qualifier"
            );
            return Err(CodecError::UnsortedColumns {
                position: position + 1,
            });
        }
        Ok(ColumnIndex { columns })
    }

    /// Wrap a slice already known to be sorted, e.g. a sub-range of an
    /// index.
    pub(crate) fn from_sorted(columns: &'a [Column]) -> Self {
        debug_assert!(columns
            .windows(2)
            .all(|pair| pair[0].qualifier < pair[1].qualifier));
        ColumnIndex { columns }
    }

    pub fn columns(&self) -> &'a [Column] {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column whose qualifier equals `qualifier`.
    pub fn exact(&self, qualifier: &[u8]) -> Option<&'a Column> {
        self.search(qualifier, MatchMode::Exact)
            .map(|pos| &self.columns[pos])
    }

    /// Contiguous span of columns whose qualifier starts with `qualifier.`.
    pub fn prefix_range(&self, qualifier: &[u8]) -> Option<&'a [Column]> {
        let prefix = descendant_prefix(qualifier);
        let hit = self.search(&prefix, MatchMode::Prefix)?;

        let mut low = hit;
        while low > 0 && self.columns[low - 1].qualifier.starts_with(&prefix) {
            low -= 1;
        }
        let mut high = hit + 1;
        while high < self.columns.len() && self.columns[high].qualifier.starts_with(&prefix) {
            high += 1;
        }
        Some(&self.columns[low..high])
    }

    /// Sub-index over the span returned by [`prefix_range`](Self::prefix_range).
    pub fn descendants(&self, qualifier: &[u8]) -> Option<ColumnIndex<'a>> {
        self.prefix_range(qualifier).map(ColumnIndex::from_sorted)
    }

    /// One binary search for both modes. In prefix mode `target` is the
    /// dotted prefix; a column starting with it is a hit regardless of how
    /// it orders against the target.
    fn search(&self, target: &[u8], mode: MatchMode) -> Option<usize> {
        let mut low = 0;
        let mut high = self.columns.len();

        while low < high {
            let mid = low + (high - low) / 2;
            let qualifier = self.columns[mid].qualifier.as_slice();

            if mode == MatchMode::Prefix && qualifier.starts_with(target) {
                return Some(mid);
            }
            match qualifier.cmp(target) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => return Some(mid),
            }
        }
        None
    }
}
