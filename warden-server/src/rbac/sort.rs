//! Sibling ordering
//!
//! `sort` values inside one sibling group are kept dense: `0..n`.
//! Every mutation of a group is expressed as one [`SortShift`] over a
//! contiguous range followed by at most one direct assignment.

use std::ops::RangeInclusive;

/// Shift applied to every sibling whose `sort` falls inside `range`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortShift {
    pub range: RangeInclusive<i32>,
    pub delta: i32,
}

impl SortShift {
    /// Shift needed to move one node from `old` to `new`.
    ///
    /// Moving down decrements `old < sort <= new`, moving up increments
    /// `new <= sort < old`. `None` when the node stays in place.
    pub fn for_move(old: i32, new: i32) -> Option<Self> {
        match new.cmp(&old) {
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some(Self {
                range: (old + 1)..=new,
                delta: -1,
            }),
            std::cmp::Ordering::Less => Some(Self {
                range: new..=(old - 1),
                delta: 1,
            }),
        }
    }

    /// Shift closing the gap left by removing the node at `removed`.
    pub fn for_removal(removed: i32) -> Self {
        Self {
            range: (removed + 1)..=i32::MAX,
            delta: -1,
        }
    }

    pub fn lo(&self) -> i32 {
        *self.range.start()
    }

    pub fn hi(&self) -> i32 {
        *self.range.end()
    }

    /// New value for `sort` under this shift
    pub fn apply(&self, sort: i32) -> i32 {
        if self.range.contains(&sort) {
            sort + self.delta
        } else {
            sort
        }
    }
}

/// Position for a node appended to a group whose current maximum is `max`
pub fn next_sort(max: Option<i32>) -> i32 {
    max.map_or(0, |m| m + 1)
}

/// Keep a requested position inside a group of `sibling_count` nodes (the moving node included)
pub fn clamp_target(requested: i32, sibling_count: usize) -> i32 {
    let last = i32::try_from(sibling_count.saturating_sub(1)).unwrap_or(i32::MAX);
    requested.clamp(0, last)
}

/// True when `sorts` is exactly `0..n` in some order
pub fn is_dense(sorts: impl IntoIterator<Item = i32>) -> bool {
    let mut sorts: Vec<i32> = sorts.into_iter().collect();
    sorts.sort_unstable();
    sorts.iter().enumerate().all(|(i, s)| i32::try_from(i) == Ok(*s))
}
