//! Index-based multi-selection over the current artifact list.
//!
//! Used for both the editor's favorites and the download screen's batch
//! selection. The set remembers the artifact count it was built for, so a
//! toggle can never record an index the list doesn't have. When the
//! artifact list changes (regeneration), call [`SelectionSet::reset`]: the
//! set is emptied rather than left pointing at indices that no longer mean
//! anything.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ordered set of selected indices within `[0, len)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSelection")]
pub struct SelectionSet {
    len: usize,
    selected: BTreeSet<usize>,
}

#[derive(Deserialize)]
struct RawSelection {
    len: usize,
    selected: BTreeSet<usize>,
}

impl TryFrom<RawSelection> for SelectionSet {
    type Error = String;

    fn try_from(raw: RawSelection) -> Result<Self, Self::Error> {
        if let Some(&max) = raw.selected.last().filter(|&&i| i >= raw.len) {
            return Err(format!("selected index {max} out of range (have {})", raw.len));
        }
        Ok(Self {
            len: raw.len,
            selected: raw.selected,
        })
    }
}

impl SelectionSet {
    /// Empty selection over `len` items.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            selected: BTreeSet::new(),
        }
    }

    /// Selection over `len` items with only the first one selected.
    ///
    /// This is the download screen's default. An empty list yields an
    /// empty selection.
    pub fn first_of(len: usize) -> Self {
        let mut set = Self::new(len);
        if len > 0 {
            set.selected.insert(0);
        }
        set
    }

    /// Flip the membership of `index`.
    ///
    /// Returns `false` (and changes nothing) when `index` is out of range.
    pub fn toggle(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        if !self.selected.remove(&index) {
            self.selected.insert(index);
        }
        true
    }

    /// Select every index in `[0, n)`, adopting `n` as the new item count.
    pub fn select_all(&mut self, n: usize) {
        self.len = n;
        self.selected = (0..n).collect();
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Forget the selection and rebind to a list of `len` items.
    pub fn reset(&mut self, len: usize) {
        self.len = len;
        self.selected.clear();
    }

    pub fn contains(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Number of selected indices.
    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Item count the selection is bound to.
    pub fn capacity(&self) -> usize {
        self.len
    }

    /// Selected indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }
}
