//! Free-size index
//!
//! A side index over the ledger holding the free regions that are worth searching,
//! sorted by ascending size. Free regions below the indexing threshold stay in the
//! ledger but are only ever reached through coalescing.

use alloc::vec::Vec;

use crate::ledger::Ledger;

/// Ledger slot indices of indexed free regions, sorted by ascending size
#[derive(Debug)]
pub(crate) struct FreeSizeIndex {
    entries: Vec<u32>,
    /// Minimum size for a free region to be indexed
    threshold: u64,
}

impl FreeSizeIndex {
    #[must_use]
    pub const fn new(threshold: u64) -> Self {
        Self {
            entries: Vec::new(),
            threshold,
        }
    }

    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    #[inline]
    pub const fn is_eligible(&self, size: u64) -> bool {
        size >= self.threshold
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Position of the first entry whose size is not less than `size`.
    #[must_use]
    pub fn lower_bound(&self, ledger: &Ledger, size: u64) -> usize {
        self.entries
            .partition_point(|&index| ledger.get(index).size < size)
    }

    /// Entries of size `size` or more, smallest first.
    #[must_use]
    pub fn candidates(&self, ledger: &Ledger, size: u64) -> &[u32] {
        &self.entries[self.lower_bound(ledger, size)..]
    }

    /// Size of the largest indexed free region, 0 if there is none.
    #[must_use]
    pub fn largest(&self, ledger: &Ledger) -> u64 {
        self.entries
            .last()
            .map_or(0, |&index| ledger.get(index).size)
    }

    /// Index the free region at `index` if it is large enough.
    pub fn register(&mut self, ledger: &Ledger, index: u32) {
        let node = ledger.get(index);
        debug_assert!(node.is_free());
        if !self.is_eligible(node.size) {
            return;
        }

        let position = self.lower_bound(ledger, node.size);
        self.entries.insert(position, index);
    }

    /// Drop the region at `index` from the index.
    ///
    /// Must be called while the region still has the size it was registered with.
    pub fn unregister(&mut self, ledger: &Ledger, index: u32) {
        if !self.is_eligible(ledger.get(index).size) {
            return;
        }

        match self.position(ledger, index) {
            Some(position) => {
                self.entries.remove(position);
            }
            None => debug_assert!(false, "free region missing from the size index"),
        }
    }

    /// Position of `index` among the entries of its size.
    fn position(&self, ledger: &Ledger, index: u32) -> Option<usize> {
        let size = ledger.get(index).size;
        let start = self.lower_bound(ledger, size);
        self.entries[start..]
            .iter()
            .take_while(|&&entry| ledger.get(entry).size == size)
            .position(|&entry| entry == index)
            .map(|offset| start + offset)
    }

    /// Returns true if the region at `index` is indexed under its current size.
    #[must_use]
    #[cfg(any(test, debug_assertions, feature = "validation"))]
    pub fn contains(&self, ledger: &Ledger, index: u32) -> bool {
        self.position(ledger, index).is_some()
    }

    /// Check ordering and eligibility of every entry.
    ///
    /// ## Errors
    ///
    /// Returns the first inconsistency found.
    #[cfg(any(test, debug_assertions, feature = "validation"))]
    pub fn validate(&self, ledger: &Ledger) -> Result<(), crate::ValidationError> {
        use crate::ValidationError;

        let mut previous = 0;
        for (position, &index) in self.entries.iter().enumerate() {
            let node = ledger.get(index);
            if node.is_allocated || !self.is_eligible(node.size) {
                return Err(ValidationError::IndexEntryInvalid { position });
            }
            if node.size < previous {
                return Err(ValidationError::IndexUnsorted { position });
            }
            previous = node.size;
        }
        Ok(())
    }
}
