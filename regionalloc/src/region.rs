//! Region value types
//!
//! A [`Region`] is what callers hold on to after a successful allocation. It is a plain
//! value: it names the ledger slot it came from and the allocator that issued it, but it
//! grants no access to the allocator itself.

use core::sync::atomic::{AtomicU64, Ordering};

/// Source of unique allocator identifiers
static NEXT_ALLOCATOR_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Identifies one allocator instance for the lifetime of the process.
pub struct AllocatorId(u64);

impl AllocatorId {
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(NEXT_ALLOCATOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Generation-checked reference to a ledger slot.
pub(crate) struct NodeId {
    pub index: u32,
    pub generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Descriptor of an allocated region.
///
/// Returned by `try_allocate` and handed back to `free`.
pub struct Region {
    /// Allocator that issued this region
    owner: AllocatorId,
    /// Ledger slot backing this region
    node: NodeId,
    /// Byte offset from the start of the backing block
    offset: u64,
    /// Size in bytes
    size: u64,
    /// Alignment guaranteed for `offset`
    alignment: u64,
}

impl Region {
    #[must_use]
    #[inline]
    pub(crate) const fn new(
        owner: AllocatorId,
        node: NodeId,
        offset: u64,
        size: u64,
        alignment: u64,
    ) -> Self {
        Self {
            owner,
            node,
            offset,
            size,
            alignment,
        }
    }

    #[must_use]
    #[inline]
    pub const fn owner(&self) -> AllocatorId {
        self.owner
    }

    #[must_use]
    #[inline]
    pub(crate) const fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    #[inline]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    #[inline]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    #[inline]
    pub const fn alignment(&self) -> u64 {
        self.alignment
    }

    #[must_use]
    #[inline]
    /// Offset one past the last byte of the region.
    pub const fn end(&self) -> u64 {
        self.offset + self.size
    }

    #[must_use]
    #[inline]
    /// Returns true if the two regions share at least one byte.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Snapshot of one ledger entry, free or allocated.
pub struct RegionInfo {
    pub offset: u64,
    pub size: u64,
    /// Alignment guaranteed at allocation time, 1 for free regions
    pub alignment: u64,
    pub is_allocated: bool,
}

impl RegionInfo {
    #[must_use]
    #[inline]
    pub const fn end(&self) -> u64 {
        self.offset + self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(offset: u64, size: u64) -> Region {
        Region::new(
            AllocatorId(0),
            NodeId {
                index: 0,
                generation: 0,
            },
            offset,
            size,
            1,
        )
    }

    #[test]
    fn test_allocator_ids_are_unique() {
        let a = AllocatorId::next();
        let b = AllocatorId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_overlaps() {
        assert!(region(0, 128).overlaps(&region(64, 128)));
        assert!(region(64, 128).overlaps(&region(0, 128)));
        assert!(!region(0, 128).overlaps(&region(128, 64)));
        assert!(!region(256, 8).overlaps(&region(0, 256)));
        assert!(region(0, 1024).overlaps(&region(512, 1)));
    }

    #[test]
    fn test_end() {
        assert_eq!(region(128, 64).end(), 192);
    }
}
