//! Statistics surface
//!
//! Allocators only ever *add* themselves to a running total, so the owner of many
//! allocators can roll them all up into one report.

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Coarse usage numbers.
pub struct Statistics {
    /// Number of backing blocks (one per allocator)
    pub block_count: usize,
    /// Number of allocated regions
    pub allocation_count: usize,
    /// Total bytes of the backing blocks
    pub block_bytes: u64,
    /// Total bytes of the allocated regions
    pub allocation_bytes: u64,
}

impl Statistics {
    /// Merge `other` into `self`.
    pub const fn add(&mut self, other: &Self) {
        self.block_count += other.block_count;
        self.allocation_count += other.allocation_count;
        self.block_bytes += other.block_bytes;
        self.allocation_bytes += other.allocation_bytes;
    }

    #[must_use]
    #[inline]
    /// Bytes of the backing blocks not covered by any allocation.
    pub const fn unused_bytes(&self) -> u64 {
        self.block_bytes - self.allocation_bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Usage numbers including per-region extremes.
pub struct DetailedStatistics {
    pub statistics: Statistics,
    /// Number of free regions
    pub unused_range_count: usize,
    /// Smallest allocated region, `u64::MAX` if there is none
    pub allocation_size_min: u64,
    /// Largest allocated region, 0 if there is none
    pub allocation_size_max: u64,
    /// Smallest free region, `u64::MAX` if there is none
    pub unused_range_size_min: u64,
    /// Largest free region, 0 if there is none
    pub unused_range_size_max: u64,
}

impl Default for DetailedStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailedStatistics {
    #[must_use]
    #[inline]
    pub const fn new() -> Self {
        Self {
            statistics: Statistics {
                block_count: 0,
                allocation_count: 0,
                block_bytes: 0,
                allocation_bytes: 0,
            },
            unused_range_count: 0,
            allocation_size_min: u64::MAX,
            allocation_size_max: 0,
            unused_range_size_min: u64::MAX,
            unused_range_size_max: 0,
        }
    }

    /// Record one allocated region.
    pub fn add_allocation(&mut self, size: u64) {
        self.statistics.allocation_count += 1;
        self.statistics.allocation_bytes += size;
        self.allocation_size_min = self.allocation_size_min.min(size);
        self.allocation_size_max = self.allocation_size_max.max(size);
    }

    /// Record one free region.
    pub fn add_unused_range(&mut self, size: u64) {
        self.unused_range_count += 1;
        self.unused_range_size_min = self.unused_range_size_min.min(size);
        self.unused_range_size_max = self.unused_range_size_max.max(size);
    }

    /// Merge `other` into `self`.
    pub fn add(&mut self, other: &Self) {
        self.statistics.add(&other.statistics);
        self.unused_range_count += other.unused_range_count;
        self.allocation_size_min = self.allocation_size_min.min(other.allocation_size_min);
        self.allocation_size_max = self.allocation_size_max.max(other.allocation_size_max);
        self.unused_range_size_min = self.unused_range_size_min.min(other.unused_range_size_min);
        self.unused_range_size_max = self.unused_range_size_max.max(other.unused_range_size_max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_add() {
        let mut total = Statistics::default();
        let block = Statistics {
            block_count: 1,
            allocation_count: 3,
            block_bytes: 1024,
            allocation_bytes: 384,
        };
        total.add(&block);
        total.add(&block);

        assert_eq!(total.block_count, 2);
        assert_eq!(total.allocation_count, 6);
        assert_eq!(total.block_bytes, 2048);
        assert_eq!(total.unused_bytes(), 2048 - 768);
    }

    #[test]
    fn test_detailed_extremes() {
        let mut a = DetailedStatistics::new();
        a.add_allocation(128);
        a.add_allocation(32);
        a.add_unused_range(512);

        let mut b = DetailedStatistics::new();
        b.add_allocation(4096);
        b.add_unused_range(16);

        a.add(&b);
        assert_eq!(a.statistics.allocation_count, 3);
        assert_eq!(a.statistics.allocation_bytes, 128 + 32 + 4096);
        assert_eq!(a.allocation_size_min, 32);
        assert_eq!(a.allocation_size_max, 4096);
        assert_eq!(a.unused_range_count, 2);
        assert_eq!(a.unused_range_size_min, 16);
        assert_eq!(a.unused_range_size_max, 512);
    }

    #[test]
    fn test_empty_detailed_merge_is_neutral() {
        let mut a = DetailedStatistics::new();
        a.add_allocation(64);
        let before = a;
        a.add(&DetailedStatistics::default());
        assert_eq!(a, before);
    }
}
