//! Allocator interface and strategy selection
//!
//! The owner of a backing block only ever talks to a `dyn RegionAllocator`; which
//! strategy sits behind it is decided once, at creation time.

use alloc::boxed::Box;

use crate::config::AllocatorConfig;
use crate::error::Result;
use crate::free_list::DefaultRegionAllocator;
use crate::region::{AllocatorId, Region, RegionInfo};
use crate::stats::{DetailedStatistics, Statistics};

/// Sub-allocates one fixed-size linear block.
///
/// Implementations are not synchronized: callers sharing an allocator between threads
/// must provide their own mutual exclusion.
pub trait RegionAllocator: core::fmt::Debug + Send {
    /// Identifier stamped on every region this allocator hands out
    fn id(&self) -> AllocatorId;

    /// Size of the managed block in bytes
    fn total_size(&self) -> u64;

    /// Whether the allocator is reserved for exactly one allocation
    fn is_dedicated(&self) -> bool;

    /// Forget every region and go back to a single free region spanning the block.
    ///
    /// No allocated region may be outstanding. Handles issued before the call are
    /// invalidated.
    fn clear(&mut self);

    /// Allocate `size` bytes aligned to `alignment`.
    ///
    /// An `alignment` of 0 selects the configured default alignment.
    /// Returns `Ok(None)` if no free region can hold the request.
    ///
    /// ## Errors
    ///
    /// - `AllocError::InvalidSize` if `size` is zero
    /// - `AllocError::InvalidAlignment` if `alignment` is neither 0 nor a power of two
    fn try_allocate(&mut self, size: u64, alignment: u64) -> Result<Option<Region>>;

    /// Release `region` and merge it with its free neighbours.
    ///
    /// Freeing a region that is unknown, already free or owned by another allocator
    /// leaves the allocator untouched.
    ///
    /// ## Errors
    ///
    /// Only in strict mode (see `AllocatorConfig::with_strict_free`):
    /// - `AllocError::ForeignRegion` if the region comes from another allocator
    /// - `AllocError::UnknownRegion` if the handle does not match any live region
    /// - `AllocError::DoubleFree` if the region is already free
    fn free(&mut self, region: &Region) -> Result<()>;

    /// Number of regions in the ledger, free and allocated
    fn count(&self) -> usize;

    /// Number of allocated regions
    fn allocated_region_count(&self) -> usize;

    /// Returns true if no region is allocated
    fn is_empty(&self) -> bool {
        self.allocated_region_count() == 0
    }

    /// Sum of the sizes of every free region
    fn total_free_size(&self) -> u64;

    /// Size of the largest free region that allocation can reach
    fn largest_free_region_size(&self) -> u64;

    /// Ledger entry behind `region`, if the handle is still live
    fn region_info(&self, region: &Region) -> Option<RegionInfo>;

    /// Every region of the ledger in offset order
    fn regions(&self) -> Box<dyn Iterator<Item = RegionInfo> + '_>;

    /// Add this allocator's block to `stats`.
    fn add_statistics(&self, stats: &mut Statistics);

    /// Add this allocator's block and every one of its regions to `stats`.
    fn add_detailed_statistics(&self, stats: &mut DetailedStatistics);

    /// Check every internal invariant.
    ///
    /// ## Errors
    ///
    /// Returns the first inconsistency found, which always indicates a bug in the allocator.
    #[cfg(any(test, debug_assertions, feature = "validation"))]
    fn validate(&self) -> core::result::Result<(), crate::ValidationError> {
        Ok(())
    }
}

/// Constructor shared by every strategy
pub type AllocatorFactory =
    fn(total_size: u64, dedicated: bool, config: AllocatorConfig) -> Result<Box<dyn RegionAllocator>>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Available allocation strategies
pub enum AllocatorStrategy {
    /// Size-sorted free list with eager coalescing
    #[default]
    FreeList,
}

impl AllocatorStrategy {
    #[must_use]
    pub const fn factory(self) -> AllocatorFactory {
        match self {
            Self::FreeList => create_free_list,
        }
    }
}

fn create_free_list(
    total_size: u64,
    dedicated: bool,
    config: AllocatorConfig,
) -> Result<Box<dyn RegionAllocator>> {
    let allocator = DefaultRegionAllocator::with_config(total_size, dedicated, config)?;
    Ok(Box::new(allocator))
}

/// Create an allocator of the given strategy over a block of `total_size` bytes.
///
/// ## Errors
///
/// - `AllocError::InvalidSize` if `total_size` is zero
/// - `AllocError::InvalidAlignment` if the configured default alignment is not a power of two
pub fn create_allocator(
    strategy: AllocatorStrategy,
    total_size: u64,
    dedicated: bool,
    config: AllocatorConfig,
) -> Result<Box<dyn RegionAllocator>> {
    (strategy.factory())(total_size, dedicated, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AllocError;

    #[test]
    fn test_create_default_strategy() {
        let mut allocator =
            create_allocator(AllocatorStrategy::default(), 4096, false, AllocatorConfig::new())
                .unwrap();

        assert_eq!(allocator.total_size(), 4096);
        assert!(!allocator.is_dedicated());
        assert!(allocator.is_empty());

        let region = allocator.try_allocate(256, 64).unwrap().unwrap();
        assert_eq!(region.owner(), allocator.id());
        assert!(!allocator.is_empty());

        allocator.free(&region).unwrap();
        assert!(allocator.is_empty());
        assert_eq!(allocator.total_free_size(), 4096);
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let zero = create_allocator(AllocatorStrategy::FreeList, 0, false, AllocatorConfig::new());
        assert!(matches!(zero, Err(AllocError::InvalidSize)));

        let config = AllocatorConfig::new().with_default_alignment(12);
        let bad = create_allocator(AllocatorStrategy::FreeList, 64, false, config);
        assert!(matches!(bad, Err(AllocError::InvalidAlignment)));
    }

    /// Never holds anything.
    #[derive(Debug)]
    struct FullAllocator(AllocatorId);

    impl RegionAllocator for FullAllocator {
        fn id(&self) -> AllocatorId {
            self.0
        }

        fn total_size(&self) -> u64 {
            64
        }

        fn is_dedicated(&self) -> bool {
            false
        }

        fn clear(&mut self) {}

        fn try_allocate(&mut self, _size: u64, _alignment: u64) -> Result<Option<Region>> {
            Ok(None)
        }

        fn free(&mut self, _region: &Region) -> Result<()> {
            Ok(())
        }

        fn count(&self) -> usize {
            1
        }

        fn allocated_region_count(&self) -> usize {
            0
        }

        fn total_free_size(&self) -> u64 {
            0
        }

        fn largest_free_region_size(&self) -> u64 {
            0
        }

        fn region_info(&self, _region: &Region) -> Option<RegionInfo> {
            None
        }

        fn regions(&self) -> Box<dyn Iterator<Item = RegionInfo> + '_> {
            Box::new(core::iter::empty())
        }

        fn add_statistics(&self, stats: &mut Statistics) {
            stats.block_count += 1;
        }

        fn add_detailed_statistics(&self, stats: &mut DetailedStatistics) {
            stats.statistics.block_count += 1;
        }
    }

    #[test]
    fn test_validate_has_default() {
        let mut allocator: Box<dyn RegionAllocator> = Box::new(FullAllocator(AllocatorId::next()));
        assert_eq!(allocator.try_allocate(16, 1), Ok(None));
        assert!(allocator.is_empty());
        assert_eq!(allocator.validate(), Ok(()));
    }

    #[test]
    fn test_dyn_debug() {
        let allocator =
            create_allocator(AllocatorStrategy::FreeList, 64, true, AllocatorConfig::new())
                .unwrap();
        let output = format!("{allocator:?}");
        assert!(output.starts_with("DefaultRegionAllocator"));
    }
}
