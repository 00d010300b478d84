//! Free-list region allocator
//!
//! The block is described by a ledger of contiguous regions, each either free or
//! allocated. Free regions are additionally kept in a size-sorted index, which turns
//! the search for a fitting region into a binary search followed by a short scan.
//!
//! ```text
//!   ledger:  [ free 0..128 ][ used 128..256 ][ free 256..1024 ]
//!                  ^                                ^
//!   index:         +---- 128 ----------------- 768 -+
//! ```
//!
//! Allocation carves the winning free region into up to three parts
//! (padding before, the allocation, padding after). Freeing flips a region back to free
//! and immediately merges it with its free neighbours, so two free regions are never
//! adjacent.

use alloc::boxed::Box;

use crate::allocator::RegionAllocator;
use crate::config::AllocatorConfig;
use crate::error::{AllocError, Result};
use crate::index::FreeSizeIndex;
use crate::ledger::{Ledger, Node};
use crate::region::{AllocatorId, Region, RegionInfo};
use crate::stats::{DetailedStatistics, Statistics};
use crate::utils::align_up;

/// Size-sorted free-list allocator over a single block
#[derive(Debug)]
pub struct DefaultRegionAllocator {
    id: AllocatorId,
    total_size: u64,
    /// Reserved for exactly one allocation spanning the whole block
    dedicated: bool,
    config: AllocatorConfig,
    ledger: Ledger,
    index: FreeSizeIndex,
    /// Number of free regions in the ledger
    free_count: usize,
    /// Sum of the sizes of the free regions
    free_bytes: u64,
}

impl DefaultRegionAllocator {
    /// Create an allocator with the default configuration
    ///
    /// ## Errors
    ///
    /// - `AllocError::InvalidSize` if `total_size` is zero
    pub fn new(total_size: u64, dedicated: bool) -> Result<Self> {
        Self::with_config(total_size, dedicated, AllocatorConfig::new())
    }

    /// Create an allocator with the given configuration
    ///
    /// ## Errors
    ///
    /// - `AllocError::InvalidSize` if `total_size` is zero
    /// - `AllocError::InvalidAlignment` if the configured default alignment is not a power of two
    pub fn with_config(total_size: u64, dedicated: bool, config: AllocatorConfig) -> Result<Self> {
        if total_size == 0 {
            return Err(AllocError::InvalidSize);
        }
        config.validate()?;

        // A block smaller than the threshold would otherwise never be searchable
        let threshold = config.min_indexed_free_size().min(total_size);

        let mut allocator = Self {
            id: AllocatorId::next(),
            total_size,
            dedicated,
            config,
            ledger: Ledger::new(total_size),
            index: FreeSizeIndex::new(threshold),
            free_count: 0,
            free_bytes: 0,
        };
        allocator.reset();

        log::debug!(
            "Region allocator {} created over {} bytes (dedicated: {})",
            allocator.id.as_u64(),
            total_size,
            dedicated
        );
        Ok(allocator)
    }

    #[must_use]
    #[inline]
    pub const fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    fn reset(&mut self) {
        self.ledger.reset(self.total_size);
        self.index.clear();
        if let Some(head) = self.ledger.head() {
            self.index.register(&self.ledger, head);
        }
        self.free_count = 1;
        self.free_bytes = self.total_size;
    }

    /// Margin actually applied around allocations
    #[inline]
    const fn margin(&self) -> u64 {
        if self.dedicated { 0 } else { self.config.margin() }
    }

    /// Offset at which `size` bytes aligned to `alignment` fit inside the free region
    /// at `candidate`, if they do.
    fn check_fit(&self, candidate: u32, size: u64, alignment: u64) -> Option<u64> {
        let node = self.ledger.get(candidate);
        debug_assert!(node.is_free());

        let margin = self.margin();
        let offset = align_up(node.offset.checked_add(margin)?, alignment)?;
        let padding_begin = offset - node.offset;
        let needed = padding_begin.checked_add(size)?.checked_add(margin)?;

        (needed <= node.size).then_some(offset)
    }

    /// Turn the free region at `candidate` into an allocation at `offset`,
    /// splitting off free padding on either side.
    fn commit(&mut self, candidate: u32, offset: u64, size: u64, alignment: u64) -> Region {
        self.index.unregister(&self.ledger, candidate);

        let (base, candidate_size) = {
            let node = self.ledger.get(candidate);
            (node.offset, node.size)
        };
        let padding_begin = offset - base;
        let padding_end = candidate_size - padding_begin - size;

        {
            let node = self.ledger.get_mut(candidate);
            node.offset = offset;
            node.size = size;
            node.alignment = alignment;
            node.is_allocated = true;
        }
        let node_id = self.ledger.renew(candidate);
        self.free_count -= 1;
        self.free_bytes -= size;

        if padding_begin > 0 {
            let before = self
                .ledger
                .insert_before(candidate, Node::free(base, padding_begin));
            self.index.register(&self.ledger, before);
            self.free_count += 1;
        }
        if padding_end > 0 {
            let after = self
                .ledger
                .insert_after(candidate, Node::free(offset + size, padding_end));
            self.index.register(&self.ledger, after);
            self.free_count += 1;
        }

        Region::new(self.id, node_id, offset, size, alignment)
    }

    /// A dedicated allocator hands out the whole block, unsplit, exactly once.
    fn allocate_dedicated(&mut self, size: u64, alignment: u64) -> Option<Region> {
        let head = self.ledger.head()?;
        let node = self.ledger.get(head);
        if node.is_allocated || size > node.size {
            return None;
        }
        debug_assert_eq!(self.ledger.len(), 1);

        self.index.unregister(&self.ledger, head);
        let node = self.ledger.get_mut(head);
        node.alignment = alignment;
        node.is_allocated = true;
        let node_id = self.ledger.renew(head);
        self.free_count = 0;
        self.free_bytes = 0;

        Some(Region::new(self.id, node_id, 0, self.total_size, alignment))
    }

    /// Absorb the free neighbours of the (free) region at `index` into it.
    fn merge_neighbours(&mut self, index: u32) {
        let prev = self
            .ledger
            .get(index)
            .prev
            .filter(|&prev| self.ledger.get(prev).is_free());
        if let Some(prev) = prev {
            self.index.unregister(&self.ledger, prev);
            let absorbed = self.ledger.remove(prev);
            let node = self.ledger.get_mut(index);
            node.offset = absorbed.offset;
            node.size += absorbed.size;
            self.free_count -= 1;
        }

        let next = self
            .ledger
            .get(index)
            .next
            .filter(|&next| self.ledger.get(next).is_free());
        if let Some(next) = next {
            self.index.unregister(&self.ledger, next);
            let absorbed = self.ledger.remove(next);
            self.ledger.get_mut(index).size += absorbed.size;
            self.free_count -= 1;
        }
    }

    /// Outcome of a free that did not match an allocated region
    fn reject_free(&self, region: &Region, error: AllocError) -> Result<()> {
        if self.config.strict_free() {
            Err(error)
        } else {
            log::warn!(
                "Ignoring free of region at offset {} in allocator {}: {}",
                region.offset(),
                self.id.as_u64(),
                error
            );
            Ok(())
        }
    }

    #[inline]
    fn heavy_validate(&self) {
        #[cfg(feature = "heavy-validation")]
        {
            let result = self.validate();
            assert!(result.is_ok(), "region allocator corrupted: {result:?}");
        }
    }
}

impl RegionAllocator for DefaultRegionAllocator {
    #[inline]
    fn id(&self) -> AllocatorId {
        self.id
    }

    #[inline]
    fn total_size(&self) -> u64 {
        self.total_size
    }

    #[inline]
    fn is_dedicated(&self) -> bool {
        self.dedicated
    }

    fn clear(&mut self) {
        debug_assert!(self.is_empty(), "clearing an allocator with live regions");
        self.reset();
        log::debug!("Region allocator {} cleared", self.id.as_u64());
        self.heavy_validate();
    }

    fn try_allocate(&mut self, size: u64, alignment: u64) -> Result<Option<Region>> {
        if size == 0 {
            return Err(AllocError::InvalidSize);
        }
        let alignment = self.config.effective_alignment(alignment)?;

        let region = if self.dedicated {
            self.allocate_dedicated(size, alignment)
        } else {
            let fit = size
                .checked_add(self.margin().saturating_mul(2))
                .filter(|&request| request <= self.free_bytes)
                .and_then(|request| {
                    self.index
                        .candidates(&self.ledger, request)
                        .iter()
                        .find_map(|&candidate| {
                            self.check_fit(candidate, size, alignment)
                                .map(|offset| (candidate, offset))
                        })
                });
            fit.map(|(candidate, offset)| self.commit(candidate, offset, size, alignment))
        };

        match region {
            Some(region) => {
                log::trace!(
                    "Allocated {} bytes at offset {} (alignment {}) in allocator {}",
                    region.size(),
                    region.offset(),
                    alignment,
                    self.id.as_u64()
                );
                self.heavy_validate();
                Ok(Some(region))
            }
            None => {
                log::debug!(
                    "Allocator {} cannot fit {} bytes (alignment {}), {} bytes free",
                    self.id.as_u64(),
                    size,
                    alignment,
                    self.free_bytes
                );
                Ok(None)
            }
        }
    }

    fn free(&mut self, region: &Region) -> Result<()> {
        if region.owner() != self.id {
            return self.reject_free(region, AllocError::ForeignRegion);
        }
        let Some(index) = self.ledger.resolve(region.node()) else {
            return self.reject_free(region, AllocError::UnknownRegion);
        };

        let node = self.ledger.get(index);
        if node.is_free() {
            return self.reject_free(region, AllocError::DoubleFree);
        }
        if node.offset != region.offset() || node.size != region.size() {
            return self.reject_free(region, AllocError::UnknownRegion);
        }

        let node = self.ledger.get_mut(index);
        node.is_allocated = false;
        node.alignment = 1;
        self.free_count += 1;
        self.free_bytes += region.size();

        self.merge_neighbours(index);
        self.index.register(&self.ledger, index);

        log::trace!(
            "Freed {} bytes at offset {} in allocator {}",
            region.size(),
            region.offset(),
            self.id.as_u64()
        );
        self.heavy_validate();
        Ok(())
    }

    #[inline]
    fn count(&self) -> usize {
        self.ledger.len()
    }

    #[inline]
    fn allocated_region_count(&self) -> usize {
        self.ledger.len() - self.free_count
    }

    #[inline]
    fn total_free_size(&self) -> u64 {
        self.free_bytes
    }

    #[inline]
    fn largest_free_region_size(&self) -> u64 {
        self.index.largest(&self.ledger)
    }

    fn region_info(&self, region: &Region) -> Option<RegionInfo> {
        if region.owner() != self.id {
            return None;
        }
        let node = self.ledger.get(self.ledger.resolve(region.node())?);
        node.is_allocated.then(|| node.info())
    }

    fn regions(&self) -> Box<dyn Iterator<Item = RegionInfo> + '_> {
        Box::new(self.ledger.iter().map(|(_, node)| node.info()))
    }

    fn add_statistics(&self, stats: &mut Statistics) {
        stats.block_count += 1;
        stats.block_bytes += self.total_size;
        stats.allocation_count += self.allocated_region_count();
        stats.allocation_bytes += self.total_size - self.free_bytes;
    }

    fn add_detailed_statistics(&self, stats: &mut DetailedStatistics) {
        stats.statistics.block_count += 1;
        stats.statistics.block_bytes += self.total_size;
        for (_, node) in self.ledger.iter() {
            if node.is_allocated {
                stats.add_allocation(node.size);
            } else {
                stats.add_unused_range(node.size);
            }
        }
    }

    #[cfg(any(test, debug_assertions, feature = "validation"))]
    fn validate(&self) -> core::result::Result<(), crate::ValidationError> {
        self.validate_ledger()?;
        self.index.validate(&self.ledger)
    }
}

#[cfg(any(test, debug_assertions, feature = "validation"))]
impl DefaultRegionAllocator {
    /// Walk the ledger once, checking layout invariants and the running counters.
    fn validate_ledger(&self) -> core::result::Result<(), crate::ValidationError> {
        use crate::ValidationError;
        use crate::utils::is_aligned;

        let margin = self.margin();
        let single = self.ledger.len() == 1;

        let mut expected_offset = 0;
        let mut prev_index = None;
        let mut prev_free = false;
        let mut free_count = 0;
        let mut free_bytes = 0;
        let mut indexed = 0;

        for (index, node) in self.ledger.iter() {
            let offset = node.offset;
            if node.prev != prev_index {
                return Err(ValidationError::BrokenLink { offset });
            }
            if offset != expected_offset {
                return Err(ValidationError::NotContiguous {
                    offset,
                    expected: expected_offset,
                });
            }
            if node.size == 0 {
                return Err(ValidationError::EmptyRegion { offset });
            }

            if node.is_free() {
                if prev_free {
                    return Err(ValidationError::AdjacentFree { offset });
                }
                if !single && node.size < margin {
                    return Err(ValidationError::FreeBelowMargin { offset });
                }
                free_count += 1;
                free_bytes += node.size;
                if self.index.is_eligible(node.size) {
                    if !self.index.contains(&self.ledger, index) {
                        return Err(ValidationError::NotIndexed { offset });
                    }
                    indexed += 1;
                }
            } else {
                if !is_aligned(offset, node.alignment) {
                    return Err(ValidationError::Misaligned { offset });
                }
                if margin > 0 && !prev_free {
                    return Err(ValidationError::MissingMargin { offset });
                }
            }

            prev_free = node.is_free();
            prev_index = Some(index);
            expected_offset = node.end();
        }

        if self.ledger.tail() != prev_index {
            return Err(ValidationError::BrokenLink {
                offset: expected_offset,
            });
        }
        if expected_offset != self.total_size {
            return Err(ValidationError::SizeMismatch {
                covered: expected_offset,
                total: self.total_size,
            });
        }
        if free_count != self.free_count {
            return Err(ValidationError::FreeCount {
                actual: free_count,
                recorded: self.free_count,
            });
        }
        if free_bytes != self.free_bytes {
            return Err(ValidationError::FreeBytes {
                actual: free_bytes,
                recorded: self.free_bytes,
            });
        }
        if indexed != self.index.len() {
            return Err(ValidationError::IndexedCount {
                actual: indexed,
                recorded: self.index.len(),
            });
        }
        Ok(())
    }
}
