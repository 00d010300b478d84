//! # Regionalloc: Free-List Sub-Allocator for Linear Blocks
//!
//! Regionalloc carves many small, aligned regions out of large fixed-size blocks of a
//! linearly addressable resource (a GPU heap, a mapped buffer, a file...). It never touches
//! the resource itself: it only hands out and takes back `[offset, offset + size)` ranges.
//!
//! ## Architecture
//!
//! Each block is managed by one [`RegionAllocator`]:
//! - **Ledger**: the offset-ordered list of every region of the block, free or allocated,
//!   with no gaps and no overlaps. Two free regions are never adjacent.
//! - **Free-size index**: free regions sorted by size, searched with a binary search
//!   for the smallest region that could hold a request.
//!
//! ```text
//!   offset 0                                                   total_size
//!   +-----------+--------------+------+----------+-------------------+
//!   |   used    |     free     | used |   used   |       free        |
//!   +-----------+--------------+------+----------+-------------------+
//!                      |                                   |
//!   free-size index: [ 96 ] -------------------------- [ 384 ]
//! ```
//!
//! Running out of space is not an error: `try_allocate` returns `Ok(None)` and the owner
//! of the blocks decides whether to create another one. Allocators are not synchronized.
//!
//! ## Usage
//!
//! ```rust
//! use regionalloc::{DefaultRegionAllocator, RegionAllocator};
//!
//! let mut allocator = DefaultRegionAllocator::new(1024, false).unwrap();
//!
//! let a = allocator.try_allocate(128, 16).unwrap().unwrap();
//! let b = allocator.try_allocate(128, 16).unwrap().unwrap();
//! assert_eq!((a.offset(), b.offset()), (0, 128));
//!
//! allocator.free(&a).unwrap();
//! allocator.free(&b).unwrap();
//! assert_eq!(allocator.total_free_size(), 1024);
//! assert_eq!(allocator.count(), 1);
//! ```
//!
//! ## Features
//!
//! - `validation`: keep `validate()` in release builds (it is always present with
//!   debug assertions).
//! - `heavy-validation`: assert `validate()` after every mutation. Run the test suite with
//!   `--features heavy-validation` to check the invariants after every step of every test.
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]

extern crate alloc;

mod allocator;
mod config;
mod error;
mod free_list;
mod index;
mod ledger;
mod region;
mod stats;
mod utils;

pub use allocator::{AllocatorFactory, AllocatorStrategy, RegionAllocator, create_allocator};
pub use config::{AllocatorConfig, DEFAULT_ALIGNMENT, DEFAULT_MIN_INDEXED_FREE_SIZE};
pub use error::{AllocError, Result, ValidationError};
pub use free_list::DefaultRegionAllocator;
pub use region::{AllocatorId, Region, RegionInfo};
pub use stats::{DetailedStatistics, Statistics};
