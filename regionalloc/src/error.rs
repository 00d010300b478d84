use thiserror::Error;

/// Errors that can occur during region allocator operations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Invalid size (must be non-zero)
    #[error("Invalid size (must be non-zero)")]
    InvalidSize,
    /// Invalid alignment (must be power of 2)
    #[error("Invalid alignment (must be power of 2)")]
    InvalidAlignment,
    /// The region was handed out by another allocator
    #[error("Region belongs to another allocator")]
    ForeignRegion,
    /// The region does not match any ledger entry
    #[error("Unknown region")]
    UnknownRegion,
    /// The region has already been freed
    #[error("Double free detected")]
    DoubleFree,
}

pub type Result<T> = core::result::Result<T, AllocError>;

/// Consistency failures reported by `validate`.
///
/// These always point at a bug inside the allocator, never at caller misuse.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Region at offset {offset} should start at {expected}")]
    NotContiguous { offset: u64, expected: u64 },
    #[error("Ledger covers {covered} bytes out of {total}")]
    SizeMismatch { covered: u64, total: u64 },
    #[error("Region at offset {offset} is empty")]
    EmptyRegion { offset: u64 },
    #[error("Adjacent free regions at offset {offset}")]
    AdjacentFree { offset: u64 },
    #[error("Free region at offset {offset} is smaller than the margin")]
    FreeBelowMargin { offset: u64 },
    #[error("Allocated region at offset {offset} is not preceded by a free region")]
    MissingMargin { offset: u64 },
    #[error("Allocated region at offset {offset} is misaligned")]
    Misaligned { offset: u64 },
    #[error("Broken ledger link at offset {offset}")]
    BrokenLink { offset: u64 },
    #[error("Free region count is {actual}, counter says {recorded}")]
    FreeCount { actual: usize, recorded: usize },
    #[error("Free bytes total {actual}, counter says {recorded}")]
    FreeBytes { actual: u64, recorded: u64 },
    #[error("Indexed {actual} free regions, index holds {recorded}")]
    IndexedCount { actual: usize, recorded: usize },
    #[error("Free-size index is not sorted at position {position}")]
    IndexUnsorted { position: usize },
    #[error("Free-size index entry {position} is not an eligible free region")]
    IndexEntryInvalid { position: usize },
    #[error("Free region at offset {offset} is missing from the free-size index")]
    NotIndexed { offset: u64 },
}
