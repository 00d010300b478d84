//! Per-allocator policy knobs

use crate::error::{AllocError, Result};

/// Free regions smaller than this are not worth searching by default
pub const DEFAULT_MIN_INDEXED_FREE_SIZE: u64 = 16;

/// Alignment substituted for a requested alignment of 0 by default
pub const DEFAULT_ALIGNMENT: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Configuration of a single region allocator.
///
/// ```rust
/// use regionalloc::AllocatorConfig;
///
/// let config = AllocatorConfig::new()
///     .with_margin(16)
///     .with_default_alignment(256)
///     .with_strict_free(true);
/// assert!(config.validate().is_ok());
/// ```
pub struct AllocatorConfig {
    /// Gap kept free before and after every allocated region
    margin: u64,
    /// Minimum size for a free region to be registered in the free-size index
    min_indexed_free_size: u64,
    /// Alignment used when a request asks for alignment 0
    default_alignment: u64,
    /// Report no-op frees as errors instead of ignoring them
    strict_free: bool,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocatorConfig {
    #[must_use]
    #[inline]
    pub const fn new() -> Self {
        Self {
            margin: 0,
            min_indexed_free_size: DEFAULT_MIN_INDEXED_FREE_SIZE,
            default_alignment: DEFAULT_ALIGNMENT,
            strict_free: false,
        }
    }

    #[must_use]
    #[inline]
    pub const fn with_margin(mut self, margin: u64) -> Self {
        self.margin = margin;
        self
    }

    #[must_use]
    #[inline]
    pub const fn with_min_indexed_free_size(mut self, size: u64) -> Self {
        self.min_indexed_free_size = size;
        self
    }

    #[must_use]
    #[inline]
    pub const fn with_default_alignment(mut self, alignment: u64) -> Self {
        self.default_alignment = alignment;
        self
    }

    #[must_use]
    #[inline]
    pub const fn with_strict_free(mut self, strict: bool) -> Self {
        self.strict_free = strict;
        self
    }

    #[must_use]
    #[inline]
    pub const fn margin(&self) -> u64 {
        self.margin
    }

    #[must_use]
    #[inline]
    pub const fn min_indexed_free_size(&self) -> u64 {
        self.min_indexed_free_size
    }

    #[must_use]
    #[inline]
    pub const fn default_alignment(&self) -> u64 {
        self.default_alignment
    }

    #[must_use]
    #[inline]
    pub const fn strict_free(&self) -> bool {
        self.strict_free
    }

    /// Check that the configuration is usable.
    ///
    /// ## Errors
    ///
    /// - `AllocError::InvalidAlignment` if the default alignment is not a power of two
    pub const fn validate(&self) -> Result<()> {
        if self.default_alignment.is_power_of_two() {
            Ok(())
        } else {
            Err(AllocError::InvalidAlignment)
        }
    }

    /// Resolve the alignment of a request, substituting the default for 0.
    ///
    /// ## Errors
    ///
    /// - `AllocError::InvalidAlignment` if `alignment` is neither 0 nor a power of two
    pub(crate) const fn effective_alignment(&self, alignment: u64) -> Result<u64> {
        if alignment == 0 {
            Ok(self.default_alignment)
        } else if alignment.is_power_of_two() {
            Ok(alignment)
        } else {
            Err(AllocError::InvalidAlignment)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AllocatorConfig::default();
        assert_eq!(config.margin(), 0);
        assert_eq!(config.min_indexed_free_size(), DEFAULT_MIN_INDEXED_FREE_SIZE);
        assert_eq!(config.default_alignment(), DEFAULT_ALIGNMENT);
        assert!(!config.strict_free());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_default_alignment() {
        let config = AllocatorConfig::new().with_default_alignment(24);
        assert_eq!(config.validate(), Err(AllocError::InvalidAlignment));
        let config = AllocatorConfig::new().with_default_alignment(0);
        assert_eq!(config.validate(), Err(AllocError::InvalidAlignment));
    }

    #[test]
    fn test_effective_alignment() {
        let config = AllocatorConfig::new().with_default_alignment(64);
        assert_eq!(config.effective_alignment(0), Ok(64));
        assert_eq!(config.effective_alignment(1), Ok(1));
        assert_eq!(config.effective_alignment(4096), Ok(4096));
        assert_eq!(
            config.effective_alignment(3),
            Err(AllocError::InvalidAlignment)
        );
    }
}
