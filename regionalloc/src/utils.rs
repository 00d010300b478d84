/// Align `offset` upwards to `align`.
///
/// Requires that `align` is a power of two.
/// Returns `None` if the aligned offset does not fit in a `u64`.
#[must_use]
#[inline]
pub const fn align_up(offset: u64, align: u64) -> Option<u64> {
    debug_assert!(align.is_power_of_two());
    match offset.checked_add(align - 1) {
        Some(bumped) => Some(bumped & !(align - 1)),
        None => None,
    }
}

/// Returns true if `offset` is a multiple of `align`.
///
/// Requires that `align` is a power of two.
#[must_use]
#[inline]
#[cfg(any(test, debug_assertions, feature = "validation"))]
pub const fn is_aligned(offset: u64, align: u64) -> bool {
    debug_assert!(align.is_power_of_two());
    offset & (align - 1) == 0
}
