/// Checks whether `n` is a multiple of `alignment`.
///
/// ```
/// use aosoa_bytes::align::is_aligned;
///
/// assert!(is_aligned(0, 8));
/// assert!(is_aligned(128, 64));
/// assert!(!is_aligned(65, 64));
/// ```
#[inline]
pub fn is_aligned(n: usize, alignment: usize) -> bool {
    debug_assert!(is_valid_alignment(alignment));
    n & (alignment - 1) == 0
}

/// Checks whether the pointer is aligned to `alignment` bytes.
#[inline]
pub fn is_ptr_aligned(ptr: *const u8, alignment: usize) -> bool {
    is_aligned(ptr as usize, alignment)
}

/// Returns `true` if `alignment` can be used as a storage alignment: a non-zero
/// power of two.
#[inline]
pub fn is_valid_alignment(alignment: usize) -> bool {
    alignment != 0 && alignment.is_power_of_two()
}
