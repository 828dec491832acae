use std::collections::TryReserveError;

use crate::align::{is_ptr_aligned, is_valid_alignment};

/// A byte vector whose data start honors a caller-selected alignment.
///
/// The alignment is fixed at construction and preserved across growth. Every
/// operation that may allocate comes in a fallible `try_` form returning
/// [`TryReserveError`]; the infallible forms panic when the allocation cannot be
/// satisfied.
///
/// The vector never hands out uninitialized bytes: newly exposed storage is
/// always filled (zeroes unless stated otherwise).
pub struct AlignedByteVec {
    /// Backing vector. The first `start` bytes are padding that moves the data
    /// start to an aligned address.
    inner: Vec<u8>,
    /// Offset of the aligned data start within `inner`.
    start: u32,
    /// Required alignment, specified during vector creation.
    alignment: u32,
}

impl AlignedByteVec {
    /// Alignment used by the constructors that do not take one explicitly.
    pub const DEFAULT_ALIGNMENT: usize = 64;

    /// Creates a new empty vector with the default alignment and no allocation.
    pub fn new() -> AlignedByteVec {
        Self::with_alignment(Self::DEFAULT_ALIGNMENT)
    }

    /// Creates a new empty vector with the specified alignment and no allocation.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a non-zero power of two.
    pub fn with_alignment(alignment: usize) -> AlignedByteVec {
        assert!(
            is_valid_alignment(alignment) && alignment <= u32::MAX as usize,
            "invalid alignment {alignment}"
        );
        AlignedByteVec {
            inner: Vec::new(),
            start: 0,
            alignment: alignment as u32,
        }
    }

    /// Creates a new vector able to hold `capacity` bytes without reallocating.
    pub fn try_with_capacity_and_alignment(
        capacity: usize,
        alignment: usize,
    ) -> Result<AlignedByteVec, TryReserveError> {
        let mut vec = Self::with_alignment(alignment);
        if capacity != 0 {
            vec.reallocate(capacity)?;
        }
        Ok(vec)
    }

    /// Creates a new vector of `len` zero bytes with the specified alignment.
    pub fn try_zeroed(len: usize, alignment: usize) -> Result<AlignedByteVec, TryReserveError> {
        let mut vec = Self::try_with_capacity_and_alignment(len, alignment)?;
        vec.inner.resize(vec.start_offset() + len, 0);
        Ok(vec)
    }

    /// Returns the number of bytes in the vector.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len() - self.start_offset()
    }

    /// Returns true if the vector contains no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of bytes the vector can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity() - self.start_offset()
    }

    /// Returns the alignment of the data start.
    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment as usize
    }

    /// Returns a raw pointer to the first data byte.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.as_slice().as_ptr()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.inner[self.start_offset()..]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let start = self.start_offset();
        &mut self.inner[start..]
    }

    /// Ensures that at least `additional` more bytes fit without reallocating.
    ///
    /// On failure the vector is left unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        if self.capacity() - self.len() >= additional {
            return Ok(());
        }
        let required = self.len().saturating_add(additional);
        let new_cap = required.max(self.capacity().saturating_mul(2));
        match self.reallocate(new_cap) {
            Ok(()) => Ok(()),
            // Doubling may overshoot what the allocator can give; retry with the
            // exact requirement before giving up.
            Err(_) if new_cap > required => self.reallocate(required),
            Err(e) => Err(e),
        }
    }

    /// Appends a slice to the vector.
    ///
    /// Does not allocate when the spare capacity already covers `s`.
    ///
    /// # Panics
    ///
    /// Panics if growing the vector fails.
    pub fn extend_from_slice(&mut self, s: &[u8]) {
        if let Err(e) = self.try_extend_from_slice(s) {
            panic!("AlignedByteVec::extend_from_slice: {e}");
        }
    }

    /// Appends a slice to the vector, reporting allocation failure.
    pub fn try_extend_from_slice(&mut self, s: &[u8]) -> Result<(), TryReserveError> {
        self.try_reserve(s.len())?;
        self.inner.extend_from_slice(s);
        Ok(())
    }

    /// Resizes the vector to `new_len` bytes, filling new space with `value`.
    ///
    /// On failure the vector is left unchanged.
    pub fn try_resize(&mut self, new_len: usize, value: u8) -> Result<(), TryReserveError> {
        let len = self.len();
        if new_len > len {
            self.try_reserve(new_len - len)?;
        }
        self.inner.resize(self.start_offset() + new_len, value);
        Ok(())
    }

    /// Resizes the vector to `new_len` bytes, filling new space with `value`.
    ///
    /// # Panics
    ///
    /// Panics if growing the vector fails.
    pub fn resize(&mut self, new_len: usize, value: u8) {
        if let Err(e) = self.try_resize(new_len, value) {
            panic!("AlignedByteVec::resize({new_len}): {e}");
        }
    }

    /// Shortens the vector to `new_len` bytes. Has no effect if the vector is
    /// already shorter. Capacity is retained.
    pub fn truncate(&mut self, new_len: usize) {
        self.inner.truncate(self.start_offset() + new_len);
    }

    /// Removes all bytes, keeping the allocation.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Releases spare capacity by moving the contents into an allocation of the
    /// exact length. The vector is unchanged if that allocation fails.
    pub fn try_shrink_to_fit(&mut self) -> Result<(), TryReserveError> {
        if self.capacity() == self.len() {
            return Ok(());
        }
        if self.is_empty() {
            *self = Self::with_alignment(self.alignment());
            return Ok(());
        }
        self.reallocate(self.len())
    }

    /// Checks whether the data at byte `offset` is aligned to `alignment`.
    ///
    /// # Panics
    ///
    /// Panics if the offset is greater than the vector's length.
    pub fn is_aligned_at(&self, offset: usize, alignment: usize) -> bool {
        assert!(offset <= self.len());
        is_ptr_aligned(self.as_ptr().wrapping_add(offset), alignment)
    }
}

impl AlignedByteVec {
    /// Moves the contents into a fresh allocation able to hold `capacity` bytes.
    /// The vector is unchanged if the allocation fails.
    fn reallocate(&mut self, capacity: usize) -> Result<(), TryReserveError> {
        let alignment = self.alignment();
        let mut inner: Vec<u8> = Vec::new();
        inner.try_reserve_exact(capacity.saturating_add(alignment - 1))?;

        let start = inner.as_ptr().align_offset(alignment);
        debug_assert!(start < alignment);
        inner.resize(start, 0);
        inner.extend_from_slice(self.as_slice());

        self.inner = inner;
        self.start = start as u32;
        Ok(())
    }

    #[inline]
    fn start_offset(&self) -> usize {
        self.start as usize
    }
}

impl std::ops::Deref for AlignedByteVec {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl std::ops::DerefMut for AlignedByteVec {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl Clone for AlignedByteVec {
    fn clone(&self) -> AlignedByteVec {
        let mut v = AlignedByteVec::with_alignment(self.alignment());
        v.extend_from_slice(self.as_slice());
        v
    }
}

impl PartialEq for AlignedByteVec {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for AlignedByteVec {}

impl std::fmt::Debug for AlignedByteVec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedByteVec")
            .field("len", &self.len())
            .field("cap", &self.capacity())
            .field("alignment", &self.alignment)
            .field("internal_offset", &self.start)
            .finish_non_exhaustive()
    }
}

impl Default for AlignedByteVec {
    fn default() -> Self {
        Self::new()
    }
}
