//! Frame stores: ordered, resizable collections of frames.
//!
//! A [`ChunkedSequence`](crate::sequence::ChunkedSequence) is generic over its
//! store. Two policies are provided:
//!
//! - [`OwnedFrames`]: every frame is its own aligned allocation, and the store
//!   holds a vector of handles. Moving frames between stores moves handles
//!   only; frame payloads stay where they are.
//! - [`SlabFrames`]: all frames live back to back in one aligned buffer. Moving
//!   frames copies their payload (`N * E` bytes per frame) and shifts the
//!   frames behind the insertion point. Only the first frame is guaranteed to
//!   start at the configured alignment; later frames start at multiples of the
//!   frame byte size.

use std::sync::Arc;

use aosoa_bytes::AlignedByteVec;
use aosoa_common::{Result, error::Error};

use crate::{
    frame::{Frame, FrameMut, FrameRef},
    layout::FrameLayout,
};

/// Storage policy for the frames of a chunked sequence.
///
/// Indices passed to the accessors must be below [`len`](FrameStore::len);
/// violations panic.
pub trait FrameStore: Sized {
    /// `true` when [`transfer`](FrameStore::transfer) moves frame handles
    /// instead of frame payloads.
    const RELOCATES_BY_HANDLE: bool;

    /// Creates an empty store for frames of the given layout.
    fn new(layout: Arc<FrameLayout>) -> Self;

    fn layout(&self) -> &Arc<FrameLayout>;

    /// Number of allocated frames.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn frame(&self, index: usize) -> FrameRef<'_>;

    fn frame_mut(&mut self, index: usize) -> FrameMut<'_>;

    /// Borrows frame `dst` for writing and frame `src` for reading at the same
    /// time. `dst` and `src` must differ.
    fn frame_pair_mut(&mut self, dst: usize, src: usize) -> (FrameMut<'_>, FrameRef<'_>);

    /// Allocates zero-filled frames until the store holds at least `count`
    /// frames. On failure the store is left as it was.
    fn try_grow(&mut self, count: usize) -> Result<()>;

    /// Reserves room for `additional` more frames, so that a following
    /// [`transfer`](FrameStore::transfer) of that many frames does not allocate.
    fn try_reserve(&mut self, additional: usize) -> Result<()>;

    /// Drops the frames at and after `count`.
    fn truncate(&mut self, count: usize);

    /// Returns spare capacity to the allocator.
    fn shrink_to_fit(&mut self);

    fn swap_frames(&mut self, a: usize, b: usize);

    /// Moves frames `[from, from + count)` out of `source` and inserts them at
    /// position `at` of `self`, in order. `source` closes the gap and the frames
    /// of `self` at and after `at` shift back by `count`.
    fn transfer(&mut self, at: usize, source: &mut Self, from: usize, count: usize);
}

/// Frame store holding one allocation per frame.
#[derive(Debug, Clone)]
pub struct OwnedFrames {
    layout: Arc<FrameLayout>,
    frames: Vec<Frame>,
}

impl OwnedFrames {
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl FrameStore for OwnedFrames {
    const RELOCATES_BY_HANDLE: bool = true;

    fn new(layout: Arc<FrameLayout>) -> Self {
        OwnedFrames {
            layout,
            frames: Vec::new(),
        }
    }

    #[inline]
    fn layout(&self) -> &Arc<FrameLayout> {
        &self.layout
    }

    #[inline]
    fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    fn frame(&self, index: usize) -> FrameRef<'_> {
        self.frames[index].view(&self.layout)
    }

    #[inline]
    fn frame_mut(&mut self, index: usize) -> FrameMut<'_> {
        self.frames[index].view_mut(&self.layout)
    }

    fn frame_pair_mut(&mut self, dst: usize, src: usize) -> (FrameMut<'_>, FrameRef<'_>) {
        assert_ne!(dst, src, "frame pair must be distinct");
        let layout = &*self.layout;
        if dst < src {
            let (left, right) = self.frames.split_at_mut(src);
            (left[dst].view_mut(layout), right[0].view(layout))
        } else {
            let (left, right) = self.frames.split_at_mut(dst);
            (right[0].view_mut(layout), left[src].view(layout))
        }
    }

    fn try_grow(&mut self, count: usize) -> Result<()> {
        let prior = self.frames.len();
        if count <= prior {
            return Ok(());
        }
        self.frames
            .try_reserve(count - prior)
            .map_err(|e| Error::alloc_failed("frame list", format!("{count} frames: {e}")))?;
        while self.frames.len() < count {
            match Frame::try_new(&self.layout) {
                Ok(frame) => self.frames.push(frame),
                Err(e) => {
                    self.frames.truncate(prior);
                    return Err(e);
                }
            }
        }
        log::debug!(
            "allocated {} frames of {} bytes",
            count - prior,
            self.layout.frame_bytes()
        );
        Ok(())
    }

    fn try_reserve(&mut self, additional: usize) -> Result<()> {
        self.frames.try_reserve(additional).map_err(|e| {
            Error::alloc_failed("frame list", format!("{additional} more frames: {e}"))
        })
    }

    fn truncate(&mut self, count: usize) {
        self.frames.truncate(count);
    }

    fn shrink_to_fit(&mut self) {
        self.frames.shrink_to_fit();
    }

    fn swap_frames(&mut self, a: usize, b: usize) {
        self.frames.swap(a, b);
    }

    fn transfer(&mut self, at: usize, source: &mut Self, from: usize, count: usize) {
        assert!(at <= self.frames.len(), "insertion point {at} out of range");
        self.frames.extend(source.frames.drain(from..from + count));
        self.frames[at..].rotate_right(count);
    }
}

/// Frame store keeping every frame image in a single contiguous buffer.
#[derive(Debug, Clone)]
pub struct SlabFrames {
    layout: Arc<FrameLayout>,
    slab: AlignedByteVec,
}

impl SlabFrames {
    /// The frame images, back to back.
    pub fn as_bytes(&self) -> &[u8] {
        self.slab.as_slice()
    }

    #[inline]
    fn frame_range(&self, index: usize) -> std::ops::Range<usize> {
        let fb = self.layout.frame_bytes();
        index * fb..(index + 1) * fb
    }

    fn byte_count(&self, frames: usize) -> Result<usize> {
        frames
            .checked_mul(self.layout.frame_bytes())
            .ok_or_else(|| {
                Error::alloc_failed(
                    "frame slab",
                    format!("{frames} frames overflow the address space"),
                )
            })
    }
}

impl FrameStore for SlabFrames {
    const RELOCATES_BY_HANDLE: bool = false;

    fn new(layout: Arc<FrameLayout>) -> Self {
        let slab = AlignedByteVec::with_alignment(layout.alignment());
        SlabFrames { layout, slab }
    }

    #[inline]
    fn layout(&self) -> &Arc<FrameLayout> {
        &self.layout
    }

    #[inline]
    fn len(&self) -> usize {
        self.slab.len() / self.layout.frame_bytes()
    }

    fn frame(&self, index: usize) -> FrameRef<'_> {
        let range = self.frame_range(index);
        FrameRef::new(&self.layout, &self.slab[range])
    }

    fn frame_mut(&mut self, index: usize) -> FrameMut<'_> {
        let range = self.frame_range(index);
        FrameMut::new(&self.layout, &mut self.slab[range])
    }

    fn frame_pair_mut(&mut self, dst: usize, src: usize) -> (FrameMut<'_>, FrameRef<'_>) {
        assert_ne!(dst, src, "frame pair must be distinct");
        let fb = self.layout.frame_bytes();
        let layout = &*self.layout;
        if dst < src {
            let (left, right) = self.slab.split_at_mut(src * fb);
            (
                FrameMut::new(layout, &mut left[dst * fb..(dst + 1) * fb]),
                FrameRef::new(layout, &right[..fb]),
            )
        } else {
            let (left, right) = self.slab.split_at_mut(dst * fb);
            (
                FrameMut::new(layout, &mut right[..fb]),
                FrameRef::new(layout, &left[src * fb..(src + 1) * fb]),
            )
        }
    }

    fn try_grow(&mut self, count: usize) -> Result<()> {
        let prior = self.len();
        if count <= prior {
            return Ok(());
        }
        let bytes = self.byte_count(count)?;
        self.slab
            .try_resize(bytes, 0)
            .map_err(|e| Error::alloc_failed("frame slab", format!("{count} frames: {e}")))?;
        log::debug!("grew frame slab from {prior} to {count} frames ({bytes} bytes)");
        Ok(())
    }

    fn try_reserve(&mut self, additional: usize) -> Result<()> {
        let bytes = self.byte_count(additional)?;
        self.slab.try_reserve(bytes).map_err(|e| {
            Error::alloc_failed("frame slab", format!("{additional} more frames: {e}"))
        })
    }

    fn truncate(&mut self, count: usize) {
        if count < self.len() {
            self.slab.truncate(count * self.layout.frame_bytes());
        }
    }

    fn shrink_to_fit(&mut self) {
        // A failed shrink keeps the larger buffer, which is still valid.
        let _ = self.slab.try_shrink_to_fit();
    }

    fn swap_frames(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let fb = self.layout.frame_bytes();
        let (lo, hi) = (a.min(b), a.max(b));
        let (left, right) = self.slab.split_at_mut(hi * fb);
        left[lo * fb..(lo + 1) * fb].swap_with_slice(&mut right[..fb]);
    }

    fn transfer(&mut self, at: usize, source: &mut Self, from: usize, count: usize) {
        assert!(at <= self.len(), "insertion point {at} out of range");
        assert!(from + count <= source.len(), "transfer range out of range");
        if count == 0 {
            return;
        }
        let fb = self.layout.frame_bytes();
        let moved = count * fb;
        let src = from * fb..from * fb + moved;

        self.slab.extend_from_slice(&source.slab[src.clone()]);
        self.slab[at * fb..].rotate_right(moved);

        let source_len = source.slab.len();
        source.slab.copy_within(src.end.., src.start);
        source.slab.truncate(source_len - moved);
    }
}
