//! The chunked sequence container.

use std::sync::Arc;

use aosoa_common::{Result, verify_arg, verify_index};

use crate::{
    config::SequenceConfig,
    frame::{FrameMut, FrameRef},
    layout::{FieldId, FrameLayout, RecordLayout, Scalar},
    store::{FrameStore, OwnedFrames, SlabFrames},
};

/// A resizable sequence of records stored in fixed-capacity frames.
///
/// The logical length is derived from two counters: the number of frames in
/// use and the fill of the last one, where a fill of `0` means that frame is
/// full. Frames beyond the used ones are kept for reuse; they are dropped only
/// by [`release_unused_frames`](Self::release_unused_frames).
///
/// Record `i` lives in frame `i / N` at slot `i % N`.
#[derive(Debug, Clone)]
pub struct ChunkedSequence<S: FrameStore = OwnedFrames> {
    pub(crate) store: S,
    pub(crate) used_frames: usize,
    pub(crate) last_frame_fill: usize,
}

/// Chunked sequence whose frames are individual allocations.
pub type FrameList = ChunkedSequence<OwnedFrames>;

/// Chunked sequence whose frames share one contiguous allocation.
pub type FrameSlab = ChunkedSequence<SlabFrames>;

impl<S: FrameStore> ChunkedSequence<S> {
    /// Creates an empty sequence. No frame is allocated.
    pub fn new(layout: Arc<FrameLayout>) -> Self {
        ChunkedSequence {
            store: S::new(layout),
            used_frames: 0,
            last_frame_fill: 0,
        }
    }

    pub fn with_config(record: RecordLayout, config: &SequenceConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(FrameLayout::new(record, config)?)))
    }

    #[inline]
    pub fn layout(&self) -> &Arc<FrameLayout> {
        self.store.layout()
    }

    /// Records per frame (`N`).
    #[inline]
    pub fn frame_size(&self) -> usize {
        self.layout().frame_size()
    }

    #[inline]
    pub fn record_width(&self) -> usize {
        self.layout().record_width()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        if self.used_frames == 0 {
            0
        } else if self.last_frame_fill == 0 {
            self.used_frames * self.frame_size()
        } else {
            (self.used_frames - 1) * self.frame_size() + self.last_frame_fill
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.used_frames == 0
    }

    #[inline]
    pub fn used_frames(&self) -> usize {
        self.used_frames
    }

    #[inline]
    pub fn last_frame_fill(&self) -> usize {
        self.last_frame_fill
    }

    /// Number of allocated frames, used or not.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn last_frame_full(&self) -> bool {
        self.last_frame_fill == 0
    }

    /// `true` when appending a record requires a new frame.
    pub fn is_full(&self) -> bool {
        self.last_frame_fill == 0 && self.used_frames == self.store.len()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Sets the logical length, allocating frames as needed.
    ///
    /// Records exposed by growing hold whatever the reused frames contained
    /// (zeroes for fresh frames). On allocation failure the sequence is
    /// unchanged.
    pub fn resize(&mut self, new_len: usize) -> Result<()> {
        let n = self.frame_size();
        let used = new_len.div_ceil(n);
        self.store.try_grow(used)?;
        self.used_frames = used;
        self.last_frame_fill = new_len % n;
        log::trace!(
            "resized to {new_len} records ({used} of {} frames in use)",
            self.store.len()
        );
        Ok(())
    }

    /// Makes the sequence empty. Frames are kept.
    pub fn clear(&mut self) {
        self.used_frames = 0;
        self.last_frame_fill = 0;
    }

    /// Drops the allocated frames that hold no records.
    pub fn release_unused_frames(&mut self) {
        let unused = self.store.len() - self.used_frames;
        if unused > 0 {
            self.store.truncate(self.used_frames);
            self.store.shrink_to_fit();
            log::debug!("released {unused} unused frames");
        }
    }

    /// Allocates frames until at least `count` frames exist, without changing
    /// the length.
    pub fn reserve_frames(&mut self, count: usize) -> Result<()> {
        self.store.try_grow(count)
    }

    /// Appends a record given as a row image.
    pub fn push_row(&mut self, row: &[u8]) -> Result<()> {
        verify_arg!(row, row.len() == self.record_width());
        if self.is_full() {
            self.store.try_grow(self.store.len() + 1)?;
        }
        if self.last_frame_fill == 0 {
            self.used_frames += 1;
        }
        let slot = self.last_frame_fill;
        let frame = self.used_frames - 1;
        self.store.frame_mut(frame).write_row(slot, row);
        self.last_frame_fill = (slot + 1) % self.frame_size();
        Ok(())
    }

    /// Copies the row image of record `index` into `out`.
    pub fn read_row(&self, index: usize, out: &mut [u8]) -> Result<()> {
        verify_arg!(out, out.len() == self.record_width());
        let (frame, local) = self.locate(index)?;
        self.store.frame(frame).read_row(local, out);
        Ok(())
    }

    /// Returns the row image of record `index`.
    pub fn row(&self, index: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.record_width()];
        self.read_row(index, &mut out)?;
        Ok(out)
    }

    /// Overwrites record `index` with a row image.
    pub fn write_row(&mut self, index: usize, row: &[u8]) -> Result<()> {
        verify_arg!(row, row.len() == self.record_width());
        let (frame, local) = self.locate(index)?;
        self.store.frame_mut(frame).write_row(local, row);
        Ok(())
    }

    pub fn get<T: Scalar>(&self, index: usize, field: FieldId) -> Result<T> {
        let (frame, local) = self.locate(index)?;
        self.store.frame(frame).get(field, local)
    }

    pub fn set<T: Scalar>(&mut self, index: usize, field: FieldId, value: T) -> Result<()> {
        let (frame, local) = self.locate(index)?;
        self.store.frame_mut(frame).set(field, local, value)
    }

    pub fn get_array<T: Scalar>(&self, index: usize, field: FieldId) -> Result<Vec<T>> {
        let (frame, local) = self.locate(index)?;
        self.store.frame(frame).get_array(field, local)
    }

    pub fn set_array<T: Scalar>(
        &mut self,
        index: usize,
        field: FieldId,
        values: &[T],
    ) -> Result<()> {
        let (frame, local) = self.locate(index)?;
        self.store.frame_mut(frame).set_array(field, local, values)
    }

    /// Read access to allocated frame `index`. Slots past the logical length
    /// hold stale data.
    pub fn frame(&self, index: usize) -> Result<FrameRef<'_>> {
        verify_index!(frame, index, self.store.len());
        Ok(self.store.frame(index))
    }

    pub fn frame_mut(&mut self, index: usize) -> Result<FrameMut<'_>> {
        verify_index!(frame, index, self.store.len());
        Ok(self.store.frame_mut(index))
    }

    /// Iterates over the records in index order.
    pub fn rows(&self) -> Rows<'_, S> {
        Rows {
            sequence: self,
            next: 0,
            end: self.len(),
        }
    }

    /// Frame and slot of record `index`.
    fn locate(&self, index: usize) -> Result<(usize, usize)> {
        verify_index!(index, index, self.len());
        let n = self.frame_size();
        Ok((index / n, index % n))
    }

    /// Sets the counters for `len` records. The frames must already exist.
    pub(crate) fn set_len(&mut self, len: usize) {
        let n = self.frame_size();
        let used = len.div_ceil(n);
        debug_assert!(used <= self.store.len());
        self.used_frames = used;
        self.last_frame_fill = len % n;
    }
}

/// Iterator over the records of a [`ChunkedSequence`].
pub struct Rows<'a, S: FrameStore> {
    sequence: &'a ChunkedSequence<S>,
    next: usize,
    end: usize,
}

impl<'a, S: FrameStore> Iterator for Rows<'a, S> {
    type Item = RowRef<'a>;

    fn next(&mut self) -> Option<RowRef<'a>> {
        if self.next == self.end {
            return None;
        }
        let n = self.sequence.frame_size();
        let row = RowRef {
            frame: self.sequence.store.frame(self.next / n),
            local: self.next % n,
        };
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl<S: FrameStore> ExactSizeIterator for Rows<'_, S> {}

/// A record of a chunked sequence, borrowed from its frame.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    frame: FrameRef<'a>,
    local: usize,
}

impl RowRef<'_> {
    pub fn get<T: Scalar>(&self, field: FieldId) -> Result<T> {
        self.frame.get(field, self.local)
    }

    pub fn get_array<T: Scalar>(&self, field: FieldId) -> Result<Vec<T>> {
        self.frame.get_array(field, self.local)
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.frame.layout().record_width()];
        self.frame.read_row(self.local, &mut out);
        out
    }
}
