//! Splicing the end of one chunked sequence into another.
//!
//! [`move_merge`](ChunkedSequence::move_merge) moves records
//! `[src_start, source.len())` out of `source` and places them at
//! `[dst_start, ...)` of the destination. Full source frames change owner
//! through the frame relocator; only the records of partial frames are copied:
//!
//! 1. The partial destination frame at `dst_start` is topped up from the source
//!    head, then the source tail, then the end of the last full source frame.
//! 2. Head records still left over are folded into the tail frame, or, when the
//!    tail frame has no room, copied to one fresh destination frame.
//! 3. The full frames and the tail frame are relocated behind the destination
//!    frame, in order.
//!
//! Every allocation happens before either sequence is touched.

use std::ops::Range;

use aosoa_common::{Result, error::Error, verify_arg};

use crate::{
    geometry::SpliceGeometry,
    relocate::relocate_reserved,
    sequence::ChunkedSequence,
    store::FrameStore,
};

impl<S: FrameStore> ChunkedSequence<S> {
    /// Moves records `[src_start, source.len())` of `source` into `self` at
    /// `dst_start`.
    ///
    /// Afterwards `self.len() == dst_start + moved` and
    /// `source.len() == src_start`. Records of `self` before `dst_start` stay in
    /// place and records at or after it are discarded. The moved records each
    /// appear exactly once in `[dst_start, self.len())`, but their relative
    /// order is not preserved.
    ///
    /// On error both sequences keep their contents and lengths.
    pub fn move_merge(
        &mut self,
        dst_start: usize,
        src_start: usize,
        source: &mut Self,
    ) -> Result<()> {
        verify_arg!(layout, self.layout() == source.layout());
        if dst_start > self.len() {
            return Err(Error::out_of_range("dst_start", dst_start, self.len() + 1));
        }
        if src_start > source.len() {
            return Err(Error::out_of_range("src_start", src_start, source.len() + 1));
        }

        let src_end = source.len();
        let moved = src_end - src_start;
        let target = dst_start
            .checked_add(moved)
            .ok_or_else(|| Error::invalid_arg("dst_start", "merged length overflow"))?;
        if moved == 0 {
            self.set_len(dst_start);
            return Ok(());
        }

        let geometry = SpliceGeometry::new(src_start, src_end, self.frame_size());
        match geometry.single.clone() {
            Some((frame, local)) => self.merge_single(dst_start, source, frame, local)?,
            None => {
                let plan = SplicePlan::new(&geometry, dst_start);
                log::trace!("move_merge {src_start}..{src_end} to {dst_start}: {plan:?}");
                self.merge_frames(source, &plan)?;
            }
        }

        self.set_len(target);
        source.set_len(src_start);
        Ok(())
    }

    /// Source range within one frame: copy the records, or relocate the frame
    /// when it is full and the destination is frame-aligned.
    fn merge_single(
        &mut self,
        dst_start: usize,
        source: &mut Self,
        frame: usize,
        local: Range<usize>,
    ) -> Result<()> {
        let n = self.frame_size();
        let (dst_frame, dst_slot) = (dst_start / n, dst_start % n);
        let count = local.len();

        if dst_slot == 0 && count == n {
            self.store.try_reserve(1)?;
            relocate_reserved(&mut self.store, dst_frame, &mut source.store, frame, 1);
            return Ok(());
        }

        self.store.try_grow((dst_start + count).div_ceil(n))?;
        let first = count.min(n - dst_slot);
        self.store
            .frame_mut(dst_frame)
            .merge(dst_slot, local.start, first, source.store.frame(frame));
        if count > first {
            self.store.frame_mut(dst_frame + 1).merge(
                0,
                local.start + first,
                count - first,
                source.store.frame(frame),
            );
        }
        Ok(())
    }

    fn merge_frames(&mut self, source: &mut Self, plan: &SplicePlan) -> Result<()> {
        if !plan.spill.is_empty() {
            self.store.try_grow(plan.insert_at + 1)?;
        }
        self.store.try_reserve(plan.relocate.len())?;

        // Top up the partial destination frame.
        let mut slot = plan.dst_slot;
        for &(frame, lo, count) in &plan.fill {
            self.store
                .frame_mut(plan.dst_frame)
                .merge(slot, lo, count, source.store.frame(frame));
            slot += count;
        }

        if let Some(fold) = &plan.fold {
            let (mut tail, head) = source.store.frame_pair_mut(fold.tail_frame, plan.head_frame);
            tail.merge(fold.tail_slot, fold.head.start, fold.head.len(), head);
        }

        relocate_reserved(
            &mut self.store,
            plan.insert_at,
            &mut source.store,
            plan.relocate.start,
            plan.relocate.len(),
        );

        if !plan.spill.is_empty() {
            let spill_frame = plan.insert_at + plan.relocate.len();
            self.store.frame_mut(spill_frame).merge(
                0,
                plan.spill.start,
                plan.spill.len(),
                source.store.frame(plan.head_frame),
            );
        }
        Ok(())
    }
}

/// Copy and relocation steps of a multi-frame splice, computed up front.
#[derive(Debug)]
struct SplicePlan {
    dst_frame: usize,
    dst_slot: usize,
    /// Copies into the partial destination frame: `(source frame, lo, count)`.
    fill: Vec<(usize, usize, usize)>,
    head_frame: usize,
    fold: Option<Fold>,
    /// Source frames handed over to the destination.
    relocate: Range<usize>,
    /// Destination frame index receiving the first relocated frame.
    insert_at: usize,
    /// Head records copied to the fresh destination frame after the relocated
    /// ones.
    spill: Range<usize>,
}

/// Head records moved into free slots of the tail frame.
#[derive(Debug)]
struct Fold {
    tail_frame: usize,
    tail_slot: usize,
    head: Range<usize>,
}

impl SplicePlan {
    fn new(geometry: &SpliceGeometry, dst_start: usize) -> SplicePlan {
        let n = geometry.frame_size;
        let dst_frame = dst_start / n;
        let dst_slot = dst_start % n;
        let mut cap = if dst_slot > 0 { n - dst_slot } else { 0 };

        let (head_frame, mut head) = geometry.head.clone().unwrap_or((0, 0..0));
        let mut full = geometry.full_frames.clone();
        let (mut tail_frame, mut tail_len) = geometry.tail.unwrap_or((full.end, 0));
        let mut fill = Vec::new();

        let take = cap.min(head.len());
        if take > 0 {
            fill.push((head_frame, head.start, take));
            head.start += take;
            cap -= take;
        }
        let take = cap.min(tail_len);
        if take > 0 {
            fill.push((tail_frame, tail_len - take, take));
            tail_len -= take;
            cap -= take;
        }
        if cap > 0 && !full.is_empty() {
            // Head and tail are exhausted; the last full frame becomes the tail.
            let last = full.end - 1;
            fill.push((last, n - cap, cap));
            full.end = last;
            tail_frame = last;
            tail_len = n - cap;
        }

        let mut fold = None;
        if !head.is_empty() && tail_len > 0 {
            let count = head.len().min(n - tail_len);
            fold = Some(Fold {
                tail_frame,
                tail_slot: tail_len,
                head: head.end - count..head.end,
            });
            head.end -= count;
            tail_len += count;
        }

        let relocated = full.len() + usize::from(tail_len > 0);
        debug_assert!(tail_len == 0 || full.end == tail_frame);
        SplicePlan {
            dst_frame,
            dst_slot,
            fill,
            head_frame,
            fold,
            relocate: full.start..full.start + relocated,
            insert_at: dst_frame + usize::from(dst_slot > 0),
            spill: head,
        }
    }
}
