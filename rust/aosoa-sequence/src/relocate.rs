//! Bulk transfer of frames between stores.

use aosoa_common::{Result, error::Error, verify_arg};

use crate::store::FrameStore;

/// Moves frames `[src_at, src_at + count)` of `src` to position `dst_at` of
/// `dst`, preserving their order.
///
/// `src` closes the gap; the frames of `dst` from `dst_at` on shift back by
/// `count`. With [`OwnedFrames`](crate::store::OwnedFrames) only handles move;
/// with [`SlabFrames`](crate::store::SlabFrames) the frame payloads are copied.
/// Both stores are left unchanged on error.
pub fn relocate_frames<S: FrameStore>(
    dst: &mut S,
    dst_at: usize,
    src: &mut S,
    src_at: usize,
    count: usize,
) -> Result<()> {
    verify_arg!(layout, dst.layout() == src.layout());
    verify_arg!(dst_at, dst_at <= dst.len());
    let src_end = src_at
        .checked_add(count)
        .ok_or_else(|| Error::invalid_arg("count", "frame range overflow"))?;
    if src_end > src.len() {
        return Err(Error::out_of_range("count", src_end, src.len() + 1));
    }
    dst.try_reserve(count)?;
    relocate_reserved(dst, dst_at, src, src_at, count);
    Ok(())
}

/// [`relocate_frames`] for callers that validated the arguments and reserved
/// room in `dst` up front.
pub(crate) fn relocate_reserved<S: FrameStore>(
    dst: &mut S,
    dst_at: usize,
    src: &mut S,
    src_at: usize,
    count: usize,
) {
    if count == 0 {
        return;
    }
    dst.transfer(dst_at, src, src_at, count);
    log::debug!(
        "relocated {count} frames from {src_at} to {dst_at} ({})",
        if S::RELOCATES_BY_HANDLE {
            "by handle"
        } else {
            "by copy"
        }
    );
}
