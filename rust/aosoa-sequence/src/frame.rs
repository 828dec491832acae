//! Frames: fixed-capacity blocks of `N` records stored column by column.
//!
//! A frame image is `N * E` bytes: the column of field 0 (`N * w0` bytes), then
//! the column of field 1, and so on (see [`FrameLayout`]). The frame does not
//! track how many of its slots hold live records; fill accounting belongs to
//! the [`ChunkedSequence`](crate::sequence::ChunkedSequence).
//!
//! The byte-range primitives on [`FrameRef`] and [`FrameMut`] copy one field at
//! a time. Their preconditions are asserted: a violated range is a bug in the
//! caller, and the primitives panic rather than touch bytes outside the frame.

use aosoa_bytes::AlignedByteVec;
use aosoa_common::{Result, error::Error};

use crate::layout::{FieldId, FrameLayout, Scalar};

/// An individually allocated frame buffer, as held by the owned-frame store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: AlignedByteVec,
}

impl Frame {
    /// Allocates a zero-filled frame image for `layout`.
    pub fn try_new(layout: &FrameLayout) -> Result<Frame> {
        let bytes = layout.frame_bytes();
        let data = AlignedByteVec::try_zeroed(bytes, layout.alignment())
            .map_err(|e| Error::alloc_failed("frame", format!("{bytes} bytes: {e}")))?;
        debug_assert!(data.is_aligned_at(0, layout.alignment()));
        Ok(Frame { data })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_slice()
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_mut_slice()
    }

    pub fn view<'a>(&'a self, layout: &'a FrameLayout) -> FrameRef<'a> {
        FrameRef::new(layout, self.as_bytes())
    }

    pub fn view_mut<'a>(&'a mut self, layout: &'a FrameLayout) -> FrameMut<'a> {
        FrameMut::new(layout, self.as_bytes_mut())
    }
}

/// Read access to one frame image.
#[derive(Debug, Clone, Copy)]
pub struct FrameRef<'a> {
    layout: &'a FrameLayout,
    bytes: &'a [u8],
}

impl<'a> FrameRef<'a> {
    pub fn new(layout: &'a FrameLayout, bytes: &'a [u8]) -> FrameRef<'a> {
        assert_eq!(bytes.len(), layout.frame_bytes(), "frame image size");
        FrameRef { layout, bytes }
    }

    #[inline]
    pub fn layout(&self) -> &'a FrameLayout {
        self.layout
    }

    /// The whole frame image.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Copies records `[lo, hi)` into the front of `out`, one contiguous run per
    /// field. Returns the number of bytes written.
    pub fn write(&self, lo: usize, hi: usize, out: &mut [u8]) -> usize {
        let n = self.layout.frame_size();
        assert!(lo <= hi && hi <= n, "frame range {lo}..{hi} exceeds {n}");
        let total = (hi - lo) * self.layout.record_width();
        assert!(
            out.len() >= total,
            "output holds {} bytes, {total} required",
            out.len()
        );

        let mut pos = 0;
        for span in self.layout.columns() {
            let len = (hi - lo) * span.width;
            let src = span.offset + lo * span.width;
            out[pos..pos + len].copy_from_slice(&self.bytes[src..src + len]);
            pos += len;
        }
        pos
    }

    /// Copies the whole frame image into the front of `out`. Equivalent to
    /// `write(0, N, out)`.
    pub fn write_full(&self, out: &mut [u8]) -> usize {
        let len = self.bytes.len();
        out[..len].copy_from_slice(self.bytes);
        len
    }

    /// Bytes of one field value of the record in slot `local`.
    pub fn element(&self, field: FieldId, local: usize) -> &'a [u8] {
        let (start, len) = element_span(self.layout, field, local);
        &self.bytes[start..start + len]
    }

    /// Reads a scalar field value.
    pub fn get<T: Scalar>(&self, field: FieldId, local: usize) -> Result<T> {
        self.layout.record().check_access::<T>(field, true)?;
        Ok(bytemuck::pod_read_unaligned(self.element(field, local)))
    }

    /// Reads all elements of an array field (a scalar field yields one).
    pub fn get_array<T: Scalar>(&self, field: FieldId, local: usize) -> Result<Vec<T>> {
        self.layout.record().check_access::<T>(field, false)?;
        Ok(self
            .element(field, local)
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned::<T>)
            .collect())
    }

    /// Gathers the row image of the record in slot `local` into `out`.
    pub fn read_row(&self, local: usize, out: &mut [u8]) {
        let record = self.layout.record();
        assert_eq!(out.len(), record.record_width(), "row image size");
        for index in 0..record.field_count() {
            let (start, len) = element_span(self.layout, field_id(index), local);
            let dst = record.row_range(field_id(index));
            debug_assert_eq!(dst.len(), len);
            out[dst].copy_from_slice(&self.bytes[start..start + len]);
        }
    }

    /// Typed view of a field's whole column (`N * arity` elements).
    pub fn column<T: Scalar>(&self, field: FieldId) -> Result<&'a [T]> {
        self.layout.record().check_access::<T>(field, false)?;
        let span = self.layout.column(field);
        let bytes = &self.bytes[span.offset..span.offset + span.width * self.layout.frame_size()];
        bytemuck::try_cast_slice(bytes)
            .map_err(|e| Error::invalid_operation(format!("column view: {e}")))
    }
}

/// Write access to one frame image.
#[derive(Debug)]
pub struct FrameMut<'a> {
    layout: &'a FrameLayout,
    bytes: &'a mut [u8],
}

impl<'a> FrameMut<'a> {
    pub fn new(layout: &'a FrameLayout, bytes: &'a mut [u8]) -> FrameMut<'a> {
        assert_eq!(bytes.len(), layout.frame_bytes(), "frame image size");
        FrameMut { layout, bytes }
    }

    #[inline]
    pub fn layout(&self) -> &'a FrameLayout {
        self.layout
    }

    #[inline]
    pub fn as_frame_ref(&self) -> FrameRef<'_> {
        FrameRef {
            layout: self.layout,
            bytes: &*self.bytes,
        }
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut *self.bytes
    }

    /// Copies `count` records into slots `[lo, lo + count)` from a flat buffer
    /// holding one sub-array per field, each `src_stride` records long. Records
    /// are taken from position `src_offset` of every sub-array.
    pub fn read(
        &mut self,
        lo: usize,
        src_offset: usize,
        count: usize,
        src_stride: usize,
        input: &[u8],
    ) {
        let n = self.layout.frame_size();
        assert!(
            lo + count <= n,
            "frame range {lo}..{} exceeds {n}",
            lo + count
        );
        assert!(
            src_offset + count <= src_stride,
            "source range {src_offset}..{} exceeds stride {src_stride}",
            src_offset + count
        );
        assert!(
            input.len() >= src_stride * self.layout.record_width(),
            "input holds {} bytes, {} required",
            input.len(),
            src_stride * self.layout.record_width()
        );

        let mut field_start = 0;
        for span in self.layout.columns() {
            let len = count * span.width;
            let src = field_start + src_offset * span.width;
            let dst = span.offset + lo * span.width;
            self.bytes[dst..dst + len].copy_from_slice(&input[src..src + len]);
            field_start += src_stride * span.width;
        }
    }

    /// Overwrites the frame with a full frame image taken from the front of
    /// `input`.
    pub fn read_full(&mut self, input: &[u8]) {
        let len = self.bytes.len();
        assert!(
            input.len() >= len,
            "input holds {} bytes, {len} required",
            input.len()
        );
        self.bytes.copy_from_slice(&input[..len]);
    }

    /// Copies records `[other_lo, other_lo + count)` of `other` into slots
    /// `[lo, lo + count)`.
    pub fn merge(&mut self, lo: usize, other_lo: usize, count: usize, other: FrameRef<'_>) {
        let n = self.layout.frame_size();
        assert!(
            self.layout.columns() == other.layout.columns(),
            "merge between frames of different layouts"
        );
        assert!(
            lo + count <= n && other_lo + count <= n,
            "merge of {count} records at {lo} from {other_lo} exceeds {n}"
        );
        for span in self.layout.columns() {
            let len = count * span.width;
            let dst = span.offset + lo * span.width;
            let src = span.offset + other_lo * span.width;
            self.bytes[dst..dst + len].copy_from_slice(&other.bytes[src..src + len]);
        }
    }

    /// Copies records `[src_lo, src_lo + count)` of this frame to
    /// `[lo, lo + count)`. The ranges may overlap.
    pub fn copy_within(&mut self, lo: usize, src_lo: usize, count: usize) {
        let n = self.layout.frame_size();
        assert!(
            lo + count <= n && src_lo + count <= n,
            "copy of {count} records from {src_lo} to {lo} exceeds {n}"
        );
        for span in self.layout.columns() {
            let src = span.offset + src_lo * span.width;
            self.bytes
                .copy_within(src..src + count * span.width, span.offset + lo * span.width);
        }
    }

    pub fn element_mut(&mut self, field: FieldId, local: usize) -> &mut [u8] {
        let (start, len) = element_span(self.layout, field, local);
        &mut self.bytes[start..start + len]
    }

    pub fn set<T: Scalar>(&mut self, field: FieldId, local: usize, value: T) -> Result<()> {
        self.layout.record().check_access::<T>(field, true)?;
        self.element_mut(field, local)
            .copy_from_slice(bytemuck::bytes_of(&value));
        Ok(())
    }

    /// Overwrites all elements of an array field. `values` must hold exactly
    /// the field's arity.
    pub fn set_array<T: Scalar>(
        &mut self,
        field: FieldId,
        local: usize,
        values: &[T],
    ) -> Result<()> {
        let record = self.layout.record();
        record.check_access::<T>(field, false)?;
        let arity = record.field(field).shape().arity();
        if values.len() != arity {
            return Err(Error::invalid_arg(
                "values",
                format!("{} values for a field of {arity}", values.len()),
            ));
        }
        self.element_mut(field, local)
            .copy_from_slice(bytemuck::cast_slice(values));
        Ok(())
    }

    /// Scatters a row image into the record in slot `local`.
    pub fn write_row(&mut self, local: usize, row: &[u8]) {
        let record = self.layout.record();
        assert_eq!(row.len(), record.record_width(), "row image size");
        for index in 0..record.field_count() {
            let (start, len) = element_span(self.layout, field_id(index), local);
            let src = record.row_range(field_id(index));
            debug_assert_eq!(src.len(), len);
            self.bytes[start..start + len].copy_from_slice(&row[src]);
        }
    }

    /// Mutable typed view of a field's whole column.
    pub fn column_mut<T: Scalar>(&mut self, field: FieldId) -> Result<&mut [T]> {
        self.layout.record().check_access::<T>(field, false)?;
        let span = self.layout.column(field);
        let end = span.offset + span.width * self.layout.frame_size();
        bytemuck::try_cast_slice_mut(&mut self.bytes[span.offset..end])
            .map_err(|e| Error::invalid_operation(format!("column view: {e}")))
    }
}

#[inline]
fn field_id(index: usize) -> FieldId {
    FieldId::from_index(index)
}

/// Byte offset and length of a field value within a frame image.
fn element_span(layout: &FrameLayout, field: FieldId, local: usize) -> (usize, usize) {
    let n = layout.frame_size();
    assert!(local < n, "slot {local} exceeds frame size {n}");
    let span = layout.column(field);
    (span.offset + local * span.width, span.width)
}
