//! Serialization of record ranges to the flat wire layout, and back.
//!
//! The wire form of `[start, end)` is a 32-byte [`WireHeader`] followed by the
//! records in three parts: the head (records inside the start frame), the full
//! frames as whole frame images, and the tail (records inside the last frame).
//! Each part is column-major over its own records, so a full frame is copied
//! with a single bulk copy in both directions.

use aosoa_common::{Result, error::Error};

use crate::{
    frame::FrameMut,
    geometry::{HEADER_SIZE, RangeGeometry, WireHeader, WireLayout},
    sequence::ChunkedSequence,
    store::FrameStore,
};

impl<S: FrameStore> ChunkedSequence<S> {
    /// Number of bytes [`serialize`](Self::serialize) writes for `[start, end)`.
    pub fn serialize_size(&self, start: usize, end: usize) -> Result<usize> {
        self.check_range(start, end)?;
        (end - start)
            .checked_mul(self.record_width())
            .and_then(|n| n.checked_add(HEADER_SIZE))
            .ok_or_else(|| Error::invalid_arg("end", "serialized size overflow"))
    }

    /// Writes records `[start, end)` to the front of `out` and returns the
    /// number of bytes written.
    pub fn serialize(&self, start: usize, end: usize, out: &mut [u8]) -> Result<usize> {
        let size = self.serialize_size(start, end)?;
        if out.len() < size {
            return Err(Error::buffer_too_small(size, out.len()));
        }

        let Some(geometry) = RangeGeometry::new(start, end, self.frame_size()) else {
            out[..HEADER_SIZE].copy_from_slice(&WireHeader::EMPTY.encode());
            return Ok(HEADER_SIZE);
        };
        log::trace!("serialize {start}..{end}: {geometry:?}");

        out[..HEADER_SIZE].copy_from_slice(&geometry.header().encode());
        let mut pos = HEADER_SIZE;

        let head = geometry.head_local();
        pos += self
            .store
            .frame(geometry.start_frame)
            .write(head.start, head.end, &mut out[pos..]);
        for frame in geometry.full_frames() {
            pos += self.store.frame(frame).write_full(&mut out[pos..]);
        }
        if let Some(frame) = geometry.tail_frame() {
            pos += self
                .store
                .frame(frame)
                .write(0, geometry.tail_count, &mut out[pos..]);
        }
        debug_assert_eq!(pos, size);
        Ok(pos)
    }

    pub fn serialize_to_vec(&self, start: usize, end: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.serialize_size(start, end)?];
        self.serialize(start, end, &mut out)?;
        Ok(out)
    }

    /// Decodes a serialized range and writes its records at `[start, start +
    /// count)`, in wire order. The sequence is resized to `start + count`.
    ///
    /// `start` must not exceed the current length. Returns the number of input
    /// bytes consumed. An empty-range input leaves the sequence untouched.
    pub fn deserialize(&mut self, start: usize, input: &[u8]) -> Result<usize> {
        let (wire, consumed) = self.prepare_deserialize(start, input)?;
        if wire.record_count == 0 {
            return Ok(consumed);
        }
        let n = self.frame_size();
        let width = self.record_width();
        let frame_bytes = self.layout().frame_bytes();
        let data = &input[HEADER_SIZE..consumed];
        log::trace!("deserialize at {start}: {wire:?}");

        let head_bytes = wire.head_records * width;
        let mut head = Segment::new(&data[..head_bytes], wire.head_records, width);
        let mut cursor = self.place(start, &mut head);

        let mut offset = head_bytes;
        for _ in 0..wire.full_frames {
            let image = &data[offset..offset + frame_bytes];
            if cursor % n == 0 {
                self.store.frame_mut(cursor / n).read_full(image);
                cursor += n;
            } else {
                cursor = self.place(cursor, &mut Segment::new(image, n, width));
            }
            offset += frame_bytes;
        }

        let mut tail = Segment::new(&data[offset..], wire.tail_records, width);
        let end = self.place(cursor, &mut tail);
        debug_assert_eq!(end, start + wire.record_count);
        Ok(consumed)
    }

    /// Like [`deserialize`](Self::deserialize), but packs the boundary records
    /// so that full frame images always land on frame boundaries.
    ///
    /// The multiset of records in `[start / N * N, start + count)` is the same
    /// as with `deserialize`, but their order is not preserved. Records of the
    /// partial start frame that precede `start` may be moved behind the decoded
    /// range.
    pub fn deserialize_packed(&mut self, start: usize, input: &[u8]) -> Result<usize> {
        let (wire, consumed) = self.prepare_deserialize(start, input)?;
        if wire.record_count == 0 {
            return Ok(consumed);
        }
        let width = self.record_width();
        let frame_bytes = self.layout().frame_bytes();
        let data = &input[HEADER_SIZE..consumed];
        log::trace!("packed deserialize at {start}: {wire:?}");

        let n = self.frame_size();
        let mut frame = start / n;
        let head_bytes = wire.head_records * width;
        let mut head = Segment::new(&data[..head_bytes], wire.head_records, width);

        if wire.one_framed {
            head.fill(&mut self.store.frame_mut(frame), start % n);
            if head.left() > 0 {
                head.fill(&mut self.store.frame_mut(frame + 1), 0);
            }
            return Ok(consumed);
        }

        let full_bytes = wire.full_frames * frame_bytes;
        let mut tail = Segment::new(&data[head_bytes + full_bytes..], wire.tail_records, width);
        let last = self.used_frames - 1;

        let lo = head.fill(&mut self.store.frame_mut(frame), start % n);
        if head.left() > 0 {
            if head.left() + tail.left() > n {
                // Head remainder and part of the tail fill the next frame; the
                // rest of the tail goes to the last frame.
                let lo = head.fill(&mut self.store.frame_mut(frame + 1), 0);
                tail.fill(&mut self.store.frame_mut(frame + 1), lo);
                tail.fill(&mut self.store.frame_mut(last), 0);
                frame += 2;
            } else {
                let lo = head.fill(&mut self.store.frame_mut(last), 0);
                tail.fill(&mut self.store.frame_mut(last), lo);
                frame += 1;
            }
        } else if lo == 0 {
            tail.fill(&mut self.store.frame_mut(last), 0);
            frame += 1;
        } else {
            let lo = tail.fill(&mut self.store.frame_mut(frame), lo);
            if tail.left() > 0 {
                tail.fill(&mut self.store.frame_mut(last), 0);
                frame += 1;
            } else if lo == 0 {
                frame += 1;
            } else if last != frame {
                // The start frame stays partial and must become the last one.
                self.store.swap_frames(last, frame);
            }
        }

        let mut offset = head_bytes;
        for i in 0..wire.full_frames {
            self.store
                .frame_mut(frame + i)
                .read_full(&data[offset..offset + frame_bytes]);
            offset += frame_bytes;
        }
        Ok(consumed)
    }

    fn check_range(&self, start: usize, end: usize) -> Result<()> {
        if start > end {
            return Err(Error::invalid_arg(
                "start",
                format!("range start {start} exceeds end {end}"),
            ));
        }
        if end > self.len() {
            return Err(Error::out_of_range("end", end, self.len() + 1));
        }
        Ok(())
    }

    /// Validates the header and payload length, then resizes for the decoded
    /// records. Returns the wire layout and the total input size.
    fn prepare_deserialize(&mut self, start: usize, input: &[u8]) -> Result<(WireLayout, usize)> {
        if start > self.len() {
            return Err(Error::out_of_range("start", start, self.len() + 1));
        }
        let wire = WireHeader::decode(input)?.layout(self.frame_size())?;
        if wire.record_count == 0 {
            return Ok((wire, HEADER_SIZE));
        }

        let total = wire
            .data_size(self.record_width())?
            .checked_add(HEADER_SIZE)
            .ok_or_else(|| Error::invalid_format("header", "payload size overflow"))?;
        if input.len() < total {
            return Err(Error::invalid_format(
                "payload",
                format!("{} bytes available, {total} required", input.len()),
            ));
        }
        let new_len = start
            .checked_add(wire.record_count)
            .ok_or_else(|| Error::invalid_format("header", "record count overflow"))?;
        self.resize(new_len)?;
        Ok((wire, total))
    }

    /// Copies a segment into consecutive records from `cursor` on. Returns the
    /// position after the last record written.
    fn place(&mut self, mut cursor: usize, segment: &mut Segment<'_>) -> usize {
        let n = self.frame_size();
        while segment.left() > 0 {
            let before = segment.left();
            segment.fill(&mut self.store.frame_mut(cursor / n), cursor % n);
            cursor += before - segment.left();
        }
        cursor
    }
}

/// A column-major run of `count` records from the wire, consumed front to back.
struct Segment<'a> {
    data: &'a [u8],
    count: usize,
    consumed: usize,
}

impl<'a> Segment<'a> {
    fn new(data: &'a [u8], count: usize, record_width: usize) -> Segment<'a> {
        let data = &data[..count * record_width];
        Segment {
            data,
            count,
            consumed: 0,
        }
    }

    #[inline]
    fn left(&self) -> usize {
        self.count - self.consumed
    }

    /// Copies as many remaining records as fit into `frame` from slot `lo`.
    /// Returns the next free slot, or `0` when the frame was filled up.
    fn fill(&mut self, frame: &mut FrameMut<'_>, lo: usize) -> usize {
        let left = self.left();
        if left == 0 {
            return lo;
        }
        let cap = frame.layout().frame_size() - lo;
        let take = cap.min(left);
        frame.read(lo, self.consumed, take, self.count, self.data);
        self.consumed += take;
        if take == cap { 0 } else { lo + take }
    }
}

#[cfg(test)]
mod tests {
    use aosoa_common::error::ErrorKind;

    use super::*;
    use crate::{
        config::SequenceConfig,
        layout::{RecordLayout, ScalarType},
        store::{OwnedFrames, SlabFrames},
    };

    fn tagged<S: FrameStore>(n: usize, len: u32) -> ChunkedSequence<S> {
        let record = RecordLayout::builder()
            .scalar("tag", ScalarType::U32)
            .scalar("weight", ScalarType::F64)
            .build()
            .unwrap();
        let mut seq =
            ChunkedSequence::with_config(record, &SequenceConfig::default().with_frame_size(n))
                .unwrap();
        let tag = seq.layout().record().field_id("tag").unwrap();
        let weight = seq.layout().record().field_id("weight").unwrap();
        seq.resize(len as usize).unwrap();
        for i in 0..len {
            seq.set(i as usize, tag, i).unwrap();
            seq.set(i as usize, weight, i as f64 * 0.5).unwrap();
        }
        seq
    }

    fn tags<S: FrameStore>(seq: &ChunkedSequence<S>) -> Vec<u32> {
        let tag = seq.layout().record().field_id("tag").unwrap();
        seq.rows().map(|r| r.get::<u32>(tag).unwrap()).collect()
    }

    #[test]
    fn test_serialize_layout() {
        let seq = tagged::<OwnedFrames>(8, 19);
        let bytes = seq.serialize_to_vec(3, 17).unwrap();
        assert_eq!(bytes.len(), 32 + 14 * 12);
        let header = WireHeader::decode(&bytes).unwrap();
        assert_eq!(
            header,
            WireHeader {
                one_framed: false,
                head_count: 5,
                full_frame_count: 1,
                tail_count: 1,
            }
        );
        // Head tags 3..8 come first, column-major: five u32 tags, then five f64 weights.
        let first = u32::from_le_bytes(bytes[32..36].try_into().unwrap());
        assert_eq!(first, 3);
        let weight = f64::from_le_bytes(bytes[52..60].try_into().unwrap());
        assert_eq!(weight, 1.5);
    }

    #[test]
    fn test_deserialize_in_order() {
        let seq = tagged::<OwnedFrames>(8, 19);
        let bytes = seq.serialize_to_vec(3, 17).unwrap();
        let mut other = tagged::<SlabFrames>(8, 0);
        assert_eq!(other.deserialize(0, &bytes).unwrap(), bytes.len());
        assert_eq!(other.len(), 14);
        assert_eq!(tags(&other), (3..17).collect::<Vec<_>>());
    }

    #[test]
    fn test_deserialize_at_offset() {
        let seq = tagged::<SlabFrames>(4, 13);
        let bytes = seq.serialize_to_vec(4, 13).unwrap();
        let mut other = tagged::<OwnedFrames>(4, 6);
        other.deserialize(2, &bytes).unwrap();
        assert_eq!(other.len(), 11);
        let mut expected = vec![0, 1];
        expected.extend(4..13);
        assert_eq!(tags(&other), expected);
    }

    #[test]
    fn test_empty_range() {
        let seq = tagged::<OwnedFrames>(8, 10);
        let bytes = seq.serialize_to_vec(4, 4).unwrap();
        assert_eq!(bytes, vec![0u8; HEADER_SIZE]);

        let mut other = tagged::<OwnedFrames>(8, 3);
        assert_eq!(other.deserialize(1, &bytes).unwrap(), HEADER_SIZE);
        assert_eq!(other.len(), 3);
        assert_eq!(other.frame_count(), 1);
    }

    #[test]
    fn test_serialize_errors() {
        let seq = tagged::<OwnedFrames>(8, 10);
        assert!(seq.serialize_size(5, 4).is_err());
        assert!(matches!(
            seq.serialize_size(0, 11).unwrap_err().kind(),
            ErrorKind::OutOfRange { .. }
        ));
        let mut small = vec![0u8; 40];
        assert!(matches!(
            seq.serialize(0, 2, &mut small).unwrap_err().kind(),
            ErrorKind::DestBufferTooSmall {
                required: 56,
                available: 40
            }
        ));
    }

    #[test]
    fn test_deserialize_rejects_bad_input() {
        let seq = tagged::<OwnedFrames>(8, 20);
        let bytes = seq.serialize_to_vec(2, 20).unwrap();
        let mut other = tagged::<OwnedFrames>(8, 5);

        let err = other.deserialize(0, &bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidFormat { .. }));
        assert_eq!(other.len(), 5);

        assert!(matches!(
            other.deserialize(6, &bytes).unwrap_err().kind(),
            ErrorKind::OutOfRange { .. }
        ));

        // A frame size mismatch shows up as an invalid head count.
        let mut narrow = tagged::<OwnedFrames>(4, 0);
        assert!(narrow.deserialize(0, &bytes).is_err());
    }

    #[test]
    fn test_packed_placement() {
        let seq = tagged::<OwnedFrames>(8, 40);
        for (start, end, at) in [(3, 17, 0), (3, 17, 5), (1, 31, 6), (9, 12, 7), (8, 40, 3)] {
            let bytes = seq.serialize_to_vec(start, end).unwrap();
            let mut packed = tagged::<OwnedFrames>(8, 8);
            packed.deserialize_packed(at, &bytes).unwrap();
            assert_eq!(packed.len(), at + (end - start));

            let mut got = tags(&packed);
            got.sort_unstable();
            let mut expected: Vec<u32> = (0..at as u32).chain(start as u32..end as u32).collect();
            expected.sort_unstable();
            assert_eq!(got, expected, "{start}..{end} at {at}");
        }
    }
}
