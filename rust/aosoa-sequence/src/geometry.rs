//! Frame geometry of logical record ranges and the wire header codec.
//!
//! A logical range `[start, end)` over frames of `N` records decomposes into a
//! partial *head* (the part of the range inside the start frame), zero or more
//! *full* frames, and a partial *tail* (the part inside the last frame). The
//! serialized form of a range records this decomposition in a 32-byte header:
//!
//! ```text
//! offset  size  field
//! 0       8     one_framed        (0 or 1)
//! 8       8     head_count        N - start % N
//! 16      8     full_frame_count
//! 24      8     tail_count        end % N
//! ```
//!
//! All fields are little-endian `u64`. An empty range is encoded as 32 zero
//! bytes.

use std::ops::Range;

use aosoa_common::{Result, error::Error, verify_data};

/// Size of the encoded [`WireHeader`] in bytes.
pub const HEADER_SIZE: usize = 32;

/// Partition of a non-empty logical range into head, full and tail frames, as
/// written by the serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeGeometry {
    pub start: usize,
    pub end: usize,
    pub frame_size: usize,
    pub start_frame: usize,
    /// One past the last frame touched by the range (`ceil(end / N)`).
    pub end_frame: usize,
    pub head_count: usize,
    pub tail_count: usize,
    pub one_framed: bool,
    pub full_frame_count: usize,
}

impl RangeGeometry {
    /// Returns `None` for an empty range.
    pub fn new(start: usize, end: usize, frame_size: usize) -> Option<RangeGeometry> {
        assert!(frame_size > 0);
        if start >= end {
            return None;
        }
        let start_frame = start / frame_size;
        let end_frame = end.div_ceil(frame_size);
        let head_count = frame_size - start % frame_size;
        let tail_count = end % frame_size;
        let span = end_frame - start_frame;
        let one_framed = span == 1;
        let full_frame_count = if one_framed {
            0
        } else if tail_count == 0 {
            span - 1
        } else {
            span - 2
        };
        Some(RangeGeometry {
            start,
            end,
            frame_size,
            start_frame,
            end_frame,
            head_count,
            tail_count,
            one_framed,
            full_frame_count,
        })
    }

    /// Local slot range written from the start frame.
    pub fn head_local(&self) -> Range<usize> {
        let lo = self.start % self.frame_size;
        if self.one_framed {
            lo..local_end(self.tail_count, self.frame_size)
        } else {
            lo..self.frame_size
        }
    }

    /// Frames copied as whole frame images.
    pub fn full_frames(&self) -> Range<usize> {
        let first = self.start_frame + 1;
        first..first + self.full_frame_count
    }

    /// The frame holding the tail records, if the range has a partial tail
    /// beyond the start frame.
    pub fn tail_frame(&self) -> Option<usize> {
        (!self.one_framed && self.tail_count > 0).then_some(self.end_frame - 1)
    }

    pub fn header(&self) -> WireHeader {
        WireHeader {
            one_framed: self.one_framed,
            head_count: self.head_count as u64,
            full_frame_count: self.full_frame_count as u64,
            tail_count: self.tail_count as u64,
        }
    }
}

/// The decoded 32-byte header of a serialized range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireHeader {
    pub one_framed: bool,
    pub head_count: u64,
    pub full_frame_count: u64,
    pub tail_count: u64,
}

impl WireHeader {
    /// Header of an empty range.
    pub const EMPTY: WireHeader = WireHeader {
        one_framed: false,
        head_count: 0,
        full_frame_count: 0,
        tail_count: 0,
    };

    pub fn for_range(start: usize, end: usize, frame_size: usize) -> WireHeader {
        RangeGeometry::new(start, end, frame_size)
            .map(|g| g.header())
            .unwrap_or(WireHeader::EMPTY)
    }

    pub fn is_empty(&self) -> bool {
        *self == WireHeader::EMPTY
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        let fields = [
            self.one_framed as u64,
            self.head_count,
            self.full_frame_count,
            self.tail_count,
        ];
        for (chunk, value) in out.chunks_exact_mut(8).zip(fields) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Decodes the header at the front of `input`.
    pub fn decode(input: &[u8]) -> Result<WireHeader> {
        if input.len() < HEADER_SIZE {
            return Err(Error::invalid_format(
                "header",
                format!("{} bytes available, {HEADER_SIZE} required", input.len()),
            ));
        }
        let field = |i: usize| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&input[i * 8..i * 8 + 8]);
            u64::from_le_bytes(bytes)
        };
        let one_framed = field(0);
        verify_data!(one_framed, one_framed <= 1);
        Ok(WireHeader {
            one_framed: one_framed == 1,
            head_count: field(1),
            full_frame_count: field(2),
            tail_count: field(3),
        })
    }

    /// Validates the header against the frame size and computes how many
    /// records it describes.
    pub fn layout(&self, frame_size: usize) -> Result<WireLayout> {
        if self.is_empty() {
            return Ok(WireLayout::default());
        }
        let n = frame_size as u64;
        verify_data!(head_count, self.head_count >= 1 && self.head_count <= n);
        verify_data!(tail_count, self.tail_count < n);
        let head = self.head_count as usize;
        let tail = self.tail_count as usize;

        if self.one_framed {
            verify_data!(full_frame_count, self.full_frame_count == 0);
            let start_local = frame_size - head;
            let end_local = local_end(tail, frame_size);
            verify_data!(tail_count, end_local > start_local);
            return Ok(WireLayout {
                one_framed: true,
                head_records: end_local - start_local,
                full_frames: 0,
                tail_records: 0,
                record_count: end_local - start_local,
            });
        }

        verify_data!(
            full_frame_count,
            self.full_frame_count > 0 || self.tail_count > 0
        );
        let full_frames = usize::try_from(self.full_frame_count)
            .map_err(|_| Error::invalid_format("full_frame_count", "exceeds address space"))?;
        let record_count = full_frames
            .checked_mul(frame_size)
            .and_then(|r| r.checked_add(head + tail))
            .ok_or_else(|| Error::invalid_format("full_frame_count", "record count overflow"))?;
        Ok(WireLayout {
            one_framed: false,
            head_records: head,
            full_frames,
            tail_records: tail,
            record_count,
        })
    }
}

/// Record counts of the three parts of a serialized range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireLayout {
    pub one_framed: bool,
    /// Records in the head part; the whole range when one-framed.
    pub head_records: usize,
    pub full_frames: usize,
    pub tail_records: usize,
    pub record_count: usize,
}

impl WireLayout {
    /// Payload bytes following the header.
    pub fn data_size(&self, record_width: usize) -> Result<usize> {
        self.record_count
            .checked_mul(record_width)
            .ok_or_else(|| Error::invalid_format("header", "payload size overflow"))
    }
}

/// Partition of a non-empty logical range for splicing: unlike
/// [`RangeGeometry`], a frame-aligned start frame counts as a full frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceGeometry {
    pub frame_size: usize,
    /// The whole range lies within one frame: `(frame, local range)`.
    pub single: Option<(usize, Range<usize>)>,
    /// Partial start frame: `(frame, local range)`.
    pub head: Option<(usize, Range<usize>)>,
    pub full_frames: Range<usize>,
    /// Partial last frame: `(frame, record count)`, records at `[0, count)`.
    pub tail: Option<(usize, usize)>,
}

impl SpliceGeometry {
    pub fn new(start: usize, end: usize, frame_size: usize) -> SpliceGeometry {
        assert!(start < end && frame_size > 0);
        let n = frame_size;
        let first = start / n;
        if first == (end - 1) / n {
            let lo = start % n;
            return SpliceGeometry {
                frame_size,
                single: Some((first, lo..lo + (end - start))),
                head: None,
                full_frames: 0..0,
                tail: None,
            };
        }
        let head = (start % n != 0).then(|| (first, start % n..n));
        let tail = (end % n != 0).then(|| (end / n, end % n));
        SpliceGeometry {
            frame_size,
            single: None,
            head,
            full_frames: start.div_ceil(n)..end / n,
            tail,
        }
    }
}

#[inline]
fn local_end(tail_count: usize, frame_size: usize) -> usize {
    if tail_count == 0 { frame_size } else { tail_count }
}

#[cfg(test)]
mod tests {
    use aosoa_common::error::ErrorKind;

    use super::*;

    #[test]
    fn test_range_geometry() {
        // N = 8, records 3..17: head 3..8 of frame 0, frame 1 full, tail 0..1 of frame 2.
        let g = RangeGeometry::new(3, 17, 8).unwrap();
        assert_eq!(g.start_frame, 0);
        assert_eq!(g.end_frame, 3);
        assert_eq!(g.head_count, 5);
        assert_eq!(g.tail_count, 1);
        assert!(!g.one_framed);
        assert_eq!(g.full_frame_count, 1);
        assert_eq!(g.head_local(), 3..8);
        assert_eq!(g.full_frames(), 1..2);
        assert_eq!(g.tail_frame(), Some(2));

        let g = RangeGeometry::new(9, 12, 8).unwrap();
        assert!(g.one_framed);
        assert_eq!(g.head_local(), 1..4);
        assert_eq!(g.tail_frame(), None);

        let g = RangeGeometry::new(8, 32, 8).unwrap();
        assert_eq!(g.head_count, 8);
        assert_eq!(g.tail_count, 0);
        assert_eq!(g.full_frame_count, 2);
        assert_eq!(g.tail_frame(), None);

        assert!(RangeGeometry::new(5, 5, 8).is_none());
    }

    #[test]
    fn test_header_roundtrip() {
        let header = WireHeader::for_range(3, 17, 8);
        let bytes = header.encode();
        assert_eq!(&bytes[8..16], &5u64.to_le_bytes());
        assert_eq!(WireHeader::decode(&bytes).unwrap(), header);
        assert_eq!(WireHeader::for_range(4, 4, 8).encode(), [0u8; HEADER_SIZE]);
    }

    #[test]
    fn test_header_layout() {
        for (start, end) in [(0, 1), (3, 17), (7, 8), (8, 16), (5, 64), (16, 40), (1, 8)] {
            let layout = WireHeader::for_range(start, end, 8).layout(8).unwrap();
            assert_eq!(layout.record_count, end - start, "{start}..{end}");
        }
        // head_count == N in a one-framed range means a frame-aligned start.
        let layout = WireHeader::for_range(8, 11, 8).layout(8).unwrap();
        assert_eq!(layout.head_records, 3);
        assert_eq!(WireHeader::EMPTY.layout(8).unwrap().record_count, 0);
    }

    #[test]
    fn test_malformed_headers() {
        let bad = [
            WireHeader {
                one_framed: true,
                head_count: 2,
                full_frame_count: 0,
                tail_count: 3,
            },
            WireHeader {
                one_framed: false,
                head_count: 9,
                full_frame_count: 1,
                tail_count: 0,
            },
            WireHeader {
                one_framed: false,
                head_count: 4,
                full_frame_count: 0,
                tail_count: 0,
            },
            WireHeader {
                one_framed: true,
                head_count: 4,
                full_frame_count: 1,
                tail_count: 0,
            },
            WireHeader {
                one_framed: false,
                head_count: 4,
                full_frame_count: 1,
                tail_count: 8,
            },
        ];
        for header in bad {
            let err = header.layout(8).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::InvalidFormat { .. }),
                "{header:?}"
            );
        }

        let mut bytes = WireHeader::for_range(0, 3, 8).encode();
        bytes[0] = 2;
        assert!(WireHeader::decode(&bytes).is_err());
        assert!(WireHeader::decode(&bytes[..16]).is_err());
    }

    #[test]
    fn test_splice_geometry() {
        let g = SpliceGeometry::new(21, 58, 8);
        assert_eq!(g.single, None);
        assert_eq!(g.head, Some((2, 5..8)));
        assert_eq!(g.full_frames, 3..7);
        assert_eq!(g.tail, Some((7, 2)));

        let g = SpliceGeometry::new(16, 24, 8);
        assert_eq!(g.single, Some((2, 0..8)));

        let g = SpliceGeometry::new(16, 40, 8);
        assert_eq!(g.head, None);
        assert_eq!(g.full_frames, 2..5);
        assert_eq!(g.tail, None);
    }
}
