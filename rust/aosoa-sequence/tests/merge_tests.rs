use aosoa_common::error::ErrorKind;
use aosoa_sequence::{
    ChunkedSequence, FieldId, FrameStore, OwnedFrames, RecordLayout, ScalarType, SequenceConfig,
    SlabFrames, relocate::relocate_frames,
};

const SOURCE_BASE: u32 = 1000;

struct Fields {
    tag: FieldId,
    vel: FieldId,
}

/// A sequence whose record `i` has `tag = base + i` and `vel = [tag, -tag, 2 * tag]`.
fn tagged<S: FrameStore>(
    frame_size: usize,
    size: usize,
    base: u32,
) -> (ChunkedSequence<S>, Fields) {
    let record = RecordLayout::builder()
        .array("vel", ScalarType::F32, 3)
        .scalar("tag", ScalarType::U32)
        .build()
        .unwrap();
    let mut seq =
        ChunkedSequence::with_config(record, &SequenceConfig::default().with_frame_size(frame_size))
            .unwrap();
    let fields = Fields {
        tag: seq.layout().record().field_id("tag").unwrap(),
        vel: seq.layout().record().field_id("vel").unwrap(),
    };
    seq.resize(size).unwrap();
    for i in 0..size {
        let tag = base + i as u32;
        seq.set(i, fields.tag, tag).unwrap();
        seq.set_array(i, fields.vel, &velocity(tag)).unwrap();
    }
    (seq, fields)
}

fn velocity(tag: u32) -> [f32; 3] {
    let v = tag as f32;
    [v, -v, 2.0 * v]
}

fn tags<S: FrameStore>(seq: &ChunkedSequence<S>, fields: &Fields) -> Vec<u32> {
    seq.rows()
        .map(|row| {
            let tag = row.get::<u32>(fields.tag).unwrap();
            assert_eq!(row.get_array::<f32>(fields.vel).unwrap(), velocity(tag));
            tag
        })
        .collect()
}

fn check_merge<S: FrameStore>(
    frame_size: usize,
    size1: usize,
    size2: usize,
    idx1: usize,
    idx2: usize,
) {
    let (mut dst, fields) = tagged::<S>(frame_size, size1, 0);
    let (mut src, _) = tagged::<S>(frame_size, size2, SOURCE_BASE);
    dst.move_merge(idx1, idx2, &mut src).unwrap();

    let case = format!("N={frame_size} sizes={size1},{size2} at={idx1},{idx2}");
    assert_eq!(dst.len(), idx1 + (size2 - idx2), "{case}");
    assert_eq!(src.len(), idx2, "{case}");

    let dst_tags = tags(&dst, &fields);
    let src_tags = tags(&src, &fields);
    assert_eq!(
        &dst_tags[..idx1],
        &(0..idx1 as u32).collect::<Vec<_>>()[..],
        "{case}"
    );
    assert_eq!(
        src_tags,
        (SOURCE_BASE..SOURCE_BASE + idx2 as u32).collect::<Vec<_>>(),
        "{case}"
    );

    let mut moved = dst_tags[idx1..].to_vec();
    moved.sort_unstable();
    assert_eq!(
        moved,
        (SOURCE_BASE + idx2 as u32..SOURCE_BASE + size2 as u32).collect::<Vec<_>>(),
        "{case}"
    );
}

#[test]
fn test_merge_22_58() {
    check_merge::<OwnedFrames>(8, 22, 58, 7, 21);
    check_merge::<SlabFrames>(8, 22, 58, 7, 21);
}

#[test]
fn test_merge_conservation_random() {
    fastrand::seed(1234567891);
    for _ in 0..3000 {
        let frame_size = [1, 3, 8, 16][fastrand::usize(0..4)];
        let size1 = fastrand::usize(1..100);
        let size2 = fastrand::usize(1..100);
        let idx1 = fastrand::usize(0..size1);
        let idx2 = fastrand::usize(0..size2);
        check_merge::<OwnedFrames>(frame_size, size1, size2, idx1, idx2);
        check_merge::<SlabFrames>(frame_size, size1, size2, idx1, idx2);
    }
}

#[test]
fn test_merge_all_small_offsets() {
    for size1 in 0..=17 {
        for size2 in 0..=17 {
            for idx1 in 0..=size1 {
                for idx2 in 0..=size2 {
                    check_merge::<OwnedFrames>(4, size1, size2, idx1, idx2);
                }
            }
        }
    }
}

#[test]
fn test_merge_into_empty() {
    let (mut dst, fields) = tagged::<OwnedFrames>(8, 0, 0);
    let (mut src, _) = tagged::<OwnedFrames>(8, 40, SOURCE_BASE);
    dst.move_merge(0, 8, &mut src).unwrap();
    assert_eq!(dst.len(), 32);
    assert_eq!(src.len(), 8);
    // Frame-aligned on both sides: every frame moves whole and order survives.
    assert_eq!(
        tags(&dst, &fields),
        (SOURCE_BASE + 8..SOURCE_BASE + 40).collect::<Vec<_>>()
    );
}

#[test]
fn test_repeated_merges_drain_source() {
    fastrand::seed(777);
    let (mut dst, fields) = tagged::<SlabFrames>(8, 10, 0);
    let (mut src, _) = tagged::<SlabFrames>(8, 90, SOURCE_BASE);
    while !src.is_empty() {
        let take = fastrand::usize(1..=src.len().min(20));
        let at = src.len() - take;
        let len = dst.len();
        dst.move_merge(len, at, &mut src).unwrap();
        assert_eq!(dst.len(), len + take);
    }
    let mut all = tags(&dst, &fields);
    all.sort_unstable();
    let expected: Vec<u32> = (0..10).chain(SOURCE_BASE..SOURCE_BASE + 90).collect();
    assert_eq!(all, expected);
}

#[test]
fn test_aligned_merge_moves_frames_by_handle() {
    let (mut dst, fields) = tagged::<OwnedFrames>(4, 8, 0);
    let (mut src, _) = tagged::<OwnedFrames>(4, 20, SOURCE_BASE);
    let handles: Vec<*const u8> = src.store().frames()[1..5]
        .iter()
        .map(|frame| frame.as_bytes().as_ptr())
        .collect();

    dst.move_merge(8, 4, &mut src).unwrap();
    assert_eq!(dst.len(), 24);
    assert_eq!(src.len(), 4);
    let moved: Vec<*const u8> = dst.store().frames()[2..6]
        .iter()
        .map(|frame| frame.as_bytes().as_ptr())
        .collect();
    assert_eq!(moved, handles);
    assert_eq!(
        tags(&dst, &fields),
        (0..8).chain(SOURCE_BASE + 4..SOURCE_BASE + 20).collect::<Vec<_>>()
    );
}

#[test]
fn test_relocate_frames_matches_across_stores() {
    let (mut owned_dst, fields) = tagged::<OwnedFrames>(4, 8, 0);
    let (mut owned_src, _) = tagged::<OwnedFrames>(4, 16, SOURCE_BASE);
    let (mut slab_dst, _) = tagged::<SlabFrames>(4, 8, 0);
    let (mut slab_src, _) = tagged::<SlabFrames>(4, 16, SOURCE_BASE);

    owned_dst.move_merge(8, 4, &mut owned_src).unwrap();
    slab_dst.move_merge(8, 4, &mut slab_src).unwrap();
    assert_eq!(tags(&owned_dst, &fields), tags(&slab_dst, &fields));
    assert_eq!(tags(&owned_src, &fields), tags(&slab_src, &fields));

    let layout = owned_dst.layout().clone();
    let mut a = OwnedFrames::new(layout.clone());
    let mut b = OwnedFrames::new(layout);
    a.try_grow(2).unwrap();
    b.try_grow(3).unwrap();
    b.frame_mut(1).as_bytes_mut()[0] = 7;
    relocate_frames(&mut a, 1, &mut b, 1, 2).unwrap();
    assert_eq!(a.len(), 4);
    assert_eq!(b.len(), 1);
    assert_eq!(a.frame(1).as_bytes()[0], 7);
    assert!(relocate_frames(&mut a, 5, &mut b, 0, 1).is_err());
}

fn check_out_of_range_starts<S: FrameStore>() {
    let (mut dst, fields) = tagged::<S>(4, 10, 0);
    let (mut src, _) = tagged::<S>(4, 5, SOURCE_BASE);
    let frames = (dst.frame_count(), src.frame_count());

    let err = dst.move_merge(11, 0, &mut src).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::OutOfRange {
            index: 11,
            bound: 11,
            ..
        }
    ));
    let err = dst.move_merge(0, 6, &mut src).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::OutOfRange {
            index: 6,
            bound: 6,
            ..
        }
    ));

    assert_eq!((dst.frame_count(), src.frame_count()), frames);
    assert_eq!(tags(&dst, &fields), (0..10).collect::<Vec<_>>());
    assert_eq!(
        tags(&src, &fields),
        (SOURCE_BASE..SOURCE_BASE + 5).collect::<Vec<_>>()
    );
}

#[test]
fn test_out_of_range_starts_leave_both_untouched() {
    check_out_of_range_starts::<OwnedFrames>();
    check_out_of_range_starts::<SlabFrames>();
}
