//! Chunked columnar record sequences.
//!
//! A [`ChunkedSequence`] stores a variable number of fixed-width records in a
//! chain of fixed-capacity frames. Inside a frame every field is its own
//! contiguous column (structure of arrays), while the frames themselves form a
//! growable list (array of structures of arrays).
//!
//! # Main Components
//!
//! - [`layout`]: record descriptors ([`RecordLayout`]) and the byte layout of a
//!   frame image ([`FrameLayout`]).
//! - [`frame`]: per-field byte-range copies between frames and flat buffers.
//! - [`store`]: the two frame store policies, [`OwnedFrames`] (one allocation
//!   per frame, frames move by handle) and [`SlabFrames`] (one allocation for
//!   all frames, frames move by copy).
//! - [`sequence`]: the container, its length accounting and record access.
//! - [`geometry`]: head / full / tail partition of record ranges and the wire
//!   header codec.
//! - Serialization of record ranges ([`ChunkedSequence::serialize`],
//!   [`ChunkedSequence::deserialize`]) and splicing of one sequence's end into
//!   another ([`ChunkedSequence::move_merge`]).
//! - [`relocate`]: bulk frame transfer between stores.
//!
//! # Example
//!
//! ```
//! use aosoa_sequence::{FrameList, RecordLayout, ScalarType, SequenceConfig};
//!
//! let record = RecordLayout::builder()
//!     .scalar("id", ScalarType::U32)
//!     .array("pos", ScalarType::F32, 3)
//!     .build()?;
//! let config = SequenceConfig::default().with_frame_size(8);
//! let mut particles = FrameList::with_config(record, &config)?;
//! particles.resize(20)?;
//!
//! let id = particles.layout().record().field_id("id")?;
//! let pos = particles.layout().record().field_id("pos")?;
//! particles.set(12, id, 7u32)?;
//! particles.set_array(12, pos, &[1.0f32, 2.0, 3.0])?;
//!
//! let bytes = particles.serialize_to_vec(10, 20)?;
//! let mut copy = FrameList::new(particles.layout().clone());
//! copy.deserialize(0, &bytes)?;
//! assert_eq!(copy.get::<u32>(2, id)?, 7);
//! # Ok::<(), aosoa_common::error::Error>(())
//! ```

pub mod config;
pub mod frame;
pub mod geometry;
pub mod layout;
mod merge;
pub mod relocate;
pub mod sequence;
mod serialize;
pub mod store;

pub use config::SequenceConfig;
pub use layout::{FieldId, FrameLayout, RecordLayout, Scalar, ScalarType};
pub use sequence::{ChunkedSequence, FrameList, FrameSlab};
pub use store::{FrameStore, OwnedFrames, SlabFrames};
