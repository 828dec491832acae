//! Byte storage for the aosoa frame containers, with caller-selected alignment
//! and fallible allocation.
//!
//! Frame payloads are fixed-size column-major images that are allocated once and
//! then moved around by ownership. [`buffer::AlignedByteVec`] is the owning
//! container for such an image: its start address honors the alignment chosen
//! at construction, and every growing operation has a `try_` form that reports
//! allocation failure instead of aborting the process.

pub mod align;
pub mod buffer;

pub use buffer::AlignedByteVec;
