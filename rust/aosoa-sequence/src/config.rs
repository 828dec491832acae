//! Construction parameters shared by every sequence built over one layout.

use aosoa_bytes::align::is_valid_alignment;
use aosoa_common::{Result, verify_arg};
use serde::{Deserialize, Serialize};

/// Number of records per frame when not configured otherwise.
pub const DEFAULT_FRAME_SIZE: usize = 64;

/// Byte alignment of each frame's storage when not configured otherwise.
/// One cache line.
pub const DEFAULT_ALIGNMENT: usize = 64;

/// Upper bound for the configurable frame alignment (one page).
pub const MAX_ALIGNMENT: usize = 4096;

/// Configuration of a chunked sequence.
///
/// The record layout itself is described separately by
/// [`RecordLayout`](crate::layout::RecordLayout); the config only carries the
/// chunking parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Number of records in every frame (`N`).
    pub frame_size: usize,
    /// Byte alignment of every frame's storage.
    pub alignment: usize,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            alignment: DEFAULT_ALIGNMENT,
        }
    }
}

impl SequenceConfig {
    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        verify_arg!(frame_size, self.frame_size > 0);
        verify_arg!(alignment, is_valid_alignment(self.alignment));
        verify_arg!(alignment, self.alignment <= MAX_ALIGNMENT);
        Ok(())
    }
}
