//! Core definitions (error and result types, verification helpers), relied upon
//! by all aosoa-* crates.

pub mod error;
pub mod result;

pub use result::Result;
