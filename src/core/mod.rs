//! Allocator internals
//!
//! - `allocator`: bitmap trait, bitmap backends, cluster runs and the zoned allocator
//! - `geometry`: volume size and cluster size
//! - `error`: error type shared by every module

pub mod allocator;
pub mod error;
pub mod geometry;
