//! # ntfs-cluster-alloc - Free-space allocation for NTFS-style volumes
//!
//! Tracks which clusters of a volume are in use through a bitmap with one bit
//! per cluster, and hands out runs of free clusters to file-extension code:
//!
//! - **Metadata growth** takes the lowest free clusters on the volume
//! - **Data allocations** prefer one contiguous run in the upper 7/8 of the
//!   volume, then degrade through lower zones
//! - **All or nothing**: a failed allocation leaves the bitmap exactly as it was
//!
//! ## Quick Start
//!
//! ```rust
//! use ntfs_cluster_alloc::{ClusterAllocator, MemoryBitmap, Result, VolumeGeometry};
//!
//! # fn main() -> Result<()> {
//! let geometry = VolumeGeometry::new(4 * 1024 * 1024, 4096)?;
//! let bitmap = MemoryBitmap::new(geometry.total_clusters());
//! let mut alloc = ClusterAllocator::with_geometry(bitmap, &geometry)?;
//!
//! // 10 clusters of file data, no placement hint
//! let runs = alloc.allocate(10, None, false, 10)?;
//! assert_eq!(runs.len(), 1);
//! assert!(runs[0].start() >= geometry.total_clusters() / 8);
//!
//! alloc.free(&runs)?;
//! assert_eq!(alloc.free_clusters(), geometry.total_clusters());
//! # Ok(())
//! # }
//! ```
//!
//! The allocator is not synchronized. Wrap it in the volume's lock when it is
//! shared between threads.

pub mod core;

#[allow(unused_imports)]
pub(crate) use self::core::{allocator, error, geometry};

pub use crate::core::{
    allocator::{
        bitmap::{MemoryBitmap, StreamBitmap},
        cluster::ClusterAllocator,
        range::{total_length, ClusterRange},
        ClusterBitmap,
    },
    error::{AllocError, Result},
    geometry::VolumeGeometry,
};
