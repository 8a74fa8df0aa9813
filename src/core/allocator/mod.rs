//! Cluster allocation for NTFS-style volumes
//!
//! The allocator tracks free space through a bitmap with one bit per cluster:
//! - Metadata-table growth scans the whole volume from cluster 0
//! - Ordinary data walks a zone ladder, preferring one contiguous run in the
//!   upper 7/8 of the volume and degrading toward low addresses

pub mod bitmap;
pub mod cluster;
pub mod range;

use crate::error::Result;

/// Bit-per-cluster storage consumed by the allocator
///
/// A set bit means the cluster is in use. Callers keep every index below
/// [`ClusterBitmap::len`]; indexing past it is a bug, not a recoverable error.
pub trait ClusterBitmap {
    /// Number of clusters the bitmap can describe
    fn len(&self) -> u64;

    /// Check whether the bitmap describes no clusters at all
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether a single cluster is in use
    fn is_used(&self, cluster: u64) -> bool;

    /// Mark `[start, start + length)` as in use
    fn mark_used(&mut self, start: u64, length: u64) -> Result<()>;

    /// Mark `[start, start + length)` as free
    fn mark_free(&mut self, start: u64, length: u64) -> Result<()>;

    /// Count used clusters in `[start, end)`
    fn count_used(&self, start: u64, end: u64) -> u64 {
        (start..end).filter(|&cluster| self.is_used(cluster)).count() as u64
    }
}

impl<B: ClusterBitmap + ?Sized> ClusterBitmap for &mut B {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn is_used(&self, cluster: u64) -> bool {
        (**self).is_used(cluster)
    }

    fn mark_used(&mut self, start: u64, length: u64) -> Result<()> {
        (**self).mark_used(start, length)
    }

    fn mark_free(&mut self, start: u64, length: u64) -> Result<()> {
        (**self).mark_free(start, length)
    }

    fn count_used(&self, start: u64, end: u64) -> u64 {
        (**self).count_used(start, end)
    }
}
