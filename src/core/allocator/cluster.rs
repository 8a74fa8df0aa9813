//! Zoned cluster allocator
//!
//! Strategy for ordinary data (stops as soon as the request is covered):
//! 1. Extend the caller's proposed run
//! 2. One exact-fit contiguous run in `[total/8, total)`
//! 3. Any free clusters in `[total/8, total)`
//! 4. Any free clusters in `[total/16, total/8)`
//! 5. Any free clusters in `[total/32, total/16)`
//! 6. Any free clusters in `[0, total/32)`
//!
//! Metadata-table growth extends the proposed run, then takes free clusters
//! from cluster 0 upward across the whole volume.
//!
//! Data scans resume from a persisted cursor, so repeated allocations walk
//! each zone round-robin instead of rescanning its head.

use crate::allocator::range::{total_length, ClusterRange};
use crate::allocator::ClusterBitmap;
use crate::error::{AllocError, Result};
use crate::geometry::VolumeGeometry;
use tracing::{debug, trace, warn};

/// One rung of the search ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScanZone {
    start: u64,
    end: u64,
    contiguous: bool,
    headroom: u64,
}

/// Zone ladder for data allocations
///
/// Boundaries are recomputed from `total` on every call.
fn data_ladder(total: u64, total_size_after: u64) -> [ScanZone; 5] {
    let headroom = total_size_after / 4;
    [
        ScanZone {
            start: total / 8,
            end: total,
            contiguous: true,
            headroom,
        },
        ScanZone {
            start: total / 8,
            end: total,
            contiguous: false,
            headroom,
        },
        ScanZone {
            start: total / 16,
            end: total / 8,
            contiguous: false,
            headroom: 0,
        },
        ScanZone {
            start: total / 32,
            end: total / 16,
            contiguous: false,
            headroom: 0,
        },
        ScanZone {
            start: 0,
            end: total / 32,
            contiguous: false,
            headroom: 0,
        },
    ]
}

/// Free-space allocator for one mounted volume
///
/// Not internally synchronized: callers serialize `allocate` and `free`
/// against a given bitmap.
#[derive(Debug)]
pub struct ClusterAllocator<B> {
    /// Bit per cluster, set = in use
    bitmap: B,

    /// Clusters on the volume; fixed for the allocator's lifetime
    total_clusters: u64,

    /// Where the next data scan resumes
    scan_cursor: u64,
}

impl<B: ClusterBitmap> ClusterAllocator<B> {
    /// Create an allocator over the first `total_clusters` bits of `bitmap`
    ///
    /// # Errors
    ///
    /// Returns `InvalidGeometry` if the bitmap is shorter than the volume.
    pub fn new(bitmap: B, total_clusters: u64) -> Result<Self> {
        if bitmap.len() < total_clusters {
            return Err(AllocError::InvalidGeometry(format!(
                "bitmap describes {} clusters but the volume has {}",
                bitmap.len(),
                total_clusters
            )));
        }

        debug!("Created cluster allocator for {} clusters", total_clusters);

        Ok(ClusterAllocator {
            bitmap,
            total_clusters,
            scan_cursor: 0,
        })
    }

    /// Create an allocator sized from the volume geometry
    pub fn with_geometry(bitmap: B, geometry: &VolumeGeometry) -> Result<Self> {
        geometry.validate()?;
        Self::new(bitmap, geometry.total_clusters())
    }

    pub fn total_clusters(&self) -> u64 {
        self.total_clusters
    }

    /// Position the next data scan resumes from
    pub fn scan_cursor(&self) -> u64 {
        self.scan_cursor
    }

    pub fn bitmap(&self) -> &B {
        &self.bitmap
    }

    pub fn into_bitmap(self) -> B {
        self.bitmap
    }

    /// Allocate `count` clusters
    ///
    /// `proposed_start` is a cluster the caller expects to be free, usually
    /// the one after a file's last run. `is_metadata` selects the metadata
    /// table policy. `total_size_after` is the file's size in clusters once
    /// this allocation lands; a quarter of it is skipped past the allocated
    /// region before the next data scan.
    ///
    /// Returns runs in discovery order whose lengths sum to `count`. On
    /// failure every cluster taken during the call is released again.
    pub fn allocate(
        &mut self,
        count: u64,
        proposed_start: Option<u64>,
        is_metadata: bool,
        total_size_after: u64,
    ) -> Result<Vec<ClusterRange>> {
        if count == 0 {
            return Err(AllocError::InvalidCount);
        }
        if let Some(start) = proposed_start {
            if start >= self.total_clusters {
                return Err(AllocError::InvalidRange {
                    start,
                    length: count,
                    total: self.total_clusters,
                });
            }
        }

        debug!(
            "Allocating {} clusters (hint {:?}, metadata {}, size after {})",
            count, proposed_start, is_metadata, total_size_after
        );

        let mut runs = Vec::new();
        let outcome = self.search(count, proposed_start, is_metadata, total_size_after, &mut runs);
        let found = match outcome {
            Ok(found) => found,
            Err(err) => {
                if let Err(rollback_err) = self.free(&runs) {
                    warn!("Rollback after failed allocation also failed: {}", rollback_err);
                }
                return Err(err);
            }
        };

        if found < count {
            warn!(
                "Out of space: wanted {} clusters, found {}; releasing {} runs",
                count,
                found,
                runs.len()
            );
            self.free(&runs)?;
            return Err(AllocError::OutOfSpace {
                requested: count,
                found,
            });
        }

        debug_assert_eq!(total_length(&runs), count);
        debug!("Allocated {} clusters in {} runs", count, runs.len());
        Ok(runs)
    }

    fn search(
        &mut self,
        count: u64,
        proposed_start: Option<u64>,
        is_metadata: bool,
        total_size_after: u64,
        runs: &mut Vec<ClusterRange>,
    ) -> Result<u64> {
        let total = self.total_clusters;
        let mut found = 0;

        if let Some(start) = proposed_start {
            found += self.extend_run(count, start, total, runs)?;
        }

        if is_metadata {
            if found < count {
                let zone = ScanZone {
                    start: 0,
                    end: total,
                    contiguous: false,
                    headroom: 0,
                };
                found += self.find_clusters(count - found, zone, true, runs)?;
            }
            return Ok(found);
        }

        for zone in data_ladder(total, total_size_after) {
            if found >= count {
                break;
            }
            found += self.find_clusters(count - found, zone, false, runs)?;
        }

        Ok(found)
    }

    /// Grow a run forward from `start` while clusters stay free
    ///
    /// Covers at most `count` clusters and stops before `end`.
    fn extend_run(
        &mut self,
        count: u64,
        start: u64,
        end: u64,
        runs: &mut Vec<ClusterRange>,
    ) -> Result<u64> {
        let mut focus = start;
        while focus < end && focus - start < count && !self.bitmap.is_used(focus) {
            focus += 1;
        }

        let found = focus - start;
        if found > 0 {
            self.bitmap.mark_used(start, found)?;
            runs.push(ClusterRange::new(start, found)?);
        }

        trace!("Extended run at {} by {} clusters", start, found);
        Ok(found)
    }

    /// Circular scan of one zone for up to `count` free clusters
    ///
    /// Inspects at most `end - start` clusters. Contiguous scans only accept
    /// a run exactly as long as what is still needed.
    fn find_clusters(
        &mut self,
        count: u64,
        zone: ScanZone,
        is_metadata: bool,
        runs: &mut Vec<ClusterRange>,
    ) -> Result<u64> {
        let ScanZone {
            start,
            end,
            contiguous,
            headroom,
        } = zone;

        let mut focus = if is_metadata {
            start
        } else if self.scan_cursor >= start && self.scan_cursor < end {
            self.scan_cursor
        } else {
            start
        };

        let width = end.saturating_sub(start);
        let mut inspected = 0u64;
        let mut found = 0u64;

        while found < count && inspected < width {
            if !self.bitmap.is_used(focus) {
                let run_start = focus;
                let need = count - found;
                focus += 1;

                while focus < end && focus - run_start < need && !self.bitmap.is_used(focus) {
                    focus += 1;
                    inspected += 1;
                }

                let length = focus - run_start;
                if !contiguous || length == need {
                    self.bitmap.mark_used(run_start, length)?;
                    runs.push(ClusterRange::new(run_start, length)?);
                    found += length;
                }
            } else {
                focus += 1;
            }

            inspected += 1;
            if focus >= end {
                focus = start;
            }
        }

        if !is_metadata {
            self.scan_cursor = focus.saturating_add(headroom);
        }

        trace!(
            "Scanned [{}, {}) contiguous={}: found {} of {}, cursor {}",
            start,
            end,
            contiguous,
            found,
            count,
            self.scan_cursor
        );
        Ok(found)
    }

    /// Release runs back to the bitmap
    ///
    /// Every run is bounds-checked before any bit changes.
    pub fn free(&mut self, runs: &[ClusterRange]) -> Result<()> {
        for run in runs {
            self.check_range(run)?;
        }

        for run in runs {
            self.bitmap.mark_free(run.start(), run.length())?;
        }

        debug!(
            "Freed {} clusters in {} runs",
            total_length(runs),
            runs.len()
        );
        Ok(())
    }

    /// Reserve a specific run regardless of the allocation policy
    ///
    /// Used for fixed structures such as the boot region at format time.
    pub fn mark_allocated(&mut self, run: ClusterRange) -> Result<()> {
        self.check_range(&run)?;
        self.bitmap.mark_used(run.start(), run.length())?;
        debug!("Reserved clusters [{}, {})", run.start(), run.end());
        Ok(())
    }

    /// Check whether a cluster is in use
    pub fn is_allocated(&self, cluster: u64) -> Result<bool> {
        if cluster >= self.total_clusters {
            return Err(AllocError::InvalidRange {
                start: cluster,
                length: 1,
                total: self.total_clusters,
            });
        }
        Ok(self.bitmap.is_used(cluster))
    }

    pub fn used_clusters(&self) -> u64 {
        self.bitmap.count_used(0, self.total_clusters)
    }

    pub fn free_clusters(&self) -> u64 {
        self.total_clusters - self.used_clusters()
    }

    /// Maximal free runs in ascending order
    pub fn free_runs(&self) -> Vec<ClusterRange> {
        let mut free = Vec::new();
        let mut run_start: Option<u64> = None;

        for cluster in 0..self.total_clusters {
            match (self.bitmap.is_used(cluster), run_start) {
                (false, None) => run_start = Some(cluster),
                (true, Some(start)) => {
                    free.push(ClusterRange::from_bounds(start, cluster));
                    run_start = None;
                }
                _ => {}
            }
        }

        if let Some(start) = run_start {
            free.push(ClusterRange::from_bounds(start, self.total_clusters));
        }

        free
    }

    fn check_range(&self, run: &ClusterRange) -> Result<()> {
        if !run.fits_within(self.total_clusters) {
            return Err(AllocError::InvalidRange {
                start: run.start(),
                length: run.length(),
                total: self.total_clusters,
            });
        }
        Ok(())
    }
}
