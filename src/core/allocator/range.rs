//! Cluster runs
//!
//! A run is a half-open span `[start, start + length)` of clusters. Every
//! allocation result is an ordered list of runs.

use crate::error::{AllocError, Result};
use serde::{Deserialize, Serialize};

/// A contiguous run of clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawClusterRange")]
pub struct ClusterRange {
    /// First cluster of the run
    start: u64,
    /// Number of clusters in the run (never zero)
    length: u64,
}

impl ClusterRange {
    /// Create a run, rejecting zero length
    pub fn new(start: u64, length: u64) -> Result<Self> {
        if length == 0 {
            return Err(AllocError::ZeroLengthRange { start });
        }
        if start.checked_add(length).is_none() {
            return Err(AllocError::InvalidRange {
                start,
                length,
                total: u64::MAX,
            });
        }
        Ok(ClusterRange { start, length })
    }

    /// Run covering `[start, end)`; callers guarantee `start < end`
    pub(crate) fn from_bounds(start: u64, end: u64) -> Self {
        debug_assert!(start < end);
        ClusterRange {
            start,
            length: end - start,
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// One past the last cluster of the run
    pub fn end(&self) -> u64 {
        self.start + self.length
    }

    /// Check if this run contains a cluster
    pub fn contains(&self, cluster: u64) -> bool {
        cluster >= self.start && cluster < self.end()
    }

    /// Check if two runs share at least one cluster
    pub fn overlaps(&self, other: &ClusterRange) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    /// Check if this run touches another without overlapping
    pub fn is_adjacent(&self, other: &ClusterRange) -> bool {
        self.end() == other.start || other.end() == self.start
    }

    /// Check the run lies entirely within `[0, total)`
    pub fn fits_within(&self, total: u64) -> bool {
        self.end() <= total
    }
}

/// Unchecked wire form, validated through [`ClusterRange::new`]
#[derive(Deserialize)]
struct RawClusterRange {
    start: u64,
    length: u64,
}

impl TryFrom<RawClusterRange> for ClusterRange {
    type Error = AllocError;

    fn try_from(raw: RawClusterRange) -> Result<Self> {
        ClusterRange::new(raw.start, raw.length)
    }
}

/// Sum of the lengths of a run list
pub fn total_length(runs: &[ClusterRange]) -> u64 {
    runs.iter().map(ClusterRange::length).sum()
}
