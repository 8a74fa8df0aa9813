//! Volume geometry
//!
//! The allocator only needs the cluster count, derived from the size of the
//! backing store and the cluster size. Geometry can be built in code or
//! loaded from a TOML document:
//!
//! ```toml
//! volume_size = 1073741824
//! cluster_size = 4096
//! ```

use crate::error::{AllocError, Result};
use serde::{Deserialize, Serialize};

/// Size of the backing store and its allocation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeGeometry {
    /// Length of the backing store in bytes
    pub volume_size: u64,
    /// Bytes per cluster
    pub cluster_size: u32,
}

impl VolumeGeometry {
    /// Create a validated geometry
    ///
    /// # Errors
    ///
    /// Returns `InvalidGeometry` if the cluster size is zero or not a power of two.
    pub fn new(volume_size: u64, cluster_size: u32) -> Result<Self> {
        let geometry = VolumeGeometry {
            volume_size,
            cluster_size,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Parse and validate geometry from TOML
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let geometry: VolumeGeometry = toml::from_str(source)?;
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cluster_size == 0 || !self.cluster_size.is_power_of_two() {
            return Err(AllocError::InvalidGeometry(format!(
                "cluster size {} is not a non-zero power of two",
                self.cluster_size
            )));
        }
        Ok(())
    }

    /// Whole clusters on the volume; a trailing partial cluster is unusable
    pub fn total_clusters(&self) -> u64 {
        self.volume_size / self.cluster_size as u64
    }

    /// Size of the on-disk bitmap stream, padded to a multiple of 8 bytes
    pub fn bitmap_bytes(&self) -> u64 {
        padded_bitmap_bytes(self.total_clusters())
    }
}

/// Bytes needed for `clusters` bits, rounded up to a multiple of 8
pub(crate) fn padded_bitmap_bytes(clusters: u64) -> u64 {
    let raw = (clusters + 7) / 8;
    (raw + 7) / 8 * 8
}
