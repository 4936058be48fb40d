//! Disk enumeration and payload installation.

use super::{format_size, ExitInfo};
use crate::HalResult;
use bootpatch_core::Progress;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskInfo {
    /// Device identifier, e.g. `disk2`.
    pub id: String,
    pub name: String,
    pub size_bytes: u64,
}

impl DiskInfo {
    pub fn label(&self) -> String {
        format!("{}: {} ({})", self.id, self.name, format_size(self.size_bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    /// Device identifier, e.g. `disk2s1`.
    pub id: String,
    pub name: String,
    pub size_bytes: u64,
}

impl PartitionInfo {
    pub fn label(&self) -> String {
        format!("{}: {} ({})", self.id, self.name, format_size(self.size_bytes))
    }
}

pub trait DiskOps {
    /// Disks carrying a FAT32 or GUID partition map.
    fn list_disks(&self) -> HalResult<Vec<DiskInfo>>;

    /// EFI-capable partitions on `disk`.
    fn list_partitions(&self, disk: &DiskInfo) -> HalResult<Vec<PartitionInfo>>;

    /// Copy the built payload onto `partition`.
    fn install_to(
        &self,
        disk: &DiskInfo,
        partition: &PartitionInfo,
        out: &mut dyn Progress,
    ) -> HalResult<ExitInfo>;
}
