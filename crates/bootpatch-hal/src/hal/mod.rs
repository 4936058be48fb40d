//! HAL trait definitions and implementations.
//!
//! This module defines the collaborator traits the workflow calls and
//! provides both the real (CommandBackend) and fake (FakeHal) implementations.

pub mod build_ops;
pub mod command_backend;
pub mod disk_ops;
pub mod fake_hal;
pub mod installer_ops;
pub mod patch_ops;
pub mod probe_ops;
pub mod process_ops;

pub use build_ops::BuildOps;
pub use command_backend::CommandBackend;
pub use disk_ops::{DiskInfo, DiskOps, PartitionInfo};
pub use fake_hal::{FakeFailure, FakeHal, Operation};
pub use installer_ops::{CatalogEntry, InstallerOps, LocalInstaller, MIN_USB_BYTES};
pub use patch_ops::PatchOps;
pub use probe_ops::HostProbeOps;
pub use process_ops::ExitInfo;

use bootpatch_core::DefaultsProbe;

/// Complete HAL combining all collaborator traits.
pub trait SystemHal:
    HostProbeOps + DefaultsProbe + BuildOps + DiskOps + PatchOps + InstallerOps + Send + Sync
{
}

/// Automatically implement SystemHal for any type implementing all required traits.
impl<T> SystemHal for T where
    T: HostProbeOps + DefaultsProbe + BuildOps + DiskOps + PatchOps + InstallerOps + Send + Sync
{
}

/// `12.3 GB` style size, decimal units as disk vendors print them.
pub(crate) fn format_size(bytes: u64) -> String {
    const GB: f64 = 1_000_000_000.0;
    const MB: f64 = 1_000_000.0;
    let bytes = bytes as f64;
    if bytes >= GB {
        format!("{:.1} GB", bytes / GB)
    } else {
        format!("{:.1} MB", bytes / MB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_use_decimal_units() {
        assert_eq!(format_size(32_017_047_552), "32.0 GB");
        assert_eq!(format_size(209_715_200), "209.7 MB");
    }
}
