//! Scripted backend for `--demo`: nothing outside the process is touched.

use bootpatch_core::{FeatureFlag, OsRelease, PatchSet};
use bootpatch_hal::hal::{CatalogEntry, DiskInfo, LocalInstaller, PartitionInfo};
use bootpatch_hal::FakeHal;
use std::path::PathBuf;

pub fn demo_hal() -> FakeHal {
    let patches: PatchSet = [
        ("Graphics: Nvidia Kepler", true),
        ("Networking: Modern Wireless", true),
        ("Settings: Requires AMFIPass", false),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value))
    .collect();

    FakeHal::new()
        .with_facts("MacPro5,1", OsRelease::MONTEREY)
        .with_defaults(
            "MacPro5,1",
            [(FeatureFlag::SipEnabled, false)].into_iter().collect(),
        )
        .with_disks(vec![DiskInfo {
            id: "disk0".into(),
            name: "APPLE SSD SM0512F".into(),
            size_bytes: 500_277_790_720,
        }])
        .with_partitions(
            "disk0",
            vec![PartitionInfo {
                id: "disk0s1".into(),
                name: "EFI".into(),
                size_bytes: 209_715_200,
            }],
        )
        .with_patches(patches)
        .with_catalog(vec![CatalogEntry {
            title: "macOS Monterey".into(),
            version: "12.6.1".into(),
            build: "21G217".into(),
            size_bytes: 12_219_805_904,
            source: "PublicRelease".into(),
            url: "https://swcdn.apple.com/content/downloads/InstallAssistant.pkg".into(),
        }])
        .with_local_installers(vec![LocalInstaller {
            name: "Install macOS Monterey".into(),
            version: "12.6.1".into(),
            build: "21G217".into(),
            path: PathBuf::from("/Applications/Install macOS Monterey.app"),
        }])
        .with_usb_disks(vec![
            DiskInfo {
                id: "disk4".into(),
                name: "SanDisk Ultra".into(),
                size_bytes: 32_017_047_552,
            },
            DiskInfo {
                id: "disk5".into(),
                name: "Kingston DataTraveler".into(),
                size_bytes: 7_751_073_792,
            },
        ])
        .with_output("build", &["Adding kexts", "Patching config.plist", "Done"])
        .with_output("install_to", &["Mounting disk0s1", "Copying EFI folder"])
        .with_output("apply_patches", &["Mounting root volume", "Installing Kepler drivers"])
        .with_output("revert_patches", &["Reverting to last sealed snapshot"])
        .with_output("download", &["25%", "50%", "75%", "100%"])
        .with_output("install_assistant", &["Installing InstallAssistant.pkg"])
        .with_output("run_creation_script", &["Erasing disk4", "Copying installer"])
}
