//! OS installer catalog, download and USB installer creation.

use super::{format_size, DiskInfo, ExitInfo};
use crate::HalResult;
use bootpatch_core::Progress;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Smallest USB disk an installer fits on.
pub const MIN_USB_BYTES: u64 = 14_000_000_000;

/// Installer offered by the update catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    pub version: String,
    pub build: String,
    #[serde(alias = "size")]
    pub size_bytes: u64,
    /// Catalog the entry came from (public, beta, ...).
    pub source: String,
    #[serde(alias = "link")]
    pub url: String,
}

impl CatalogEntry {
    pub fn label(&self) -> String {
        format!(
            "{} {} ({}) - {}",
            self.title,
            self.version,
            self.build,
            format_size(self.size_bytes)
        )
    }
}

/// Installer application already present on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalInstaller {
    pub name: String,
    pub version: String,
    pub build: String,
    pub path: PathBuf,
}

impl LocalInstaller {
    pub fn label(&self) -> String {
        format!("{}: {} ({})", self.name, self.version, self.build)
    }
}

pub trait InstallerOps {
    fn list_downloadable(&self, payload_path: &Path, seed: &str) -> HalResult<Vec<CatalogEntry>>;

    /// Download the installer package into `payload_path`.
    fn download(
        &self,
        payload_path: &Path,
        entry: &CatalogEntry,
        out: &mut dyn Progress,
    ) -> HalResult<ExitInfo>;

    /// Unpack a downloaded package into an installer application.
    fn install_assistant(&self, payload_path: &Path, out: &mut dyn Progress) -> HalResult<ExitInfo>;

    fn list_local_installers(&self) -> HalResult<Vec<LocalInstaller>>;

    /// Removable disks that may be erased for an installer.
    fn list_formattable_disks(&self) -> HalResult<Vec<DiskInfo>>;

    /// Write the creation script to `script_path`. `false` means the
    /// collaborator refused (unsupported installer or disk).
    fn generate_creation_script(
        &self,
        script_path: &Path,
        installer: &LocalInstaller,
        disk: &DiskInfo,
    ) -> HalResult<bool>;

    /// Run a generated creation script with elevated privileges.
    fn run_creation_script(&self, script_path: &Path, out: &mut dyn Progress)
        -> HalResult<ExitInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_label_shows_formatted_size() {
        let entry: CatalogEntry = serde_json::from_str(
            r#"{
                "title": "macOS Monterey",
                "version": "12.6.1",
                "build": "21G217",
                "size": 12219805904,
                "source": "PublicRelease",
                "link": "https://swcdn.apple.com/InstallAssistant.pkg"
            }"#,
        )
        .unwrap();
        assert_eq!(entry.size_bytes, 12_219_805_904);
        assert_eq!(entry.source, "PublicRelease");
        assert_eq!(entry.url, "https://swcdn.apple.com/InstallAssistant.pkg");
        assert_eq!(entry.label(), "macOS Monterey 12.6.1 (21G217) - 12.2 GB");
    }
}
