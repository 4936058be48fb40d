//! Settings file (`settings.toml`): where the external tools live and how
//! the session starts.

use crate::flags::{FeatureFlag, FlagSet};
use anyhow::{Context, Result};
use bootpatch_error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatcherSettings {
    /// Privilege helper every privileged invocation is prefixed with.
    pub helper_path: PathBuf,
    pub launcher_binary: PathBuf,
    /// Script passed to the launcher when it is an interpreter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launcher_script: Option<PathBuf>,
    pub payload_path: PathBuf,
    pub installer_sh_path: PathBuf,
    pub catalog_seed: String,
    pub command_timeout_secs: u64,
    pub log_path: PathBuf,
    /// Initial flag values by flag key, applied after the defaults probe.
    pub flags: BTreeMap<String, bool>,
}

impl Default for PatcherSettings {
    fn default() -> Self {
        let home = home_dir();
        Self {
            helper_path: PathBuf::from("/usr/local/libexec/bootpatch-helper"),
            launcher_binary: PathBuf::from("/usr/local/bin/bootpatch-launcher"),
            launcher_script: None,
            payload_path: home.join("Library/Application Support/bootpatch/payloads"),
            installer_sh_path: home.join("Library/Application Support/bootpatch/Installer.sh"),
            catalog_seed: "PublicSeed".to_string(),
            command_timeout_secs: 3600,
            log_path: home.join("Library/Logs/bootpatch/bootpatch.log"),
            flags: BTreeMap::new(),
        }
    }
}

impl PatcherSettings {
    pub fn default_path() -> PathBuf {
        home_dir().join(".config/bootpatch/settings.toml")
    }

    /// Load from `path`, or the default location. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            log::info!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid settings file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let settings: PatcherSettings = toml::from_str(text).context("failed to parse settings TOML")?;
        settings.flag_overrides()?;
        Ok(settings)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("failed to serialize settings")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_toml()?)
            .with_context(|| format!("failed to write settings file {}", path.display()))
    }

    pub fn flag_overrides(&self) -> Result<FlagSet, ConfigurationError> {
        self.flags
            .iter()
            .map(|(key, value)| Ok((key.parse::<FeatureFlag>()?, *value)))
            .collect()
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = PatcherSettings::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(settings, PatcherSettings::default());
        assert_eq!(settings.catalog_seed, "PublicSeed");
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            r#"
helper_path = "/opt/helper"
command_timeout_secs = 5

[flags]
verbose_debug = true
sip_enabled = false
"#,
        )
        .unwrap();
        let settings = PatcherSettings::load(Some(&path)).unwrap();
        assert_eq!(settings.helper_path, PathBuf::from("/opt/helper"));
        assert_eq!(settings.command_timeout_secs, 5);
        assert_eq!(settings.catalog_seed, "PublicSeed");

        let overrides = settings.flag_overrides().unwrap();
        assert_eq!(overrides.get(&FeatureFlag::VerboseDebug), Some(&true));
        assert_eq!(overrides.get(&FeatureFlag::SipEnabled), Some(&false));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = PatcherSettings::parse("[flags]\nwarp_drive = true\n").unwrap_err();
        assert!(format!("{:#}", err).contains("warp_drive"));
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/settings.toml");
        let mut settings = PatcherSettings::default();
        settings.launcher_script = Some(PathBuf::from("/opt/launcher.py"));
        settings.flags.insert("kext_debug".into(), true);
        settings.save(&path).unwrap();
        assert_eq!(PatcherSettings::load(Some(&path)).unwrap(), settings);
    }
}
