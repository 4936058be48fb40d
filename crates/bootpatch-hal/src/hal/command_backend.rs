//! Real backend: drives the external patcher launcher.
//!
//! Queries run the launcher unprivileged and parse JSON from its stdout.
//! Operations that modify the system run through the privilege helper and
//! stream their stdout line by line into the caller's progress sink.

use super::process_ops::{checked_stdout, stream_lines};
use super::{
    BuildOps, CatalogEntry, DiskInfo, DiskOps, ExitInfo, HostProbeOps, InstallerOps,
    LocalInstaller, PartitionInfo, PatchOps,
};
use crate::{HalError, HalResult};
use bootpatch_core::{
    ConfigurationRecord, DefaultsProbe, FeatureFlag, FlagSet, OsRelease, PatchSet,
    PatcherSettings, Progress, SystemFacts,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

const QUERY_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct HostReport {
    model: String,
    os_version: String,
}

#[derive(Debug, Clone)]
pub struct CommandBackend {
    helper: PathBuf,
    launcher: PathBuf,
    script: Option<PathBuf>,
    timeout: Duration,
}

impl CommandBackend {
    pub fn new(settings: &PatcherSettings) -> Self {
        Self {
            helper: settings.helper_path.clone(),
            launcher: settings.launcher_binary.clone(),
            script: settings.launcher_script.clone(),
            timeout: Duration::from_secs(settings.command_timeout_secs),
        }
    }

    /// `[helper?] launcher [script] args...`
    pub fn launcher_argv(&self, privileged: bool, args: &[&str]) -> Vec<String> {
        let mut argv = Vec::with_capacity(args.len() + 3);
        if privileged {
            argv.push(self.helper.display().to_string());
        }
        argv.push(self.launcher.display().to_string());
        if let Some(script) = &self.script {
            argv.push(script.display().to_string());
        }
        argv.extend(args.iter().map(|a| a.to_string()));
        argv
    }

    /// Arguments for rolling the root volume back to its sealed snapshot.
    pub fn revert_argv(&self) -> Vec<String> {
        self.launcher_argv(true, &["--unpatch_sys_vol"])
    }

    fn command(argv: &[String]) -> HalResult<(String, Command)> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| HalError::Other("empty command line".to_string()))?;
        let mut cmd = Command::new(program);
        cmd.args(args);
        Ok((program.clone(), cmd))
    }

    fn query<T: DeserializeOwned>(&self, args: &[&str]) -> HalResult<T> {
        let argv = self.launcher_argv(false, args);
        log::debug!("query: {}", argv.join(" "));
        let (program, mut cmd) = Self::command(&argv)?;
        let stdout = checked_stdout(&program, &mut cmd, QUERY_TIMEOUT)?;
        serde_json::from_str(&stdout)
            .map_err(|e| HalError::Parse(format!("{} {}: {}", program, args.join(" "), e)))
    }

    fn stream(&self, argv: Vec<String>, out: &mut dyn Progress) -> HalResult<ExitInfo> {
        log::info!("run: {}", argv.join(" "));
        let (program, mut cmd) = Self::command(&argv)?;
        let exit = stream_lines(&program, &mut cmd, self.timeout, &mut |line| out.line(line))?;
        log::info!("{} finished: {:?}", program, exit.code);
        Ok(exit)
    }
}

fn build_args(model: &str, record: &ConfigurationRecord) -> Vec<String> {
    let gpu = record.gpu_selection();
    let mut args = vec![
        "--build".to_string(),
        "--model".to_string(),
        model.to_string(),
        "--variant".to_string(),
        record.build_variant().to_string(),
        "--serial".to_string(),
        record.serial_policy().as_str().to_string(),
        "--gpu-vendor".to_string(),
        gpu.vendor.to_string(),
    ];
    if let Some(gpu_model) = gpu.model {
        args.push("--gpu-model".to_string());
        args.push(gpu_model.to_string());
    }
    if gpu.metal_build {
        args.push("--metal-build".to_string());
    }
    for (flag, value) in record.flags() {
        args.push("--flag".to_string());
        args.push(format!("{}={}", flag.key(), value));
    }
    args
}

impl HostProbeOps for CommandBackend {
    fn detect_facts(&self) -> HalResult<SystemFacts> {
        let report: HostReport = self.query(&["--detect_host"])?;
        let os = OsRelease::from_product_version(&report.os_version)
            .map_err(|e| HalError::Parse(e.to_string()))?;
        Ok(SystemFacts::new(report.model, os))
    }
}

impl DefaultsProbe for CommandBackend {
    fn probe_defaults(&self, model: &str, is_detected: bool) -> HalResult<FlagSet> {
        let mut args = vec!["--probe_defaults", "--model", model];
        if is_detected {
            args.push("--detected");
        }
        let raw: BTreeMap<String, bool> = self.query(&args)?;
        let mut flags = FlagSet::new();
        for (key, value) in raw {
            match key.parse::<FeatureFlag>() {
                Ok(flag) => {
                    flags.insert(flag, value);
                }
                Err(err) => log::warn!("ignoring default from launcher: {}", err),
            }
        }
        Ok(flags)
    }
}

impl BuildOps for CommandBackend {
    fn build(
        &self,
        model: &str,
        record: &ConfigurationRecord,
        out: &mut dyn Progress,
    ) -> HalResult<ExitInfo> {
        let args = build_args(model, record);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.stream(self.launcher_argv(false, &args), out)
    }
}

impl DiskOps for CommandBackend {
    fn list_disks(&self) -> HalResult<Vec<DiskInfo>> {
        self.query(&["--list_disks"])
    }

    fn list_partitions(&self, disk: &DiskInfo) -> HalResult<Vec<PartitionInfo>> {
        self.query(&["--list_partitions", "--disk", &disk.id])
    }

    fn install_to(
        &self,
        disk: &DiskInfo,
        partition: &PartitionInfo,
        out: &mut dyn Progress,
    ) -> HalResult<ExitInfo> {
        let argv = self.launcher_argv(
            true,
            &["--install_efi", "--disk", &disk.id, "--partition", &partition.id],
        );
        self.stream(argv, out)
    }
}

impl PatchOps for CommandBackend {
    fn detect_patches(&self, model: &str, record: &ConfigurationRecord) -> HalResult<PatchSet> {
        let gpu = record.gpu_selection();
        self.query(&[
            "--detect_patches",
            "--model",
            model,
            "--gpu-vendor",
            gpu.vendor,
        ])
    }

    fn apply_patches(&self, out: &mut dyn Progress) -> HalResult<ExitInfo> {
        self.stream(self.launcher_argv(true, &["--patch_sys_vol"]), out)
    }

    fn revert_patches(&self, out: &mut dyn Progress) -> HalResult<ExitInfo> {
        self.stream(self.revert_argv(), out)
    }
}

impl InstallerOps for CommandBackend {
    fn list_downloadable(&self, payload_path: &Path, seed: &str) -> HalResult<Vec<CatalogEntry>> {
        let payload = payload_path.display().to_string();
        self.query(&["--list_installers", "--seed", seed, "--payload", &payload])
    }

    fn download(
        &self,
        payload_path: &Path,
        entry: &CatalogEntry,
        out: &mut dyn Progress,
    ) -> HalResult<ExitInfo> {
        let payload = payload_path.display().to_string();
        let argv = self.launcher_argv(
            false,
            &["--download_installer", "--url", &entry.url, "--payload", &payload],
        );
        self.stream(argv, out)
    }

    fn install_assistant(&self, payload_path: &Path, out: &mut dyn Progress) -> HalResult<ExitInfo> {
        let payload = payload_path.display().to_string();
        let argv = self.launcher_argv(true, &["--install_assistant", "--payload", &payload]);
        self.stream(argv, out)
    }

    fn list_local_installers(&self) -> HalResult<Vec<LocalInstaller>> {
        self.query(&["--list_local_installers"])
    }

    fn list_formattable_disks(&self) -> HalResult<Vec<DiskInfo>> {
        self.query(&["--list_usb_disks"])
    }

    fn generate_creation_script(
        &self,
        script_path: &Path,
        installer: &LocalInstaller,
        disk: &DiskInfo,
    ) -> HalResult<bool> {
        let script = script_path.display().to_string();
        let installer_path = installer.path.display().to_string();
        self.query(&[
            "--create_installer_script",
            "--script",
            &script,
            "--installer",
            &installer_path,
            "--disk",
            &disk.id,
        ])
    }

    fn run_creation_script(
        &self,
        script_path: &Path,
        out: &mut dyn Progress,
    ) -> HalResult<ExitInfo> {
        let argv = vec![
            self.helper.display().to_string(),
            "/bin/sh".to_string(),
            script_path.display().to_string(),
        ];
        self.stream(argv, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootpatch_core::ConfigurationStore;

    fn backend(script: Option<&str>) -> CommandBackend {
        let settings = PatcherSettings {
            helper_path: PathBuf::from("/opt/helper"),
            launcher_binary: PathBuf::from("/opt/patcher"),
            launcher_script: script.map(PathBuf::from),
            ..PatcherSettings::default()
        };
        CommandBackend::new(&settings)
    }

    #[test]
    fn revert_runs_launcher_through_helper() {
        assert_eq!(
            backend(None).revert_argv(),
            vec!["/opt/helper", "/opt/patcher", "--unpatch_sys_vol"]
        );
        assert_eq!(
            backend(Some("/opt/patcher.py")).revert_argv(),
            vec!["/opt/helper", "/opt/patcher", "/opt/patcher.py", "--unpatch_sys_vol"]
        );
    }

    #[test]
    fn build_args_carry_gpu_and_variant() {
        let store = ConfigurationStore::new("MacPro5,1");
        let args = build_args("MacPro5,1", store.record());
        assert_eq!(
            &args[..7],
            ["--build", "--model", "MacPro5,1", "--variant", "RELEASE", "--serial", "Minimal"]
        );
        assert!(args.contains(&"sip_enabled=true".to_string()));
        assert!(!args.contains(&"--metal-build".to_string()));
    }
}
