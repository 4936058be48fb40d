#![cfg(unix)]

use bootpatch_core::{DefaultsProbe, FeatureFlag, OsRelease, PatcherSettings, Sink, SinkMode};
use bootpatch_hal::hal::{DiskInfo, DiskOps, HostProbeOps, InstallerOps, LocalInstaller, PatchOps};
use bootpatch_hal::{CommandBackend, HalError};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const LAUNCHER: &str = r#"#!/bin/sh
case "$1" in
  --detect_host) echo '{"model":"MacBookPro8,1","os_version":"10.15.7"}' ;;
  --probe_defaults) echo '{"sip_enabled": false, "future_flag": true}' ;;
  --list_disks) echo '[{"id":"disk2","name":"USB","size_bytes":32000000000}]' ;;
  --list_local_installers) echo 'not json' ;;
  --patch_sys_vol) echo "Patching"; echo "Done" ;;
  --unpatch_sys_vol) echo "Reverting"; echo "snapshot missing" >&2; exit 4 ;;
  --create_installer_script) printf 'echo creating\necho created\n' > "$3"; echo true ;;
  *) echo "unknown $1" >&2; exit 1 ;;
esac
"#;

fn write_launcher(dir: &Path) -> PathBuf {
    let path = dir.join("launcher.sh");
    fs::write(&path, LAUNCHER).unwrap();
    path
}

fn backend() -> (TempDir, CommandBackend) {
    let dir = tempdir().unwrap();
    let settings = PatcherSettings {
        helper_path: PathBuf::from("/usr/bin/env"),
        launcher_binary: PathBuf::from("/bin/sh"),
        launcher_script: Some(write_launcher(dir.path())),
        command_timeout_secs: 30,
        ..PatcherSettings::default()
    };
    (dir, CommandBackend::new(&settings))
}

#[test]
fn detects_host_facts_from_json() {
    let (_dir, backend) = backend();
    let facts = backend.detect_facts().unwrap();
    assert_eq!(facts.detected_model, "MacBookPro8,1");
    assert_eq!(facts.detected_os, OsRelease::CATALINA);
}

#[test]
fn probe_defaults_skips_unknown_flags() {
    let (_dir, backend) = backend();
    let defaults = backend.probe_defaults("MacBookPro8,1", true).unwrap();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults.get(&FeatureFlag::SipEnabled), Some(&false));
}

#[test]
fn lists_disks() {
    let (_dir, backend) = backend();
    let disks = backend.list_disks().unwrap();
    assert_eq!(disks.len(), 1);
    assert_eq!(disks[0].label(), "disk2: USB (32.0 GB)");
}

#[test]
fn malformed_json_is_a_parse_error() {
    let (_dir, backend) = backend();
    let err = backend.list_local_installers().unwrap_err();
    assert!(matches!(err, HalError::Parse(_)));
}

#[test]
fn unknown_subcommand_is_command_failed() {
    let (_dir, backend) = backend();
    let err = backend.list_formattable_disks().unwrap_err();
    assert!(matches!(err, HalError::CommandFailed { code: Some(1), .. }));
}

#[test]
fn privileged_operations_stream_into_sink() {
    let (_dir, backend) = backend();
    let mut sink = Sink::new(SinkMode::Append);
    let exit = backend.apply_patches(&mut sink).unwrap();
    assert!(exit.is_success());
    assert_eq!(sink.lines(), vec!["Patching", "Done"]);
}

#[test]
fn revert_failure_carries_exit_code_and_stderr() {
    let (_dir, backend) = backend();
    let mut sink = Sink::new(SinkMode::Append);
    let exit = backend.revert_patches(&mut sink).unwrap();
    assert_eq!(exit.code, Some(4));
    assert_eq!(exit.message, "snapshot missing");
    assert_eq!(sink.lines(), vec!["Reverting"]);
}

#[test]
fn creation_script_is_generated_then_run_through_helper() {
    let (dir, backend) = backend();
    let script = dir.path().join("Installer.sh");
    let installer = LocalInstaller {
        name: "Install macOS Monterey".into(),
        version: "12.1".into(),
        build: "21C52".into(),
        path: PathBuf::from("/Applications/Install macOS Monterey.app"),
    };
    let disk = DiskInfo {
        id: "disk4".into(),
        name: "USB".into(),
        size_bytes: 32_000_000_000,
    };
    assert!(backend
        .generate_creation_script(&script, &installer, &disk)
        .unwrap());
    assert!(script.exists());

    let mut sink = Sink::new(SinkMode::Append);
    let exit = backend.run_creation_script(&script, &mut sink).unwrap();
    assert!(exit.is_success());
    assert_eq!(sink.lines(), vec!["creating", "created"]);
}
