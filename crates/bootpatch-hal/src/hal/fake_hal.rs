//! Fake HAL implementation for testing and demo sessions.
//!
//! This implementation records all operations without executing them and
//! answers from scripted data, so workflows can be exercised without the
//! external patcher or real disks.

use super::{
    BuildOps, CatalogEntry, DiskInfo, DiskOps, ExitInfo, HostProbeOps, InstallerOps,
    LocalInstaller, PartitionInfo, PatchOps,
};
use crate::{HalError, HalResult};
use bootpatch_core::{
    ConfigurationRecord, DefaultsProbe, FlagSet, OsRelease, PatchSet, Progress, SystemFacts,
};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Operation records for testing and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    DetectFacts,
    ProbeDefaults {
        model: String,
        is_detected: bool,
    },
    Build {
        model: String,
        variant: String,
    },
    ListDisks,
    ListPartitions {
        disk: String,
    },
    InstallTo {
        disk: String,
        partition: String,
    },
    DetectPatches {
        model: String,
    },
    ApplyPatches,
    RevertPatches,
    ListDownloadable {
        seed: String,
    },
    Download {
        url: String,
    },
    InstallAssistant,
    ListLocalInstallers,
    ListFormattableDisks,
    GenerateCreationScript {
        script: PathBuf,
        installer: String,
        disk: String,
    },
    RunCreationScript {
        script: PathBuf,
    },
}

impl Operation {
    /// Stable name used to script failures and output.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::DetectFacts => "detect_facts",
            Operation::ProbeDefaults { .. } => "probe_defaults",
            Operation::Build { .. } => "build",
            Operation::ListDisks => "list_disks",
            Operation::ListPartitions { .. } => "list_partitions",
            Operation::InstallTo { .. } => "install_to",
            Operation::DetectPatches { .. } => "detect_patches",
            Operation::ApplyPatches => "apply_patches",
            Operation::RevertPatches => "revert_patches",
            Operation::ListDownloadable { .. } => "list_downloadable",
            Operation::Download { .. } => "download",
            Operation::InstallAssistant => "install_assistant",
            Operation::ListLocalInstallers => "list_local_installers",
            Operation::ListFormattableDisks => "list_formattable_disks",
            Operation::GenerateCreationScript { .. } => "generate_creation_script",
            Operation::RunCreationScript { .. } => "run_creation_script",
        }
    }
}

/// Scripted failure for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeFailure {
    /// The operation runs but exits non-zero.
    Exit(i32),
    /// The collaborator itself fails.
    Error(String),
    /// Only for `generate_creation_script`: the collaborator declines.
    Refuse,
}

/// Shared state for FakeHal operations.
#[derive(Debug, Clone)]
struct FakeHalState {
    operations: Vec<Operation>,
    facts: SystemFacts,
    defaults: BTreeMap<String, FlagSet>,
    disks: Vec<DiskInfo>,
    partitions: HashMap<String, Vec<PartitionInfo>>,
    patches: PatchSet,
    catalog: Vec<CatalogEntry>,
    local_installers: Vec<LocalInstaller>,
    usb_disks: Vec<DiskInfo>,
    output: HashMap<&'static str, Vec<String>>,
    failures: HashMap<&'static str, FakeFailure>,
}

impl Default for FakeHalState {
    fn default() -> Self {
        Self {
            operations: Vec::new(),
            facts: SystemFacts::new("iMac14,2", OsRelease::MONTEREY),
            defaults: BTreeMap::new(),
            disks: Vec::new(),
            partitions: HashMap::new(),
            patches: PatchSet::new(),
            catalog: Vec::new(),
            local_installers: Vec::new(),
            usb_disks: Vec::new(),
            output: HashMap::new(),
            failures: HashMap::new(),
        }
    }
}

/// Fake HAL that records operations and answers from scripted data.
///
/// Clones share state, so a test can keep one handle for assertions while
/// the workflow owns another.
#[derive(Debug, Clone, Default)]
pub struct FakeHal {
    state: Arc<Mutex<FakeHalState>>,
}

impl FakeHal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeHalState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn with_facts(self, model: &str, os: OsRelease) -> Self {
        self.lock().facts = SystemFacts::new(model, os);
        self
    }

    pub fn with_defaults(self, model: &str, defaults: FlagSet) -> Self {
        self.lock().defaults.insert(model.to_string(), defaults);
        self
    }

    pub fn with_disks(self, disks: Vec<DiskInfo>) -> Self {
        self.lock().disks = disks;
        self
    }

    pub fn with_partitions(self, disk: &str, partitions: Vec<PartitionInfo>) -> Self {
        self.lock().partitions.insert(disk.to_string(), partitions);
        self
    }

    pub fn with_patches(self, patches: PatchSet) -> Self {
        self.lock().patches = patches;
        self
    }

    pub fn with_catalog(self, catalog: Vec<CatalogEntry>) -> Self {
        self.lock().catalog = catalog;
        self
    }

    pub fn with_local_installers(self, installers: Vec<LocalInstaller>) -> Self {
        self.lock().local_installers = installers;
        self
    }

    pub fn with_usb_disks(self, disks: Vec<DiskInfo>) -> Self {
        self.lock().usb_disks = disks;
        self
    }

    /// Lines an operation writes to its progress sink.
    pub fn with_output(self, operation: &'static str, lines: &[&str]) -> Self {
        self.lock()
            .output
            .insert(operation, lines.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn fail(self, operation: &'static str, failure: FakeFailure) -> Self {
        self.lock().failures.insert(operation, failure);
        self
    }

    /// Replace the disk list after construction (hot-plug between entries).
    pub fn set_disks(&self, disks: Vec<DiskInfo>) {
        self.lock().disks = disks;
    }

    pub fn set_failure(&self, operation: &'static str, failure: Option<FakeFailure>) {
        let mut state = self.lock();
        match failure {
            Some(failure) => {
                state.failures.insert(operation, failure);
            }
            None => {
                state.failures.remove(operation);
            }
        }
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    /// Get the number of operations recorded.
    pub fn operation_count(&self) -> usize {
        self.lock().operations.len()
    }

    /// Check if a specific operation was recorded.
    pub fn has_operation(&self, check: impl Fn(&Operation) -> bool) -> bool {
        self.lock().operations.iter().any(check)
    }

    /// Number of recorded operations with the given name.
    pub fn count(&self, name: &str) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|op| op.name() == name)
            .count()
    }

    /// Clear all recorded operations.
    pub fn clear(&self) {
        self.lock().operations.clear();
    }

    /// Record `op` and return the scripted failure for it, if any.
    fn record(&self, op: Operation) -> Option<FakeFailure> {
        let mut state = self.lock();
        let failure = state.failures.get(op.name()).cloned();
        state.operations.push(op);
        failure
    }

    fn query<T>(&self, op: Operation, answer: impl FnOnce(&FakeHalState) -> T) -> HalResult<T> {
        match self.record(op) {
            Some(FakeFailure::Error(message)) => Err(HalError::Other(message)),
            _ => Ok(answer(&self.lock())),
        }
    }

    fn run(&self, op: Operation, out: &mut dyn Progress) -> HalResult<ExitInfo> {
        let name = op.name();
        let failure = self.record(op);
        if let Some(FakeFailure::Error(message)) = failure {
            return Err(HalError::Other(message));
        }
        let lines = self.lock().output.get(name).cloned().unwrap_or_default();
        for line in &lines {
            out.line(line);
        }
        match failure {
            Some(FakeFailure::Exit(code)) => {
                Ok(ExitInfo::failed(Some(code), format!("{} failed", name)))
            }
            _ => Ok(ExitInfo::success()),
        }
    }
}

impl HostProbeOps for FakeHal {
    fn detect_facts(&self) -> HalResult<SystemFacts> {
        self.query(Operation::DetectFacts, |s| s.facts.clone())
    }
}

impl DefaultsProbe for FakeHal {
    fn probe_defaults(&self, model: &str, is_detected: bool) -> HalResult<FlagSet> {
        self.query(
            Operation::ProbeDefaults {
                model: model.to_string(),
                is_detected,
            },
            |s| s.defaults.get(model).cloned().unwrap_or_default(),
        )
    }
}

impl BuildOps for FakeHal {
    fn build(
        &self,
        model: &str,
        record: &ConfigurationRecord,
        out: &mut dyn Progress,
    ) -> HalResult<ExitInfo> {
        self.run(
            Operation::Build {
                model: model.to_string(),
                variant: record.build_variant().to_string(),
            },
            out,
        )
    }
}

impl DiskOps for FakeHal {
    fn list_disks(&self) -> HalResult<Vec<DiskInfo>> {
        self.query(Operation::ListDisks, |s| s.disks.clone())
    }

    fn list_partitions(&self, disk: &DiskInfo) -> HalResult<Vec<PartitionInfo>> {
        self.query(
            Operation::ListPartitions {
                disk: disk.id.clone(),
            },
            |s| s.partitions.get(&disk.id).cloned().unwrap_or_default(),
        )
    }

    fn install_to(
        &self,
        disk: &DiskInfo,
        partition: &PartitionInfo,
        out: &mut dyn Progress,
    ) -> HalResult<ExitInfo> {
        self.run(
            Operation::InstallTo {
                disk: disk.id.clone(),
                partition: partition.id.clone(),
            },
            out,
        )
    }
}

impl PatchOps for FakeHal {
    fn detect_patches(&self, model: &str, _record: &ConfigurationRecord) -> HalResult<PatchSet> {
        self.query(
            Operation::DetectPatches {
                model: model.to_string(),
            },
            |s| s.patches.clone(),
        )
    }

    fn apply_patches(&self, out: &mut dyn Progress) -> HalResult<ExitInfo> {
        self.run(Operation::ApplyPatches, out)
    }

    fn revert_patches(&self, out: &mut dyn Progress) -> HalResult<ExitInfo> {
        self.run(Operation::RevertPatches, out)
    }
}

impl InstallerOps for FakeHal {
    fn list_downloadable(&self, _payload_path: &Path, seed: &str) -> HalResult<Vec<CatalogEntry>> {
        self.query(
            Operation::ListDownloadable {
                seed: seed.to_string(),
            },
            |s| s.catalog.clone(),
        )
    }

    fn download(
        &self,
        _payload_path: &Path,
        entry: &CatalogEntry,
        out: &mut dyn Progress,
    ) -> HalResult<ExitInfo> {
        self.run(
            Operation::Download {
                url: entry.url.clone(),
            },
            out,
        )
    }

    fn install_assistant(&self, _payload_path: &Path, out: &mut dyn Progress) -> HalResult<ExitInfo> {
        self.run(Operation::InstallAssistant, out)
    }

    fn list_local_installers(&self) -> HalResult<Vec<LocalInstaller>> {
        self.query(Operation::ListLocalInstallers, |s| s.local_installers.clone())
    }

    fn list_formattable_disks(&self) -> HalResult<Vec<DiskInfo>> {
        self.query(Operation::ListFormattableDisks, |s| s.usb_disks.clone())
    }

    fn generate_creation_script(
        &self,
        script_path: &Path,
        installer: &LocalInstaller,
        disk: &DiskInfo,
    ) -> HalResult<bool> {
        let failure = self.record(Operation::GenerateCreationScript {
            script: script_path.to_path_buf(),
            installer: installer.name.clone(),
            disk: disk.id.clone(),
        });
        match failure {
            Some(FakeFailure::Error(message)) => Err(HalError::Other(message)),
            Some(FakeFailure::Refuse) => Ok(false),
            _ => Ok(true),
        }
    }

    fn run_creation_script(
        &self,
        script_path: &Path,
        out: &mut dyn Progress,
    ) -> HalResult<ExitInfo> {
        self.run(
            Operation::RunCreationScript {
                script: script_path.to_path_buf(),
            },
            out,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootpatch_core::{ConfigurationStore, Sink, SinkMode};

    #[test]
    fn clones_share_recorded_operations() {
        let hal = FakeHal::new();
        let handle = hal.clone();
        hal.list_disks().unwrap();
        assert_eq!(handle.operations(), vec![Operation::ListDisks]);
    }

    #[test]
    fn scripted_output_and_exit_code() {
        let hal = FakeHal::new()
            .with_output("apply_patches", &["Patching", "Done"])
            .fail("apply_patches", FakeFailure::Exit(2));
        let mut sink = Sink::new(SinkMode::Append);
        let exit = hal.apply_patches(&mut sink).unwrap();
        assert_eq!(exit.code, Some(2));
        assert_eq!(sink.lines(), vec!["Patching", "Done"]);
    }

    #[test]
    fn scripted_error_fails_before_output() {
        let hal = FakeHal::new()
            .with_output("build", &["never shown"])
            .fail("build", FakeFailure::Error("launcher missing".into()));
        let store = ConfigurationStore::new("iMac14,2");
        let mut sink = Sink::new(SinkMode::Append);
        assert!(hal.build("iMac14,2", store.record(), &mut sink).is_err());
        assert!(sink.lines().is_empty());
        assert_eq!(hal.count("build"), 1);
    }
}
