//! Step definitions: what each page offers and where it leads.

use bootpatch_core::{FeatureFlag, Gate, GpuOverride, SinkMode};
use bootpatch_hal::hal::{CatalogEntry, DiskInfo, LocalInstaller, PartitionInfo};
use std::fmt;

/// Every page of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepId {
    MainMenu,
    Help,
    NotYetImplemented,
    WalkthroughMenu,
    FirstTimeSetup,
    BuildInstall,
    BuildRun,
    InstallDisks,
    InstallPartitions,
    InstallRun,
    RootPatchMenu,
    RootPatchRun,
    RootPatchRevert,
    CreateInstallerMenu,
    InstallerCatalog,
    InstallerDownload,
    LocalInstallers,
    UsbDisks,
    InstallerFlash,
    Settings,
    ModelPicker,
    ModelApply,
    DeveloperSettings,
    GpuPicker,
    GpuApply,
}

impl StepId {
    pub fn all() -> &'static [StepId] {
        &[
            StepId::MainMenu,
            StepId::Help,
            StepId::NotYetImplemented,
            StepId::WalkthroughMenu,
            StepId::FirstTimeSetup,
            StepId::BuildInstall,
            StepId::BuildRun,
            StepId::InstallDisks,
            StepId::InstallPartitions,
            StepId::InstallRun,
            StepId::RootPatchMenu,
            StepId::RootPatchRun,
            StepId::RootPatchRevert,
            StepId::CreateInstallerMenu,
            StepId::InstallerCatalog,
            StepId::InstallerDownload,
            StepId::LocalInstallers,
            StepId::UsbDisks,
            StepId::InstallerFlash,
            StepId::Settings,
            StepId::ModelPicker,
            StepId::ModelApply,
            StepId::DeveloperSettings,
            StepId::GpuPicker,
            StepId::GpuApply,
        ]
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Enumeration a dynamic list is materialized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    Disks,
    /// Partitions of the disk chosen on the previous step.
    Partitions,
    Catalog,
    LocalInstallers,
    /// Removable disks large enough for an installer.
    UsbDisks,
    Models,
    GpuChoices,
    Patches,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSpec {
    pub source: ListSource,
    /// Step entered after an element is chosen.
    pub on_select: StepId,
    pub empty_message: &'static str,
    pub hint: Option<&'static str>,
}

/// Long-running or local operation bound to an action step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Build,
    InstallPayload,
    ApplyPatches,
    RevertPatches,
    DownloadInstaller,
    FlashInstaller,
    ApplyModel,
    ApplyGpu,
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Build => "build",
            ActionKind::InstallPayload => "install",
            ActionKind::ApplyPatches => "root-patch",
            ActionKind::RevertPatches => "revert",
            ActionKind::DownloadInstaller => "download",
            ActionKind::FlashInstaller => "flash",
            ActionKind::ApplyModel => "model",
            ActionKind::ApplyGpu => "gpu",
        }
    }

    /// Local actions only touch the configuration record and report to the console.
    pub fn is_local(&self) -> bool {
        matches!(self, ActionKind::ApplyModel | ActionKind::ApplyGpu)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Show the result in place.
    Stay,
    Goto(StepId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpec {
    pub kind: ActionKind,
    pub completion: Completion,
    pub sink_mode: SinkMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    Menu,
    /// Menu preceded by a read-only listing.
    Report(ListSpec),
    DynamicList(ListSpec),
    Action(ActionSpec),
    /// Information page; only exits.
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Goto(StepId),
    Toggle(FeatureFlag),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub label: &'static str,
    pub effect: Effect,
    pub gate: Gate,
}

impl Transition {
    pub fn goto(label: &'static str, to: StepId) -> Self {
        Self {
            label,
            effect: Effect::Goto(to),
            gate: Gate::Always,
        }
    }

    pub fn gated(label: &'static str, to: StepId, gate: Gate) -> Self {
        Self {
            label,
            effect: Effect::Goto(to),
            gate,
        }
    }

    pub fn toggle(flag: FeatureFlag) -> Self {
        Self {
            label: flag.label(),
            effect: Effect::Toggle(flag),
            gate: Gate::Always,
        }
    }
}

/// Return transition. Taking one discards the step scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exit {
    pub label: &'static str,
    pub to: StepId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub id: StepId,
    pub title: &'static str,
    pub body: &'static [&'static str],
    pub kind: StepKind,
    pub enabled_when: Gate,
    pub transitions: Vec<Transition>,
    pub exits: Vec<Exit>,
}

impl Step {
    pub fn new(id: StepId, title: &'static str, kind: StepKind) -> Self {
        Self {
            id,
            title,
            body: &[],
            kind,
            enabled_when: Gate::Always,
            transitions: Vec::new(),
            exits: Vec::new(),
        }
    }

    pub fn body(mut self, body: &'static [&'static str]) -> Self {
        self.body = body;
        self
    }

    pub fn enabled_when(mut self, gate: Gate) -> Self {
        self.enabled_when = gate;
        self
    }

    pub fn transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn exit(mut self, label: &'static str, to: StepId) -> Self {
        self.exits.push(Exit { label, to });
        self
    }

    pub fn list_spec(&self) -> Option<&ListSpec> {
        match &self.kind {
            StepKind::DynamicList(spec) | StepKind::Report(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn action(&self) -> Option<&ActionSpec> {
        match &self.kind {
            StepKind::Action(spec) => Some(spec),
            _ => None,
        }
    }
}

/// One materialized element of a dynamic list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListElement {
    Disk(DiskInfo),
    Partition(PartitionInfo),
    Catalog(CatalogEntry),
    Installer(LocalInstaller),
    UsbDisk(DiskInfo),
    Model { model: String, detected: bool },
    Gpu(GpuOverride),
    Patch(String),
}

impl ListElement {
    pub fn label(&self) -> String {
        match self {
            ListElement::Disk(disk) | ListElement::UsbDisk(disk) => disk.label(),
            ListElement::Partition(partition) => partition.label(),
            ListElement::Catalog(entry) => entry.label(),
            ListElement::Installer(installer) => installer.label(),
            ListElement::Model { model, detected } => {
                if *detected {
                    format!("{} (detected)", model)
                } else {
                    model.clone()
                }
            }
            ListElement::Gpu(gpu) => gpu.label().to_string(),
            ListElement::Patch(name) => format!("- {}", name),
        }
    }
}
