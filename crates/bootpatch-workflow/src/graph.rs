//! The static step graph.

use crate::session::Session;
use crate::step::{
    ActionKind, ActionSpec, Completion, Effect, ListSource, ListSpec, Step, StepId, StepKind,
    Transition,
};
use bootpatch_core::gate::{build_gate, revert_gate, root_patch_gate, start_patch_gate};
use bootpatch_core::{FeatureFlag, OsRelease, SinkMode};
use bootpatch_error::ConfigurationError;
use std::collections::BTreeMap;
use std::fmt::Write as _;

pub const RETURN_TO_MAIN_MENU: &str = "Return to Main Menu";
pub const BACK: &str = "Back";

pub const HELP_RESOURCES: &[&str] = &[
    "Official Guide: https://dortania.github.io/OpenCore-Legacy-Patcher/",
    "Official Discord Server: https://discord.gg/rqdPgH8xSN",
];

pub struct StepGraph {
    steps: BTreeMap<StepId, Step>,
}

fn action(kind: ActionKind, completion: Completion, sink_mode: SinkMode) -> StepKind {
    StepKind::Action(ActionSpec {
        kind,
        completion,
        sink_mode,
    })
}

fn list(
    source: ListSource,
    on_select: StepId,
    empty_message: &'static str,
    hint: Option<&'static str>,
) -> StepKind {
    StepKind::DynamicList(ListSpec {
        source,
        on_select,
        empty_message,
        hint,
    })
}

impl StepGraph {
    pub fn standard() -> Self {
        let mut steps = vec![
            Step::new(StepId::MainMenu, "bootpatch", StepKind::Menu)
                .transition(Transition::gated(
                    "Build and Install OpenCore",
                    StepId::BuildInstall,
                    build_gate(),
                ))
                .transition(Transition::gated(
                    "Post Install Root Patch",
                    StepId::RootPatchMenu,
                    root_patch_gate(),
                ))
                .transition(Transition::goto(
                    "Create macOS Installer",
                    StepId::CreateInstallerMenu,
                ))
                .transition(Transition::goto("Settings", StepId::Settings))
                .transition(Transition::goto("Walkthrough", StepId::WalkthroughMenu))
                .transition(Transition::goto("Help", StepId::Help)),
            Step::new(StepId::Help, "Patcher Resources", StepKind::Terminal)
                .body(HELP_RESOURCES)
                .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(
                StepId::NotYetImplemented,
                "Not Yet Implemented",
                StepKind::Terminal,
            )
            .body(&["This feature is not yet implemented."])
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(StepId::WalkthroughMenu, "Walkthrough", StepKind::Menu)
                .transition(Transition::goto("First Time Setup", StepId::FirstTimeSetup))
                .transition(Transition::goto(
                    "Post-Install Setup",
                    StepId::NotYetImplemented,
                ))
                .transition(Transition::goto("Advanced Setup", StepId::NotYetImplemented))
                .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(StepId::FirstTimeSetup, "First Time Setup", StepKind::Menu)
                .body(&[
                    "1. Build the boot payload for this machine.",
                    "2. Install it to a disk's EFI partition.",
                    "3. Reboot holding Option and pick the payload's EFI entry.",
                ])
                .transition(Transition::gated(
                    "Build and Install OpenCore",
                    StepId::BuildInstall,
                    build_gate(),
                ))
                .exit(BACK, StepId::WalkthroughMenu),
            Step::new(
                StepId::BuildInstall,
                "Build and Install OpenCore",
                StepKind::Menu,
            )
            .enabled_when(build_gate())
            .transition(Transition::gated("Build OpenCore", StepId::BuildRun, build_gate()))
            .transition(Transition::goto("Install OpenCore", StepId::InstallDisks))
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(
                StepId::BuildRun,
                "Building OpenCore",
                action(ActionKind::Build, Completion::Stay, SinkMode::Append),
            )
            .enabled_when(build_gate())
            .transition(Transition::goto("Install OpenCore", StepId::InstallDisks))
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(
                StepId::InstallDisks,
                "Select Disk",
                list(
                    ListSource::Disks,
                    StepId::InstallPartitions,
                    "Failed to find any applicable disks",
                    Some("Missing disks? Ensure they're FAT32 or formatted as GUID/GPT"),
                ),
            )
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(
                StepId::InstallPartitions,
                "Select Partition",
                list(
                    ListSource::Partitions,
                    StepId::InstallRun,
                    "Failed to find any EFI partitions on this disk",
                    None,
                ),
            )
            .exit(BACK, StepId::InstallDisks)
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(
                StepId::InstallRun,
                "Installing OpenCore",
                action(ActionKind::InstallPayload, Completion::Stay, SinkMode::Append),
            )
            .enabled_when(build_gate())
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(
                StepId::RootPatchMenu,
                "Post Install Root Patch",
                StepKind::Report(ListSpec {
                    source: ListSource::Patches,
                    on_select: StepId::RootPatchRun,
                    empty_message: "No patches needed for this system",
                    hint: None,
                }),
            )
            // Entering runs patch detection, so the OS gate sits on the menu.
            .enabled_when(root_patch_gate())
            .transition(Transition::gated(
                "Start Root Patching",
                StepId::RootPatchRun,
                start_patch_gate(),
            ))
            .transition(Transition::gated(
                "Revert Root Patches",
                StepId::RootPatchRevert,
                revert_gate(),
            ))
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(
                StepId::RootPatchRun,
                "Root Patching",
                action(ActionKind::ApplyPatches, Completion::Stay, SinkMode::Append),
            )
            .enabled_when(root_patch_gate())
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(
                StepId::RootPatchRevert,
                "Revert Root Patches",
                action(ActionKind::RevertPatches, Completion::Stay, SinkMode::Append),
            )
            .enabled_when(revert_gate())
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(
                StepId::CreateInstallerMenu,
                "Create macOS Installer",
                StepKind::Menu,
            )
            .transition(Transition::goto(
                "Download macOS Installer",
                StepId::InstallerCatalog,
            ))
            .transition(Transition::goto(
                "Use existing macOS Installer",
                StepId::LocalInstallers,
            ))
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(
                StepId::InstallerCatalog,
                "Download macOS Installer",
                list(
                    ListSource::Catalog,
                    StepId::InstallerDownload,
                    "No installers available from the software update catalog",
                    None,
                ),
            )
            .exit(BACK, StepId::CreateInstallerMenu)
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(
                StepId::InstallerDownload,
                "Downloading macOS Installer",
                action(
                    ActionKind::DownloadInstaller,
                    Completion::Stay,
                    SinkMode::Append,
                ),
            )
            .transition(Transition::goto("Flash Installer", StepId::LocalInstallers))
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(
                StepId::LocalInstallers,
                "Select macOS Installer",
                list(
                    ListSource::LocalInstallers,
                    StepId::UsbDisks,
                    "No Installers Found in Applications folder",
                    None,
                ),
            )
            .exit(BACK, StepId::CreateInstallerMenu)
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(
                StepId::UsbDisks,
                "Select Disk to Flash",
                list(
                    ListSource::UsbDisks,
                    StepId::InstallerFlash,
                    "No Disks Found",
                    Some("Missing drives? Ensure they're 14GB+ and removable"),
                ),
            )
            .body(&["Selecting a disk will erase all data on it."])
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(
                StepId::InstallerFlash,
                "Creating macOS Installer",
                action(ActionKind::FlashInstaller, Completion::Stay, SinkMode::Append),
            )
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
            Step::new(
                StepId::ModelPicker,
                "Select Model",
                list(ListSource::Models, StepId::ModelApply, "No models available", None),
            )
            .exit(BACK, StepId::Settings),
            Step::new(
                StepId::ModelApply,
                "Apply Model",
                action(
                    ActionKind::ApplyModel,
                    Completion::Goto(StepId::Settings),
                    SinkMode::Append,
                ),
            )
            .exit(BACK, StepId::Settings),
            Step::new(
                StepId::GpuPicker,
                "Set GPU Override",
                list(
                    ListSource::GpuChoices,
                    StepId::GpuApply,
                    "No GPU choices available",
                    None,
                ),
            )
            .exit(BACK, StepId::DeveloperSettings),
            Step::new(
                StepId::GpuApply,
                "Apply GPU Override",
                action(
                    ActionKind::ApplyGpu,
                    Completion::Goto(StepId::DeveloperSettings),
                    SinkMode::Append,
                ),
            )
            .exit(BACK, StepId::DeveloperSettings),
        ];

        let mut settings = Step::new(StepId::Settings, "Settings", StepKind::Menu)
            .transition(Transition::goto("Change Model", StepId::ModelPicker));
        for flag in FeatureFlag::GENERAL {
            settings = settings.transition(Transition::toggle(flag));
        }
        settings = settings
            .transition(Transition::goto(
                "Developer Settings",
                StepId::DeveloperSettings,
            ))
            .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu);
        steps.push(settings);

        let mut developer = Step::new(
            StepId::DeveloperSettings,
            "Developer Settings",
            StepKind::Menu,
        )
        .transition(Transition::goto("Set GPU Override", StepId::GpuPicker));
        for flag in FeatureFlag::DEVELOPER {
            developer = developer.transition(Transition::toggle(flag));
        }
        steps.push(
            developer
                .exit(BACK, StepId::Settings)
                .exit(RETURN_TO_MAIN_MENU, StepId::MainMenu),
        );

        Self {
            steps: steps.into_iter().map(|step| (step.id, step)).collect(),
        }
    }

    pub fn step(&self, id: StepId) -> Result<&Step, ConfigurationError> {
        self.steps
            .get(&id)
            .ok_or_else(|| ConfigurationError::UnknownStep(id.to_string()))
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.values()
    }

    /// Lines shown above the entries, including text that depends on the session.
    pub fn body(&self, step: &Step, session: &Session) -> Vec<String> {
        let mut lines: Vec<String> = step.body.iter().map(|l| l.to_string()).collect();
        let record = session.store.record();
        match step.id {
            StepId::BuildInstall => {
                lines.push(format!("Model: {}", record.effective_model()));
                lines.push(format!("Build: {}", record.build_variant()));
            }
            StepId::RootPatchRevert => {
                let subheader = if session.facts.detected_os == OsRelease::BIG_SUR {
                    "Currently experimental in Big Sur"
                } else {
                    "Reverting to last sealed snapshot"
                };
                lines.push(subheader.to_string());
            }
            StepId::Settings => {
                lines.push(format!("Target model: {}", record.effective_model()));
                lines.push(format!("Serial policy: {}", record.serial_policy().as_str()));
            }
            StepId::DeveloperSettings => {
                lines.push(format!("GPU override: {}", record.gpu_override()));
            }
            _ => {}
        }
        lines
    }

    /// Text rendering of every step with its gate status for this session.
    pub fn dump(&self, session: &Session) -> String {
        let ctx = session.gate_context();
        let mut out = String::new();
        for step in self.steps.values() {
            let enabled = step.enabled_when.evaluate(&ctx);
            let _ = writeln!(out, "STEP: {} [{}]", step.title, step.id);
            let _ = writeln!(out, "- Kind: {}", kind_name(&step.kind));
            if !enabled.allowed {
                let _ = writeln!(
                    out,
                    "- Disabled: {}",
                    enabled.reason.as_deref().unwrap_or("unavailable")
                );
            }
            for line in self.body(step, session) {
                let _ = writeln!(out, "  {}", line);
            }
            if let Some(spec) = step.list_spec() {
                let _ = writeln!(
                    out,
                    "- Lists: {:?} (empty: \"{}\")",
                    spec.source, spec.empty_message
                );
            }
            for transition in &step.transitions {
                let result = transition.gate.evaluate(&ctx);
                let target = match transition.effect {
                    Effect::Goto(to) => to.to_string(),
                    Effect::Toggle(flag) => format!(
                        "toggle {} (now {})",
                        flag,
                        if session.store.get(flag) { "on" } else { "off" }
                    ),
                };
                match result.reason {
                    Some(reason) if !result.allowed => {
                        let _ = writeln!(
                            out,
                            "- [disabled] {} -> {} ({})",
                            transition.label, target, reason
                        );
                    }
                    _ if !result.allowed => {
                        let _ = writeln!(out, "- [disabled] {} -> {}", transition.label, target);
                    }
                    _ => {
                        let _ = writeln!(out, "- {} -> {}", transition.label, target);
                    }
                }
            }
            for exit in &step.exits {
                let _ = writeln!(out, "- exit: {} -> {}", exit.label, exit.to);
            }
            out.push('\n');
        }
        out
    }
}

fn kind_name(kind: &StepKind) -> String {
    match kind {
        StepKind::Menu => "menu".to_string(),
        StepKind::Report(_) => "report".to_string(),
        StepKind::DynamicList(_) => "list".to_string(),
        StepKind::Action(spec) => format!("action ({})", spec.kind.label()),
        StepKind::Terminal => "page".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootpatch_core::{ConfigurationStore, SystemFacts};

    #[test]
    fn every_step_is_defined_once() {
        let graph = StepGraph::standard();
        for id in StepId::all() {
            assert_eq!(graph.step(*id).unwrap().id, *id);
        }
        assert_eq!(graph.steps().count(), StepId::all().len());
    }

    #[test]
    fn every_target_exists() {
        let graph = StepGraph::standard();
        for step in graph.steps() {
            for transition in &step.transitions {
                if let Effect::Goto(to) = transition.effect {
                    assert!(graph.step(to).is_ok(), "{} -> {}", step.id, to);
                }
            }
            if let Some(spec) = step.list_spec() {
                assert!(graph.step(spec.on_select).is_ok());
            }
        }
    }

    #[test]
    fn non_main_steps_have_a_way_back() {
        let graph = StepGraph::standard();
        for step in graph.steps().filter(|s| s.id != StepId::MainMenu) {
            assert!(!step.exits.is_empty(), "{} has no exit", step.id);
        }
    }

    #[test]
    fn revert_subheader_depends_on_release() {
        let graph = StepGraph::standard();
        let step = graph.step(StepId::RootPatchRevert).unwrap();
        let big_sur = Session::new(
            SystemFacts::new("iMac14,2", OsRelease::BIG_SUR),
            ConfigurationStore::new("iMac14,2"),
        );
        assert!(graph
            .body(step, &big_sur)
            .contains(&"Currently experimental in Big Sur".to_string()));

        let monterey = Session::new(
            SystemFacts::new("iMac14,2", OsRelease::MONTEREY),
            ConfigurationStore::new("iMac14,2"),
        );
        assert!(graph
            .body(step, &monterey)
            .contains(&"Reverting to last sealed snapshot".to_string()));
    }
}
