//! Runs the operation bound to an action step.
//!
//! Output is redirected to the step's sink for exactly the duration of the
//! call. Operational failures become a failed [`ActionResult`] and are shown
//! in the sink; configuration errors are returned to the caller.

use crate::session::Session;
use crate::step::{ActionKind, StepId};
use bootpatch_core::{
    DefaultsProbe, FlagSet, OutputRelay, PatcherSettings, Progress, RelayScope, Sink, SinkMode,
};
use bootpatch_error::{ConfigurationError, HalResult, PatcherError};
use bootpatch_hal::{ExitInfo, SystemHal};
use std::path::PathBuf;

/// Paths and catalog parameters actions need.
#[derive(Debug, Clone)]
pub struct ActionEnv {
    pub payload_path: PathBuf,
    pub installer_sh_path: PathBuf,
    pub catalog_seed: String,
}

impl ActionEnv {
    pub fn from_settings(settings: &PatcherSettings) -> Self {
        Self {
            payload_path: settings.payload_path.clone(),
            installer_sh_path: settings.installer_sh_path.clone(),
            catalog_seed: settings.catalog_seed.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub success: bool,
    pub exit: Option<ExitInfo>,
}

impl ActionResult {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            exit: None,
        }
    }

    pub fn failed(exit: Option<ExitInfo>) -> Self {
        Self {
            success: false,
            exit,
        }
    }

    fn from_exit(exit: ExitInfo) -> Self {
        Self {
            success: exit.is_success(),
            exit: Some(exit),
        }
    }
}

/// Borrowed defaults prober over the session's HAL.
struct HalProbe<'a>(&'a dyn SystemHal);

impl DefaultsProbe for HalProbe<'_> {
    fn probe_defaults(&self, model: &str, is_detected: bool) -> HalResult<FlagSet> {
        self.0.probe_defaults(model, is_detected)
    }
}

pub struct ActionInvoker<'a> {
    hal: &'a dyn SystemHal,
    env: &'a ActionEnv,
}

impl<'a> ActionInvoker<'a> {
    pub fn new(hal: &'a dyn SystemHal, env: &'a ActionEnv) -> Self {
        Self { hal, env }
    }

    /// Run `action` for `step` with progress going to `sink`.
    pub fn invoke(
        &self,
        step: StepId,
        action: ActionKind,
        session: &mut Session,
        relay: &mut OutputRelay,
        sink: Sink,
    ) -> Result<ActionResult, PatcherError> {
        let mut scope = relay.redirect(action.label(), sink);
        scope.yield_now();
        log::info!("Action {} started on {}", action.label(), step);

        let result = match self.run(step, action, session, &mut scope) {
            Ok(result) => result,
            Err(PatcherError::Hal(err)) => {
                log::warn!("Action {} failed: {}", action.label(), err);
                scope.line(&format!("Error: {}", err));
                ActionResult::failed(None)
            }
            Err(err) => {
                log::error!("Action {} on {} aborted: {}", action.label(), step, err);
                return Err(err);
            }
        };

        if !result.success {
            if let Some(exit) = &result.exit {
                if !exit.message.is_empty() {
                    scope.line(&exit.message);
                }
            }
        }
        log::info!(
            "Action {} finished: success={}",
            action.label(),
            result.success
        );
        Ok(result)
    }

    fn run(
        &self,
        step: StepId,
        action: ActionKind,
        session: &mut Session,
        out: &mut RelayScope<'_>,
    ) -> Result<ActionResult, PatcherError> {
        match action {
            ActionKind::Build => self.build(session, out),
            ActionKind::InstallPayload => self.install_payload(step, session, out),
            ActionKind::ApplyPatches => {
                out.line("Starting root patching...");
                let exit = self.hal.apply_patches(out)?;
                if exit.is_success() {
                    out.line("Root patching finished. Reboot to apply the patches.");
                } else {
                    out.line("Root patching failed");
                }
                Ok(ActionResult::from_exit(exit))
            }
            ActionKind::RevertPatches => {
                out.line("Reverting root patches...");
                let exit = self.hal.revert_patches(out)?;
                if exit.is_success() {
                    out.line("Root patches reverted. Reboot to apply.");
                } else {
                    out.line("Reverting root patches failed");
                }
                Ok(ActionResult::from_exit(exit))
            }
            ActionKind::DownloadInstaller => self.download_installer(step, session, out),
            ActionKind::FlashInstaller => self.flash_installer(step, session, out),
            ActionKind::ApplyModel => {
                let model = session
                    .scratch
                    .model_choice
                    .clone()
                    .ok_or_else(|| missing(step, "model"))?;
                session
                    .store
                    .set_target_model(&model, &HalProbe(self.hal), out)?;
                Ok(ActionResult::succeeded())
            }
            ActionKind::ApplyGpu => {
                let label = session
                    .scratch
                    .gpu_choice
                    .clone()
                    .ok_or_else(|| missing(step, "GPU"))?;
                session.store.select_gpu_label(&label, out)?;
                Ok(ActionResult::succeeded())
            }
        }
    }

    fn build(
        &self,
        session: &mut Session,
        out: &mut RelayScope<'_>,
    ) -> Result<ActionResult, PatcherError> {
        let record = session.store.record();
        let model = record.effective_model().to_string();
        out.line(&format!(
            "Building {} payload for {}",
            record.build_variant(),
            model
        ));
        let exit = self.hal.build(&model, record, out)?;
        if exit.is_success() {
            out.line(&format!("Payload for {} built successfully", model));
        } else {
            out.line("Build failed");
        }
        Ok(ActionResult::from_exit(exit))
    }

    fn install_payload(
        &self,
        step: StepId,
        session: &mut Session,
        out: &mut RelayScope<'_>,
    ) -> Result<ActionResult, PatcherError> {
        let disk = session
            .scratch
            .disk
            .clone()
            .ok_or_else(|| missing(step, "disk"))?;
        let partition = session
            .scratch
            .partition
            .clone()
            .ok_or_else(|| missing(step, "partition"))?;
        out.line(&format!("Installing to {}", partition.label()));
        let exit = self.hal.install_to(&disk, &partition, out)?;
        if exit.is_success() {
            out.line("Payload installed successfully");
        } else {
            out.line("Install failed");
        }
        Ok(ActionResult::from_exit(exit))
    }

    /// Download into a single-line progress sink, then unpack into a sink
    /// that keeps only the final status.
    fn download_installer(
        &self,
        step: StepId,
        session: &mut Session,
        out: &mut RelayScope<'_>,
    ) -> Result<ActionResult, PatcherError> {
        let entry = session
            .scratch
            .catalog_entry
            .clone()
            .ok_or_else(|| missing(step, "installer"))?;
        out.line(&format!("Downloading {}", entry.label()));

        let progress = session.phase_sink(step, "download", SinkMode::Replace);
        let exit = {
            let mut phase = out.redirect("download", progress);
            self.hal.download(&self.env.payload_path, &entry, &mut phase)?
        };
        if !exit.is_success() {
            out.line("Download failed");
            return Ok(ActionResult::from_exit(exit));
        }

        let status = session.phase_sink(step, "install", SinkMode::ReplaceAll);
        let exit = {
            let mut phase = out.redirect("install", status);
            self.hal
                .install_assistant(&self.env.payload_path, &mut phase)?
        };
        if exit.is_success() {
            out.line(&format!("Finished Installing {}", entry.title));
        } else {
            out.line("Installer unpacking failed");
        }
        Ok(ActionResult::from_exit(exit))
    }

    fn flash_installer(
        &self,
        step: StepId,
        session: &mut Session,
        out: &mut RelayScope<'_>,
    ) -> Result<ActionResult, PatcherError> {
        let installer = session
            .scratch
            .installer
            .clone()
            .ok_or_else(|| missing(step, "installer"))?;
        let disk = session
            .scratch
            .usb_disk
            .clone()
            .ok_or_else(|| missing(step, "disk"))?;
        let script = &self.env.installer_sh_path;

        out.line(&format!("Creating {} on {}", installer.name, disk.label()));
        if !self
            .hal
            .generate_creation_script(script, &installer, &disk)?
        {
            out.line("- Failed to create installer script");
            return Ok(ActionResult::failed(None));
        }

        let exit = self.hal.run_creation_script(script, out)?;
        if exit.is_success() {
            out.line("Installer created successfully!");
        } else {
            out.line("Installer creation failed");
            out.line(&format!("Exit code: {}", exit_code(&exit)));
        }
        Ok(ActionResult::from_exit(exit))
    }
}

fn exit_code(exit: &ExitInfo) -> String {
    exit.code
        .map(|code| code.to_string())
        .unwrap_or_else(|| "signal".to_string())
}

fn missing(step: StepId, what: &'static str) -> PatcherError {
    ConfigurationError::MissingSelection {
        step: step.to_string(),
        what,
    }
    .into()
}
