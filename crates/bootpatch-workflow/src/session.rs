//! One operator session: the configuration store, detected facts, the
//! current step and the scratch the steps share.

use crate::invoker::ActionResult;
use crate::step::{ListElement, StepId};
use bootpatch_core::{
    ConfigurationStore, FlagSet, GateContext, OsRelease, PatchSet, Sink, SinkMode, SystemFacts,
};
use bootpatch_error::PatcherResult;
use bootpatch_hal::hal::{CatalogEntry, DiskInfo, LocalInstaller, PartitionInfo};
use bootpatch_hal::SystemHal;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Succeeded,
    Failed,
}

/// Session-local selections and results. Discarded by every exit.
#[derive(Debug, Clone, Default)]
pub struct StepScratch {
    pub disk: Option<DiskInfo>,
    pub partition: Option<PartitionInfo>,
    pub catalog_entry: Option<CatalogEntry>,
    pub installer: Option<LocalInstaller>,
    pub usb_disk: Option<DiskInfo>,
    pub model_choice: Option<String>,
    pub gpu_choice: Option<String>,
    pub patches: Option<PatchSet>,
    /// Elements of the list the current step shows.
    pub elements: Vec<ListElement>,
    /// Why the current list could not be enumerated.
    pub list_error: Option<String>,
    pub last_action: Option<(StepId, ActionState, ActionResult)>,
}

/// Output panes of an action step: the main sink plus named phase sinks.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub main: Sink,
    pub phases: Vec<(&'static str, Sink)>,
}

impl StepOutput {
    fn new(mode: SinkMode) -> Self {
        Self {
            main: Sink::new(mode),
            phases: Vec::new(),
        }
    }
}

/// Startup overrides taken from the command line and settings file.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub model: Option<String>,
    pub os: Option<OsRelease>,
    pub flag_overrides: FlagSet,
}

#[derive(Debug)]
pub struct Session {
    pub store: ConfigurationStore,
    pub facts: SystemFacts,
    pub current: StepId,
    pub scratch: StepScratch,
    outputs: HashMap<StepId, StepOutput>,
}

impl Session {
    pub fn new(facts: SystemFacts, store: ConfigurationStore) -> Self {
        Self {
            store,
            facts,
            current: StepId::MainMenu,
            scratch: StepScratch::default(),
            outputs: HashMap::new(),
        }
    }

    /// Detect the host, load the detected model's defaults and apply overrides.
    pub fn start(hal: &dyn SystemHal, options: &SessionOptions) -> PatcherResult<Self> {
        let mut facts = hal.detect_facts()?;
        if let Some(model) = &options.model {
            facts.detected_model = model.clone();
        }
        if let Some(os) = options.os {
            facts.detected_os = os;
        }
        log::info!(
            "Session start: model={} os={}",
            facts.detected_model,
            facts.detected_os
        );

        let mut store = ConfigurationStore::new(facts.detected_model.clone());
        let defaults = hal.probe_defaults(&facts.detected_model, true)?;
        store.apply_defaults(&defaults);
        store.apply_defaults(&options.flag_overrides);
        Ok(Self::new(facts, store))
    }

    pub fn gate_context(&self) -> GateContext<'_> {
        GateContext::new(self.store.record(), &self.facts).with_patches(self.scratch.patches.as_ref())
    }

    /// Drop every selection and listing; the configuration record is kept.
    pub fn reset_scratch(&mut self) {
        self.scratch = StepScratch::default();
    }

    pub fn output(&self, step: StepId) -> Option<&StepOutput> {
        self.outputs.get(&step)
    }

    /// Fresh output panes for a new run of `step`.
    pub fn reset_output(&mut self, step: StepId, mode: SinkMode) -> Sink {
        let output = StepOutput::new(mode);
        let sink = output.main.clone();
        self.outputs.insert(step, output);
        sink
    }

    /// Named phase sink of `step`, created on first use.
    pub fn phase_sink(&mut self, step: StepId, phase: &'static str, mode: SinkMode) -> Sink {
        let output = self
            .outputs
            .entry(step)
            .or_insert_with(|| StepOutput::new(SinkMode::Append));
        if let Some((_, sink)) = output.phases.iter().find(|(name, _)| *name == phase) {
            return sink.clone();
        }
        let sink = Sink::new(mode);
        output.phases.push((phase, sink.clone()));
        sink
    }

    pub fn action_state(&self, step: StepId) -> Option<ActionState> {
        self.scratch
            .last_action
            .as_ref()
            .filter(|(id, _, _)| *id == step)
            .map(|(_, state, _)| *state)
    }
}
