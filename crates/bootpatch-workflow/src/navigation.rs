//! Navigation over the step graph.
//!
//! A [`Navigator`] is built per operator input from borrowed parts: the
//! session, the graph, the collaborators and the output relay. Entering a
//! step re-evaluates its gates and re-queries its enumeration, so every view
//! reflects the current configuration and hardware.

use crate::graph::StepGraph;
use crate::invoker::{ActionEnv, ActionInvoker, ActionResult};
use crate::session::{ActionState, Session};
use crate::step::{Completion, Effect, ListElement, ListSource, Step, StepId, StepKind};
use bootpatch_core::models::model_choices;
use bootpatch_core::{FeatureFlag, GateResult, GpuOverride, OutputRelay, Progress, Sink};
use bootpatch_error::{HalResult, PatcherError};
use bootpatch_hal::hal::MIN_USB_BYTES;
use bootpatch_hal::SystemHal;

/// Operator choice on the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Entry(usize),
    Exit(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Moved(StepId),
    Toggled { flag: FeatureFlag, value: bool },
    Acted { result: ActionResult, now_at: StepId },
    Denied { reason: Option<String> },
    /// Index out of range or a non-interactive line.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Transition,
    Toggle { value: bool },
    Element,
    Info,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub label: String,
    pub selectable: bool,
    pub reason: Option<String>,
    pub kind: EntryKind,
}

impl Entry {
    fn new(label: impl Into<String>, kind: EntryKind, gate: GateResult) -> Self {
        Self {
            label: label.into(),
            selectable: gate.allowed,
            reason: gate.reason,
            kind,
        }
    }

    fn passive(label: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            label: label.into(),
            selectable: false,
            reason: None,
            kind,
        }
    }
}

/// What the operator sees on a step.
#[derive(Debug, Clone)]
pub struct StepView {
    pub id: StepId,
    pub title: String,
    pub body: Vec<String>,
    pub entries: Vec<Entry>,
    pub exits: Vec<Entry>,
    pub action_state: Option<ActionState>,
    /// Output panes of an action step: main sink first, then phases.
    pub panes: Vec<(String, Sink)>,
}

impl StepView {
    pub fn selectable_count(&self) -> usize {
        self.entries.iter().filter(|e| e.selectable).count()
    }
}

/// What a view entry refers to.
#[derive(Debug, Clone, Copy)]
enum Target {
    Transition(usize),
    Element(usize),
    None,
}

pub struct Navigator<'a> {
    session: &'a mut Session,
    graph: &'a StepGraph,
    hal: &'a dyn SystemHal,
    relay: &'a mut OutputRelay,
    env: &'a ActionEnv,
}

impl<'a> Navigator<'a> {
    pub fn new(
        session: &'a mut Session,
        graph: &'a StepGraph,
        hal: &'a dyn SystemHal,
        relay: &'a mut OutputRelay,
        env: &'a ActionEnv,
    ) -> Self {
        Self {
            session,
            graph,
            hal,
            relay,
            env,
        }
    }

    pub fn current(&self) -> StepId {
        self.session.current
    }

    /// Enter the main menu with a clean scratch.
    pub fn start(&mut self) -> Result<(), PatcherError> {
        self.session.reset_scratch();
        self.enter(StepId::MainMenu)
    }

    pub fn view(&self) -> Result<StepView, PatcherError> {
        let step = self.graph.step(self.session.current)?;
        let (entries, _) = self.entries(step)?;
        let exits = step
            .exits
            .iter()
            .map(|exit| Entry::new(exit.label, EntryKind::Transition, GateResult::allowed()))
            .collect();
        let panes = match (step.action(), self.session.output(step.id)) {
            (Some(_), Some(output)) => std::iter::once(("output".to_string(), output.main.clone()))
                .chain(
                    output
                        .phases
                        .iter()
                        .map(|(name, sink)| (name.to_string(), sink.clone())),
                )
                .collect(),
            _ => Vec::new(),
        };
        Ok(StepView {
            id: step.id,
            title: step.title.to_string(),
            body: self.graph.body(step, &*self.session),
            entries,
            exits,
            action_state: self.session.action_state(step.id),
            panes,
        })
    }

    pub fn select(&mut self, selection: Selection) -> Result<Outcome, PatcherError> {
        let graph = self.graph;
        let step = graph.step(self.session.current)?;
        match selection {
            Selection::Exit(index) => {
                let Some(exit) = step.exits.get(index) else {
                    return Ok(Outcome::Ignored);
                };
                log::debug!("exit {} -> {}", step.id, exit.to);
                self.session.reset_scratch();
                self.enter(exit.to)?;
                Ok(Outcome::Moved(exit.to))
            }
            Selection::Entry(index) => {
                let (entries, targets) = self.entries(step)?;
                let (Some(entry), Some(target)) = (entries.get(index), targets.get(index)) else {
                    return Ok(Outcome::Ignored);
                };
                if !entry.selectable {
                    return Ok(match entry.kind {
                        EntryKind::Info | EntryKind::Placeholder => Outcome::Ignored,
                        _ => Outcome::Denied {
                            reason: entry.reason.clone(),
                        },
                    });
                }
                match *target {
                    Target::Transition(i) => match step.transitions[i].effect {
                        Effect::Toggle(flag) => {
                            let value = self.session.store.toggle(flag, &mut *self.relay);
                            Ok(Outcome::Toggled { flag, value })
                        }
                        Effect::Goto(to) => self.go(to),
                    },
                    Target::Element(i) => {
                        let element = self.session.scratch.elements[i].clone();
                        self.choose(element);
                        match step.list_spec() {
                            Some(spec) => self.go(spec.on_select),
                            None => Ok(Outcome::Ignored),
                        }
                    }
                    Target::None => Ok(Outcome::Ignored),
                }
            }
        }
    }

    /// Move to `to`, running its action if it has one.
    fn go(&mut self, to: StepId) -> Result<Outcome, PatcherError> {
        let graph = self.graph;
        let target = graph.step(to)?;
        let gate = target.enabled_when.evaluate(&self.session.gate_context());
        if !gate.allowed {
            return Ok(Outcome::Denied {
                reason: gate.reason,
            });
        }
        let Some(spec) = target.action() else {
            self.enter(to)?;
            return Ok(Outcome::Moved(to));
        };

        self.session.current = to;
        let sink = if spec.kind.is_local() {
            self.relay.console().clone()
        } else {
            self.session.reset_output(to, spec.sink_mode)
        };
        let invoker = ActionInvoker::new(self.hal, self.env);
        let result = invoker.invoke(to, spec.kind, self.session, self.relay, sink)?;
        let state = if result.success {
            ActionState::Succeeded
        } else {
            ActionState::Failed
        };
        self.session.scratch.last_action = Some((to, state, result.clone()));

        let now_at = match spec.completion {
            Completion::Goto(next) if result.success => {
                self.enter(next)?;
                next
            }
            _ => to,
        };
        Ok(Outcome::Acted { result, now_at })
    }

    fn enter(&mut self, to: StepId) -> Result<(), PatcherError> {
        let graph = self.graph;
        let step = graph.step(to)?;
        self.session.current = to;
        self.session.scratch.elements.clear();
        self.session.scratch.list_error = None;
        if let Some(spec) = step.list_spec() {
            match self.enumerate(spec.source) {
                Ok(elements) => self.session.scratch.elements = elements,
                Err(err) => {
                    log::warn!("listing {:?} for {} failed: {}", spec.source, to, err);
                    self.relay
                        .line(&format!("Failed to list {:?}: {}", spec.source, err));
                    self.session.scratch.list_error = Some(err.to_string());
                }
            }
        }
        log::debug!("entered {}", to);
        Ok(())
    }

    fn enumerate(&mut self, source: ListSource) -> HalResult<Vec<ListElement>> {
        let elements = match source {
            ListSource::Disks => self
                .hal
                .list_disks()?
                .into_iter()
                .map(ListElement::Disk)
                .collect(),
            ListSource::Partitions => match &self.session.scratch.disk {
                Some(disk) => self
                    .hal
                    .list_partitions(disk)?
                    .into_iter()
                    .map(ListElement::Partition)
                    .collect(),
                None => Vec::new(),
            },
            ListSource::Catalog => self
                .hal
                .list_downloadable(&self.env.payload_path, &self.env.catalog_seed)?
                .into_iter()
                .map(ListElement::Catalog)
                .collect(),
            ListSource::LocalInstallers => self
                .hal
                .list_local_installers()?
                .into_iter()
                .map(ListElement::Installer)
                .collect(),
            ListSource::UsbDisks => self
                .hal
                .list_formattable_disks()?
                .into_iter()
                .filter(|disk| disk.size_bytes >= MIN_USB_BYTES)
                .map(ListElement::UsbDisk)
                .collect(),
            ListSource::Models => {
                let detected = self.session.facts.detected_model.clone();
                model_choices(&detected)
                    .into_iter()
                    .map(|model| ListElement::Model {
                        detected: model == detected,
                        model,
                    })
                    .collect()
            }
            ListSource::GpuChoices => GpuOverride::ALL.into_iter().map(ListElement::Gpu).collect(),
            ListSource::Patches => {
                let record = self.session.store.record();
                let patches = self
                    .hal
                    .detect_patches(record.effective_model(), record)?;
                let names = bootpatch_core::facts::applicable_patches(&patches)
                    .into_iter()
                    .map(|name| ListElement::Patch(name.to_string()))
                    .collect();
                self.session.scratch.patches = Some(patches);
                names
            }
        };
        Ok(elements)
    }

    /// Record the chosen element in the scratch for the next step.
    fn choose(&mut self, element: ListElement) {
        let scratch = &mut self.session.scratch;
        match element {
            ListElement::Disk(disk) => scratch.disk = Some(disk),
            ListElement::Partition(partition) => scratch.partition = Some(partition),
            ListElement::Catalog(entry) => scratch.catalog_entry = Some(entry),
            ListElement::Installer(installer) => scratch.installer = Some(installer),
            ListElement::UsbDisk(disk) => scratch.usb_disk = Some(disk),
            ListElement::Model { model, .. } => scratch.model_choice = Some(model),
            ListElement::Gpu(gpu) => scratch.gpu_choice = Some(gpu.label().to_string()),
            ListElement::Patch(_) => {}
        }
    }

    fn entries(&self, step: &Step) -> Result<(Vec<Entry>, Vec<Target>), PatcherError> {
        let ctx = self.session.gate_context();
        let mut entries = Vec::new();
        let mut targets = Vec::new();

        if let Some(spec) = step.list_spec() {
            let elements = &self.session.scratch.elements;
            let selectable = matches!(step.kind, StepKind::DynamicList(_));
            if elements.is_empty() {
                entries.push(Entry::passive(spec.empty_message, EntryKind::Placeholder));
                targets.push(Target::None);
                if let Some(error) = &self.session.scratch.list_error {
                    entries.push(Entry::passive(error.clone(), EntryKind::Info));
                    targets.push(Target::None);
                }
                if let Some(hint) = spec.hint {
                    entries.push(Entry::passive(hint, EntryKind::Info));
                    targets.push(Target::None);
                }
            } else {
                for (i, element) in elements.iter().enumerate() {
                    if selectable {
                        entries.push(Entry::new(
                            element.label(),
                            EntryKind::Element,
                            GateResult::allowed(),
                        ));
                        targets.push(Target::Element(i));
                    } else {
                        entries.push(Entry::passive(element.label(), EntryKind::Info));
                        targets.push(Target::None);
                    }
                }
            }
        }

        for (i, transition) in step.transitions.iter().enumerate() {
            let mut gate = transition.gate.evaluate(&ctx);
            if gate.allowed {
                if let Effect::Goto(to) = transition.effect {
                    gate = self.graph.step(to)?.enabled_when.evaluate(&ctx);
                }
            }
            let kind = match transition.effect {
                Effect::Toggle(flag) => EntryKind::Toggle {
                    value: self.session.store.get(flag),
                },
                Effect::Goto(_) => EntryKind::Transition,
            };
            entries.push(Entry::new(transition.label, kind, gate));
            targets.push(Target::Transition(i));
        }
        Ok((entries, targets))
    }
}
