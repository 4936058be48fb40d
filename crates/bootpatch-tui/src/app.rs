//! Front-end state: one session, the cursor and the last rendered view.

use bootpatch_core::{OutputRelay, Sink, SinkMode, YieldPoint};
use bootpatch_error::PatcherResult;
use bootpatch_hal::SystemHal;
use bootpatch_workflow::{
    ActionEnv, Navigator, Outcome, Selection, Session, StepGraph, StepId, StepView,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResult {
    Continue,
    Quit,
}

pub struct App {
    hal: Box<dyn SystemHal>,
    pub session: Session,
    graph: StepGraph,
    pub relay: OutputRelay,
    env: ActionEnv,
    pub view: StepView,
    /// Row under the cursor: entries first, then exits.
    pub selected: usize,
    pub status_message: String,
}

impl App {
    pub fn new(hal: Box<dyn SystemHal>, session: Session, env: ActionEnv) -> PatcherResult<Self> {
        let mut session = session;
        let graph = StepGraph::standard();
        let mut relay = OutputRelay::new(Sink::new(SinkMode::Append));
        let view = {
            let mut nav = Navigator::new(&mut session, &graph, hal.as_ref(), &mut relay, &env);
            nav.start()?;
            nav.view()?
        };
        let mut app = Self {
            hal,
            session,
            graph,
            relay,
            env,
            view,
            selected: 0,
            status_message: String::new(),
        };
        app.selected = app.first_selectable();
        Ok(app)
    }

    /// Hook the host calls back into while an action runs.
    pub fn set_yield_point(&mut self, yield_point: Box<dyn YieldPoint>) {
        self.relay.set_yield_point(yield_point);
    }

    pub fn current_step(&self) -> StepId {
        self.view.id
    }

    pub fn row_count(&self) -> usize {
        self.view.entries.len() + self.view.exits.len()
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> InputResult {
        if key.kind != KeyEventKind::Press {
            return InputResult::Continue;
        }
        match key.code {
            KeyCode::Char('q') => return InputResult::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return InputResult::Quit
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.row_count() {
                    self.selected += 1;
                }
            }
            KeyCode::Enter => {
                let selection = if self.selected < self.view.entries.len() {
                    Selection::Entry(self.selected)
                } else {
                    Selection::Exit(self.selected - self.view.entries.len())
                };
                self.select(selection);
            }
            KeyCode::Esc => {
                if !self.view.exits.is_empty() {
                    self.select(Selection::Exit(0));
                }
            }
            _ => {}
        }
        InputResult::Continue
    }

    fn select(&mut self, selection: Selection) {
        let before = self.view.id;
        let (result, view) = {
            let mut nav = self.navigator();
            let result = nav.select(selection);
            // A failed action may still have moved the session.
            (result, nav.view())
        };
        match view {
            Ok(view) => {
                self.view = view;
                if self.view.id != before {
                    self.selected = self.first_selectable();
                } else if self.selected >= self.row_count() {
                    self.selected = self.row_count().saturating_sub(1);
                }
            }
            Err(err) => log::error!("Rendering {} failed: {}", self.session.current, err),
        }
        match result {
            Ok(outcome) => self.status_message = describe(&outcome),
            Err(err) => {
                log::error!("Selection on {} failed: {}", before, err);
                self.status_message = format!("Error: {}", err);
            }
        }
    }

    fn navigator(&mut self) -> Navigator<'_> {
        Navigator::new(
            &mut self.session,
            &self.graph,
            self.hal.as_ref(),
            &mut self.relay,
            &self.env,
        )
    }

    fn first_selectable(&self) -> usize {
        self.view
            .entries
            .iter()
            .position(|entry| entry.selectable)
            .unwrap_or(self.view.entries.len())
    }
}

fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Toggled { flag, value } => format!(
            "{} {}",
            flag.label(),
            if *value { "enabled" } else { "disabled" }
        ),
        Outcome::Acted { result, .. } if result.success => "Finished".to_string(),
        Outcome::Acted { .. } => "Failed, see output".to_string(),
        Outcome::Denied { reason } => reason
            .clone()
            .unwrap_or_else(|| "Unavailable".to_string()),
        Outcome::Moved(_) | Outcome::Ignored => String::new(),
    }
}
