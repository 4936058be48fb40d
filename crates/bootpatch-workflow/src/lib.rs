//! bootpatch workflow.
//!
//! The step graph describes every page of the front-end. A [`Navigator`]
//! walks it for one session, materializing lists from the collaborators and
//! running action steps through the [`ActionInvoker`] with their output
//! redirected to the step's own sink.

pub mod graph;
pub mod invoker;
pub mod navigation;
pub mod session;
pub mod step;

pub use graph::StepGraph;
pub use invoker::{ActionEnv, ActionInvoker, ActionResult};
pub use navigation::{Entry, EntryKind, Navigator, Outcome, Selection, StepView};
pub use session::{ActionState, Session, SessionOptions, StepOutput, StepScratch};
pub use step::{ActionKind, Completion, Effect, ListElement, ListSource, Step, StepId, StepKind};
