//! Redraws the terminal while an action runs on the UI thread.

use crate::ui;
use bootpatch_core::{Sink, YieldPoint};
use ratatui::{backend::Backend, Terminal};
use std::cell::RefCell;
use std::rc::Rc;

pub struct TerminalPump<B: Backend> {
    terminal: Rc<RefCell<Terminal<B>>>,
}

impl<B: Backend> TerminalPump<B> {
    pub fn new(terminal: Rc<RefCell<Terminal<B>>>) -> Self {
        Self { terminal }
    }
}

impl<B: Backend> YieldPoint for TerminalPump<B> {
    fn yield_now(&mut self, label: &str, sink: &Sink) {
        let Ok(mut terminal) = self.terminal.try_borrow_mut() else {
            return;
        };
        if let Err(err) = terminal.draw(|f| ui::draw_running(f, label, sink)) {
            log::warn!("redraw during {} failed: {}", label, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootpatch_core::{Progress, SinkMode};
    use ratatui::backend::TestBackend;

    #[test]
    fn redraw_shows_running_sink() {
        let terminal = Rc::new(RefCell::new(Terminal::new(TestBackend::new(60, 12)).unwrap()));
        let mut pump = TerminalPump::new(terminal.clone());
        let mut sink = Sink::new(SinkMode::Append);
        sink.line("Copying EFI");

        pump.yield_now("install", &sink);

        let buffer = terminal.borrow().backend().buffer().clone();
        let text: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("Running install..."));
        assert!(text.contains("Copying EFI"));
    }
}
