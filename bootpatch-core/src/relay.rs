//! Output relay: routes progress text to the sink of whatever is running.
//!
//! The relay always has a console sink. [`OutputRelay::redirect`] pushes a new
//! target and returns a [`RelayScope`]; dropping the scope (on every exit path,
//! including unwinding) flushes any partial line and restores the previous
//! target. Nested scopes are created through the outer scope, so release order
//! is LIFO by construction.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

/// How a sink treats incoming text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    /// Every line is appended to a scrollable log.
    Append,
    /// Every line replaces the displayed content (single-line progress).
    Replace,
    /// Every write replaces the whole content; sealed once its scope closes.
    ReplaceAll,
}

/// Displayed content of a sink.
#[derive(Debug, Clone)]
pub struct SinkBuffer {
    mode: SinkMode,
    lines: Vec<String>,
    pending: String,
    sealed: bool,
}

impl SinkBuffer {
    fn new(mode: SinkMode) -> Self {
        Self {
            mode,
            lines: Vec::new(),
            pending: String::new(),
            sealed: false,
        }
    }

    pub fn mode(&self) -> SinkMode {
        self.mode
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Partial line not yet terminated by a newline.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn push_line(&mut self, line: &str) {
        if self.sealed {
            return;
        }
        match self.mode {
            SinkMode::Append => self.lines.push(line.to_string()),
            SinkMode::Replace => {
                self.lines.clear();
                self.lines.push(line.to_string());
            }
            SinkMode::ReplaceAll => {
                if line.trim().is_empty() {
                    return;
                }
                self.lines = line.trim_end().lines().map(str::to_string).collect();
            }
        }
    }

    fn write_str(&mut self, text: &str) {
        if self.sealed {
            return;
        }
        if self.mode == SinkMode::ReplaceAll {
            self.push_line(text);
            return;
        }
        self.pending.push_str(text);
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            self.push_line(line.trim_end_matches(['\n', '\r']));
        }
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.push_line(&line);
        }
    }
}

/// Shared handle to a sink buffer. Cloning shares the same buffer.
#[derive(Debug, Clone)]
pub struct Sink(Arc<Mutex<SinkBuffer>>);

impl Sink {
    pub fn new(mode: SinkMode) -> Self {
        Sink(Arc::new(Mutex::new(SinkBuffer::new(mode))))
    }

    fn lock(&self) -> MutexGuard<'_, SinkBuffer> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn mode(&self) -> SinkMode {
        self.lock().mode
    }

    pub fn snapshot(&self) -> SinkBuffer {
        self.lock().clone()
    }

    /// Displayed lines, including a trailing partial line if one is pending.
    pub fn lines(&self) -> Vec<String> {
        let buffer = self.lock();
        let mut lines = buffer.lines.clone();
        if !buffer.pending.is_empty() {
            lines.push(buffer.pending.clone());
        }
        lines
    }

    pub fn text(&self) -> String {
        self.lines().join("\n")
    }

    pub fn is_sealed(&self) -> bool {
        self.lock().sealed
    }

    pub fn same_as(&self, other: &Sink) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn clear(&self) {
        let mut buffer = self.lock();
        buffer.lines.clear();
        buffer.pending.clear();
        buffer.sealed = false;
    }

    fn flush(&self) {
        self.lock().flush();
    }

    fn seal(&self) {
        self.lock().sealed = true;
    }
}

/// Anything progress text can be written to.
pub trait Progress {
    /// Write raw text; lines complete at `\n`.
    fn write_str(&mut self, text: &str);

    /// Write one complete line.
    fn line(&mut self, text: &str) {
        self.write_str(text);
        self.write_str("\n");
    }
}

impl Progress for Sink {
    fn write_str(&mut self, text: &str) {
        self.lock().write_str(text);
    }

    fn line(&mut self, text: &str) {
        let mut buffer = self.lock();
        if buffer.mode == SinkMode::ReplaceAll {
            buffer.write_str(text);
        } else {
            buffer.write_str(text);
            buffer.write_str("\n");
        }
    }
}

impl<P: Progress + ?Sized> Progress for &mut P {
    fn write_str(&mut self, text: &str) {
        (**self).write_str(text);
    }

    fn line(&mut self, text: &str) {
        (**self).line(text);
    }
}

/// Cooperative yield hook: lets the host repaint while a blocking action runs.
pub trait YieldPoint {
    fn yield_now(&mut self, label: &str, sink: &Sink);
}

pub struct OutputRelay {
    console: Sink,
    stack: Vec<(String, Sink)>,
    yield_point: Option<Box<dyn YieldPoint>>,
}

impl OutputRelay {
    pub fn new(console: Sink) -> Self {
        Self {
            console,
            stack: Vec::new(),
            yield_point: None,
        }
    }

    pub fn set_yield_point(&mut self, yield_point: Box<dyn YieldPoint>) {
        self.yield_point = Some(yield_point);
    }

    pub fn console(&self) -> &Sink {
        &self.console
    }

    /// Sink that currently receives progress text.
    pub fn current(&self) -> &Sink {
        self.stack
            .last()
            .map(|(_, sink)| sink)
            .unwrap_or(&self.console)
    }

    pub fn current_label(&self) -> &str {
        self.stack
            .last()
            .map(|(label, _)| label.as_str())
            .unwrap_or("console")
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn redirect(&mut self, label: impl Into<String>, sink: Sink) -> RelayScope<'_> {
        let label = label.into();
        log::debug!("relay: redirect to {}", label);
        self.stack.push((label, sink));
        let depth = self.stack.len();
        RelayScope { relay: self, depth }
    }

    /// Give the host a chance to repaint the current sink.
    pub fn yield_now(&mut self) {
        let (label, sink) = match self.stack.last() {
            Some((label, sink)) => (label.as_str(), sink),
            None => ("console", &self.console),
        };
        if let Some(yield_point) = self.yield_point.as_mut() {
            yield_point.yield_now(label, sink);
        }
    }

    fn close_to(&mut self, depth: usize) {
        while self.stack.len() >= depth {
            let Some((label, sink)) = self.stack.pop() else {
                break;
            };
            sink.flush();
            if sink.mode() == SinkMode::ReplaceAll {
                sink.seal();
            }
            log::debug!("relay: released {}", label);
        }
    }
}

impl Progress for OutputRelay {
    fn write_str(&mut self, text: &str) {
        let mut sink = self.current().clone();
        sink.write_str(text);
        if text.contains('\n') {
            self.yield_now();
        }
    }

    fn line(&mut self, text: &str) {
        let mut sink = self.current().clone();
        sink.line(text);
        self.yield_now();
    }
}

/// An open redirection. Dropping it restores the previous target.
pub struct RelayScope<'a> {
    relay: &'a mut OutputRelay,
    depth: usize,
}

impl RelayScope<'_> {
    pub fn sink(&self) -> &Sink {
        self.relay.current()
    }

    pub fn release(self) {}
}

impl Deref for RelayScope<'_> {
    type Target = OutputRelay;

    fn deref(&self) -> &OutputRelay {
        &*self.relay
    }
}

impl DerefMut for RelayScope<'_> {
    fn deref_mut(&mut self) -> &mut OutputRelay {
        &mut *self.relay
    }
}

impl Progress for RelayScope<'_> {
    fn write_str(&mut self, text: &str) {
        self.relay.write_str(text);
    }

    fn line(&mut self, text: &str) {
        self.relay.line(text);
    }
}

impl Drop for RelayScope<'_> {
    fn drop(&mut self) {
        self.relay.close_to(self.depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn append_sink_keeps_every_line_in_order() {
        let mut sink = Sink::new(SinkMode::Append);
        sink.line("one");
        sink.line("two");
        sink.write_str("thr");
        sink.write_str("ee\nfour\n");
        assert_eq!(sink.lines(), vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn replace_sink_shows_latest_line() {
        let mut sink = Sink::new(SinkMode::Replace);
        sink.line("10%");
        sink.line("20%");
        assert_eq!(sink.lines(), vec!["20%"]);
    }

    #[test]
    fn scope_restores_previous_target_and_flushes_partial_line() {
        let console = Sink::new(SinkMode::Append);
        let mut relay = OutputRelay::new(console.clone());
        let step = Sink::new(SinkMode::Append);
        {
            let mut scope = relay.redirect("step", step.clone());
            scope.line("inside");
            scope.write_str("partial");
        }
        relay.line("after");
        assert_eq!(step.lines(), vec!["inside", "partial"]);
        assert_eq!(console.lines(), vec!["after"]);
        assert_eq!(relay.depth(), 0);
    }

    #[test]
    fn nested_scopes_release_lifo() {
        let console = Sink::new(SinkMode::Append);
        let mut relay = OutputRelay::new(console.clone());
        let outer = Sink::new(SinkMode::Append);
        let inner = Sink::new(SinkMode::Replace);
        {
            let mut outer_scope = relay.redirect("outer", outer.clone());
            outer_scope.line("a");
            {
                let mut inner_scope = outer_scope.redirect("inner", inner.clone());
                inner_scope.line("b");
                assert_eq!(inner_scope.depth(), 2);
            }
            outer_scope.line("c");
        }
        assert_eq!(outer.lines(), vec!["a", "c"]);
        assert_eq!(inner.lines(), vec!["b"]);
    }

    #[test]
    fn replace_all_sink_is_sealed_after_release() {
        let mut relay = OutputRelay::new(Sink::new(SinkMode::Append));
        let status = Sink::new(SinkMode::ReplaceAll);
        {
            let mut scope = relay.redirect("status", status.clone());
            scope.line("Installing...");
            scope.write_str("Finished installing\nmacOS 12.1\n");
        }
        assert!(status.is_sealed());
        status.clone().line("late write");
        assert_eq!(status.lines(), vec!["Finished installing", "macOS 12.1"]);
    }

    #[test]
    fn scope_released_during_unwind() {
        let console = Sink::new(SinkMode::Append);
        let mut relay = OutputRelay::new(console.clone());
        let step = Sink::new(SinkMode::Append);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut scope = relay.redirect("step", step.clone());
            scope.line("before panic");
            panic!("collaborator blew up");
        }));
        assert!(result.is_err());
        assert_eq!(relay.depth(), 0);
        relay.line("recovered");
        assert_eq!(step.lines(), vec!["before panic"]);
        assert_eq!(console.lines(), vec!["recovered"]);
    }

    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl YieldPoint for Recorder {
        fn yield_now(&mut self, label: &str, sink: &Sink) {
            self.0
                .borrow_mut()
                .push(format!("{}:{}", label, sink.lines().len()));
        }
    }

    #[test]
    fn yield_point_runs_after_each_line() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut relay = OutputRelay::new(Sink::new(SinkMode::Append));
        relay.set_yield_point(Box::new(Recorder(Rc::clone(&seen))));
        {
            let mut scope = relay.redirect("build", Sink::new(SinkMode::Append));
            scope.line("one");
            scope.line("two");
        }
        assert_eq!(seen.borrow().as_slice(), &["build:1", "build:2"]);
    }
}
