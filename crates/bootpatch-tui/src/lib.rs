//! bootpatch terminal front-end.

pub mod app;
pub mod demo;
pub mod pump;
pub mod ui;
pub mod widgets;

use anyhow::{Context, Result};
use app::{App, InputResult};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use pump::TerminalPump;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::cell::RefCell;
use std::io::{self, IsTerminal};
use std::rc::Rc;
use std::time::Duration;

/// Run the interactive front-end until the operator quits.
pub fn run(mut app: App) -> Result<()> {
    if !io::stdout().is_terminal() {
        anyhow::bail!(
            "No TTY detected. bootpatch requires an interactive terminal.\n\
             Use --dump-steps for a non-interactive overview."
        );
    }

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Rc::new(RefCell::new(Terminal::new(CrosstermBackend::new(stdout))?));
    app.set_yield_point(Box::new(TerminalPump::new(terminal.clone())));

    let result = run_loop(&terminal, &mut app);

    disable_raw_mode()?;
    {
        let mut terminal = terminal.borrow_mut();
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
    }
    result
}

fn run_loop(
    terminal: &Rc<RefCell<Terminal<CrosstermBackend<io::Stdout>>>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.borrow_mut().draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if app.handle_input(key) == InputResult::Quit {
                    log::info!("Operator quit on {}", app.current_step());
                    return Ok(());
                }
            }
        }
    }
}
