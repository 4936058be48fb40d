use crate::app::App;
use crate::widgets::{tail, CheckboxState};
use bootpatch_core::Sink;
use bootpatch_workflow::{ActionState, Entry, EntryKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

const KEY_HELP: &str = "Up/Down: move | Enter: select | Esc: back | q: quit";
const CONSOLE_LINES: usize = 6;

pub fn draw(f: &mut Frame, app: &App) {
    // Title | Body | Console | Key legend
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(CONSOLE_LINES as u16 + 2),
                Constraint::Length(4),
            ]
            .as_ref(),
        )
        .split(f.area());

    let facts = &app.session.facts;
    let record = app.session.store.record();
    let mut title = vec![
        Span::styled("bootpatch", Style::default().fg(Color::White)),
        Span::raw(" | "),
        Span::styled(
            format!("Model: {}", facts.detected_model),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled(
            format!("macOS: {}", facts.detected_os.name()),
            Style::default().fg(Color::Cyan),
        ),
    ];
    if let Some(target) = record.target_model() {
        title.push(Span::raw(" | "));
        title.push(Span::styled(
            format!("Target: {}", target),
            Style::default().fg(Color::Yellow),
        ));
    }
    f.render_widget(
        Block::default().borders(Borders::ALL).title(Line::from(title)),
        chunks[0],
    );

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)].as_ref())
        .split(chunks[1]);
    draw_step(f, app, body[0]);
    draw_panes(f, app, body[1]);

    let console = app.relay.console().lines();
    draw_sink_lines(f, "Console", tail(&console, CONSOLE_LINES), chunks[2]);

    let legend = Paragraph::new(format!("{}\n{}", app.status_message, KEY_HELP))
        .block(Block::default().borders(Borders::ALL).title("Keys"));
    f.render_widget(legend, chunks[3]);
}

fn draw_step(f: &mut Frame, app: &App, area: Rect) {
    let view = &app.view;
    let mut items: Vec<ListItem> = view
        .body
        .iter()
        .map(|line| ListItem::new(Line::from(line.as_str())))
        .collect();
    if !items.is_empty() {
        items.push(ListItem::new(Line::from("")));
    }

    let rows = view.entries.iter().chain(view.exits.iter());
    for (index, entry) in rows.enumerate() {
        items.push(entry_item(entry, index == app.selected));
    }

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(view.title.as_str()),
    );
    f.render_widget(list, area);
}

fn entry_item(entry: &Entry, cursor: bool) -> ListItem<'static> {
    let marker = if cursor { "> " } else { "  " };
    let text = match entry.kind {
        EntryKind::Toggle { value } => {
            format!("{}{} {}", marker, CheckboxState::from(value).symbol(), entry.label)
        }
        _ => format!("{}{}", marker, entry.label),
    };
    let style = match entry.kind {
        EntryKind::Placeholder => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
        EntryKind::Info => Style::default().fg(Color::Gray),
        _ if !entry.selectable => Style::default().fg(Color::DarkGray),
        _ if cursor => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        _ => Style::default(),
    };

    let mut lines = vec![Line::from(Span::styled(text, style))];
    if let Some(reason) = &entry.reason {
        lines.push(Line::from(Span::styled(
            format!("    {}", reason),
            Style::default().fg(Color::DarkGray),
        )));
    }
    ListItem::new(lines)
}

fn draw_panes(f: &mut Frame, app: &App, area: Rect) {
    let view = &app.view;
    if view.panes.is_empty() {
        let help = Paragraph::new("Select an entry to continue.")
            .block(Block::default().borders(Borders::ALL).title("Output"));
        f.render_widget(help, area);
        return;
    }

    let state = match view.action_state {
        Some(ActionState::Succeeded) => " [done]",
        Some(ActionState::Failed) => " [failed]",
        None => "",
    };
    let constraints: Vec<Constraint> = view
        .panes
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i == 0 {
                Constraint::Min(5)
            } else {
                Constraint::Length(4)
            }
        })
        .collect();
    let areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, (name, sink)) in view.panes.iter().enumerate() {
        let title = if i == 0 {
            format!("{}{}", name, state)
        } else {
            name.clone()
        };
        draw_sink(f, &title, sink, areas[i]);
    }
}

/// Render the tail of `sink` that fits in `area`.
pub fn draw_sink(f: &mut Frame, title: &str, sink: &Sink, area: Rect) {
    let lines = sink.lines();
    let visible = area.height.saturating_sub(2) as usize;
    draw_sink_lines(f, title, tail(&lines, visible), area);
}

fn draw_sink_lines(f: &mut Frame, title: &str, lines: &[String], area: Rect) {
    let text: Vec<Line> = lines.iter().map(|l| Line::from(l.as_str())).collect();
    let paragraph = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title.to_string()),
    );
    f.render_widget(paragraph, area);
}

/// Frame shown while an action holds the session.
pub fn draw_running(f: &mut Frame, label: &str, sink: &Sink) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Length(3), Constraint::Min(5)].as_ref())
        .split(f.area());
    let title = Paragraph::new(format!("Running {}...", label))
        .block(Block::default().borders(Borders::ALL).title("bootpatch"));
    f.render_widget(title, chunks[0]);
    draw_sink(f, label, sink, chunks[1]);
}
