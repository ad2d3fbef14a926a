use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::{App, Screen};
use crate::orchestrator::{Decision, InstallRow, Outcome, View};
use crate::probe::InstallationStatus;
use crate::tracker::StepState;

const WELCOME: &str = "Welcome to Decor! This tool will help you install ('decorate') \
                       your environment with what you need.";

pub fn render(app: &App, frame: &mut Frame) {
    let area = frame.area();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(area);

    render_header(app, frame, main_layout[0]);
    match &app.screen {
        Screen::Menu => render_menu(app, frame, main_layout[1]),
        Screen::Install(orchestrator) => {
            render_install(app, &orchestrator.view(), frame, main_layout[1])
        }
    }
    render_footer(app, frame, main_layout[2]);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let os = if app.platform.distro_id.is_empty() {
        app.platform.os.to_string()
    } else {
        format!("{} ({})", app.platform.os, app.platform.distro_id)
    };
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            " decor",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(format!(" {WELCOME}"), Style::default().fg(Color::Gray))),
        Line::from(vec![
            Span::styled(" OS: ", Style::default().fg(Color::Gray)),
            Span::styled(
                os,
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" | PACKAGE-MANAGER: ", Style::default().fg(Color::Gray)),
            Span::styled(
                app.platform.pkg_manager.to_string(),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" | DRY-RUN: ", Style::default().fg(Color::Gray)),
            Span::styled(
                if app.dry_run { "ON" } else { "OFF" },
                Style::default()
                    .fg(if app.dry_run { Color::Yellow } else { Color::Green })
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
    ])
    .wrap(Wrap { trim: false });
    frame.render_widget(header, area);
}

fn render_menu(app: &App, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = app
        .menu
        .items()
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let is_cursor = idx == app.menu.cursor();
            let selected = app.menu.is_selected(idx);
            let pointer = if is_cursor { "> " } else { "  " };
            let symbol = if selected { "[x] " } else { "[ ] " };
            let base_style = if selected {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            };
            let style = if is_cursor {
                base_style.bg(Color::Rgb(40, 40, 40)).add_modifier(Modifier::BOLD).fg(Color::Blue)
            } else {
                base_style
            };
            ListItem::new(Line::from(vec![
                Span::styled(pointer, style),
                Span::styled(symbol, style),
                Span::styled(item.name, style),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title("  Select the languages to install  ")
            .border_style(Style::default().fg(Color::Cyan)),
    );
    let mut state = ListState::default();
    state.select(Some(app.menu.cursor()));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_install(app: &App, view: &View, frame: &mut Frame, area: Rect) {
    match view {
        View::Checking { done, total } => {
            let text = Paragraph::new(format!(" Checking installed languages... ({done}/{total})"))
                .block(bordered("  Checking  ", Color::Cyan));
            frame.render_widget(text, area);
        }
        View::Prompting {
            statuses, current, ..
        } => render_prompting(app, statuses, current, frame, area),
        View::Installing { rows } => render_progress(app, rows, frame, area),
        View::Complete { outcomes } => {
            let lines: Vec<Line> = outcomes
                .iter()
                .map(|(id, outcome)| {
                    let color = match outcome {
                        Outcome::Failed(_) => Color::Red,
                        Outcome::Skipped => Color::DarkGray,
                        Outcome::Installed | Outcome::Updated => Color::Green,
                    };
                    Line::from(vec![
                        Span::styled(
                            format!(" {}: ", app.menu.name_of(id)),
                            Style::default().fg(Color::White),
                        ),
                        Span::styled(outcome_text(outcome), Style::default().fg(color)),
                    ])
                })
                .collect();
            let summary = Paragraph::new(lines)
                .block(bordered("  Installation Complete  ", Color::Green))
                .wrap(Wrap { trim: true });
            frame.render_widget(summary, area);
        }
    }
}

fn render_prompting(
    app: &App,
    statuses: &[InstallationStatus],
    current: &InstallationStatus,
    frame: &mut Frame,
    area: Rect,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(statuses.len() as u16 + 2),
            Constraint::Min(0),
        ])
        .split(area);

    let lines: Vec<Line> = statuses
        .iter()
        .map(|status| Line::from(status_line(&app.menu.name_of(&status.id), status)))
        .collect();
    frame.render_widget(
        Paragraph::new(lines).block(bordered("  Installation Status  ", Color::Cyan)),
        chunks[0],
    );

    let prompt: Vec<Line> = prompt_text(&app.menu.name_of(&current.id), current)
        .into_iter()
        .map(Line::from)
        .collect();
    frame.render_widget(
        Paragraph::new(prompt)
            .block(bordered("  What next?  ", Color::Yellow))
            .wrap(Wrap { trim: true }),
        chunks[1],
    );
}

fn render_progress(app: &App, rows: &[InstallRow], frame: &mut Frame, area: Rect) {
    let block = bordered("  Installing Languages...  ", Color::Cyan);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let constraints: Vec<Constraint> = rows.iter().map(|_| Constraint::Length(3)).collect();
    let slots = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (row, slot) in rows.iter().zip(slots.iter()) {
        let name = app.menu.name_of(&row.id);
        let Some(snapshot) = row.snapshot.as_ref().filter(|_| row.decision != Decision::Skip) else {
            frame.render_widget(
                Paragraph::new(format!("{name}: ⊘ Skipped"))
                    .style(Style::default().fg(Color::DarkGray))
                    .block(
                        Block::default()
                            .borders(Borders::BOTTOM)
                            .border_style(Style::default().fg(Color::DarkGray)),
                    ),
                *slot,
            );
            continue;
        };

        let color = match snapshot.step {
            StepState::Error => Color::Red,
            StepState::Complete => Color::Green,
            StepState::Starting | StepState::Named(_) => Color::Cyan,
        };
        let step = match (&snapshot.step, snapshot.error.as_deref()) {
            (StepState::Error, Some(error)) => format!("error: {error}"),
            (step, _) => step.label().to_string(),
        };
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .title(format!(" {name} ({step}) "))
                    .title_style(Style::default().fg(color)),
            )
            .gauge_style(Style::default().fg(color).bg(Color::Black).add_modifier(Modifier::BOLD))
            .ratio(snapshot.progress.clamp(0.0, 1.0))
            .label(format!("{:.0}%", snapshot.progress * 100.0));
        frame.render_widget(gauge, *slot);
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let help = match &app.screen {
        Screen::Menu => "↑/↓ or k/j: Move • Enter/Space: Select • n: Continue • q: Quit",
        Screen::Install(orchestrator) => match orchestrator.view() {
            View::Checking { .. } => "checking installed languages • q: Quit",
            View::Prompting { .. } => concat!(
                "y/Enter: Default • i: Install • u: Update • ",
                "r: Reinstall • n/s: Skip • q: Quit"
            ),
            View::Installing { .. } => "installation in progress • please wait... • q: Quit",
            View::Complete { .. } => "Done! Press [Enter] or [q] to exit",
        },
    };
    let footer = Paragraph::new(Line::from(vec![
        Span::styled("Keys: ", Style::default().fg(Color::Cyan)),
        Span::raw(help),
    ]))
    .alignment(Alignment::Center);
    frame.render_widget(footer, area);
}

fn bordered(title: &str, color: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(color))
}

/// One row of the status overview.
pub fn status_line(name: &str, status: &InstallationStatus) -> String {
    let version = status.installed_version.as_deref().unwrap_or_default();
    if !status.installed {
        format!("❌ {name}: NOT INSTALLED")
    } else if status.is_latest() {
        format!("✅ {name}: {version} (latest)")
    } else {
        format!("⚠️  {name}: {version} (latest: {})", status.latest_version)
    }
}

/// The question asked for the item under the cursor, one line per entry.
pub fn prompt_text(name: &str, status: &InstallationStatus) -> Vec<String> {
    let version = status.installed_version.as_deref().unwrap_or_default();
    if !status.installed {
        vec![
            format!("{name} is not installed."),
            "(i) Install".to_string(),
            "(s) Skip".to_string(),
        ]
    } else if status.is_latest() {
        vec![
            format!("{name} is installed (version: {version})."),
            "(s) Skip".to_string(),
            "(r) Reinstall".to_string(),
        ]
    } else {
        vec![
            format!(
                "{name} is installed (current: {version}, latest: {}).",
                status.latest_version
            ),
            "(u) Update".to_string(),
            "(s) Skip".to_string(),
        ]
    }
}

pub fn outcome_text(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Skipped => "skipped".to_string(),
        Outcome::Installed => "installed".to_string(),
        Outcome::Updated => "updated".to_string(),
        Outcome::Failed(reason) => format!("error: {reason}"),
    }
}
