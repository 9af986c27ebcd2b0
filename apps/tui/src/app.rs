//! Core TUI application state and event loop.

use std::io;
use std::time::{Duration, Instant};

use chrono::Utc;
use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use studyplan_core::progress;
use tracing::{info, warn};

use crate::screens::{Action, ScreenId, Screens};
use crate::session::Session;
use crate::widgets::status_bar;

/// Application state.
pub(crate) struct App {
    /// Currently active screen tab.
    pub active_tab: usize,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Status message shown in bottom bar.
    pub status: String,
    /// Whether the status message reports a failure.
    pub status_is_error: bool,
    /// Whether help overlay is visible.
    pub show_help: bool,
    pub screens: Screens,
    pub session: Session,
}

impl App {
    pub(crate) fn new(session: Session) -> Self {
        let mut screens = Screens::new(&session.config.pomodoro);
        screens.refresh(&session);

        Self {
            active_tab: 0,
            should_quit: false,
            status: format!("Hello, {} · press ? for help", session.user.display_name),
            status_is_error: false,
            show_help: false,
            screens,
            session,
        }
    }

    fn current_screen(&self) -> ScreenId {
        ScreenId::ALL[self.active_tab]
    }

    fn is_editing(&self) -> bool {
        self.screens.is_editing(self.current_screen())
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.status_is_error = false;
    }

    fn set_error(&mut self, context: &str, error: impl std::fmt::Display) {
        warn!(error = %error, "{context}");
        self.status = format!("{context}: {error}");
        self.status_is_error = true;
    }

    fn select_tab(&mut self, idx: usize) {
        self.active_tab = idx;
        self.set_status(ScreenId::ALL[idx].to_string());
    }

    /// Apply a screen action to the session and report the outcome.
    ///
    /// Failures leave the cached data as it was.
    pub(crate) fn apply(&mut self, action: Action) {
        let outcome = match action {
            Action::ToggleTopic(theme) => self
                .session
                .update(|p| Ok(progress::toggle_completed(p, &theme, Utc::now())))
                .map(|done| {
                    if done {
                        format!("'{theme}' done")
                    } else {
                        format!("'{theme}' not done")
                    }
                }),
            Action::SetDifficulty(theme, difficulty) => self
                .session
                .update(|p| {
                    progress::set_difficulty(p, &theme, difficulty);
                    Ok(())
                })
                .map(|()| {
                    format!(
                        "'{theme}' rated {difficulty:?} · review every {} days",
                        difficulty.review_interval_days()
                    )
                }),
            Action::AddPerformance {
                date,
                topic,
                attempted,
                correct,
            } => self
                .session
                .update(|p| progress::add_performance_entry(p, date, &topic, attempted, correct))
                .map(|entry| format!("Logged {}% for '{}'", entry.percentage(), entry.topic)),
            Action::RemovePerformance(id) => self
                .session
                .update(|p| progress::remove_performance_entry(p, id))
                .map(|entry| format!("Removed entry for '{}'", entry.topic)),
            Action::RecordPomodoro => self
                .session
                .update(|p| Ok(progress::record_pomodoro(p)))
                .map(|total| format!("Focus phase done ({total} in total). Take a break!")),
            Action::Ask(question) => self
                .session
                .ask(&question)
                .map(|()| "Waiting for the assistant...".to_string()),
            Action::ClearChat => self
                .session
                .clear_chat()
                .map(|removed| format!("Deleted {removed} message(s)")),
            Action::Reload => self.session.reload().map(|()| "Reloaded".to_string()),
            Action::Notify(message) => Ok(message),
        };

        match outcome {
            Ok(message) => self.set_status(message),
            Err(e) => self.set_error("Error", e),
        }
        self.screens.refresh(&self.session);
    }

    /// Per-loop housekeeping: timer ticks and finished assistant calls.
    fn on_tick(&mut self, elapsed: Duration) {
        if let Some(action) = self.screens.tick(elapsed) {
            self.apply(action);
        }

        match self.session.poll_assistant() {
            Some(Ok(())) => self.set_status("Assistant replied"),
            Some(Err(e)) => self.set_error("Assistant", e),
            None => {}
        }
    }
}

/// Set up the terminal, run the event loop and restore the terminal on exit.
pub(crate) fn run(session: Session) -> Result<()> {
    // Setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, session);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, session: Session) -> Result<()> {
    let mut app = App::new(session);
    let mut last_tick = Instant::now();
    info!("tui started");

    loop {
        terminal.draw(|f| draw(f, &app))?;

        // Poll for events with 100ms timeout for responsive UI
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(&mut app, key.code, key.modifiers);
                }
            }
        }

        let now = Instant::now();
        app.on_tick(now.duration_since(last_tick));
        last_tick = now;

        if app.should_quit {
            break;
        }
    }

    info!("tui stopped");
    Ok(())
}

fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    // Global keybindings (always active)
    match code {
        KeyCode::Char('q') | KeyCode::Char('c')
            if modifiers.contains(KeyModifiers::CONTROL) =>
        {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('q') if !app.is_editing() => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('?') if !app.is_editing() => {
            app.show_help = !app.show_help;
            return;
        }
        KeyCode::Esc if app.show_help => {
            app.show_help = false;
            return;
        }
        // Tab navigation with number keys
        KeyCode::Char(c @ '1'..='5') if !app.is_editing() => {
            let idx = (c as usize) - ('1' as usize);
            if idx < ScreenId::ALL.len() {
                app.select_tab(idx);
            }
            return;
        }
        KeyCode::Tab if !app.is_editing() => {
            app.select_tab((app.active_tab + 1) % ScreenId::ALL.len());
            return;
        }
        KeyCode::BackTab if !app.is_editing() => {
            let idx = if app.active_tab == 0 {
                ScreenId::ALL.len() - 1
            } else {
                app.active_tab - 1
            };
            app.select_tab(idx);
            return;
        }
        _ => {}
    }

    // If help is showing, consume any key to dismiss
    if app.show_help {
        app.show_help = false;
        return;
    }

    // Delegate to current screen
    let screen = app.current_screen();
    if let Some(action) = app
        .screens
        .handle_key(screen, code, modifiers, &app.session)
    {
        app.apply(action);
    }
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    // Tab bar
    let tab_titles: Vec<Line> = ScreenId::ALL
        .iter()
        .enumerate()
        .map(|(i, s)| Line::from(format!("{} {s}", i + 1)))
        .collect();

    let tabs = Tabs::new(tab_titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" studyplan · {} ", app.session.user.email)),
        )
        .select(app.active_tab)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" │ ");

    f.render_widget(tabs, chunks[0]);

    // Content area, drawn by the active screen
    app.screens
        .draw(app.current_screen(), f, chunks[1], &app.session);

    // Status bar
    let bar = status_bar(&app.status, app.status_is_error);
    f.render_widget(bar, chunks[2]);

    // Help overlay
    if app.show_help {
        draw_help_overlay(f);
    }
}

fn draw_help_overlay(f: &mut Frame) {
    let area = centered_rect(60, 70, f.area());

    let help_text = vec![
        Line::from("Keybindings").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::from("  1-5          Switch to screen"),
        Line::from("  Tab/S-Tab    Next/previous screen"),
        Line::from("  ?            Toggle this help"),
        Line::from("  q / Ctrl-C   Quit"),
        Line::from(""),
        Line::from("Schedule:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  ←/→ ↑/↓      Week / topic"),
        Line::from("  Space        Toggle done"),
        Line::from("  d            Cycle difficulty"),
        Line::from("  / f x t      Search, area filter, clear, today"),
        Line::from(""),
        Line::from("Pomodoro:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  Space / r    Start-pause / reset"),
        Line::from(""),
        Line::from("Performance & Assistant:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  n / i        New entry / type a question"),
        Line::from("  Enter / Esc  Confirm / cancel"),
        Line::from("  d / c        Delete entry / clear chat"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help · press any key to close ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));

    // Clear background
    f.render_widget(ratatui::widgets::Clear, area);
    f.render_widget(help, area);
}

/// Create a centered rectangle with percentage width and height.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_is_inside() {
        let outer = Rect::new(0, 0, 100, 50);
        let inner = centered_rect(60, 70, outer);
        assert!(inner.width <= 60 && inner.height <= 35);
        assert!(inner.x >= outer.x && inner.right() <= outer.right());
        assert!(inner.y >= outer.y && inner.bottom() <= outer.bottom());
    }
}
