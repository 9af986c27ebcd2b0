//! "Pomodoro" screen: live focus/break countdown.

use std::time::Duration;

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use studyplan_core::pomodoro::{Phase, Pomodoro};
use studyplan_shared::PomodoroConfig;

use super::Action;
use crate::session::Session;

pub(crate) struct PomodoroScreen {
    timer: Pomodoro,
}

impl PomodoroScreen {
    pub(crate) fn new(config: &PomodoroConfig) -> Self {
        Self {
            timer: Pomodoro::new(config),
        }
    }

    /// Advance the countdown; a finished focus phase is recorded.
    pub(crate) fn tick(&mut self, elapsed: Duration) -> Option<Action> {
        match self.timer.tick(elapsed)? {
            Phase::Focus => Some(Action::RecordPomodoro),
            Phase::Break => Some(Action::Notify("Break over. Back to focus!".to_string())),
        }
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, session: &Session) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(5), // Clock
                Constraint::Length(3), // Gauge
                Constraint::Min(3),    // Counters
                Constraint::Length(1), // Hint
            ])
            .split(area);

        let phase = self.timer.phase();
        let color = match phase {
            Phase::Focus => Color::Red,
            Phase::Break => Color::Green,
        };
        let state = if self.timer.is_running() { "running" } else { "paused" };

        let clock = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                self.timer.format_remaining(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} · {state} ", phase.label())),
        );
        f.render_widget(clock, chunks[0]);

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL))
            .gauge_style(Style::default().fg(color))
            .ratio(self.timer.progress());
        f.render_widget(gauge, chunks[1]);

        let counters = Paragraph::new(vec![
            Line::from(format!("  This session:  {}", self.timer.completed())),
            Line::from(format!(
                "  All time:      {}",
                session.progress.completed_pomodoros
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title(" Focus phases "));
        f.render_widget(counters, chunks[2]);

        let hint = Paragraph::new("Space start/pause · r reset")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(hint, chunks[3]);
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode, _modifiers: KeyModifiers) -> Option<Action> {
        match code {
            KeyCode::Char(' ') | KeyCode::Enter => {
                self.timer.toggle();
                let state = if self.timer.is_running() { "started" } else { "paused" };
                Some(Action::Notify(format!("{} {state}", self.timer.phase().label())))
            }
            KeyCode::Char('r') => {
                self.timer.reset();
                Some(Action::Notify(format!("{} reset", self.timer.phase().label())))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_end_requests_recording() {
        let config = PomodoroConfig {
            focus_minutes: 1,
            break_minutes: 1,
        };
        let mut screen = PomodoroScreen::new(&config);
        assert!(screen.tick(Duration::from_secs(120)).is_none());

        screen.handle_key(KeyCode::Char(' '), KeyModifiers::NONE);
        assert!(screen.tick(Duration::from_secs(30)).is_none());
        assert_eq!(
            screen.tick(Duration::from_secs(30)),
            Some(Action::RecordPomodoro)
        );

        screen.handle_key(KeyCode::Char(' '), KeyModifiers::NONE);
        assert!(matches!(
            screen.tick(Duration::from_secs(60)),
            Some(Action::Notify(_))
        ));
    }
}
