//! "Performance" screen: question-bank log with an entry form.

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use studyplan_core::progress::sorted_performance_log;
use studyplan_shared::ScoreBand;

use super::{Action, field_style};
use crate::session::Session;

/// Which input field is focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Date,
    Topic,
    Attempted,
    Correct,
}

impl Field {
    fn next(self) -> Self {
        match self {
            Self::Date => Self::Topic,
            Self::Topic => Self::Attempted,
            Self::Attempted => Self::Correct,
            Self::Correct => Self::Date,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Date => Self::Correct,
            Self::Topic => Self::Date,
            Self::Attempted => Self::Topic,
            Self::Correct => Self::Attempted,
        }
    }
}

pub(crate) struct PerformanceScreen {
    date: String,
    topic: String,
    attempted: String,
    correct: String,
    focused: Field,
    /// Form has focus (typing goes to the focused field).
    editing: bool,
    selected: usize,
}

impl PerformanceScreen {
    pub(crate) fn new() -> Self {
        Self {
            date: String::new(),
            topic: String::new(),
            attempted: String::new(),
            correct: String::new(),
            focused: Field::Topic,
            editing: false,
            selected: 0,
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    pub(crate) fn clamp(&mut self, session: &Session) {
        let len = session.progress.performance_log.len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, session: &Session) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Form
                Constraint::Min(1),    // Log
                Constraint::Length(1), // Hint
            ])
            .split(area);

        let form = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(16),
                Constraint::Min(20),
                Constraint::Length(13),
                Constraint::Length(13),
            ])
            .split(chunks[0]);

        let fields = [
            (Field::Date, " Date ", self.date.as_str(), "today"),
            (Field::Topic, " Topic ", self.topic.as_str(), ""),
            (Field::Attempted, " Attempted ", self.attempted.as_str(), ""),
            (Field::Correct, " Correct ", self.correct.as_str(), ""),
        ];
        for ((field, title, value, placeholder), rect) in fields.into_iter().zip(form.iter()) {
            let focused = self.editing && self.focused == field;
            let text = if value.is_empty() && !focused {
                Span::styled(placeholder, Style::default().fg(Color::DarkGray))
            } else {
                Span::raw(value)
            };
            let input = Paragraph::new(text).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_style(field_style(focused, self.editing)),
            );
            f.render_widget(input, *rect);
        }

        let entries = sorted_performance_log(&session.progress);
        if entries.is_empty() {
            let empty = Paragraph::new("No sessions logged yet.\n\nPress 'n' to add one.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(" Sessions "));
            f.render_widget(empty, chunks[1]);
        } else {
            let items: Vec<ListItem> = entries
                .iter()
                .enumerate()
                .map(|(i, entry)| {
                    let pct = entry.percentage();
                    let mut style = Style::default().fg(band_color(entry.band()));
                    if i == self.selected && !self.editing {
                        style = style.add_modifier(Modifier::BOLD);
                    }
                    let prefix = if i == self.selected { "▸ " } else { "  " };
                    ListItem::new(format!(
                        "{prefix}{}  {:>3}/{:<3} {:>3}%  {}",
                        entry.date.format("%d/%m/%Y"),
                        entry.correct,
                        entry.attempted,
                        pct,
                        entry.topic
                    ))
                    .style(style)
                })
                .collect();

            let list = List::new(items).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" Sessions ({}) ", entries.len())),
            );
            let mut state = ListState::default().with_selected(Some(self.selected));
            f.render_stateful_widget(list, chunks[1], &mut state);
        }

        let hint = if self.editing {
            "Type to edit · Tab next field · Enter save · Esc cancel"
        } else {
            "n new entry · ↑/↓ select · Del/d delete"
        };
        let hint = Paragraph::new(hint)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(hint, chunks[2]);
    }

    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        _modifiers: KeyModifiers,
        session: &Session,
    ) -> Option<Action> {
        if self.editing {
            match code {
                KeyCode::Esc => self.editing = false,
                KeyCode::Tab | KeyCode::Down => self.focused = self.focused.next(),
                KeyCode::BackTab | KeyCode::Up => self.focused = self.focused.prev(),
                KeyCode::Backspace => {
                    self.current_field_mut().pop();
                }
                KeyCode::Char(c) => self.current_field_mut().push(c),
                KeyCode::Enter => {
                    return Some(match self.parse_form(session.today()) {
                        Ok(action) => {
                            self.clear_form();
                            action
                        }
                        Err(message) => Action::Notify(message),
                    });
                }
                _ => {}
            }
            return None;
        }

        let entries = sorted_performance_log(&session.progress);
        match code {
            KeyCode::Char('n') | KeyCode::Char('a') => {
                self.editing = true;
                self.focused = Field::Topic;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < entries.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Delete | KeyCode::Char('d') => {
                return entries
                    .get(self.selected)
                    .map(|entry| Action::RemovePerformance(entry.id));
            }
            _ => {}
        }
        None
    }

    fn current_field_mut(&mut self) -> &mut String {
        match self.focused {
            Field::Date => &mut self.date,
            Field::Topic => &mut self.topic,
            Field::Attempted => &mut self.attempted,
            Field::Correct => &mut self.correct,
        }
    }

    fn clear_form(&mut self) {
        self.date.clear();
        self.topic.clear();
        self.attempted.clear();
        self.correct.clear();
        self.editing = false;
    }

    /// Turn the form into an entry; range checks happen when it is stored.
    fn parse_form(&self, today: NaiveDate) -> Result<Action, String> {
        let date = parse_date(self.date.trim(), today)?;
        let attempted = parse_count("attempted", &self.attempted)?;
        let correct = parse_count("correct", &self.correct)?;
        Ok(Action::AddPerformance {
            date,
            topic: self.topic.trim().to_string(),
            attempted,
            correct,
        })
    }
}

/// Accepts `YYYY-MM-DD` or `DD/MM/YYYY`; blank means today.
fn parse_date(input: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    if input.is_empty() {
        return Ok(today);
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%d/%m/%Y"))
        .map_err(|_| format!("invalid date '{input}'"))
}

fn parse_count(name: &str, input: &str) -> Result<u32, String> {
    input
        .trim()
        .parse()
        .map_err(|_| format!("{name} must be a whole number"))
}

fn band_color(band: ScoreBand) -> Color {
    match band {
        ScoreBand::Good => Color::Green,
        ScoreBand::Fair => Color::Yellow,
        ScoreBand::Poor => Color::Red,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()
    }

    #[test]
    fn dates_in_both_formats() {
        assert_eq!(parse_date("", today()), Ok(today()));
        assert_eq!(
            parse_date("2025-08-01", today()),
            Ok(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap())
        );
        assert_eq!(
            parse_date("01/08/2025", today()),
            Ok(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap())
        );
        assert!(parse_date("ontem", today()).is_err());
    }

    #[test]
    fn form_becomes_action() {
        let mut screen = PerformanceScreen::new();
        screen.topic = " Cardio ".into();
        screen.attempted = "50".into();
        screen.correct = "42".into();

        assert_eq!(
            screen.parse_form(today()),
            Ok(Action::AddPerformance {
                date: today(),
                topic: "Cardio".into(),
                attempted: 50,
                correct: 42,
            })
        );

        screen.correct = "muitas".into();
        assert_eq!(
            screen.parse_form(today()),
            Err("correct must be a whole number".to_string())
        );
    }

    #[test]
    fn field_cycle() {
        let mut field = Field::Date;
        for _ in 0..4 {
            field = field.next();
        }
        assert_eq!(field, Field::Date);
        assert_eq!(Field::Date.prev(), Field::Correct);
    }
}
