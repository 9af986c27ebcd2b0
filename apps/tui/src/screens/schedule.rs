//! "Schedule" screen: one week at a time with completion toggling, theme
//! search and an area filter.

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use studyplan_core::view::{ScheduleFilter, current_week, week_completion};
use studyplan_shared::{AREA_LABELS, Difficulty, REST_AREA, StudyDay, Topic, Week, area_label};

use super::{Action, field_style};
use crate::session::Session;

pub(crate) struct ScheduleScreen {
    /// Index into the filtered weeks.
    week: usize,
    /// Index into the selectable topics of the shown week.
    cursor: usize,
    search: String,
    area: Option<&'static str>,
    editing: bool,
    /// Whether the view has been positioned on the current week yet.
    positioned: bool,
}

impl ScheduleScreen {
    pub(crate) fn new() -> Self {
        Self {
            week: 0,
            cursor: 0,
            search: String::new(),
            area: None,
            editing: false,
            positioned: false,
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    fn filter(&self) -> ScheduleFilter {
        ScheduleFilter::new(Some(self.search.clone()), self.area.map(str::to_string))
    }

    fn visible<'a>(&self, session: &'a Session) -> Vec<&'a Week> {
        self.filter().apply(&session.weeks)
    }

    /// Position of the week containing today among the filtered weeks.
    fn current_position(&self, session: &Session) -> Option<usize> {
        let current = current_week(&session.weeks, session.today())?;
        let index = session.weeks[current].index;
        self.visible(session).iter().position(|w| w.index == index)
    }

    /// Keep the week and cursor inside the data after it changed.
    pub(crate) fn clamp(&mut self, session: &Session) {
        if !self.positioned {
            self.week = self.current_position(session).unwrap_or(0);
            self.positioned = true;
        }
        let visible = self.visible(session);
        self.week = self.week.min(visible.len().saturating_sub(1));
        let items = visible.get(self.week).map_or(0, |w| selectable(w).len());
        self.cursor = self.cursor.min(items.saturating_sub(1));
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, session: &Session) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Filters
                Constraint::Min(1),    // Week
                Constraint::Length(1), // Hint
            ])
            .split(area);

        let filter_row = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(10), Constraint::Length(24)])
            .split(chunks[0]);

        let search = Paragraph::new(self.search.as_str()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Search ")
                .border_style(field_style(self.editing, self.editing)),
        );
        f.render_widget(search, filter_row[0]);

        let area_text = match self.area {
            Some(tag) => format!("< {tag} >"),
            None => "< all >".to_string(),
        };
        let area_filter = Paragraph::new(area_text)
            .block(Block::default().borders(Borders::ALL).title(" Area "));
        f.render_widget(area_filter, filter_row[1]);

        let visible = self.visible(session);
        match visible.get(self.week) {
            Some(week) => self.draw_week(f, chunks[1], session, week, visible.len()),
            None => {
                let message = if session.weeks.is_empty() {
                    "No study days in the configured period.\n\nAdjust it with `studyplan schedule set`."
                } else {
                    "No weeks match the current filter."
                };
                let empty = Paragraph::new(message)
                    .alignment(Alignment::Center)
                    .block(Block::default().borders(Borders::ALL).title(" Schedule "));
                f.render_widget(empty, chunks[1]);
            }
        }

        let hint = if self.editing {
            "Type to search · Enter/Esc to finish"
        } else {
            "←/→ week · ↑/↓ topic · Space done · d difficulty · / search · f area · x clear · t today"
        };
        let hint = Paragraph::new(hint)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(hint, chunks[2]);
    }

    fn draw_week(&self, f: &mut Frame, area: Rect, session: &Session, week: &Week, count: usize) {
        let completion = week_completion(week, &session.progress);
        let filter = self.filter();
        let today = session.today();

        let mut items: Vec<ListItem> = Vec::new();
        let mut position = 0;
        let mut selected_row = None;
        for day in &week.days {
            let head = format!("{} {}", day.weekday(), day.date.format("%d/%m"));
            let head_style = if day.date == today {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            if day.is_rest {
                items.push(ListItem::new(Line::from(vec![
                    Span::styled(head, head_style),
                    Span::styled("  rest", Style::default().fg(Color::DarkGray)),
                ])));
                continue;
            }
            items.push(ListItem::new(Span::styled(head, head_style)));
            if day.topics.is_empty() {
                items.push(
                    ListItem::new("    -").style(Style::default().fg(Color::DarkGray)),
                );
            }
            for topic in &day.topics {
                let selected = position == self.cursor;
                if selected {
                    selected_row = Some(items.len());
                }
                position += 1;
                items.push(topic_item(session, &filter, topic, selected));
            }
        }

        let list = List::new(items).block(
            Block::default().borders(Borders::ALL).title(format!(
                " {}  ·  {}/{} done ({}%)  ·  {}/{} ",
                week.label,
                completion.completed,
                completion.total,
                completion.percentage(),
                self.week + 1,
                count
            )),
        );
        // Scrolls the list so the cursor stays visible
        let mut state = ListState::default().with_selected(selected_row);
        f.render_stateful_widget(list, area, &mut state);
    }

    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        _modifiers: KeyModifiers,
        session: &Session,
    ) -> Option<Action> {
        if self.editing {
            match code {
                KeyCode::Esc | KeyCode::Enter => self.editing = false,
                KeyCode::Backspace => {
                    self.search.pop();
                    self.reset_position();
                }
                KeyCode::Char(c) => {
                    self.search.push(c);
                    self.reset_position();
                }
                _ => {}
            }
            return None;
        }

        let visible = self.visible(session);
        let week = visible.get(self.week).copied();
        let items = week.map(selectable).unwrap_or_default();

        match code {
            KeyCode::Left | KeyCode::Char('h') => {
                if self.week > 0 {
                    self.week -= 1;
                    self.cursor = 0;
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.week + 1 < visible.len() {
                    self.week += 1;
                    self.cursor = 0;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < items.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Char('t') => {
                self.week = self.current_position(session).unwrap_or(0);
                self.cursor = 0;
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                return items
                    .get(self.cursor)
                    .map(|(_, topic)| Action::ToggleTopic(topic.theme.clone()));
            }
            KeyCode::Char('d') => {
                let (_, topic) = items.get(self.cursor)?;
                let next = next_difficulty(session.progress.topic_difficulties.get(&topic.theme));
                return Some(Action::SetDifficulty(topic.theme.clone(), next));
            }
            KeyCode::Char('/') => self.editing = true,
            KeyCode::Char('f') => {
                self.area = next_area(self.area);
                self.reset_position();
            }
            KeyCode::Char('x') => {
                self.search.clear();
                self.area = None;
                self.reset_position();
            }
            _ => {}
        }
        None
    }

    fn reset_position(&mut self) {
        self.week = 0;
        self.cursor = 0;
    }
}

/// Topics of `week` that can be selected, in display order.
fn selectable(week: &Week) -> Vec<(&StudyDay, &Topic)> {
    week.days
        .iter()
        .filter(|d| !d.is_rest)
        .flat_map(|d| d.topics.iter().map(move |t| (d, t)))
        .collect()
}

fn topic_item(
    session: &Session,
    filter: &ScheduleFilter,
    topic: &Topic,
    selected: bool,
) -> ListItem<'static> {
    let done = session.progress.is_completed(&topic.theme);
    let mark = if done { "[x]" } else { "[ ]" };
    let prefix = if selected { "▸ " } else { "  " };
    let difficulty = session
        .progress
        .topic_difficulties
        .get(&topic.theme)
        .map(|d| format!("  ({d:?})"))
        .unwrap_or_default();

    let mut style = if done {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };
    if !filter.is_empty() && !filter.matches(topic) {
        style = style.fg(Color::DarkGray);
    }
    if selected {
        style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
    }

    ListItem::new(format!(
        "  {prefix}{mark} {:<5} {}{difficulty}",
        area_label(&topic.area),
        topic.theme
    ))
    .style(style)
}

fn next_difficulty(current: Option<&Difficulty>) -> Difficulty {
    match current {
        None | Some(Difficulty::Hard) => Difficulty::Easy,
        Some(Difficulty::Easy) => Difficulty::Medium,
        Some(Difficulty::Medium) => Difficulty::Hard,
    }
}

/// Cycle `all → each area tag → all`, skipping the rest placeholder.
fn next_area(current: Option<&'static str>) -> Option<&'static str> {
    let tags: Vec<&'static str> = AREA_LABELS
        .iter()
        .map(|(tag, _)| *tag)
        .filter(|tag| *tag != REST_AREA)
        .collect();
    match current {
        None => tags.first().copied(),
        Some(tag) => {
            let position = tags.iter().position(|t| *t == tag)?;
            tags.get(position + 1).copied()
        }
    }
}
