//! "Assistant" screen: conversation history, question input and quick
//! questions.

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use studyplan_assistant::{GREETING, QUICK_QUESTIONS};
use studyplan_shared::ChatRole;

use super::{Action, field_style};
use crate::session::Session;

pub(crate) struct AssistantScreen {
    input: String,
    editing: bool,
    quick: usize,
}

impl AssistantScreen {
    pub(crate) fn new() -> Self {
        Self {
            input: String::new(),
            editing: false,
            quick: 0,
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, session: &Session) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Min(5),                                  // Conversation
                Constraint::Length(QUICK_QUESTIONS.len() as u16 + 2), // Quick questions
                Constraint::Length(3),                               // Input
                Constraint::Length(1),                               // Hint
            ])
            .split(area);

        let lines = conversation_lines(session);
        // Keep the newest messages in view; wrapped lines are not counted
        let height = chunks[0].height.saturating_sub(2) as usize;
        let scroll = lines.len().saturating_sub(height) as u16;
        let title = if session.assistant_enabled() {
            " Conversation ".to_string()
        } else {
            format!(
                " Conversation (offline: set {}) ",
                session.config.assistant.api_key_env
            )
        };
        let conversation = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(conversation, chunks[0]);

        let quick: Vec<ListItem> = QUICK_QUESTIONS
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let selected = i == self.quick && !self.editing;
                let prefix = if selected { "▸ " } else { "  " };
                let style = if selected {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(format!("{prefix}{q}")).style(style)
            })
            .collect();
        let quick = List::new(quick)
            .block(Block::default().borders(Borders::ALL).title(" Quick questions "));
        f.render_widget(quick, chunks[1]);

        let input = Paragraph::new(self.input.as_str()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Question ")
                .border_style(field_style(self.editing, self.editing)),
        );
        f.render_widget(input, chunks[2]);

        let hint = if self.editing {
            "Type your question · Enter send · Esc stop typing"
        } else {
            "i type · ↑/↓ quick question · Enter send quick question · c clear chat"
        };
        let hint = Paragraph::new(hint)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(hint, chunks[3]);
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode, _modifiers: KeyModifiers) -> Option<Action> {
        if self.editing {
            match code {
                KeyCode::Esc => self.editing = false,
                KeyCode::Backspace => {
                    self.input.pop();
                }
                KeyCode::Char(c) => self.input.push(c),
                KeyCode::Enter => {
                    let question = self.input.trim().to_string();
                    if question.is_empty() {
                        return None;
                    }
                    self.input.clear();
                    return Some(Action::Ask(question));
                }
                _ => {}
            }
            return None;
        }

        match code {
            KeyCode::Char('i') | KeyCode::Char('/') => self.editing = true,
            KeyCode::Up | KeyCode::Char('k') => self.quick = self.quick.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.quick + 1 < QUICK_QUESTIONS.len() {
                    self.quick += 1;
                }
            }
            KeyCode::Enter => {
                return QUICK_QUESTIONS
                    .get(self.quick)
                    .map(|q| Action::Ask((*q).to_string()));
            }
            KeyCode::Char('c') => return Some(Action::ClearChat),
            _ => {}
        }
        None
    }
}

fn conversation_lines(session: &Session) -> Vec<Line<'_>> {
    let assistant_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let user_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let mut lines = Vec::new();
    if session.chat.is_empty() {
        lines.push(Line::styled("assistant", assistant_style));
        lines.extend(GREETING.lines().map(Line::from));
        lines.push(Line::from(""));
    }

    for message in &session.chat {
        let (who, style) = match message.role {
            ChatRole::User => ("you", user_style),
            ChatRole::Assistant => ("assistant", assistant_style),
        };
        lines.push(Line::from(vec![
            Span::styled(who, style),
            Span::styled(
                format!("  {}", message.timestamp.format("%d/%m %H:%M")),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        lines.extend(message.text.lines().map(Line::from));
        lines.push(Line::from(""));
    }

    if let Some(question) = session.pending_question() {
        lines.push(Line::styled("you", user_style));
        lines.push(Line::from(question));
        lines.push(Line::from(""));
        lines.push(Line::styled(
            "assistant is typing...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_sends_typed_question() {
        let mut screen = AssistantScreen::new();
        screen.handle_key(KeyCode::Char('i'), KeyModifiers::NONE);
        assert!(screen.is_editing());
        for c in "  sepse ".chars() {
            screen.handle_key(KeyCode::Char(c), KeyModifiers::NONE);
        }
        assert_eq!(
            screen.handle_key(KeyCode::Enter, KeyModifiers::NONE),
            Some(Action::Ask("sepse".into()))
        );
        assert!(screen.input.is_empty());
        assert_eq!(screen.handle_key(KeyCode::Enter, KeyModifiers::NONE), None);
    }

    #[test]
    fn quick_question_selection() {
        let mut screen = AssistantScreen::new();
        screen.handle_key(KeyCode::Down, KeyModifiers::NONE);
        assert_eq!(
            screen.handle_key(KeyCode::Enter, KeyModifiers::NONE),
            Some(Action::Ask(QUICK_QUESTIONS[1].to_string()))
        );
        for _ in 0..10 {
            screen.handle_key(KeyCode::Down, KeyModifiers::NONE);
        }
        assert_eq!(screen.quick, QUICK_QUESTIONS.len() - 1);
    }
}
