//! "Overview" screen: headline numbers, due reviews and the quote of the day.

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap};
use studyplan_core::progress::{reviews_due, stats};
use studyplan_core::seed::quote_of_the_day;

use super::Action;
use crate::session::Session;

pub(crate) struct OverviewScreen;

impl OverviewScreen {
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, session: &Session) {
        let today = session.today();
        let stats = stats(&session.progress, today);
        let due = reviews_due(&session.progress, today);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Completion gauge
                Constraint::Length(7), // Numbers
                Constraint::Min(3),    // Reviews due
                Constraint::Length(4), // Quote
            ])
            .split(area);

        let gauge = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ", session.user.display_name)),
            )
            .gauge_style(Style::default().fg(Color::Green))
            .percent(stats.completion_pct.min(100) as u16)
            .label(format!(
                "{}/{} topics ({}%)",
                stats.completed, stats.total_topics, stats.completion_pct
            ));
        f.render_widget(gauge, chunks[0]);

        let cfg = &session.progress.schedule_config;
        let numbers = vec![
            Line::from(format!("  Period:      {} .. {}", cfg.start_date, cfg.end_date)),
            Line::from(format!("  Days left:   {}", stats.days_left)),
            Line::from(format!("  Reviews due: {}", stats.reviews_due)),
            Line::from(format!("  Pomodoros:   {}", stats.completed_pomodoros)),
            Line::from(format!("  Sessions:    {}", stats.performance_entries)),
        ];
        let numbers = Paragraph::new(numbers)
            .block(Block::default().borders(Borders::ALL).title(" Progress "));
        f.render_widget(numbers, chunks[1]);

        let reviews: Vec<ListItem> = if due.is_empty() {
            vec![ListItem::new("  Nothing to review today.").style(Style::default().fg(Color::DarkGray))]
        } else {
            due.iter()
                .map(|theme| {
                    let difficulty = session
                        .progress
                        .topic_difficulties
                        .get(*theme)
                        .copied()
                        .unwrap_or_default();
                    ListItem::new(format!("  {theme}  ({difficulty:?})"))
                })
                .collect()
        };
        let reviews = List::new(reviews).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Due for review ({}) ", due.len())),
        );
        f.render_widget(reviews, chunks[2]);

        let quote = Paragraph::new(format!("\"{}\"", quote_of_the_day(today)))
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(" Quote of the day "));
        f.render_widget(quote, chunks[3]);
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode, _modifiers: KeyModifiers) -> Option<Action> {
        match code {
            KeyCode::Char('r') => Some(Action::Reload),
            _ => None,
        }
    }
}
