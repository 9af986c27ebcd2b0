//! TUI screen definitions.
//!
//! Each screen corresponds to a tab in the TUI. Screens own their view state
//! (selection, input fields) and turn key presses into [`Action`]s that the
//! app applies to the session.

mod assistant;
mod overview;
mod performance;
mod pomodoro;
mod schedule;

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use studyplan_shared::{Difficulty, PomodoroConfig};
use uuid::Uuid;

use crate::session::Session;

/// Screen identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScreenId {
    Overview,
    Schedule,
    Pomodoro,
    Performance,
    Assistant,
}

impl ScreenId {
    pub(crate) const ALL: [ScreenId; 5] = [
        Self::Overview,
        Self::Schedule,
        Self::Pomodoro,
        Self::Performance,
        Self::Assistant,
    ];
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overview => write!(f, "Overview"),
            Self::Schedule => write!(f, "Schedule"),
            Self::Pomodoro => write!(f, "Pomodoro"),
            Self::Performance => write!(f, "Performance"),
            Self::Assistant => write!(f, "Assistant"),
        }
    }
}

/// A change requested by a screen.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Action {
    ToggleTopic(String),
    SetDifficulty(String, Difficulty),
    AddPerformance {
        date: NaiveDate,
        topic: String,
        attempted: u32,
        correct: u32,
    },
    RemovePerformance(Uuid),
    RecordPomodoro,
    Ask(String),
    ClearChat,
    Reload,
    /// Message for the status bar only.
    Notify(String),
}

/// State of every screen.
pub(crate) struct Screens {
    overview: overview::OverviewScreen,
    schedule: schedule::ScheduleScreen,
    pomodoro: pomodoro::PomodoroScreen,
    performance: performance::PerformanceScreen,
    assistant: assistant::AssistantScreen,
}

impl Screens {
    pub(crate) fn new(pomodoro: &PomodoroConfig) -> Self {
        Self {
            overview: overview::OverviewScreen::new(),
            schedule: schedule::ScheduleScreen::new(),
            pomodoro: pomodoro::PomodoroScreen::new(pomodoro),
            performance: performance::PerformanceScreen::new(),
            assistant: assistant::AssistantScreen::new(),
        }
    }

    /// Whether the screen has an active text input field.
    pub(crate) fn is_editing(&self, id: ScreenId) -> bool {
        match id {
            ScreenId::Schedule => self.schedule.is_editing(),
            ScreenId::Performance => self.performance.is_editing(),
            ScreenId::Assistant => self.assistant.is_editing(),
            ScreenId::Overview | ScreenId::Pomodoro => false,
        }
    }

    pub(crate) fn draw(&self, id: ScreenId, f: &mut Frame, area: Rect, session: &Session) {
        match id {
            ScreenId::Overview => self.overview.draw(f, area, session),
            ScreenId::Schedule => self.schedule.draw(f, area, session),
            ScreenId::Pomodoro => self.pomodoro.draw(f, area, session),
            ScreenId::Performance => self.performance.draw(f, area, session),
            ScreenId::Assistant => self.assistant.draw(f, area, session),
        }
    }

    pub(crate) fn handle_key(
        &mut self,
        id: ScreenId,
        code: KeyCode,
        modifiers: KeyModifiers,
        session: &Session,
    ) -> Option<Action> {
        match id {
            ScreenId::Overview => self.overview.handle_key(code, modifiers),
            ScreenId::Schedule => self.schedule.handle_key(code, modifiers, session),
            ScreenId::Pomodoro => self.pomodoro.handle_key(code, modifiers),
            ScreenId::Performance => self.performance.handle_key(code, modifiers, session),
            ScreenId::Assistant => self.assistant.handle_key(code, modifiers),
        }
    }

    /// Advance the timer; it keeps running while other tabs are shown.
    pub(crate) fn tick(&mut self, elapsed: Duration) -> Option<Action> {
        self.pomodoro.tick(elapsed)
    }

    /// Called after the session data changed underneath the screens.
    pub(crate) fn refresh(&mut self, session: &Session) {
        self.schedule.clamp(session);
        self.performance.clamp(session);
    }
}

/// Border style for a focused/editing input, as used by every form.
pub(crate) fn field_style(focused: bool, editing: bool) -> Style {
    if focused && editing {
        Style::default().fg(Color::Yellow)
    } else if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}
