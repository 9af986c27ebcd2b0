//! Focus/break countdown timer.
//!
//! The timer is driven by explicit [`Pomodoro::tick`] calls with the elapsed
//! duration, so callers own the clock (a TUI tick loop, a CLI sleep loop or a
//! test).

use std::time::Duration;

use tracing::debug;

use studyplan_shared::PomodoroConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Focus,
    Break,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Focus => "Focus",
            Self::Break => "Break",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pomodoro {
    focus: Duration,
    rest: Duration,
    phase: Phase,
    remaining: Duration,
    running: bool,
    completed_focus: u32,
}

impl Pomodoro {
    pub fn new(config: &PomodoroConfig) -> Self {
        Self::with_durations(
            Duration::from_secs(config.focus_secs()),
            Duration::from_secs(config.break_secs()),
        )
    }

    pub fn with_durations(focus: Duration, rest: Duration) -> Self {
        Self {
            focus,
            rest,
            phase: Phase::Focus,
            remaining: focus,
            running: false,
            completed_focus: 0,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn toggle(&mut self) {
        self.running = !self.running;
    }

    /// Stop and rewind the current phase to its full length.
    pub fn reset(&mut self) {
        self.running = false;
        self.remaining = self.phase_length();
    }

    /// Advance the countdown by `elapsed` while running.
    ///
    /// When the current phase runs out the timer stops, switches to the other
    /// phase and returns the phase that just ended. Overshoot beyond the phase
    /// boundary is discarded.
    pub fn tick(&mut self, elapsed: Duration) -> Option<Phase> {
        if !self.running {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(elapsed);
        if !self.remaining.is_zero() {
            return None;
        }

        let ended = self.phase;
        self.running = false;
        match ended {
            Phase::Focus => {
                self.completed_focus += 1;
                self.phase = Phase::Break;
                self.remaining = self.rest;
            }
            Phase::Break => {
                self.phase = Phase::Focus;
                self.remaining = self.focus;
            }
        }
        debug!(ended = ended.label(), completed = self.completed_focus, "pomodoro phase ended");
        Some(ended)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Focus phases finished since this timer was created.
    pub fn completed(&self) -> u32 {
        self.completed_focus
    }

    pub fn phase_length(&self) -> Duration {
        match self.phase {
            Phase::Focus => self.focus,
            Phase::Break => self.rest,
        }
    }

    /// Fraction of the current phase already elapsed, `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        let total = self.phase_length().as_secs_f64();
        if total <= 0.0 {
            return 1.0;
        }
        (1.0 - self.remaining.as_secs_f64() / total).clamp(0.0, 1.0)
    }

    /// Remaining time as `MM:SS`, rounding partial seconds up.
    pub fn format_remaining(&self) -> String {
        format_mm_ss(self.remaining)
    }
}

pub fn format_mm_ss(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs += 1;
    }
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer() -> Pomodoro {
        Pomodoro::with_durations(Duration::from_secs(10), Duration::from_secs(4))
    }

    #[test]
    fn does_not_tick_while_paused() {
        let mut p = timer();
        assert_eq!(p.tick(Duration::from_secs(30)), None);
        assert_eq!(p.remaining(), Duration::from_secs(10));
        assert_eq!(p.format_remaining(), "00:10");
    }

    #[test]
    fn focus_then_break_cycle() {
        let mut p = timer();
        p.start();

        assert_eq!(p.tick(Duration::from_secs(9)), None);
        assert_eq!(p.tick(Duration::from_secs(1)), Some(Phase::Focus));
        assert_eq!(p.phase(), Phase::Break);
        assert_eq!(p.completed(), 1);
        assert!(!p.is_running());
        assert_eq!(p.remaining(), Duration::from_secs(4));
        assert_eq!(p.tick(Duration::from_secs(1)), None);

        p.start();
        assert_eq!(p.tick(Duration::from_secs(10)), Some(Phase::Break));
        assert_eq!(p.phase(), Phase::Focus);
        assert_eq!(p.completed(), 1);
    }

    #[test]
    fn reset_restores_current_phase() {
        let mut p = timer();
        p.start();
        p.tick(Duration::from_secs(10));
        p.start();
        p.tick(Duration::from_secs(1));
        p.reset();

        assert!(!p.is_running());
        assert_eq!(p.phase(), Phase::Break);
        assert_eq!(p.remaining(), Duration::from_secs(4));
        assert_eq!(p.completed(), 1);
    }

    #[test]
    fn progress_and_formatting() {
        let mut p = timer();
        p.toggle();
        p.tick(Duration::from_millis(2_500));
        assert!((p.progress() - 0.25).abs() < 1e-9);
        assert_eq!(p.format_remaining(), "00:08");

        assert_eq!(format_mm_ss(Duration::from_secs(25 * 60)), "25:00");
        assert_eq!(format_mm_ss(Duration::from_secs(61)), "01:01");
        assert_eq!(format_mm_ss(Duration::ZERO), "00:00");
    }

    #[test]
    fn config_durations_are_used() {
        let p = Pomodoro::new(&PomodoroConfig::default());
        assert_eq!(p.remaining(), Duration::from_secs(25 * 60));
        assert_eq!(p.phase_length(), Duration::from_secs(25 * 60));
    }
}
