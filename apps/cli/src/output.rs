//! Plain-text rendering of schedules, stats and logs for terminal output.

use std::fmt::Write;

use chrono::Weekday;
use studyplan_core::progress::ProgressStats;
use studyplan_core::view::week_completion;
use studyplan_shared::{
    ChatMessage, ChatRole, PerformanceEntry, ScoreBand, StudyProgress, Week, area_label,
};

/// Width of the day column (`Mon 28/07  `).
const DAY_COLUMN: usize = 11;

pub(crate) fn weekday_short(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// One week as an indented block with completion marks.
pub(crate) fn render_week(week: &Week, progress: &StudyProgress, current: bool) -> String {
    let completion = week_completion(week, progress);
    let mut out = format!(
        "{}  ({}/{} done, {}%)",
        week.label,
        completion.completed,
        completion.total,
        completion.percentage()
    );
    if current {
        out.push_str("  <- current");
    }
    out.push('\n');

    for day in &week.days {
        let head = format!("{} {}", weekday_short(day.weekday()), day.date.format("%d/%m"));
        if day.is_rest {
            let _ = writeln!(out, "  {head:<DAY_COLUMN$}rest");
            continue;
        }
        if day.topics.is_empty() {
            let _ = writeln!(out, "  {head:<DAY_COLUMN$}-");
            continue;
        }
        for (i, topic) in day.topics.iter().enumerate() {
            let label = if i == 0 { head.as_str() } else { "" };
            let mark = if progress.is_completed(&topic.theme) { "x" } else { " " };
            let _ = write!(
                out,
                "  {label:<DAY_COLUMN$}[{mark}] {:<5} {}",
                area_label(&topic.area),
                topic.theme
            );
            if let Some(difficulty) = progress.topic_difficulties.get(&topic.theme) {
                let _ = write!(out, "  ({difficulty:?})");
            }
            out.push('\n');
        }
    }
    out
}

pub(crate) fn render_stats(stats: &ProgressStats, quote: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  Topics:     {}/{} completed ({}%)",
        stats.completed, stats.total_topics, stats.completion_pct
    );
    let _ = writeln!(out, "  Days left:  {}", stats.days_left);
    let _ = writeln!(out, "  Reviews:    {} due", stats.reviews_due);
    let _ = writeln!(out, "  Pomodoros:  {}", stats.completed_pomodoros);
    let _ = writeln!(out, "  Sessions:   {} logged", stats.performance_entries);
    let _ = writeln!(out);
    let _ = writeln!(out, "  \"{quote}\"");
    out
}

fn band_label(band: ScoreBand) -> &'static str {
    match band {
        ScoreBand::Good => "good",
        ScoreBand::Fair => "fair",
        ScoreBand::Poor => "poor",
    }
}

pub(crate) fn render_performance(entries: &[&PerformanceEntry]) -> String {
    if entries.is_empty() {
        return "  No performance entries yet.\n".to_string();
    }

    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(
            out,
            "  {}  {:>3}/{:<3} {:>3}% {:<4}  {}  [{}]",
            entry.date.format("%d/%m/%Y"),
            entry.correct,
            entry.attempted,
            entry.percentage(),
            band_label(entry.band()),
            entry.topic,
            entry.id
        );
    }
    out
}

pub(crate) fn render_chat(messages: &[ChatMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        let who = match message.role {
            ChatRole::User => "you",
            ChatRole::Assistant => "assistant",
        };
        let _ = writeln!(
            out,
            "[{} {who}]\n{}\n",
            message.timestamp.format("%d/%m %H:%M"),
            message.text
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use studyplan_core::schedule::build_schedule;
    use studyplan_shared::{Difficulty, ScheduleConfig, Topic};
    use uuid::Uuid;

    fn one_week() -> Week {
        let topics = vec![
            Topic::new("Asma", "clinica"),
            Topic::new("Apendicite", "cirurgia"),
        ];
        let config = ScheduleConfig {
            start_date: "2025-07-28".into(),
            end_date: "2025-08-03".into(),
            max_topics_per_day: 4,
        };
        build_schedule(&topics, &config).remove(0)
    }

    #[test]
    fn week_block_marks_completion() {
        let mut progress = StudyProgress::default();
        progress.completed_topics.insert("Asma".into(), Utc::now());
        progress
            .topic_difficulties
            .insert("Asma".into(), Difficulty::Hard);

        let text = render_week(&one_week(), &progress, true);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Week 1: 28/07 - 02/08  (1/2 done, 50%)  <- current");
        assert_eq!(lines[1], "  Mon 28/07  [x] CLM   Asma  (Hard)");
        assert_eq!(lines[2], "  Tue 29/07  [ ] CIR   Apendicite");
        assert_eq!(lines[3], "  Wed 30/07  -");
        assert_eq!(lines[7], "  Sun 03/08  rest");
    }

    #[test]
    fn performance_lines() {
        assert!(render_performance(&[]).contains("No performance"));

        let entry = PerformanceEntry {
            id: Uuid::now_v7(),
            date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            topic: "Cardio".into(),
            attempted: 50,
            correct: 42,
        };
        let text = render_performance(&[&entry]);
        assert!(text.contains("01/08/2025"));
        assert!(text.contains("84%"));
        assert!(text.contains("good"));
        assert!(text.contains(&entry.id.to_string()));
    }

    #[test]
    fn stats_block_includes_quote() {
        let stats = ProgressStats {
            total_topics: 22,
            completed: 11,
            completion_pct: 50,
            days_left: 30,
            reviews_due: 2,
            completed_pomodoros: 7,
            performance_entries: 3,
        };
        let text = render_stats(&stats, "Keep going.");
        assert!(text.contains("11/22 completed (50%)"));
        assert!(text.contains("\"Keep going.\""));
    }
}
