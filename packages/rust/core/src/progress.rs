//! Operations on the per-user [`StudyProgress`] document.
//!
//! Every function here mutates or reads an in-memory document; persisting it is
//! the storage layer's job (see `Storage::update_progress`).

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use studyplan_shared::{
    Difficulty, PerformanceEntry, REVIEW_AREA, Result, ScheduleConfig, StudyPlanError,
    StudyProgress, Topic,
};

use crate::seed::seed_topics;

/// Seed topics followed by the user's custom topics.
pub fn all_topics(progress: &StudyProgress) -> Vec<Topic> {
    let mut topics = seed_topics();
    topics.extend(progress.custom_topics.iter().cloned());
    topics
}

// ---------------------------------------------------------------------------
// Completion and difficulty
// ---------------------------------------------------------------------------

/// Mark `theme` done (recording `now` as its review date) or clear it.
///
/// Returns whether the document changed.
pub fn set_completed(
    progress: &mut StudyProgress,
    theme: &str,
    done: bool,
    now: DateTime<Utc>,
) -> bool {
    if done {
        let previous = progress.completed_topics.insert(theme.to_string(), now);
        previous != Some(now)
    } else {
        progress.completed_topics.remove(theme).is_some()
    }
}

/// Flip the completion state of `theme`; returns the new state.
pub fn toggle_completed(progress: &mut StudyProgress, theme: &str, now: DateTime<Utc>) -> bool {
    let done = !progress.is_completed(theme);
    set_completed(progress, theme, done, now);
    done
}

pub fn set_difficulty(progress: &mut StudyProgress, theme: &str, difficulty: Difficulty) {
    progress
        .topic_difficulties
        .insert(theme.to_string(), difficulty);
}

// ---------------------------------------------------------------------------
// Custom topics
// ---------------------------------------------------------------------------

/// Append a user-defined topic. A blank area defaults to the review tag.
pub fn add_custom_topic(progress: &mut StudyProgress, theme: &str, area: &str) -> Result<Topic> {
    let theme = theme.trim();
    if theme.is_empty() {
        return Err(StudyPlanError::validation("topic theme must not be empty"));
    }

    let needle = theme.to_lowercase();
    if all_topics(progress)
        .iter()
        .any(|t| t.theme.to_lowercase() == needle)
    {
        return Err(StudyPlanError::validation(format!(
            "topic '{theme}' already exists"
        )));
    }

    let area = match area.trim() {
        "" => REVIEW_AREA,
        other => other,
    };

    let topic = Topic::new(theme, area.to_lowercase());
    progress.custom_topics.push(topic.clone());
    debug!(theme, area = %topic.area, "custom topic added");
    Ok(topic)
}

/// Remove a user-defined topic together with its completion and difficulty.
pub fn remove_custom_topic(progress: &mut StudyProgress, theme: &str) -> Result<Topic> {
    let needle = theme.trim().to_lowercase();
    let position = progress
        .custom_topics
        .iter()
        .position(|t| t.theme.to_lowercase() == needle)
        .ok_or_else(|| StudyPlanError::not_found(format!("custom topic '{}'", theme.trim())))?;

    let topic = progress.custom_topics.remove(position);
    progress.completed_topics.remove(&topic.theme);
    progress.topic_difficulties.remove(&topic.theme);
    Ok(topic)
}

// ---------------------------------------------------------------------------
// Schedule settings
// ---------------------------------------------------------------------------

/// Replace the schedule settings after validating them.
pub fn set_schedule_config(progress: &mut StudyProgress, config: ScheduleConfig) -> Result<()> {
    let (start, end) = config.date_range().ok_or_else(|| {
        StudyPlanError::parse(format!(
            "dates must be YYYY-MM-DD (got '{}' and '{}')",
            config.start_date, config.end_date
        ))
    })?;

    if start > end {
        return Err(StudyPlanError::validation(format!(
            "start date {start} is after end date {end}"
        )));
    }

    if config.max_topics_per_day < 1 {
        return Err(StudyPlanError::validation(
            "max topics per day must be at least 1",
        ));
    }

    progress.schedule_config = config;
    Ok(())
}

// ---------------------------------------------------------------------------
// Performance log
// ---------------------------------------------------------------------------

/// Record a question-bank result.
pub fn add_performance_entry(
    progress: &mut StudyProgress,
    date: NaiveDate,
    topic: &str,
    attempted: u32,
    correct: u32,
) -> Result<PerformanceEntry> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(StudyPlanError::validation("performance topic must not be empty"));
    }
    if attempted == 0 {
        return Err(StudyPlanError::validation(
            "attempted questions must be greater than zero",
        ));
    }
    if correct > attempted {
        return Err(StudyPlanError::validation(format!(
            "correct answers ({correct}) exceed attempted questions ({attempted})"
        )));
    }

    let entry = PerformanceEntry {
        id: Uuid::now_v7(),
        date,
        topic: topic.to_string(),
        attempted,
        correct,
    };
    progress.performance_log.push(entry.clone());
    Ok(entry)
}

pub fn remove_performance_entry(progress: &mut StudyProgress, id: Uuid) -> Result<PerformanceEntry> {
    let position = progress
        .performance_log
        .iter()
        .position(|e| e.id == id)
        .ok_or_else(|| StudyPlanError::not_found(format!("performance entry {id}")))?;
    Ok(progress.performance_log.remove(position))
}

/// The log with the most recent dates first.
pub fn sorted_performance_log(progress: &StudyProgress) -> Vec<&PerformanceEntry> {
    let mut entries: Vec<&PerformanceEntry> = progress.performance_log.iter().collect();
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries
}

/// Count one finished focus phase; returns the new total.
pub fn record_pomodoro(progress: &mut StudyProgress) -> u32 {
    progress.completed_pomodoros = progress.completed_pomodoros.saturating_add(1);
    progress.completed_pomodoros
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Headline numbers for the overview panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressStats {
    /// Topics that count towards completion (rest/review excluded).
    pub total_topics: usize,
    pub completed: usize,
    pub completion_pct: u32,
    /// Calendar days until the end date, never negative.
    pub days_left: i64,
    pub reviews_due: usize,
    pub completed_pomodoros: u32,
    pub performance_entries: usize,
}

pub fn stats(progress: &StudyProgress, today: NaiveDate) -> ProgressStats {
    let countable: HashSet<String> = all_topics(progress)
        .into_iter()
        .filter(Topic::is_countable)
        .map(|t| t.theme)
        .collect();

    let total_topics = countable.len();
    let completed = progress
        .completed_topics
        .keys()
        .filter(|theme| countable.contains(theme.as_str()))
        .count();

    let completion_pct = if total_topics == 0 {
        0
    } else {
        (completed as f64 / total_topics as f64 * 100.0).round() as u32
    };

    let days_left = progress
        .schedule_config
        .date_range()
        .map(|(_, end)| (end - today).num_days().max(0))
        .unwrap_or(0);

    ProgressStats {
        total_topics,
        completed,
        completion_pct,
        days_left,
        reviews_due: reviews_due(progress, today).len(),
        completed_pomodoros: progress.completed_pomodoros,
        performance_entries: progress.performance_log.len(),
    }
}

/// Completed themes whose last review is older than their difficulty interval.
pub fn reviews_due(progress: &StudyProgress, today: NaiveDate) -> Vec<&str> {
    progress
        .completed_topics
        .iter()
        .filter(|(theme, reviewed_at)| {
            let difficulty = progress
                .topic_difficulties
                .get(theme.as_str())
                .copied()
                .unwrap_or_default();
            let elapsed = (today - reviewed_at.date_naive()).num_days();
            elapsed >= difficulty.review_interval_days()
        })
        .map(|(theme, _)| theme.as_str())
        .collect()
}
