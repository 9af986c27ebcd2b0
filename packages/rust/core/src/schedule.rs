//! Weekly schedule builder.
//!
//! Turns a flat topic list plus a [`ScheduleConfig`] into Monday-to-Sunday
//! [`Week`] blocks. Three pure stages:
//! 1. [`study_days`] enumerates every date in the range except Sundays
//! 2. [`distribute_topics`] hands out topics in order with a weekly ramp
//! 3. [`group_weeks`] folds the assigned days into complete 7-day weeks
//!
//! Nothing here touches I/O or the clock; the same inputs always give the
//! same schedule.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use tracing::{debug, instrument, warn};

use studyplan_shared::{ScheduleConfig, StudyDay, Topic, Week};

/// The fixed weekly rest day.
pub const REST_WEEKDAY: Weekday = Weekday::Sun;

/// Consecutive study days that share one ramp step (a week minus the rest day).
const DAYS_PER_RAMP_STEP: usize = 6;

/// Build the full schedule for `topics` under `config`.
///
/// A malformed or reversed date range yields an empty schedule. With no topics
/// at all, every study day of the range is laid out as an empty placeholder.
#[instrument(skip_all, fields(topics = topics.len(), start = %config.start_date, end = %config.end_date))]
pub fn build_schedule(topics: &[Topic], config: &ScheduleConfig) -> Vec<Week> {
    let Some((start, end)) = config.date_range() else {
        debug!("unparsable date range, returning empty schedule");
        return Vec::new();
    };

    let days = study_days(start, end);

    let assigned = if topics.is_empty() {
        days.into_iter().map(StudyDay::empty).collect()
    } else {
        distribute_topics(topics, &days, config.effective_max())
    };

    let weeks = group_weeks(&assigned);
    debug!(weeks = weeks.len(), "schedule built");
    weeks
}

/// Every date in `[start, end]` except the weekly rest day, in order.
///
/// Returns an empty list when `start > end`.
pub fn study_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }

    start
        .iter_days()
        .take_while(|date| *date <= end)
        .filter(|date| date.weekday() != REST_WEEKDAY)
        .collect()
}

/// Assign topics to study days in input order.
///
/// The quota for a day is `min(step, max_per_day)` where `step` is 1 for the
/// first six study days, 2 for the next six, and so on. Days left without a
/// topic once the list runs out are not returned.
pub fn distribute_topics(topics: &[Topic], days: &[NaiveDate], max_per_day: usize) -> Vec<StudyDay> {
    let max_per_day = max_per_day.max(1);
    let mut remaining = topics;
    let mut assigned = Vec::new();

    for (day_index, date) in days.iter().enumerate() {
        if remaining.is_empty() {
            break;
        }

        let quota = (day_index / DAYS_PER_RAMP_STEP + 1).min(max_per_day);
        let (today, rest) = remaining.split_at(quota.min(remaining.len()));

        assigned.push(StudyDay {
            date: *date,
            topics: today.to_vec(),
            is_rest: false,
        });
        remaining = rest;
    }

    if !remaining.is_empty() {
        warn!(
            unassigned = remaining.len(),
            study_days = days.len(),
            "study period too short for every topic"
        );
    }

    assigned
}

/// Group assigned days into complete Monday..Sunday weeks, numbered from 1.
///
/// Slots without an assigned day become empty placeholders; Sundays are always
/// rest days.
pub fn group_weeks(days: &[StudyDay]) -> Vec<Week> {
    let mut ordered: Vec<&StudyDay> = days.iter().collect();
    ordered.sort_by_key(|day| day.date);

    let mut weeks = Vec::new();
    let mut chunk: Vec<&StudyDay> = Vec::new();
    let mut chunk_monday: Option<NaiveDate> = None;

    for day in ordered {
        let monday = week_start(day.date);
        if !chunk.is_empty() && monday != chunk_monday {
            push_week(&mut weeks, &chunk);
            chunk.clear();
        }
        chunk_monday = monday;
        chunk.push(day);
    }

    if !chunk.is_empty() {
        push_week(&mut weeks, &chunk);
    }

    weeks
}

/// The Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset))
}

fn push_week(weeks: &mut Vec<Week>, chunk: &[&StudyDay]) {
    let index = weeks.len() as u32 + 1;
    match build_week(chunk, index) {
        Some(week) => weeks.push(week),
        None => warn!(index, "week falls outside the supported calendar, skipped"),
    }
}

fn build_week(chunk: &[&StudyDay], index: u32) -> Option<Week> {
    let monday = week_start(chunk.first()?.date)?;

    let days: Vec<StudyDay> = monday
        .iter_days()
        .take(7)
        .map(|date| {
            if date.weekday() == REST_WEEKDAY {
                return StudyDay::rest(date);
            }
            match chunk.iter().find(|d| d.date == date) {
                Some(day) => StudyDay {
                    date,
                    topics: day.topics.clone(),
                    is_rest: false,
                },
                None => StudyDay::empty(date),
            }
        })
        .collect();

    let days: [StudyDay; 7] = days.try_into().ok()?;
    let label = format!(
        "Week {index}: {} - {}",
        days[0].date.format("%d/%m"),
        days[5].date.format("%d/%m")
    );

    Some(Week { index, label, days })
}
