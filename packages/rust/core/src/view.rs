//! Read-only projections of a built schedule: filtering, per-week completion
//! and locating the current week.

use chrono::NaiveDate;

use studyplan_shared::{StudyDay, StudyProgress, Topic, Week};

/// Search/area filter applied to schedule topics.
///
/// Both criteria are optional; an empty filter matches every topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleFilter {
    /// Case-insensitive substring of the theme.
    pub search: Option<String>,
    /// Exact area tag.
    pub area: Option<String>,
}

impl ScheduleFilter {
    pub fn new(search: Option<String>, area: Option<String>) -> Self {
        let clean = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            search: clean(search),
            area: clean(area).map(|a| a.to_lowercase()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.area.is_none()
    }

    /// A theme search, when present, overrides the area filter.
    pub fn matches(&self, topic: &Topic) -> bool {
        match (&self.search, &self.area) {
            (Some(needle), _) => topic
                .theme
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            (None, Some(area)) => topic.area == *area,
            (None, None) => true,
        }
    }

    /// Whether any real topic of `week` matches.
    pub fn matches_week(&self, week: &Week) -> bool {
        self.is_empty() || week.topics().any(|t| self.matches(t))
    }

    /// The weeks that contain at least one matching topic, kept whole.
    pub fn apply<'a>(&self, weeks: &'a [Week]) -> Vec<&'a Week> {
        weeks.iter().filter(|w| self.matches_week(w)).collect()
    }
}

/// Completion summary of a single week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekCompletion {
    pub completed: usize,
    pub total: usize,
}

impl WeekCompletion {
    /// Rounded percentage; an empty week counts as 0%.
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.completed as f64 / self.total as f64 * 100.0).round() as u32
    }

    pub fn is_done(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

pub fn week_completion(week: &Week, progress: &StudyProgress) -> WeekCompletion {
    let (completed, total) = week.topics().fold((0, 0), |(done, total), topic| {
        (done + usize::from(progress.is_completed(&topic.theme)), total + 1)
    });
    WeekCompletion { completed, total }
}

/// Index into `weeks` of the week containing `today`.
///
/// Before the schedule starts this is the first week; after it ends, the last.
pub fn current_week(weeks: &[Week], today: NaiveDate) -> Option<usize> {
    let last = weeks.len().checked_sub(1)?;
    if let Some(found) = weeks.iter().position(|w| w.contains(today)) {
        return Some(found);
    }
    if today < weeks[0].monday() {
        Some(0)
    } else {
        Some(last)
    }
}

/// The scheduled day for `date`, if the schedule covers it.
pub fn day_for<'a>(weeks: &'a [Week], date: NaiveDate) -> Option<&'a StudyDay> {
    weeks
        .iter()
        .find(|w| w.contains(date))
        .and_then(|w| w.days.iter().find(|d| d.date == date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::build_schedule;
    use chrono::{TimeZone, Utc};
    use studyplan_shared::ScheduleConfig;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_weeks() -> Vec<Week> {
        let topics = vec![
            Topic::new("Asma", "clinica"),
            Topic::new("Apendicite", "cirurgia"),
            Topic::new("Asma na Infância", "pediatria"),
            Topic::new("Diabetes", "clinica"),
            Topic::new("Pré-natal", "obstetricia"),
            Topic::new("Sepse", "clinica"),
            Topic::new("Bronquiolite", "pediatria"),
        ];
        let config = ScheduleConfig {
            start_date: "2025-07-28".into(),
            end_date: "2025-08-31".into(),
            max_topics_per_day: 4,
        };
        build_schedule(&topics, &config)
    }

    #[test]
    fn filter_by_search_is_case_insensitive() {
        let all = sample_weeks();
        let filter = ScheduleFilter::new(Some("BRONQUIO".into()), None);
        let weeks = filter.apply(&all);
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].index, 2);

        let filter = ScheduleFilter::new(Some("asma".into()), None);
        let weeks = filter.apply(&all);
        assert_eq!(weeks.len(), 1);
        // Matching weeks are returned whole
        assert_eq!(weeks[0].topics().count(), 6);
    }

    #[test]
    fn filter_by_area_keeps_matching_weeks() {
        let all = sample_weeks();
        assert_eq!(all.len(), 2);

        let filter = ScheduleFilter::new(None, Some("Obstetricia".into()));
        let weeks = filter.apply(&all);
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].index, 1);

        let filter = ScheduleFilter::new(None, Some("psiquiatria".into()));
        assert!(filter.apply(&all).is_empty());
    }

    #[test]
    fn search_overrides_area_and_blanks_are_ignored() {
        let all = sample_weeks();
        let filter = ScheduleFilter::new(Some("  ".into()), Some("".into()));
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&all).len(), all.len());

        let filter = ScheduleFilter::new(Some("asma".into()), Some("pediatria".into()));
        assert!(filter.matches(&Topic::new("Asma na Infância", "pediatria")));
        assert!(filter.matches(&Topic::new("Asma", "clinica")));
        assert!(!filter.matches(&Topic::new("Bronquiolite", "pediatria")));
    }

    #[test]
    fn completion_counts_real_topics() {
        let weeks = sample_weeks();
        let mut progress = StudyProgress::default();
        let at = Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap();
        progress.completed_topics.insert("Asma".into(), at);
        progress.completed_topics.insert("Sepse".into(), at);

        let first = week_completion(&weeks[0], &progress);
        assert_eq!(first, WeekCompletion { completed: 2, total: 6 });
        assert_eq!(first.percentage(), 33);
        assert!(!first.is_done());

        let second = week_completion(&weeks[1], &progress);
        assert_eq!(second.total, 1);
        assert_eq!(WeekCompletion { completed: 0, total: 0 }.percentage(), 0);
    }

    #[test]
    fn current_week_clamps_to_range() {
        let weeks = sample_weeks();
        assert_eq!(current_week(&weeks, date(2025, 8, 5)), Some(1));
        assert_eq!(current_week(&weeks, date(2025, 8, 3)), Some(0));
        assert_eq!(current_week(&weeks, date(2025, 1, 1)), Some(0));
        assert_eq!(current_week(&weeks, date(2026, 1, 1)), Some(1));
        assert_eq!(current_week(&[], date(2025, 8, 5)), None);
    }

    #[test]
    fn day_lookup() {
        let weeks = sample_weeks();
        let day = day_for(&weeks, date(2025, 7, 28)).expect("covered");
        assert_eq!(day.topics[0].theme, "Asma");
        assert!(day_for(&weeks, date(2025, 8, 3)).is_some_and(|d| d.is_rest));
        assert!(day_for(&weeks, date(2025, 9, 30)).is_none());
    }
}
