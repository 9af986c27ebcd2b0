//! Core domain types for studyplan profiles and schedules.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Area tag of the synthetic Sunday placeholder topic.
pub const REST_AREA: &str = "rest";

/// Area tag used for review / light-study topics.
pub const REVIEW_AREA: &str = "revisao";

/// Theme of the synthetic Sunday placeholder topic.
pub const REST_THEME: &str = "REST";

/// Known area tags and their short display labels.
pub const AREA_LABELS: &[(&str, &str)] = &[
    ("preventiva", "PREV"),
    ("pediatria", "PED"),
    ("ginecologia", "GIN"),
    ("obstetricia", "OBS"),
    ("clinica", "CLM"),
    ("cirurgia", "CIR"),
    ("psiquiatria", "PSI"),
    (REVIEW_AREA, "REV"),
    (REST_AREA, "OFF"),
];

/// Short display label for an area tag; unknown tags render as `GEN`.
pub fn area_label(area: &str) -> &'static str {
    AREA_LABELS
        .iter()
        .find(|(tag, _)| *tag == area)
        .map(|(_, label)| *label)
        .unwrap_or("GEN")
}

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for user identifiers (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new time-sortable user identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A registered local user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    /// Unique login key.
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Schedule types
// ---------------------------------------------------------------------------

/// A single study unit: a theme plus its category tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    pub theme: String,
    pub area: String,
}

impl Topic {
    pub fn new(theme: impl Into<String>, area: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            area: area.into(),
        }
    }

    /// The placeholder shown on every Sunday.
    pub fn rest() -> Self {
        Self::new(REST_THEME, REST_AREA)
    }

    /// Whether this topic counts towards completion statistics.
    pub fn is_countable(&self) -> bool {
        self.area != REST_AREA && self.area != REVIEW_AREA
    }
}

/// One calendar day of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyDay {
    pub date: NaiveDate,
    pub topics: Vec<Topic>,
    pub is_rest: bool,
}

impl StudyDay {
    /// A study day with no topics assigned.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            topics: Vec::new(),
            is_rest: false,
        }
    }

    /// The weekly rest day with its single placeholder topic.
    pub fn rest(date: NaiveDate) -> Self {
        Self {
            date,
            topics: vec![Topic::rest()],
            is_rest: true,
        }
    }

    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }
}

/// A Monday..Sunday block of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    /// 1-based, chronological.
    pub index: u32,
    /// Human-readable range, e.g. `Week 1: 28/07 - 02/08`.
    pub label: String,
    pub days: [StudyDay; 7],
}

impl Week {
    pub fn monday(&self) -> NaiveDate {
        self.days[0].date
    }

    pub fn sunday(&self) -> NaiveDate {
        self.days[6].date
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.monday() && date <= self.sunday()
    }

    /// Real (non-placeholder) topics of the week in day order.
    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.days
            .iter()
            .filter(|d| !d.is_rest)
            .flat_map(|d| d.topics.iter())
    }
}

/// User-editable schedule settings, stored in the profile document.
///
/// Dates are kept as ISO strings exactly as entered; the schedule builder treats
/// anything unparsable as an empty range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub start_date: String,
    pub end_date: String,
    pub max_topics_per_day: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            start_date: "2025-07-28".into(),
            end_date: "2025-10-19".into(),
            max_topics_per_day: 4,
        }
    }
}

impl ScheduleConfig {
    /// Parsed `(start, end)` dates, or `None` if either is malformed.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.start_date.trim().parse::<NaiveDate>().ok()?;
        let end = self.end_date.trim().parse::<NaiveDate>().ok()?;
        Some((start, end))
    }

    /// Per-day cap with non-positive values clamped to 1.
    pub fn effective_max(&self) -> usize {
        usize::try_from(self.max_topics_per_day.max(1)).unwrap_or(usize::MAX)
    }
}

// ---------------------------------------------------------------------------
// Progress document
// ---------------------------------------------------------------------------

/// Self-rated difficulty of a completed topic; drives the review interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Days after the last review before the topic is due again.
    pub fn review_interval_days(self) -> i64 {
        match self {
            Self::Easy => 15,
            Self::Medium => 7,
            Self::Hard => 3,
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

/// Result of one question bank / mock exam session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub topic: String,
    pub attempted: u32,
    pub correct: u32,
}

impl PerformanceEntry {
    /// Rounded share of correct answers, 0..=100.
    pub fn percentage(&self) -> u32 {
        if self.attempted == 0 {
            return 0;
        }
        (f64::from(self.correct) / f64::from(self.attempted) * 100.0).round() as u32
    }

    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_percentage(self.percentage())
    }
}

/// Coarse grading of a performance percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn from_percentage(pct: u32) -> Self {
        match pct {
            80.. => Self::Good,
            60..=79 => Self::Fair,
            _ => Self::Poor,
        }
    }
}

/// The single per-user progress document persisted by the profile store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyProgress {
    /// Completed themes and when they were last reviewed.
    #[serde(default)]
    pub completed_topics: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub topic_difficulties: BTreeMap<String, Difficulty>,
    #[serde(default)]
    pub custom_topics: Vec<Topic>,
    #[serde(default)]
    pub performance_log: Vec<PerformanceEntry>,
    #[serde(default)]
    pub completed_pomodoros: u32,
    #[serde(default)]
    pub schedule_config: ScheduleConfig,
}

impl StudyProgress {
    /// A fresh document seeded with the given schedule settings.
    pub fn with_config(schedule_config: ScheduleConfig) -> Self {
        Self {
            schedule_config,
            ..Self::default()
        }
    }

    pub fn is_completed(&self, theme: &str) -> bool {
        self.completed_topics.contains_key(theme)
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for ChatRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(format!("unknown chat role '{other}'")),
        }
    }
}

/// One line of the assistant conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_roundtrip() {
        let id = UserId::new();
        let s = id.to_string();
        let parsed: UserId = s.parse().expect("parse UserId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn schedule_config_parses_dates() {
        let config = ScheduleConfig::default();
        let (start, end) = config.date_range().expect("valid defaults");
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 7, 28).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 10, 19).unwrap());

        let broken = ScheduleConfig {
            start_date: "28/07/2025".into(),
            ..ScheduleConfig::default()
        };
        assert!(broken.date_range().is_none());
    }

    #[test]
    fn effective_max_clamps_to_one() {
        let mut config = ScheduleConfig::default();
        config.max_topics_per_day = 0;
        assert_eq!(config.effective_max(), 1);
        config.max_topics_per_day = -3;
        assert_eq!(config.effective_max(), 1);
        config.max_topics_per_day = 6;
        assert_eq!(config.effective_max(), 6);
    }

    #[test]
    fn progress_deserializes_from_partial_document() {
        let parsed: StudyProgress =
            serde_json::from_str(r#"{"completed_pomodoros": 3}"#).expect("deserialize");
        assert_eq!(parsed.completed_pomodoros, 3);
        assert!(parsed.completed_topics.is_empty());
        assert_eq!(parsed.schedule_config, ScheduleConfig::default());
    }

    #[test]
    fn performance_percentage_and_band() {
        let entry = PerformanceEntry {
            id: Uuid::now_v7(),
            date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            topic: "Cardiologia".into(),
            attempted: 50,
            correct: 42,
        };
        assert_eq!(entry.percentage(), 84);
        assert_eq!(entry.band(), ScoreBand::Good);
        assert_eq!(ScoreBand::from_percentage(60), ScoreBand::Fair);
        assert_eq!(ScoreBand::from_percentage(59), ScoreBand::Poor);
    }

    #[test]
    fn difficulty_intervals() {
        assert_eq!(Difficulty::default(), Difficulty::Medium);
        assert_eq!(Difficulty::Easy.review_interval_days(), 15);
        assert_eq!(Difficulty::Hard.review_interval_days(), 3);
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("impossible".parse::<Difficulty>().is_err());
    }

    #[test]
    fn area_labels() {
        assert_eq!(area_label("pediatria"), "PED");
        assert_eq!(area_label(REST_AREA), "OFF");
        assert_eq!(area_label("cardio"), "GEN");
        assert!(!Topic::rest().is_countable());
        assert!(Topic::new("Asma", "clinica").is_countable());
    }
}
