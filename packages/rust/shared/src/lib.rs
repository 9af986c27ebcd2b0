//! Shared types, error model, and configuration for studyplan.
//!
//! This crate is the foundation depended on by all other studyplan crates.
//! It provides:
//! - [`StudyPlanError`], the unified error type
//! - Domain types ([`Topic`], [`StudyDay`], [`Week`], [`ScheduleConfig`], [`StudyProgress`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AssistantConfig, DefaultsConfig, PomodoroConfig, ScheduleDefaults, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{Result, StudyPlanError};
pub use types::{
    AREA_LABELS, ChatMessage, ChatRole, Difficulty, PerformanceEntry, REST_AREA, REST_THEME, REVIEW_AREA,
    ScheduleConfig, ScoreBand, StudyDay, StudyProgress, Topic, UserId, UserRecord, Week,
    area_label,
};
