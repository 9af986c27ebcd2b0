//! Application configuration for studyplan.
//!
//! User config lives at `~/.studyplan/studyplan.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, StudyPlanError};
use crate::types::ScheduleConfig;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "studyplan.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".studyplan";

/// Database file name inside the data directory.
const DATABASE_FILE_NAME: &str = "studyplan.db";

// ---------------------------------------------------------------------------
// Config structs (matching studyplan.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Schedule settings applied to newly created profiles.
    #[serde(default)]
    pub schedule: ScheduleDefaults,

    /// Pomodoro durations.
    #[serde(default)]
    pub pomodoro: PomodoroConfig,

    /// Generative-language API settings.
    #[serde(default)]
    pub assistant: AssistantConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory holding the profile database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// E-mail of the active user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            user: None,
        }
    }
}

fn default_data_dir() -> String {
    "~/.studyplan/data".into()
}

/// `[schedule]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDefaults {
    #[serde(default = "default_start_date")]
    pub start_date: String,

    #[serde(default = "default_end_date")]
    pub end_date: String,

    #[serde(default = "default_max_topics")]
    pub max_topics_per_day: i64,
}

impl Default for ScheduleDefaults {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            end_date: default_end_date(),
            max_topics_per_day: default_max_topics(),
        }
    }
}

fn default_start_date() -> String {
    "2025-07-28".into()
}
fn default_end_date() -> String {
    "2025-10-19".into()
}
fn default_max_topics() -> i64 {
    4
}

impl From<&ScheduleDefaults> for ScheduleConfig {
    fn from(defaults: &ScheduleDefaults) -> Self {
        Self {
            start_date: defaults.start_date.clone(),
            end_date: defaults.end_date.clone(),
            max_topics_per_day: defaults.max_topics_per_day,
        }
    }
}

/// `[pomodoro]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PomodoroConfig {
    /// Focus phase length in minutes (1..=60).
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,

    /// Break phase length in minutes (1..=30).
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            focus_minutes: default_focus_minutes(),
            break_minutes: default_break_minutes(),
        }
    }
}

impl PomodoroConfig {
    pub fn focus_secs(&self) -> u64 {
        u64::from(self.focus_minutes.clamp(1, 60)) * 60
    }

    pub fn break_secs(&self) -> u64 {
        u64::from(self.break_minutes.clamp(1, 30)) * 60
    }
}

fn default_focus_minutes() -> u32 {
    25
}
fn default_break_minutes() -> u32 {
    5
}

/// `[assistant]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the generative-language API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model used for `generateContent`.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AssistantConfig {
    /// Full `generateContent` URL for the configured model (without the key).
    pub fn generate_url(&self) -> Result<Url> {
        let base = self.endpoint.trim_end_matches('/');
        let raw = format!("{base}/models/{}:generateContent", self.model);
        Url::parse(&raw)
            .map_err(|e| StudyPlanError::config(format!("invalid assistant endpoint '{raw}': {e}")))
    }
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_output_tokens() -> u32 {
    800
}
fn default_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// Resolved data directory with a leading `~` expanded.
    pub fn data_dir(&self) -> Result<PathBuf> {
        expand_home(&self.defaults.data_dir)
    }

    /// Path to the profile database.
    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(DATABASE_FILE_NAME))
    }

    /// Schedule settings for a newly created profile.
    pub fn initial_schedule(&self) -> ScheduleConfig {
        ScheduleConfig::from(&self.schedule)
    }
}

fn expand_home(raw: &str) -> Result<PathBuf> {
    match raw.strip_prefix('~') {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| StudyPlanError::config("could not determine home directory"))?;
            Ok(home.join(rest.trim_start_matches(['/', '\\'])))
        }
        None => Ok(PathBuf::from(raw)),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.studyplan/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| StudyPlanError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.studyplan/studyplan.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| StudyPlanError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| StudyPlanError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| StudyPlanError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| StudyPlanError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| StudyPlanError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the assistant API key from the configured env var.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.assistant.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(StudyPlanError::config(format!(
            "Assistant API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://aistudio.google.com/apikey"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("GEMINI_API_KEY"));
        assert!(!toml_str.contains("user ="));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.schedule.max_topics_per_day, 4);
        assert_eq!(parsed.pomodoro.focus_minutes, 25);
        assert_eq!(parsed.assistant.model, "gemini-2.0-flash");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
data_dir = "/tmp/studyplan"
user = "ana@example.com"

[schedule]
max_topics_per_day = 2
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.user.as_deref(), Some("ana@example.com"));
        assert_eq!(config.schedule.start_date, "2025-07-28");
        assert_eq!(config.initial_schedule().max_topics_per_day, 2);
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/studyplan/studyplan.db")
        );
    }

    #[test]
    fn pomodoro_durations_are_clamped() {
        let config = PomodoroConfig {
            focus_minutes: 90,
            break_minutes: 0,
        };
        assert_eq!(config.focus_secs(), 60 * 60);
        assert_eq!(config.break_secs(), 60);
    }

    #[test]
    fn generate_url_includes_model() {
        let config = AssistantConfig::default();
        let url = config.generate_url().expect("valid url");
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );

        let broken = AssistantConfig {
            endpoint: "not a url".into(),
            ..AssistantConfig::default()
        };
        assert!(broken.generate_url().is_err());
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.assistant.api_key_env = "SP_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
