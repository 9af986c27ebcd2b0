//! Data behind the TUI: the active user's profile, the built schedule and the
//! assistant conversation.
//!
//! Storage calls run on a private tokio runtime via `block_on`; assistant
//! requests are spawned on it and polled from the event loop so the UI keeps
//! drawing while a reply is in flight.

use chrono::{Local, NaiveDate};
use studyplan_assistant::AssistantClient;
use studyplan_core::progress::all_topics;
use studyplan_core::schedule::build_schedule;
use studyplan_shared::{
    AppConfig, ChatMessage, Result, StudyPlanError, StudyProgress, UserRecord, Week, load_config,
    validate_api_key,
};
use studyplan_storage::Storage;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Messages loaded into the chat view.
const CHAT_HISTORY_LIMIT: u32 = 200;

/// User to open, set by `studyplan tui --user`.
const USER_ENV: &str = "STUDYPLAN_USER";

struct PendingAsk {
    question: String,
    handle: JoinHandle<Result<String>>,
}

pub(crate) struct Session {
    rt: Runtime,
    pub config: AppConfig,
    storage: Storage,
    pub user: UserRecord,
    assistant: Option<AssistantClient>,
    pub progress: StudyProgress,
    pub weeks: Vec<Week>,
    pub chat: Vec<ChatMessage>,
    pending: Option<PendingAsk>,
}

impl Session {
    /// Load config, open the database and resolve the active user.
    pub(crate) fn open() -> Result<Self> {
        let config = load_config()?;
        let rt = Runtime::new().map_err(|e| StudyPlanError::io("tokio runtime", e))?;
        let storage = rt.block_on(Storage::open(&config.database_path()?))?;

        let requested = std::env::var(USER_ENV)
            .ok()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| config.defaults.user.clone());
        let user = rt.block_on(storage.resolve_user(requested.as_deref()))?;
        rt.block_on(storage.touch_login(user.id))?;

        let assistant = match validate_api_key(&config)
            .and_then(|key| AssistantClient::new(&config.assistant, key))
        {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "assistant disabled");
                None
            }
        };

        Self::with_parts(rt, config, storage, user, assistant)
    }

    pub(crate) fn with_parts(
        rt: Runtime,
        config: AppConfig,
        storage: Storage,
        user: UserRecord,
        assistant: Option<AssistantClient>,
    ) -> Result<Self> {
        let mut session = Self {
            rt,
            config,
            storage,
            user,
            assistant,
            progress: StudyProgress::default(),
            weeks: Vec::new(),
            chat: Vec::new(),
            pending: None,
        };
        session.reload()?;
        info!(user = %session.user.email, weeks = session.weeks.len(), "session loaded");
        Ok(session)
    }

    pub(crate) fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    /// Re-read the profile and chat history from the database.
    pub(crate) fn reload(&mut self) -> Result<()> {
        let progress = self.rt.block_on(self.storage.load_progress(self.user.id))?;
        let chat = self
            .rt
            .block_on(self.storage.list_chat_messages(self.user.id, CHAT_HISTORY_LIMIT))?;
        self.set_progress(progress);
        self.chat = chat;
        Ok(())
    }

    /// Apply `f` to the stored profile; the cached copy changes only on success.
    pub(crate) fn update<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut StudyProgress) -> Result<T>,
    {
        let (progress, output) = self
            .rt
            .block_on(self.storage.update_progress(self.user.id, f))?;
        self.set_progress(progress);
        Ok(output)
    }

    fn set_progress(&mut self, progress: StudyProgress) {
        self.weeks = build_schedule(&all_topics(&progress), &progress.schedule_config);
        self.progress = progress;
    }

    pub(crate) fn clear_chat(&mut self) -> Result<u64> {
        let removed = self.rt.block_on(self.storage.clear_chat(self.user.id))?;
        self.chat.clear();
        Ok(removed)
    }

    pub(crate) fn assistant_enabled(&self) -> bool {
        self.assistant.is_some()
    }

    /// Question currently waiting for a reply.
    pub(crate) fn pending_question(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.question.as_str())
    }

    /// Send `question` to the assistant in the background.
    pub(crate) fn ask(&mut self, question: &str) -> Result<()> {
        let question = question.trim();
        if question.is_empty() {
            return Err(StudyPlanError::validation("question must not be empty"));
        }
        if self.pending.is_some() {
            return Err(StudyPlanError::validation(
                "still waiting for the previous answer",
            ));
        }
        let Some(client) = self.assistant.clone() else {
            return Err(StudyPlanError::config(format!(
                "assistant unavailable: set {}",
                self.config.assistant.api_key_env
            )));
        };

        let owned = question.to_string();
        let handle = self.rt.spawn(async move { client.ask(&owned).await });
        self.pending = Some(PendingAsk {
            question: question.to_string(),
            handle,
        });
        Ok(())
    }

    /// Collect a finished assistant reply, if any.
    ///
    /// The question and the reply are stored together only when the call
    /// succeeded; on failure the conversation is left as it was.
    pub(crate) fn poll_assistant(&mut self) -> Option<Result<()>> {
        if !self.pending.as_ref()?.handle.is_finished() {
            return None;
        }
        let pending = self.pending.take()?;

        let reply = match self.rt.block_on(pending.handle) {
            Ok(reply) => reply,
            Err(e) => Err(StudyPlanError::Assistant(format!("request task failed: {e}"))),
        };

        Some(reply.and_then(|reply| {
            let question = ChatMessage::user(pending.question);
            let answer = ChatMessage::assistant(reply);
            self.rt
                .block_on(self.storage.append_chat_message(self.user.id, &question))?;
            self.rt
                .block_on(self.storage.append_chat_message(self.user.id, &answer))?;
            self.chat.push(question);
            self.chat.push(answer);
            Ok(())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use studyplan_core::progress;
    use studyplan_shared::{ChatRole, ScheduleConfig};

    fn temp_db_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("sp_tui_test_{}.db", uuid::Uuid::now_v7()))
    }

    fn session_with(assistant: Option<AssistantClient>) -> (Session, std::path::PathBuf) {
        let rt = Runtime::new().unwrap();
        let path = temp_db_path();
        let storage = rt.block_on(Storage::open(&path)).unwrap();
        let schedule = ScheduleConfig {
            start_date: "2025-07-28".into(),
            end_date: "2025-08-10".into(),
            max_topics_per_day: 2,
        };
        let user = rt
            .block_on(storage.create_user("ana@example.com", "Ana", &schedule))
            .unwrap();
        let session =
            Session::with_parts(rt, AppConfig::default(), storage, user, assistant).unwrap();
        (session, path)
    }

    #[test]
    fn loads_schedule_for_user() {
        let (session, path) = session_with(None);
        assert_eq!(session.weeks.len(), 2);
        assert!(session.chat.is_empty());
        assert!(!session.assistant_enabled());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn update_refreshes_cache_and_persists() {
        let (mut session, path) = session_with(None);
        let theme = session.weeks[0].days[0].topics[0].theme.clone();

        let done = session
            .update(|p| Ok(progress::toggle_completed(p, &theme, Utc::now())))
            .unwrap();
        assert!(done);
        assert!(session.progress.is_completed(&theme));

        session.reload().unwrap();
        assert!(session.progress.is_completed(&theme));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn failed_update_keeps_cached_progress() {
        let (mut session, path) = session_with(None);
        let before = session.progress.clone();

        let err = session.update(|p| {
            p.completed_pomodoros = 99;
            progress::remove_custom_topic(p, "does not exist")
        });
        assert!(err.is_err());
        assert_eq!(session.progress, before);

        session.reload().unwrap();
        assert_eq!(session.progress.completed_pomodoros, 0);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn ask_without_client_is_rejected() {
        let (mut session, path) = session_with(None);
        assert!(matches!(session.ask("Oi"), Err(StudyPlanError::Config { .. })));
        assert!(session.pending_question().is_none());
        assert!(session.poll_assistant().is_none());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn failed_ask_leaves_history_untouched() {
        let config = studyplan_shared::AssistantConfig {
            endpoint: "http://127.0.0.1:9".into(),
            timeout_secs: 1,
            ..Default::default()
        };
        let client = AssistantClient::new(&config, "k").unwrap();
        let (mut session, path) = session_with(Some(client));

        session.ask("  O que é sepse?  ").unwrap();
        assert_eq!(session.pending_question(), Some("O que é sepse?"));
        assert!(session.ask("outra").is_err());

        let outcome = loop {
            if let Some(outcome) = session.poll_assistant() {
                break outcome;
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
        };
        assert!(outcome.is_err());
        assert!(session.chat.is_empty());
        assert!(session.pending_question().is_none());

        session.reload().unwrap();
        assert!(session.chat.iter().all(|m| m.role != ChatRole::User));
        let _ = std::fs::remove_file(path);
    }
}
