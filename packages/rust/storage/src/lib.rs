//! libSQL storage layer for user profiles (offline mode).
//!
//! The [`Storage`] struct wraps a local libSQL database holding the user
//! registry, one progress document per user, and the assistant chat history.
//!
//! **Access rules:**
//! - Mutating commands open read-write via [`Storage::open`]
//! - Reporting commands may open read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, Transaction, params};
use studyplan_shared::{
    ChatMessage, ChatRole, Result, ScheduleConfig, StudyPlanError, StudyProgress, UserId,
    UserRecord,
};
use tracing::{debug, info, instrument, warn};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StudyPlanError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StudyPlanError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| StudyPlanError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` without write access.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StudyPlanError::not_found(format!(
                "database {} (create a user first)",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StudyPlanError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| StudyPlanError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        StudyPlanError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(StudyPlanError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // User registry
    // -----------------------------------------------------------------------

    /// Register a user and create their progress document.
    ///
    /// E-mails are trimmed and lowercased; a second registration with the same
    /// address is rejected.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn create_user(
        &self,
        email: &str,
        display_name: &str,
        schedule: &ScheduleConfig,
    ) -> Result<UserRecord> {
        self.check_writable()?;
        let email = normalize_email(email)?;

        if self.find_user_by_email(&email).await?.is_some() {
            return Err(StudyPlanError::validation(format!(
                "a user with e-mail '{email}' already exists"
            )));
        }

        let display_name = match display_name.trim() {
            "" => email.split('@').next().unwrap_or(&email).to_string(),
            name => name.to_string(),
        };

        let now = Utc::now();
        let user = UserRecord {
            id: UserId::new(),
            email,
            display_name,
            created_at: now,
            last_login_at: now,
        };
        let ts = now.to_rfc3339();
        let document = encode_progress(&StudyProgress::with_config(schedule.clone()))?;

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| StudyPlanError::Storage(e.to_string()))?;
        let inserted = async {
            tx.execute(
                "INSERT INTO users (id, email, display_name, created_at, last_login_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id.to_string(),
                    user.email.as_str(),
                    user.display_name.as_str(),
                    ts.as_str(),
                    ts.as_str()
                ],
            )
            .await?;
            tx.execute(
                "INSERT INTO profiles (user_id, document_json, updated_at) VALUES (?1, ?2, ?3)",
                params![user.id.to_string(), document, ts.as_str()],
            )
            .await?;
            Ok::<_, libsql::Error>(())
        }
        .await;
        finish_transaction(tx, inserted.map_err(|e| StudyPlanError::Storage(e.to_string())))
            .await?;

        info!(user = %user.id, "user created");
        Ok(user)
    }

    /// Look a user up by e-mail (case-insensitive).
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let email = email.trim().to_lowercase();
        let mut rows = self
            .conn
            .query(
                "SELECT id, email, display_name, created_at, last_login_at
                 FROM users WHERE email = ?1",
                params![email],
            )
            .await
            .map_err(|e| StudyPlanError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_user(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StudyPlanError::Storage(e.to_string())),
        }
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, email, display_name, created_at, last_login_at
                 FROM users WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| StudyPlanError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_user(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StudyPlanError::Storage(e.to_string())),
        }
    }

    /// All users, oldest registration first.
    pub async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, email, display_name, created_at, last_login_at
                 FROM users ORDER BY created_at, id",
                params![],
            )
            .await
            .map_err(|e| StudyPlanError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_user(&row)?);
        }
        Ok(results)
    }

    /// Pick the active user: the requested e-mail if given, otherwise the only
    /// registered user.
    pub async fn resolve_user(&self, requested: Option<&str>) -> Result<UserRecord> {
        if let Some(email) = requested {
            return self
                .find_user_by_email(email)
                .await?
                .ok_or_else(|| StudyPlanError::not_found(format!("user '{}'", email.trim())));
        }

        let mut users = self.list_users().await?;
        match users.len() {
            0 => Err(StudyPlanError::not_found(
                "no users registered (run `studyplan user create <email>`)",
            )),
            1 => Ok(users.remove(0)),
            n => Err(StudyPlanError::validation(format!(
                "{n} users registered; choose one with --user or `defaults.user`"
            ))),
        }
    }

    /// Record a login for `id`.
    pub async fn touch_login(&self, id: UserId) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn
            .execute(
                "UPDATE users SET last_login_at = ?1 WHERE id = ?2",
                params![now.as_str(), id.to_string()],
            )
            .await
            .map_err(|e| StudyPlanError::Storage(e.to_string()))?;

        if changed == 0 {
            return Err(StudyPlanError::not_found(format!("user {id}")));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Progress document
    // -----------------------------------------------------------------------

    /// Load the progress document of `user`, or a default one if none is stored.
    pub async fn load_progress(&self, user: UserId) -> Result<StudyProgress> {
        let mut rows = self
            .conn
            .query(
                "SELECT document_json FROM profiles WHERE user_id = ?1",
                params![user.to_string()],
            )
            .await
            .map_err(|e| StudyPlanError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let json: String = row
                    .get(0)
                    .map_err(|e| StudyPlanError::Storage(e.to_string()))?;
                serde_json::from_str(&json)
                    .map_err(|e| StudyPlanError::parse(format!("corrupt profile for {user}: {e}")))
            }
            Ok(None) => {
                debug!(%user, "no stored profile, using defaults");
                Ok(StudyProgress::default())
            }
            Err(e) => Err(StudyPlanError::Storage(e.to_string())),
        }
    }

    /// Replace the whole progress document of `user`.
    pub async fn save_progress(&self, user: UserId, progress: &StudyProgress) -> Result<()> {
        self.check_writable()?;
        self.write_progress(&self.conn, user, progress).await
    }

    /// Read-modify-write the progress document of `user` in one transaction.
    ///
    /// Nothing is written when `apply` fails.
    #[instrument(skip_all, fields(user = %user))]
    pub async fn update_progress<T, F>(&self, user: UserId, apply: F) -> Result<(StudyProgress, T)>
    where
        F: FnOnce(&mut StudyProgress) -> Result<T>,
    {
        self.check_writable()?;
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| StudyPlanError::Storage(e.to_string()))?;

        let result = async {
            let mut progress = self.load_progress(user).await?;
            let output = apply(&mut progress)?;
            self.write_progress(&tx, user, &progress).await?;
            Ok::<_, StudyPlanError>((progress, output))
        }
        .await;
        finish_transaction(tx, result).await
    }

    async fn write_progress(
        &self,
        conn: &Connection,
        user: UserId,
        progress: &StudyProgress,
    ) -> Result<()> {
        let document = encode_progress(progress)?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO profiles (user_id, document_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
               document_json = excluded.document_json,
               updated_at = excluded.updated_at",
            params![user.to_string(), document, now.as_str()],
        )
        .await
        .map_err(|e| StudyPlanError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Chat history
    // -----------------------------------------------------------------------

    pub async fn append_chat_message(&self, user: UserId, message: &ChatMessage) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO chat_messages (user_id, role, text, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.to_string(),
                    message.role.as_str(),
                    message.text.as_str(),
                    message.timestamp.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| StudyPlanError::Storage(e.to_string()))?;
        Ok(())
    }

    /// The latest `limit` messages of `user`, oldest first.
    pub async fn list_chat_messages(&self, user: UserId, limit: u32) -> Result<Vec<ChatMessage>> {
        let mut rows = self
            .conn
            .query(
                "SELECT role, text, created_at FROM chat_messages
                 WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
                params![user.to_string(), limit],
            )
            .await
            .map_err(|e| StudyPlanError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let role: String = row
                .get(0)
                .map_err(|e| StudyPlanError::Storage(e.to_string()))?;
            let text: String = row
                .get(1)
                .map_err(|e| StudyPlanError::Storage(e.to_string()))?;
            let created_at: String = row
                .get(2)
                .map_err(|e| StudyPlanError::Storage(e.to_string()))?;
            results.push(ChatMessage {
                role: role.parse::<ChatRole>().map_err(StudyPlanError::Storage)?,
                text,
                timestamp: parse_timestamp(&created_at)?,
            });
        }
        results.reverse();
        Ok(results)
    }

    /// Delete the chat history of `user`; returns how many messages were removed.
    pub async fn clear_chat(&self, user: UserId) -> Result<u64> {
        self.check_writable()?;
        self.conn
            .execute(
                "DELETE FROM chat_messages WHERE user_id = ?1",
                params![user.to_string()],
            )
            .await
            .map_err(|e| StudyPlanError::Storage(e.to_string()))
    }
}

/// Commit `tx` when `result` is ok, roll it back otherwise.
async fn finish_transaction<T>(tx: Transaction, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| StudyPlanError::Storage(e.to_string()))?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}

fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(StudyPlanError::validation(format!(
            "'{}' is not a valid e-mail address",
            raw.trim()
        ))),
    }
}

fn encode_progress(progress: &StudyProgress) -> Result<String> {
    serde_json::to_string(progress)
        .map_err(|e| StudyPlanError::Storage(format!("failed to encode profile: {e}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StudyPlanError::Storage(format!("invalid date: {e}")))
}

/// Convert a database row to a [`UserRecord`].
fn row_to_user(row: &libsql::Row) -> Result<UserRecord> {
    let id: String = row
        .get(0)
        .map_err(|e| StudyPlanError::Storage(e.to_string()))?;
    Ok(UserRecord {
        id: id
            .parse()
            .map_err(|e| StudyPlanError::Storage(format!("invalid user id '{id}': {e}")))?,
        email: row
            .get::<String>(1)
            .map_err(|e| StudyPlanError::Storage(e.to_string()))?,
        display_name: row
            .get::<String>(2)
            .map_err(|e| StudyPlanError::Storage(e.to_string()))?,
        created_at: parse_timestamp(
            &row.get::<String>(3)
                .map_err(|e| StudyPlanError::Storage(e.to_string()))?,
        )?,
        last_login_at: parse_timestamp(
            &row.get::<String>(4)
                .map_err(|e| StudyPlanError::Storage(e.to_string()))?,
        )?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("sp_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    async fn test_user(storage: &Storage) -> UserRecord {
        storage
            .create_user("Ana@Example.com", "Ana", &ScheduleConfig::default())
            .await
            .expect("create user")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("sp_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn user_registry() {
        let storage = test_storage().await;
        let user = test_user(&storage).await;
        assert_eq!(user.email, "ana@example.com");

        let found = storage
            .find_user_by_email("  ANA@example.com ")
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.id, user.id);
        assert_eq!(found.display_name, "Ana");

        let by_id = storage.get_user(user.id).await.expect("get").expect("present");
        assert_eq!(by_id.email, user.email);
        assert!(storage.get_user(UserId::new()).await.unwrap().is_none());

        let dup = storage
            .create_user("ana@example.com", "Other", &ScheduleConfig::default())
            .await;
        assert!(matches!(dup, Err(StudyPlanError::Validation { .. })));

        let bruno = storage
            .create_user("bruno@example.com", "", &ScheduleConfig::default())
            .await
            .expect("second user");
        assert_eq!(bruno.display_name, "bruno");

        let users = storage.list_users().await.expect("list");
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, user.id);

        storage.touch_login(user.id).await.expect("touch");
        assert!(storage.touch_login(UserId::new()).await.is_err());
    }

    #[tokio::test]
    async fn resolve_active_user() {
        let storage = test_storage().await;
        assert!(matches!(
            storage.resolve_user(None).await,
            Err(StudyPlanError::NotFound { .. })
        ));

        let ana = test_user(&storage).await;
        assert_eq!(storage.resolve_user(None).await.unwrap().id, ana.id);

        let bruno = storage
            .create_user("bruno@example.com", "Bruno", &ScheduleConfig::default())
            .await
            .unwrap();
        assert!(matches!(
            storage.resolve_user(None).await,
            Err(StudyPlanError::Validation { .. })
        ));
        assert_eq!(
            storage.resolve_user(Some("BRUNO@example.com")).await.unwrap().id,
            bruno.id
        );
        assert!(storage.resolve_user(Some("zeca@example.com")).await.is_err());
    }

    #[tokio::test]
    async fn invalid_email_rejected() {
        let storage = test_storage().await;
        for bad in ["", "ana", "@example.com", "ana@"] {
            let result = storage
                .create_user(bad, "x", &ScheduleConfig::default())
                .await;
            assert!(result.is_err(), "{bad:?} accepted");
        }
    }

    #[tokio::test]
    async fn new_profile_uses_given_schedule() {
        let storage = test_storage().await;
        let schedule = ScheduleConfig {
            start_date: "2025-09-01".into(),
            end_date: "2025-12-20".into(),
            max_topics_per_day: 2,
        };
        let user = storage
            .create_user("carla@example.com", "Carla", &schedule)
            .await
            .unwrap();

        let progress = storage.load_progress(user.id).await.expect("load");
        assert_eq!(progress.schedule_config, schedule);
        assert!(progress.completed_topics.is_empty());
    }

    #[tokio::test]
    async fn missing_profile_loads_default() {
        let storage = test_storage().await;
        let progress = storage.load_progress(UserId::new()).await.expect("load");
        assert_eq!(progress, StudyProgress::default());
    }

    #[tokio::test]
    async fn progress_roundtrip_and_update() {
        let storage = test_storage().await;
        let user = test_user(&storage).await;

        let mut progress = storage.load_progress(user.id).await.unwrap();
        progress.completed_pomodoros = 4;
        progress.completed_topics.insert("Asma".into(), Utc::now());
        storage.save_progress(user.id, &progress).await.expect("save");

        let (updated, total) = storage
            .update_progress(user.id, |p| {
                p.completed_pomodoros += 1;
                Ok(p.completed_pomodoros)
            })
            .await
            .expect("update");
        assert_eq!(total, 5);
        assert!(updated.is_completed("Asma"));

        let reloaded = storage.load_progress(user.id).await.unwrap();
        assert_eq!(reloaded, updated);
    }

    #[tokio::test]
    async fn failed_update_writes_nothing() {
        let storage = test_storage().await;
        let user = test_user(&storage).await;

        let result = storage
            .update_progress(user.id, |p| {
                p.completed_pomodoros = 99;
                Err::<(), _>(StudyPlanError::validation("nope"))
            })
            .await;
        assert!(result.is_err());

        let reloaded = storage.load_progress(user.id).await.unwrap();
        assert_eq!(reloaded.completed_pomodoros, 0);
    }

    #[tokio::test]
    async fn profiles_are_isolated() {
        let storage = test_storage().await;
        let ana = test_user(&storage).await;
        let bruno = storage
            .create_user("bruno@example.com", "Bruno", &ScheduleConfig::default())
            .await
            .unwrap();

        storage
            .update_progress(ana.id, |p| {
                p.performance_log.push(studyplan_shared::PerformanceEntry {
                    id: Uuid::now_v7(),
                    date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
                    topic: "Cardio".into(),
                    attempted: 10,
                    correct: 8,
                });
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(storage.load_progress(ana.id).await.unwrap().performance_log.len(), 1);
        assert!(storage.load_progress(bruno.id).await.unwrap().performance_log.is_empty());
    }

    #[tokio::test]
    async fn chat_history() {
        let storage = test_storage().await;
        let user = test_user(&storage).await;

        for i in 0..5 {
            storage
                .append_chat_message(user.id, &ChatMessage::user(format!("q{i}")))
                .await
                .unwrap();
            storage
                .append_chat_message(user.id, &ChatMessage::assistant(format!("a{i}")))
                .await
                .unwrap();
        }

        let all = storage.list_chat_messages(user.id, 100).await.expect("list");
        assert_eq!(all.len(), 10);
        assert_eq!(all[0].text, "q0");
        assert_eq!(all[0].role, ChatRole::User);
        assert_eq!(all[9].role, ChatRole::Assistant);

        let recent = storage.list_chat_messages(user.id, 3).await.unwrap();
        let texts: Vec<&str> = recent.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["a3", "q4", "a4"]);

        assert_eq!(storage.clear_chat(user.id).await.expect("clear"), 10);
        assert!(storage.list_chat_messages(user.id, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("sp_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        let user = rw
            .create_user("ana@example.com", "Ana", &ScheduleConfig::default())
            .await
            .unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert_eq!(ro.list_users().await.unwrap().len(), 1);
        let result = ro.save_progress(user.id, &StudyProgress::default()).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn readonly_requires_existing_file() {
        let tmp = std::env::temp_dir().join(format!("sp_missing_{}.db", Uuid::now_v7()));
        assert!(matches!(
            Storage::open_readonly(&tmp).await,
            Err(StudyPlanError::NotFound { .. })
        ));
    }
}
