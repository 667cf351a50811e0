/// Session store
///
/// Records which refresh-token ids are currently honorable, keyed by
/// `"<user_id>:<token_id>"` with a TTL. The store is the sole owner of the
/// mapping from (user, token id) to liveness: its atomic single-key delete
/// is what makes refresh-token rotation race-free across concurrent calls.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// Batch size for the incremental delete-all scan.
const SCAN_BATCH_SIZE: i64 = 64;

/// Builds the delimiter-terminated key prefix shared by every session of
/// one user. The trailing delimiter in prefix scans is load-bearing: a bare
/// user-id prefix could match another user's keys if one id were a prefix
/// of the other.
fn user_prefix(user_id: Uuid) -> String {
    format!("{}:", user_id)
}

fn session_key(user_id: Uuid, token_id: Uuid) -> String {
    format!("{}{}", user_prefix(user_id), token_id)
}

/// Judges the outcome of an unconditional single-key removal: a missing or
/// already-expired row is an authorization failure, not a storage fault.
/// Both stores remove the row either way, so expired sessions never linger.
fn removed_session_was_live(
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    match expires_at {
        Some(expires_at) if expires_at > now => Ok(()),
        _ => Err(AppError::authorization("invalid refresh token")),
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Records a refresh-token id as live for `ttl`. Idempotent: re-issuing
    /// the same id overwrites the previous record.
    async fn set_session(
        &self,
        user_id: Uuid,
        token_id: Uuid,
        ttl: Duration,
    ) -> Result<(), AppError>;

    /// Removes exactly one session. A session that does not exist (expired,
    /// already rotated, or forged) is an authorization failure, not a
    /// storage fault.
    async fn delete_session(&self, user_id: Uuid, token_id: Uuid) -> Result<(), AppError>;

    /// Removes every session belonging to `user_id`, best-effort. Individual
    /// failures do not abort the scan; if any key failed to delete, a single
    /// aggregate internal error is returned afterwards.
    async fn delete_all_sessions(&self, user_id: Uuid) -> Result<(), AppError>;
}

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn set_session(
        &self,
        user_id: Uuid,
        token_id: Uuid,
        ttl: Duration,
    ) -> Result<(), AppError> {
        let key = session_key(user_id, token_id);
        let expires_at = Utc::now() + ttl;

        sqlx::query(
            r#"
            INSERT INTO sessions (session_key, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (session_key) DO UPDATE SET expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&key)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            tracing::error!(user_id = %user_id, token_id = %token_id, error = %err,
                "could not persist session");
            AppError::internal(format!("could not persist session: {}", err))
        })?;

        Ok(())
    }

    async fn delete_session(&self, user_id: Uuid, token_id: Uuid) -> Result<(), AppError> {
        let key = session_key(user_id, token_id);

        // Remove the row unconditionally and judge expiry from what came
        // back, so a lapsed session does not leave a stale row behind.
        let removed: Option<(DateTime<Utc>,)> =
            sqlx::query_as("DELETE FROM sessions WHERE session_key = $1 RETURNING expires_at")
                .bind(&key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|err| {
                    tracing::error!(user_id = %user_id, token_id = %token_id, error = %err,
                        "could not delete session");
                    AppError::internal(format!("could not delete session: {}", err))
                })?;

        removed_session_was_live(removed.map(|(expires_at,)| expires_at), Utc::now()).map_err(
            |err| {
                tracing::warn!(user_id = %user_id, token_id = %token_id,
                    "session does not exist");
                err
            },
        )
    }

    async fn delete_all_sessions(&self, user_id: Uuid) -> Result<(), AppError> {
        // Delimiter-terminated prefix; user ids never contain LIKE wildcards.
        let pattern = format!("{}%", user_prefix(user_id));
        let mut cursor = String::new();
        let mut fail_count = 0u32;

        loop {
            let batch: Vec<(String,)> = match sqlx::query_as(
                r#"
                SELECT session_key FROM sessions
                WHERE session_key LIKE $1 AND session_key > $2
                ORDER BY session_key
                LIMIT $3
                "#,
            )
            .bind(&pattern)
            .bind(&cursor)
            .bind(SCAN_BATCH_SIZE)
            .fetch_all(&self.pool)
            .await
            {
                Ok(batch) => batch,
                Err(err) => {
                    tracing::error!(user_id = %user_id, error = %err,
                        "session scan failed");
                    fail_count += 1;
                    break;
                }
            };

            if batch.is_empty() {
                break;
            }

            for (key,) in &batch {
                if let Err(err) = sqlx::query("DELETE FROM sessions WHERE session_key = $1")
                    .bind(key)
                    .execute(&self.pool)
                    .await
                {
                    tracing::error!(session_key = %key, error = %err,
                        "failed to delete session");
                    fail_count += 1;
                }
            }

            match batch.last() {
                Some((last,)) => cursor = last.clone(),
                None => break,
            }
        }

        if fail_count > 0 {
            return Err(AppError::internal(format!(
                "failed to delete {} session(s)",
                fail_count
            )));
        }

        Ok(())
    }
}

/// In-memory session store with the same contract, used by tests and local
/// development.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, DateTime<Utc>>>, AppError> {
        self.sessions
            .lock()
            .map_err(|_| AppError::internal("session store mutex poisoned"))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn set_session(
        &self,
        user_id: Uuid,
        token_id: Uuid,
        ttl: Duration,
    ) -> Result<(), AppError> {
        let mut sessions = self.lock()?;
        sessions.insert(session_key(user_id, token_id), Utc::now() + ttl);
        Ok(())
    }

    async fn delete_session(&self, user_id: Uuid, token_id: Uuid) -> Result<(), AppError> {
        let mut sessions = self.lock()?;
        let removed = sessions.remove(&session_key(user_id, token_id));
        removed_session_was_live(removed, Utc::now())
    }

    async fn delete_all_sessions(&self, user_id: Uuid) -> Result<(), AppError> {
        let prefix = user_prefix(user_id);
        let mut sessions = self.lock()?;
        sessions.retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }
}
