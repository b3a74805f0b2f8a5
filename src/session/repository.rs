use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::{CreateSessionParams, SessionModel};
use crate::store::{StoreError, SESSIONS_PKEY};

/// Trait for session repository operations
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create_session(&self, params: CreateSessionParams)
        -> Result<SessionModel, StoreError>;
    async fn get_session(&self, session_id: Uuid) -> Result<Option<SessionModel>, StoreError>;
}

/// In-memory implementation of SessionRepository for development and testing
///
/// Data is stored in memory and will be lost when the application restarts.
#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<Uuid, SessionModel>>,
}

impl InMemorySessionRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the current number of sessions in the repository
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Marks a session as blocked, standing in for the moderation tooling
    pub async fn block_session(&self, session_id: Uuid) -> bool {
        match self.sessions.write().await.get_mut(&session_id) {
            Some(session) => {
                session.is_blocked = true;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    #[instrument(skip(self, params))]
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionModel, StoreError> {
        debug!(session_id = %params.session_id, user_id = params.user_id, "Creating session in memory");

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&params.session_id) {
            warn!(session_id = %params.session_id, "Session already exists in memory");
            return Err(StoreError::unique(SESSIONS_PKEY));
        }

        let session = SessionModel::from_params(params, Utc::now());
        sessions.insert(session.session_id, session.clone());

        debug!(session_id = %session.session_id, "Session created successfully in memory");
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn get_session(&self, session_id: Uuid) -> Result<Option<SessionModel>, StoreError> {
        debug!(session_id = %session_id, "Fetching session from memory");

        let session = self.sessions.read().await.get(&session_id).cloned();
        if session.is_none() {
            debug!(session_id = %session_id, "Session not found in memory");
        }

        Ok(session)
    }
}

/// PostgreSQL implementation of session repository
pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SESSION_COLUMNS: &str = "session_id, user_id, refresh_token, user_agent, client_ip, \
    is_blocked, expired_at, created_at";

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    #[instrument(skip(self, params))]
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionModel, StoreError> {
        debug!(session_id = %params.session_id, user_id = params.user_id, "Creating session in database");

        let query = format!(
            "INSERT INTO sessions (session_id, user_id, refresh_token, user_agent, client_ip, is_blocked, expired_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {SESSION_COLUMNS}"
        );
        let session = sqlx::query_as::<_, SessionModel>(&query)
            .bind(params.session_id)
            .bind(params.user_id)
            .bind(&params.refresh_token)
            .bind(&params.user_agent)
            .bind(&params.client_ip)
            .bind(params.is_blocked)
            .bind(params.expired_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to create session in database");
                StoreError::from(e)
            })?;

        debug!(session_id = %session.session_id, "Session created successfully in database");
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn get_session(&self, session_id: Uuid) -> Result<Option<SessionModel>, StoreError> {
        debug!(session_id = %session_id, "Fetching session from database");

        let query = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = $1");
        let session = sqlx::query_as::<_, SessionModel>(&query)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, session_id = %session_id, "Failed to fetch session from database");
                StoreError::from(e)
            })?;

        if session.is_none() {
            debug!(session_id = %session_id, "Session not found in database");
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create_test_params(user_id: i32) -> CreateSessionParams {
        CreateSessionParams {
            session_id: Uuid::new_v4(),
            user_id,
            refresh_token: format!("refresh-token-{user_id}"),
            user_agent: "test-agent".to_string(),
            client_ip: "10.0.0.1".to_string(),
            is_blocked: false,
            expired_at: Utc::now() + Duration::days(1),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let repo = InMemorySessionRepository::new();
        let params = create_test_params(1);

        let created = repo.create_session(params.clone()).await.unwrap();
        assert_eq!(created.session_id, params.session_id);
        assert_eq!(created.refresh_token, params.refresh_token);
        assert!(!created.is_blocked);

        let retrieved = repo.get_session(params.session_id).await.unwrap();
        assert_eq!(retrieved, Some(created));
    }

    #[tokio::test]
    async fn test_get_nonexistent_session() {
        let repo = InMemorySessionRepository::new();

        let result = repo.get_session(Uuid::new_v4()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_session() {
        let repo = InMemorySessionRepository::new();
        let params = create_test_params(1);

        repo.create_session(params.clone()).await.unwrap();

        let result = repo.create_session(params).await;
        assert!(matches!(result, Err(ref e) if e.is_unique_violation(SESSIONS_PKEY)));
        assert_eq!(repo.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_block_session() {
        let repo = InMemorySessionRepository::new();
        let params = create_test_params(2);
        repo.create_session(params.clone()).await.unwrap();

        assert!(repo.block_session(params.session_id).await);
        assert!(!repo.block_session(Uuid::new_v4()).await);

        let session = repo.get_session(params.session_id).await.unwrap().unwrap();
        assert!(session.is_blocked);
    }
}
