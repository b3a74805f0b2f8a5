use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{CreateUserParams, UpdateUserParams, UserModel};
use crate::store::{StoreError, USERS_EMAIL_KEY, USERS_NICKNAME_KEY};

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserModel, StoreError>;
    async fn get_user(&self, user_id: i32) -> Result<Option<UserModel>, StoreError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserModel>, StoreError>;
    /// Returns `None` when no user has this id
    async fn update_user(&self, params: UpdateUserParams)
        -> Result<Option<UserModel>, StoreError>;
}

#[derive(Default)]
struct UserTable {
    users: Vec<UserModel>,
    next_id: i32,
}

/// In-memory implementation of UserRepository for development and testing
///
/// Enforces the same unique keys as the users table so conflict handling can be
/// exercised without a database.
#[derive(Default)]
pub struct InMemoryUserRepository {
    table: RwLock<UserTable>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(UserTable {
                users: Vec::new(),
                next_id: 1,
            }),
        }
    }

    pub async fn user_count(&self) -> usize {
        self.table.read().await.users.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, params), fields(email = %params.email))]
    async fn create_user(&self, params: CreateUserParams) -> Result<UserModel, StoreError> {
        debug!(nickname = %params.nickname, "Creating user in memory");

        let mut table = self.table.write().await;
        if table.users.iter().any(|u| u.email == params.email) {
            warn!("Email already registered in memory");
            return Err(StoreError::unique(USERS_EMAIL_KEY));
        }
        if table.users.iter().any(|u| u.nickname == params.nickname) {
            warn!(nickname = %params.nickname, "Nickname already taken in memory");
            return Err(StoreError::unique(USERS_NICKNAME_KEY));
        }

        let now = Utc::now();
        let user = UserModel {
            user_id: table.next_id.max(1),
            email: params.email,
            hashed_password: params.hashed_password,
            nickname: params.nickname,
            created_at: now,
            updated_at: now,
        };
        table.next_id = user.user_id + 1;
        table.users.push(user.clone());

        debug!(user_id = user.user_id, "User created successfully in memory");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: i32) -> Result<Option<UserModel>, StoreError> {
        let table = self.table.read().await;
        Ok(table.users.iter().find(|u| u.user_id == user_id).cloned())
    }

    #[instrument(skip(self))]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserModel>, StoreError> {
        let table = self.table.read().await;
        Ok(table.users.iter().find(|u| u.email == email).cloned())
    }

    #[instrument(skip(self, params), fields(user_id = params.user_id))]
    async fn update_user(
        &self,
        params: UpdateUserParams,
    ) -> Result<Option<UserModel>, StoreError> {
        let mut table = self.table.write().await;
        if table
            .users
            .iter()
            .any(|u| u.nickname == params.nickname && u.user_id != params.user_id)
        {
            warn!(nickname = %params.nickname, "Nickname already taken in memory");
            return Err(StoreError::unique(USERS_NICKNAME_KEY));
        }

        let Some(user) = table.users.iter_mut().find(|u| u.user_id == params.user_id) else {
            debug!("User not found in memory");
            return Ok(None);
        };
        user.nickname = params.nickname;
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }
}

/// PostgreSQL implementation of user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "user_id, email, hashed_password, nickname, created_at, updated_at";

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, params), fields(email = %params.email))]
    async fn create_user(&self, params: CreateUserParams) -> Result<UserModel, StoreError> {
        debug!("Creating user in database");

        let query = format!(
            "INSERT INTO users (email, hashed_password, nickname) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, UserModel>(&query)
            .bind(&params.email)
            .bind(&params.hashed_password)
            .bind(&params.nickname)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to create user in database");
                StoreError::from(e)
            })?;

        debug!(user_id = user.user_id, "User created successfully in database");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: i32) -> Result<Option<UserModel>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
        let user = sqlx::query_as::<_, UserModel>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserModel>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, UserModel>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    #[instrument(skip(self, params), fields(user_id = params.user_id))]
    async fn update_user(
        &self,
        params: UpdateUserParams,
    ) -> Result<Option<UserModel>, StoreError> {
        let query = format!(
            "UPDATE users SET nickname = $2, updated_at = now() WHERE user_id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, UserModel>(&query)
            .bind(params.user_id)
            .bind(&params.nickname)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to update user in database");
                StoreError::from(e)
            })?;
        Ok(user)
    }
}
