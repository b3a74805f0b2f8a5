use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for users table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct UserModel {
    pub user_id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String, // argon2 PHC string
    pub nickname: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub email: String,
    pub hashed_password: String,
    pub nickname: String,
}

/// Only the nickname is mutable after registration
#[derive(Debug, Clone)]
pub struct UpdateUserParams {
    pub user_id: i32,
    pub nickname: String,
}
