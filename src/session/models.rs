use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::token::Payload;

/// Database model for sessions table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct SessionModel {
    pub session_id: Uuid, // Same id as the refresh token payload
    pub user_id: i32,
    pub refresh_token: String,
    pub user_agent: String,
    pub client_ip: String,
    pub is_blocked: bool,
    pub expired_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by login when persisting a new session
#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub session_id: Uuid,
    pub user_id: i32,
    pub refresh_token: String,
    pub user_agent: String,
    pub client_ip: String,
    pub is_blocked: bool,
    pub expired_at: DateTime<Utc>,
}

impl CreateSessionParams {
    /// Mirrors a freshly issued refresh token into session parameters
    pub fn from_refresh_token(
        refresh_token: String,
        payload: &Payload,
        user_agent: String,
        client_ip: String,
    ) -> Self {
        Self {
            session_id: payload.id,
            user_id: payload.user_id,
            refresh_token,
            user_agent,
            client_ip,
            is_blocked: false,
            expired_at: payload.expired_at,
        }
    }
}

impl SessionModel {
    pub fn from_params(params: CreateSessionParams, created_at: DateTime<Utc>) -> Self {
        Self {
            session_id: params.session_id,
            user_id: params.user_id,
            refresh_token: params.refresh_token,
            user_agent: params.user_agent,
            client_ip: params.client_ip,
            is_blocked: params.is_blocked,
            expired_at: params.expired_at,
            created_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expired_at
    }
}
