use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried inside every signed token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payload {
    pub id: Uuid, // Mirrored into sessions.session_id for refresh tokens
    pub user_id: i32,
    pub issued_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
}

impl Payload {
    /// Builds a payload issued now; a negative duration yields an already-expired payload
    pub fn new(id: Uuid, user_id: i32, duration: Duration) -> Self {
        let issued_at = Utc::now();

        Self {
            id,
            user_id,
            issued_at,
            expired_at: issued_at + duration,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expired_at
    }
}
