use chrono::{DateTime, Utc};
use tracing::warn;

use super::models::SessionModel;
use crate::shared::AppError;
use crate::token::Payload;

/// Decides whether a stored session may mint a new access token.
///
/// Checks run in a fixed order and the first failing one is reported,
/// so a blocked session that has also expired reports `BlockedSession`.
pub fn validate_session<'a>(
    session: Option<&'a SessionModel>,
    refresh_payload: &Payload,
    presented_refresh_token: &str,
    now: DateTime<Utc>,
) -> Result<&'a SessionModel, AppError> {
    let session = session.ok_or_else(|| {
        warn!(session_id = %refresh_payload.id, "Session not found");
        AppError::NotFoundSession
    })?;

    if session.is_blocked {
        warn!(session_id = %session.session_id, "Session is blocked");
        return Err(AppError::BlockedSession);
    }

    if session.user_id != refresh_payload.user_id {
        warn!(
            session_id = %session.session_id,
            session_user_id = session.user_id,
            token_user_id = refresh_payload.user_id,
            "Session belongs to a different user"
        );
        return Err(AppError::IncorrectSessionUser);
    }

    if session.refresh_token != presented_refresh_token {
        warn!(session_id = %session.session_id, "Presented refresh token does not match session");
        return Err(AppError::MismatchedSessionToken);
    }

    if session.is_expired_at(now) {
        warn!(session_id = %session.session_id, expired_at = %session.expired_at, "Session has expired");
        return Err(AppError::ExpiredSession);
    }

    Ok(session)
}
