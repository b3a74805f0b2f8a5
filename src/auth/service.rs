use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::password::{hash_password, verify_password};
use super::types::{
    ClientInfo, LoginRequest, LoginResponse, RegisterRequest, RenewAccessTokenResponse,
    UpdateNicknameRequest, UserResponse,
};
use crate::session::{validate_session, CreateSessionParams, SessionRepository};
use crate::shared::AppError;
use crate::store::{StoreError, USERS_EMAIL_KEY, USERS_NICKNAME_KEY};
use crate::token::{Payload, TokenMaker};
use crate::user::{CreateUserParams, UpdateUserParams, UserRepository};

/// Lifetimes of the two token kinds handed out at login
#[derive(Debug, Clone, Copy)]
pub struct AuthConfig {
    pub access_token_duration: Duration,
    pub refresh_token_duration: Duration,
}

/// Service for registration, login and the refresh-token lifecycle
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    token_maker: Arc<dyn TokenMaker>,
    config: AuthConfig,
}

fn user_conflict(err: StoreError) -> AppError {
    if err.is_unique_violation(USERS_EMAIL_KEY) {
        AppError::DuplicateEmail
    } else if err.is_unique_violation(USERS_NICKNAME_KEY) {
        AppError::DuplicateNickname
    } else {
        err.into()
    }
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        token_maker: Arc<dyn TokenMaker>,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            sessions,
            token_maker,
            config,
        }
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<UserResponse, AppError> {
        let hashed_password = hash_password(&request.password)
            .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))?;

        let user = self
            .users
            .create_user(CreateUserParams {
                email: request.email,
                hashed_password,
                nickname: request.nickname,
            })
            .await
            .map_err(user_conflict)?;

        info!(user_id = user.user_id, "User registered");
        Ok(user.into())
    }

    /// Checks credentials and opens a new session keyed by the refresh token's id.
    ///
    /// Every call creates a fresh session row; earlier sessions stay valid.
    #[instrument(skip(self, request, client), fields(email = %request.email))]
    pub async fn login(
        &self,
        request: LoginRequest,
        client: ClientInfo,
    ) -> Result<LoginResponse, AppError> {
        let user = self
            .users
            .get_user_by_email(&request.email)
            .await?
            .ok_or_else(|| {
                warn!("Login attempt for unknown email");
                AppError::NotFoundUser
            })?;

        let matches = verify_password(&request.password, &user.hashed_password)
            .map_err(|e| AppError::Internal(format!("failed to verify password: {e}")))?;
        if !matches {
            warn!(user_id = user.user_id, "Login attempt with wrong password");
            return Err(AppError::InvalidPassword);
        }

        let (access_token, _) = self.issue_access_token(user.user_id)?;
        let (refresh_token, refresh_payload) = self
            .token_maker
            .create_token(user.user_id, self.config.refresh_token_duration)?;

        let params = CreateSessionParams::from_refresh_token(
            refresh_token.clone(),
            &refresh_payload,
            client.user_agent,
            client.client_ip,
        );
        // Any storage failure here is internal, including a token id collision
        let session = self.sessions.create_session(params).await.map_err(|e| {
            warn!(error = %e, user_id = user.user_id, "Failed to persist session");
            AppError::Internal(e.to_string())
        })?;

        info!(
            user_id = user.user_id,
            session_id = %session.session_id,
            "User logged in"
        );

        Ok(LoginResponse {
            access_token,
            refresh_token,
            user: user.into(),
        })
    }

    /// Exchanges a refresh token for a new access token without touching the session row
    #[instrument(skip(self, refresh_token))]
    pub async fn renew_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<RenewAccessTokenResponse, AppError> {
        let refresh_payload = self.token_maker.verify_token(refresh_token).map_err(|e| {
            warn!(error = %e, "Refresh token rejected");
            AppError::from(e)
        })?;

        let session = self.sessions.get_session(refresh_payload.id).await?;
        let session =
            validate_session(session.as_ref(), &refresh_payload, refresh_token, Utc::now())?;

        let (access_token, _) = self.issue_access_token(session.user_id)?;

        info!(
            user_id = session.user_id,
            session_id = %session.session_id,
            "Access token renewed"
        );
        Ok(RenewAccessTokenResponse { access_token })
    }

    pub fn issue_access_token(&self, user_id: i32) -> Result<(String, Payload), AppError> {
        let token = self
            .token_maker
            .create_token(user_id, self.config.access_token_duration)?;
        Ok(token)
    }

    #[instrument(skip(self, request))]
    pub async fn update_nickname(
        &self,
        user_id: i32,
        request: UpdateNicknameRequest,
    ) -> Result<UserResponse, AppError> {
        let user = self
            .users
            .update_user(UpdateUserParams {
                user_id,
                nickname: request.nickname,
            })
            .await
            .map_err(user_conflict)?
            .ok_or(AppError::NotFoundUser)?;

        info!(user_id, nickname = %user.nickname, "Nickname updated");
        Ok(user.into())
    }
}
