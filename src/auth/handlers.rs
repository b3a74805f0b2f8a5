use axum::{
    extract::{ConnectInfo, State},
    http::{header::USER_AGENT, HeaderMap},
    Extension, Json,
};
use std::net::SocketAddr;
use tracing::{info, instrument};

use super::types::{
    ClientInfo, LoginRequest, LoginResponse, RegisterRequest, RenewAccessTokenRequest,
    RenewAccessTokenResponse, UpdateNicknameRequest, UserResponse,
};
use crate::extract::ValidatedJson;
use crate::shared::{AppError, AppState};
use crate::token::Payload;

/// POST /api/auth/register
#[instrument(name = "register", skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.auth_service.register(request).await?;
    Ok(Json(user))
}

/// POST /api/auth/login
///
/// The caller's user agent and address are recorded on the new session.
#[instrument(name = "login", skip(state, headers, request))]
pub async fn login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let client = ClientInfo {
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        client_ip: connect_info
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_default(),
    };

    let response = state.auth_service.login(request, client).await?;
    info!(nickname = %response.user.nickname, "Login succeeded");

    Ok(Json(response))
}

/// POST /api/auth/renew-access-token
#[instrument(name = "renew_access_token", skip(state, request))]
pub async fn renew_access_token(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RenewAccessTokenRequest>,
) -> Result<Json<RenewAccessTokenResponse>, AppError> {
    let response = state
        .auth_service
        .renew_access_token(&request.refresh_token)
        .await?;
    Ok(Json(response))
}

/// PATCH /api/users/me
#[instrument(name = "update_nickname", skip(state, payload, request), fields(user_id = payload.user_id))]
pub async fn update_nickname(
    State(state): State<AppState>,
    Extension(payload): Extension<Payload>,
    ValidatedJson(request): ValidatedJson<UpdateNicknameRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .auth_service
        .update_nickname(payload.user_id, request)
        .await?;
    Ok(Json(user))
}
