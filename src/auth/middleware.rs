use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use crate::shared::{AppError, AppState};

const AUTHORIZATION_TYPE_BEARER: &str = "bearer";

/// Bearer-token middleware - verifies the access token and adds its Payload to the request.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), auth::bearer_auth))
/// Handlers can then extract Extension(payload): Extension<Payload>.
#[instrument(skip(state, req, next), fields(uri = %req.uri()))]
pub async fn bearer_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .filter(|header| !header.is_empty())
        .ok_or_else(|| {
            warn!("Missing Authorization header in request");
            AppError::Unauthorized("authorization header is not provided".to_string())
        })?;

    let fields: Vec<&str> = auth_header.split_whitespace().collect();
    if fields.len() < 2 {
        warn!("Malformed Authorization header");
        return Err(AppError::Unauthorized(
            "invalid authorization header format".to_string(),
        ));
    }

    let authorization_type = fields[0];
    if !authorization_type.eq_ignore_ascii_case(AUTHORIZATION_TYPE_BEARER) {
        warn!(authorization_type, "Unsupported authorization type");
        return Err(AppError::Unauthorized(format!(
            "unsupported authorization type {authorization_type}"
        )));
    }

    let payload = state.token_maker.verify_token(fields[1]).map_err(|e| {
        warn!(error = %e, "Access token rejected");
        AppError::from(e)
    })?;

    debug!(user_id = payload.user_id, token_id = %payload.id, "Request authenticated");
    req.extensions_mut().insert(payload);

    Ok(next.run(req).await)
}
