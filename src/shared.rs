use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use strum_macros::AsRefStr;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthService;
use crate::goods::GoodsService;
use crate::store::StoreError;
use crate::token::{TokenError, TokenMaker};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub goods_service: Arc<GoodsService>,
    pub token_maker: Arc<dyn TokenMaker>,
}

impl AppState {
    pub fn new(
        auth_service: Arc<AuthService>,
        goods_service: Arc<GoodsService>,
        token_maker: Arc<dyn TokenMaker>,
    ) -> Self {
        Self {
            auth_service,
            goods_service,
            token_maker,
        }
    }
}

/// Every operation reports exactly one of these on failure
#[derive(Error, Debug, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("invalid password")]
    InvalidPassword,

    #[error("not found user")]
    NotFoundUser,

    #[error("not found session")]
    NotFoundSession,

    #[error("not found goods")]
    NotFoundGoods,

    #[error("not found category")]
    NotFoundCategory,

    #[error("forbidden user")]
    ForbiddenUser,

    #[error("email should be unique")]
    DuplicateEmail,

    #[error("nickname should be unique")]
    DuplicateNickname,

    #[error("category should be unique")]
    DuplicateCategory,

    #[error("blocked session")]
    BlockedSession,

    #[error("incorrect session user")]
    IncorrectSessionUser,

    #[error("mismatched session token")]
    MismatchedSessionToken,

    #[error("expired session")]
    ExpiredSession,

    #[error("token is invalid")]
    InvalidToken,

    #[error("token has expired")]
    ExpiredToken,

    #[error("{0}")]
    Unauthorized(String),

    #[error("internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::InvalidPassword => StatusCode::BAD_REQUEST,
            AppError::NotFoundUser
            | AppError::NotFoundSession
            | AppError::NotFoundGoods
            | AppError::NotFoundCategory => StatusCode::NOT_FOUND,
            AppError::ForbiddenUser => StatusCode::FORBIDDEN,
            AppError::DuplicateEmail | AppError::DuplicateNickname | AppError::DuplicateCategory => {
                StatusCode::CONFLICT
            }
            AppError::BlockedSession
            | AppError::IncorrectSessionUser
            | AppError::MismatchedSessionToken
            | AppError::ExpiredSession
            | AppError::InvalidToken
            | AppError::ExpiredToken
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken => AppError::InvalidToken,
            TokenError::ExpiredToken => AppError::ExpiredToken,
            TokenError::InvalidKeySize(_) | TokenError::Internal(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

/// Storage errors that no operation claimed are opaque internal failures
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match &self {
            AppError::Internal(detail) => {
                error!(error = %detail, "Internal server error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "code": self.as_ref(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::auth::AuthConfig;
    use crate::goods::{
        CategoryModel, CategoryRepository, GoodsRepository, InMemoryGoodsRepository,
    };
    use crate::session::{InMemorySessionRepository, SessionRepository};
    use crate::token::JwtMaker;
    use crate::user::{InMemoryUserRepository, UserRepository};
    use chrono::{Duration, Utc};

    pub const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

    pub fn test_token_maker() -> Arc<JwtMaker> {
        Arc::new(JwtMaker::new(TEST_SECRET).unwrap())
    }

    pub fn test_auth_config() -> AuthConfig {
        AuthConfig {
            access_token_duration: Duration::minutes(15),
            refresh_token_duration: Duration::days(1),
        }
    }

    /// Categories 1..=3 exist; anything else trips the category foreign key
    pub fn test_categories() -> Vec<CategoryModel> {
        let now = Utc::now();
        ["digital", "furniture", "clothing"]
            .iter()
            .zip(1..)
            .map(|(title, category_id)| CategoryModel {
                category_id,
                title: title.to_string(),
                created_at: now,
                updated_at: now,
            })
            .collect()
    }

    /// Builder for creating AppState with overrides for testing
    pub struct AppStateBuilder {
        user_repository: Option<Arc<dyn UserRepository>>,
        session_repository: Option<Arc<dyn SessionRepository>>,
        goods_repository: Option<Arc<InMemoryGoodsRepository>>,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                user_repository: None,
                session_repository: None,
                goods_repository: None,
            }
        }

        pub fn with_user_repository(mut self, repo: Arc<dyn UserRepository>) -> Self {
            self.user_repository = Some(repo);
            self
        }

        pub fn with_session_repository(mut self, repo: Arc<dyn SessionRepository>) -> Self {
            self.session_repository = Some(repo);
            self
        }

        pub fn with_goods_repository(mut self, repo: Arc<InMemoryGoodsRepository>) -> Self {
            self.goods_repository = Some(repo);
            self
        }

        pub fn build(self) -> AppState {
            let token_maker: Arc<dyn TokenMaker> = test_token_maker();
            let goods = self
                .goods_repository
                .unwrap_or_else(|| Arc::new(InMemoryGoodsRepository::with_categories(test_categories())));

            let user_repository: Arc<dyn UserRepository> = match self.user_repository {
                Some(repo) => repo,
                None => Arc::new(InMemoryUserRepository::new()),
            };
            let session_repository: Arc<dyn SessionRepository> = match self.session_repository {
                Some(repo) => repo,
                None => Arc::new(InMemorySessionRepository::new()),
            };

            let auth_service = AuthService::new(
                user_repository,
                session_repository,
                token_maker.clone(),
                test_auth_config(),
            );
            let goods_service = GoodsService::new(
                goods.clone() as Arc<dyn GoodsRepository>,
                goods as Arc<dyn CategoryRepository>,
            );

            AppState::new(Arc::new(auth_service), Arc::new(goods_service), token_maker)
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
