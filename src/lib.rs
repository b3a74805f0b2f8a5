// Library crate for the marketplace server
// This file exposes the public API for the binary and integration tests

pub mod auth;
pub mod config;
pub mod extract;
pub mod goods;
pub mod router;
pub mod session;
pub mod shared;
pub mod store;
pub mod token;
pub mod user;

use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;

use auth::{AuthConfig, AuthService};
use goods::{
    CategoryModel, CategoryRepository, GoodsRepository, GoodsService, InMemoryGoodsRepository,
    PostgresGoodsRepository,
};
use session::{InMemorySessionRepository, PostgresSessionRepository, SessionRepository};
use token::{TokenError, TokenMaker};
use user::{InMemoryUserRepository, PostgresUserRepository, UserRepository};

// Re-export commonly used types for easier access in tests
pub use config::{Config, ConfigError};
pub use router::build_router;
pub use shared::{AppError, AppState};
pub use token::JwtMaker;

/// Categories available when running without a database
pub const SEED_CATEGORY_TITLES: [&str; 6] =
    ["digital", "furniture", "clothing", "books", "sports", "etc"];

pub fn seed_categories() -> Vec<CategoryModel> {
    let now = Utc::now();
    SEED_CATEGORY_TITLES
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

fn assemble_state(
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    goods: Arc<dyn GoodsRepository>,
    categories: Arc<dyn CategoryRepository>,
    token_maker: Arc<dyn TokenMaker>,
    auth_config: AuthConfig,
) -> AppState {
    let auth_service = AuthService::new(users, sessions, token_maker.clone(), auth_config);
    let goods_service = GoodsService::new(goods, categories);
    AppState::new(Arc::new(auth_service), Arc::new(goods_service), token_maker)
}

/// Application state backed by in-memory stores with the seed categories
pub fn in_memory_state(config: &Config) -> Result<AppState, TokenError> {
    let token_maker = Arc::new(JwtMaker::new(config.jwt_secret.clone())?);
    let goods = Arc::new(InMemoryGoodsRepository::with_categories(seed_categories()));

    Ok(assemble_state(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(InMemorySessionRepository::new()),
        goods.clone(),
        goods,
        token_maker,
        config.auth_config(),
    ))
}

/// Application state backed by PostgreSQL
pub fn postgres_state(pool: PgPool, config: &Config) -> Result<AppState, TokenError> {
    let token_maker = Arc::new(JwtMaker::new(config.jwt_secret.clone())?);
    let goods = Arc::new(PostgresGoodsRepository::new(pool.clone()));

    Ok(assemble_state(
        Arc::new(PostgresUserRepository::new(pool.clone())),
        Arc::new(PostgresSessionRepository::new(pool)),
        goods.clone(),
        goods,
        token_maker,
        config.auth_config(),
    ))
}
