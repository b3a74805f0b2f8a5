use axum::Router;
use chrono::{Duration, Utc};
use std::sync::Arc;

use marketplace::{
    auth::{AuthConfig, AuthService},
    build_router,
    goods::{CategoryModel, GoodsService, InMemoryGoodsRepository},
    session::InMemorySessionRepository,
    token::JwtMaker,
    user::InMemoryUserRepository,
    AppState,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub const TEST_SECRET: &str = "integration-secret-with-enough-characters";

pub struct TestSetup {
    pub app: Router,
    pub sessions: Arc<InMemorySessionRepository>,
    pub goods: Arc<InMemoryGoodsRepository>,
    pub token_maker: Arc<JwtMaker>,
}

pub struct TestSetupBuilder {
    access_token_duration: Duration,
    refresh_token_duration: Duration,
    category_titles: Vec<String>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            access_token_duration: Duration::minutes(15),
            refresh_token_duration: Duration::days(1),
            category_titles: vec![
                "digital".to_string(),
                "furniture".to_string(),
                "clothing".to_string(),
            ],
        }
    }

    #[allow(dead_code)]
    pub fn with_refresh_token_duration(mut self, duration: Duration) -> Self {
        self.refresh_token_duration = duration;
        self
    }

    pub fn build(self) -> TestSetup {
        let now = Utc::now();
        let categories = self
            .category_titles
            .into_iter()
            .zip(1..)
            .map(|(title, category_id)| CategoryModel {
                category_id,
                title,
                created_at: now,
                updated_at: now,
            })
            .collect();

        let sessions = Arc::new(InMemorySessionRepository::new());
        let goods = Arc::new(InMemoryGoodsRepository::with_categories(categories));
        let token_maker = Arc::new(JwtMaker::new(TEST_SECRET).unwrap());

        let auth_service = AuthService::new(
            Arc::new(InMemoryUserRepository::new()),
            sessions.clone(),
            token_maker.clone(),
            AuthConfig {
                access_token_duration: self.access_token_duration,
                refresh_token_duration: self.refresh_token_duration,
            },
        );
        let goods_service = GoodsService::new(goods.clone(), goods.clone());
        let app_state = AppState::new(
            Arc::new(auth_service),
            Arc::new(goods_service),
            token_maker.clone(),
        );

        TestSetup {
            app: build_router(app_state, std::time::Duration::from_secs(5)),
            sessions,
            goods,
            token_maker,
        }
    }
}
