use axum::{
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{auth, goods, shared::AppState};

async fn health_check() -> Json<Value> {
    Json(json!({ "message": "OK" }))
}

/// Builds the full application router.
///
/// Routes under the bearer layer see the caller's token `Payload` as a request extension.
pub fn build_router(app_state: AppState, request_timeout: Duration) -> Router {
    let protected = Router::new()
        .route("/api/users/me", patch(auth::update_nickname))
        .route(
            "/api/goods",
            post(goods::create_goods).get(goods::get_goods_list),
        )
        .route(
            "/api/goods/:goods_id",
            get(goods::get_goods)
                .patch(goods::update_goods)
                .delete(goods::delete_goods),
        )
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::bearer_auth,
        ));

    Router::new()
        .route("/api/health-check", get(health_check))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/renew-access-token", post(auth::renew_access_token))
        .route("/api/categories", get(goods::get_category_list))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(app_state)
}
