use axum::{
    extract::{Path, State},
    Extension, Json,
};
use tracing::{info, instrument};

use super::types::{
    CategoryListResponse, CreateGoodsRequest, GoodsListQuery, GoodsListResponse, GoodsResponse,
    UpdateGoodsRequest,
};
use crate::extract::{ValidatedJson, ValidatedQuery};
use crate::shared::{AppError, AppState};
use crate::token::Payload;

/// POST /api/goods
#[instrument(name = "create_goods", skip_all, fields(user_id = payload.user_id))]
pub async fn create_goods(
    State(state): State<AppState>,
    Extension(payload): Extension<Payload>,
    ValidatedJson(request): ValidatedJson<CreateGoodsRequest>,
) -> Result<Json<GoodsResponse>, AppError> {
    let goods = state
        .goods_service
        .create_goods(payload.user_id, request)
        .await?;

    info!(goods_id = goods.goods_id, "Goods created successfully");
    Ok(Json(goods))
}

/// GET /api/goods?page_id=1&page_size=10
#[instrument(name = "get_goods_list", skip(state))]
pub async fn get_goods_list(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<GoodsListQuery>,
) -> Result<Json<GoodsListResponse>, AppError> {
    let goods_list = state.goods_service.get_goods_list(query).await?;
    Ok(Json(goods_list))
}

/// GET /api/goods/:goods_id
#[instrument(name = "get_goods", skip(state))]
pub async fn get_goods(
    State(state): State<AppState>,
    Path(goods_id): Path<i32>,
) -> Result<Json<GoodsResponse>, AppError> {
    let goods = state.goods_service.get_goods(goods_id).await?;
    Ok(Json(goods))
}

/// PATCH /api/goods/:goods_id
#[instrument(name = "update_goods", skip(state, payload, request), fields(user_id = payload.user_id))]
pub async fn update_goods(
    State(state): State<AppState>,
    Extension(payload): Extension<Payload>,
    Path(goods_id): Path<i32>,
    ValidatedJson(request): ValidatedJson<UpdateGoodsRequest>,
) -> Result<Json<GoodsResponse>, AppError> {
    let goods = state
        .goods_service
        .update_goods(payload.user_id, goods_id, request)
        .await?;
    Ok(Json(goods))
}

/// DELETE /api/goods/:goods_id
#[instrument(name = "delete_goods", skip(state, payload), fields(user_id = payload.user_id))]
pub async fn delete_goods(
    State(state): State<AppState>,
    Extension(payload): Extension<Payload>,
    Path(goods_id): Path<i32>,
) -> Result<(), AppError> {
    state
        .goods_service
        .delete_goods(payload.user_id, goods_id)
        .await
}

/// GET /api/categories
#[instrument(name = "get_category_list", skip(state))]
pub async fn get_category_list(
    State(state): State<AppState>,
) -> Result<Json<CategoryListResponse>, AppError> {
    let categories = state.goods_service.get_category_list().await?;
    Ok(Json(categories))
}
