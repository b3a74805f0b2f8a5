use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::models::GoodsDetailModel;
use super::repository::{
    CategoryRepository, CreateGoodsTxParams, GetGoodsListParams, GoodsRepository,
    UpdateGoodsTxParams,
};
use super::types::{
    CategoryListResponse, CreateGoodsRequest, GoodsListQuery, GoodsListResponse, GoodsResponse,
    UpdateGoodsRequest,
};
use crate::shared::AppError;
use crate::store::{StoreError, GOODS_CATEGORIES_CATEGORY_ID_FKEY, GOODS_CATEGORIES_PKEY};

/// Service for listing management
pub struct GoodsService {
    goods: Arc<dyn GoodsRepository>,
    categories: Arc<dyn CategoryRepository>,
}

fn category_conflict(err: StoreError) -> AppError {
    if err.is_foreign_key_violation(GOODS_CATEGORIES_CATEGORY_ID_FKEY) {
        AppError::NotFoundCategory
    } else if err.is_unique_violation(GOODS_CATEGORIES_PKEY) {
        AppError::DuplicateCategory
    } else {
        err.into()
    }
}

impl GoodsService {
    pub fn new(goods: Arc<dyn GoodsRepository>, categories: Arc<dyn CategoryRepository>) -> Self {
        Self { goods, categories }
    }

    #[instrument(skip(self, request))]
    pub async fn create_goods(
        &self,
        user_id: i32,
        request: CreateGoodsRequest,
    ) -> Result<GoodsResponse, AppError> {
        let result = self
            .goods
            .create_goods_tx(CreateGoodsTxParams {
                user_id,
                title: request.title,
                price: request.price,
                description: request.description,
                default_image_url: request.default_image_url,
                category_id_list: request.category_id_list,
                image_url_list: request.image_url_list,
            })
            .await
            .map_err(category_conflict)?;

        info!(goods_id = result.goods.goods.goods_id, "Goods created");
        Ok(GoodsResponse::new(result.goods, result.goods_image_list))
    }

    #[instrument(skip(self))]
    pub async fn get_goods_list(&self, query: GoodsListQuery) -> Result<GoodsListResponse, AppError> {
        // Unvalidated callers must not reach the store with a negative limit or offset
        let page_size = query.page_size.max(0);
        let goods_list = self
            .goods
            .get_goods_list(GetGoodsListParams {
                limit: page_size,
                offset: query.page_id.saturating_sub(1).max(0).saturating_mul(page_size),
            })
            .await?;

        Ok(GoodsListResponse { goods_list })
    }

    #[instrument(skip(self))]
    pub async fn get_goods(&self, goods_id: i32) -> Result<GoodsResponse, AppError> {
        let (goods, goods_image_list) = futures::try_join!(
            self.goods.get_goods(goods_id),
            self.goods.get_goods_image_list(goods_id)
        )?;
        let goods = goods.ok_or(AppError::NotFoundGoods)?;

        Ok(GoodsResponse::new(goods, goods_image_list))
    }

    /// Applies a partial update after checking the listing exists and belongs to `user_id`
    #[instrument(skip(self, request))]
    pub async fn update_goods(
        &self,
        user_id: i32,
        goods_id: i32,
        request: UpdateGoodsRequest,
    ) -> Result<GoodsResponse, AppError> {
        self.owned_goods(user_id, goods_id).await?;

        self.goods
            .update_goods_tx(UpdateGoodsTxParams {
                goods_id,
                title: request.title,
                price: request.price,
                description: request.description,
                default_image_url: request.default_image_url,
                add_category_id_list: request.add_category_id_list,
                delete_category_id_list: request.delete_category_id_list,
                add_image_url_list: request.add_image_url_list,
                delete_goods_image_id_list: request.delete_goods_image_id_list,
            })
            .await
            .map_err(category_conflict)?;

        info!(goods_id, "Goods updated");
        self.get_goods(goods_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_goods(&self, user_id: i32, goods_id: i32) -> Result<(), AppError> {
        self.owned_goods(user_id, goods_id).await?;
        self.goods.delete_goods(goods_id).await?;

        info!(goods_id, "Goods deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_category_list(&self) -> Result<CategoryListResponse, AppError> {
        let category_list = self.categories.get_category_list().await?;
        Ok(CategoryListResponse { category_list })
    }

    async fn owned_goods(&self, user_id: i32, goods_id: i32) -> Result<GoodsDetailModel, AppError> {
        let goods = self
            .goods
            .get_goods(goods_id)
            .await?
            .ok_or(AppError::NotFoundGoods)?;

        if goods.goods.user_id != user_id {
            warn!(goods_id, owner_id = goods.goods.user_id, user_id, "User does not own goods");
            return Err(AppError::ForbiddenUser);
        }

        Ok(goods)
    }
}
