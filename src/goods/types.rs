use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::models::{CategoryModel, GoodsDetailModel, GoodsImageModel, GoodsModel};

/// Request payload for creating a listing
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGoodsRequest {
    #[validate(length(min = 1, max = 50, message = "title must be 1-50 characters"))]
    pub title: String,
    #[validate(range(min = 0, message = "price must not be negative"))]
    pub price: i32,
    pub description: String,
    #[validate(length(min = 1, message = "category_id_list must not be empty"))]
    pub category_id_list: Vec<i32>,
    #[validate(length(min = 1, message = "default_image_url is required"))]
    pub default_image_url: String,
    pub image_url_list: Option<Vec<String>>,
}

/// Partial update; omitted fields are left as they are
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateGoodsRequest {
    #[validate(length(min = 1, max = 50, message = "title must be 1-50 characters"))]
    pub title: Option<String>,
    #[validate(range(min = 0, message = "price must not be negative"))]
    pub price: Option<i32>,
    pub description: Option<String>,
    pub default_image_url: Option<String>,
    pub add_category_id_list: Option<Vec<i32>>,
    pub delete_category_id_list: Option<Vec<i32>>,
    pub add_image_url_list: Option<Vec<String>>,
    pub delete_goods_image_id_list: Option<Vec<i32>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GoodsListQuery {
    #[validate(range(min = 1, message = "page_id must be at least 1"))]
    pub page_id: i64,
    #[validate(range(min = 10, message = "page_size must be at least 10"))]
    pub page_size: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GoodsResponse {
    pub goods_id: i32,
    pub user_id: i32,
    pub title: String,
    pub price: i32,
    pub description: String,
    pub default_image_url: String,
    pub category_title_list: Vec<String>,
    pub goods_image_list: Vec<GoodsImageModel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GoodsResponse {
    pub fn new(detail: GoodsDetailModel, goods_image_list: Vec<GoodsImageModel>) -> Self {
        let category_title_list = detail.category_title_list();
        let goods = detail.goods;
        Self {
            goods_id: goods.goods_id,
            user_id: goods.user_id,
            title: goods.title,
            price: goods.price,
            description: goods.description,
            default_image_url: goods.default_image_url,
            category_title_list,
            goods_image_list,
            created_at: goods.created_at,
            updated_at: goods.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GoodsListResponse {
    pub goods_list: Vec<GoodsModel>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryListResponse {
    pub category_list: Vec<CategoryModel>,
}
