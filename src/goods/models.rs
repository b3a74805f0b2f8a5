use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for goods table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct GoodsModel {
    pub goods_id: i32,
    pub user_id: i32, // Owner; only this user may update or delete
    pub title: String,
    pub price: i32,
    pub description: String,
    pub default_image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A listing joined with the titles of its categories.
///
/// Only listings with at least one category association produce one of these.
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct GoodsDetailModel {
    #[sqlx(flatten)]
    pub goods: GoodsModel,
    pub category_titles: String, // Comma-joined, ordered by category id
}

impl GoodsDetailModel {
    pub fn category_title_list(&self) -> Vec<String> {
        self.category_titles
            .split(',')
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct GoodsImageModel {
    pub goods_image_id: i32,
    pub goods_id: i32,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct GoodsCategoryModel {
    pub goods_id: i32,
    pub category_id: i32,
    pub created_at: DateTime<Utc>,
}

/// Read-only reference data
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct CategoryModel {
    pub category_id: i32,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
