use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{
    CategoryModel, GoodsCategoryModel, GoodsDetailModel, GoodsImageModel, GoodsModel,
};
use crate::store::{
    StoreError, GOODS_CATEGORIES_CATEGORY_ID_FKEY, GOODS_CATEGORIES_GOODS_ID_FKEY,
    GOODS_CATEGORIES_PKEY, GOODS_IMAGES_GOODS_ID_FKEY,
};

#[derive(Debug, Clone)]
pub struct CreateGoodsTxParams {
    pub user_id: i32,
    pub title: String,
    pub price: i32,
    pub description: String,
    pub default_image_url: String,
    pub category_id_list: Vec<i32>,
    pub image_url_list: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct CreateGoodsTxResult {
    pub goods: GoodsDetailModel,
    pub goods_image_list: Vec<GoodsImageModel>,
}

/// Partial update of a listing.
///
/// `None` leaves a field or association list untouched. A present but empty
/// list is a no-op as well.
#[derive(Debug, Clone, Default)]
pub struct UpdateGoodsTxParams {
    pub goods_id: i32,
    pub title: Option<String>,
    pub price: Option<i32>,
    pub description: Option<String>,
    pub default_image_url: Option<String>,
    pub add_category_id_list: Option<Vec<i32>>,
    pub delete_category_id_list: Option<Vec<i32>>,
    pub add_image_url_list: Option<Vec<String>>,
    pub delete_goods_image_id_list: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Copy)]
pub struct GetGoodsListParams {
    pub limit: i64,
    pub offset: i64,
}

/// Trait for goods repository operations
#[async_trait]
pub trait GoodsRepository: Send + Sync {
    /// `None` when the listing is missing or has no category association
    async fn get_goods(&self, goods_id: i32) -> Result<Option<GoodsDetailModel>, StoreError>;
    /// Newest listings first
    async fn get_goods_list(&self, params: GetGoodsListParams)
        -> Result<Vec<GoodsModel>, StoreError>;
    /// Newest images first, ties broken by id
    async fn get_goods_image_list(&self, goods_id: i32)
        -> Result<Vec<GoodsImageModel>, StoreError>;
    async fn delete_goods(&self, goods_id: i32) -> Result<(), StoreError>;
    async fn create_goods_tx(
        &self,
        params: CreateGoodsTxParams,
    ) -> Result<CreateGoodsTxResult, StoreError>;
    async fn update_goods_tx(&self, params: UpdateGoodsTxParams) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn get_category_list(&self) -> Result<Vec<CategoryModel>, StoreError>;
}

/// Rows of every table the goods repository touches
#[derive(Debug, Clone, Default)]
struct Tables {
    categories: BTreeMap<i32, CategoryModel>,
    goods: BTreeMap<i32, GoodsModel>,
    goods_categories: BTreeMap<(i32, i32), GoodsCategoryModel>,
    goods_images: BTreeMap<i32, GoodsImageModel>,
    last_goods_id: i32,
    last_goods_image_id: i32,
}

impl Tables {
    fn create_goods(&mut self, params: &CreateGoodsTxParams) -> GoodsModel {
        self.last_goods_id += 1;
        let now = Utc::now();
        let goods = GoodsModel {
            goods_id: self.last_goods_id,
            user_id: params.user_id,
            title: params.title.clone(),
            price: params.price,
            description: params.description.clone(),
            default_image_url: params.default_image_url.clone(),
            created_at: now,
            updated_at: now,
        };
        self.goods.insert(goods.goods_id, goods.clone());
        goods
    }

    fn update_goods(&mut self, params: &UpdateGoodsTxParams) {
        let Some(goods) = self.goods.get_mut(&params.goods_id) else {
            return;
        };
        if let Some(title) = &params.title {
            goods.title = title.clone();
        }
        if let Some(price) = params.price {
            goods.price = price;
        }
        if let Some(description) = &params.description {
            goods.description = description.clone();
        }
        if let Some(default_image_url) = &params.default_image_url {
            goods.default_image_url = default_image_url.clone();
        }
    }

    fn touch_goods(&mut self, goods_id: i32) {
        if let Some(goods) = self.goods.get_mut(&goods_id) {
            goods.updated_at = Utc::now();
        }
    }

    fn create_goods_category(&mut self, goods_id: i32, category_id: i32) -> Result<(), StoreError> {
        if !self.goods.contains_key(&goods_id) {
            return Err(StoreError::foreign_key(GOODS_CATEGORIES_GOODS_ID_FKEY));
        }
        if !self.categories.contains_key(&category_id) {
            return Err(StoreError::foreign_key(GOODS_CATEGORIES_CATEGORY_ID_FKEY));
        }
        if self.goods_categories.contains_key(&(goods_id, category_id)) {
            return Err(StoreError::unique(GOODS_CATEGORIES_PKEY));
        }

        self.goods_categories.insert(
            (goods_id, category_id),
            GoodsCategoryModel {
                goods_id,
                category_id,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn delete_goods_category(&mut self, goods_id: i32, category_id: i32) {
        self.goods_categories.remove(&(goods_id, category_id));
    }

    fn create_goods_image(&mut self, goods_id: i32, image_url: &str) -> Result<(), StoreError> {
        if !self.goods.contains_key(&goods_id) {
            return Err(StoreError::foreign_key(GOODS_IMAGES_GOODS_ID_FKEY));
        }

        self.last_goods_image_id += 1;
        let image = GoodsImageModel {
            goods_image_id: self.last_goods_image_id,
            goods_id,
            image_url: image_url.to_string(),
            created_at: Utc::now(),
        };
        self.goods_images.insert(image.goods_image_id, image);
        Ok(())
    }

    /// Deletes only when the image belongs to `goods_id`
    fn delete_goods_image(&mut self, goods_id: i32, goods_image_id: i32) {
        if self
            .goods_images
            .get(&goods_image_id)
            .is_some_and(|image| image.goods_id == goods_id)
        {
            self.goods_images.remove(&goods_image_id);
        }
    }

    fn goods_image_by_url(&self, goods_id: i32, image_url: &str) -> Option<i32> {
        self.goods_images
            .values()
            .find(|image| image.goods_id == goods_id && image.image_url == image_url)
            .map(|image| image.goods_image_id)
    }

    fn goods_detail(&self, goods_id: i32) -> Option<GoodsDetailModel> {
        let goods = self.goods.get(&goods_id)?;
        let titles: Vec<&str> = self
            .goods_categories
            .range((goods_id, i32::MIN)..=(goods_id, i32::MAX))
            .filter_map(|((_, category_id), _)| self.categories.get(category_id))
            .map(|category| category.title.as_str())
            .collect();

        Some(GoodsDetailModel {
            goods: goods.clone(),
            category_titles: titles.join(","),
        })
    }

    fn goods_image_list(&self, goods_id: i32) -> Vec<GoodsImageModel> {
        let mut images: Vec<GoodsImageModel> = self
            .goods_images
            .values()
            .filter(|image| image.goods_id == goods_id)
            .cloned()
            .collect();
        images.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.goods_image_id.cmp(&a.goods_image_id))
        });
        images
    }

    /// Removes the listing along with the rows that reference it
    fn delete_goods(&mut self, goods_id: i32) {
        self.goods.remove(&goods_id);
        self.goods_categories.retain(|(id, _), _| *id != goods_id);
        self.goods_images.retain(|_, image| image.goods_id != goods_id);
    }
}

/// In-memory implementation of GoodsRepository and CategoryRepository
///
/// Each transactional unit works on a copy of the tables and swaps it in only on
/// success, so a failed unit leaves nothing behind. Writers are serialized by the
/// lock.
#[derive(Default)]
pub struct InMemoryGoodsRepository {
    tables: RwLock<Tables>,
}

impl InMemoryGoodsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository whose category table is pre-populated
    pub fn with_categories(categories: Vec<CategoryModel>) -> Self {
        let tables = Tables {
            categories: categories
                .into_iter()
                .map(|category| (category.category_id, category))
                .collect(),
            ..Tables::default()
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub async fn goods_count(&self) -> usize {
        self.tables.read().await.goods.len()
    }

    async fn transaction<T>(
        &self,
        unit: impl FnOnce(&mut Tables) -> Result<T, StoreError> + Send,
    ) -> Result<T, StoreError> {
        let mut tables = self.tables.write().await;
        let mut working = tables.clone();

        let value = unit(&mut working).map_err(|e| {
            debug!(error = %e, "Rolling back in-memory transaction");
            e
        })?;

        *tables = working;
        Ok(value)
    }
}

#[async_trait]
impl GoodsRepository for InMemoryGoodsRepository {
    #[instrument(skip(self))]
    async fn get_goods(&self, goods_id: i32) -> Result<Option<GoodsDetailModel>, StoreError> {
        Ok(self.tables.read().await.goods_detail(goods_id))
    }

    #[instrument(skip(self))]
    async fn get_goods_list(
        &self,
        params: GetGoodsListParams,
    ) -> Result<Vec<GoodsModel>, StoreError> {
        let tables = self.tables.read().await;
        let offset = usize::try_from(params.offset).unwrap_or_default();
        let limit = usize::try_from(params.limit).unwrap_or_default();

        Ok(tables
            .goods
            .values()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn get_goods_image_list(
        &self,
        goods_id: i32,
    ) -> Result<Vec<GoodsImageModel>, StoreError> {
        Ok(self.tables.read().await.goods_image_list(goods_id))
    }

    #[instrument(skip(self))]
    async fn delete_goods(&self, goods_id: i32) -> Result<(), StoreError> {
        self.tables.write().await.delete_goods(goods_id);
        debug!(goods_id, "Goods deleted from memory");
        Ok(())
    }

    #[instrument(skip(self, params), fields(user_id = params.user_id))]
    async fn create_goods_tx(
        &self,
        params: CreateGoodsTxParams,
    ) -> Result<CreateGoodsTxResult, StoreError> {
        self.transaction(|tables| {
            let goods = tables.create_goods(&params);

            for &category_id in &params.category_id_list {
                tables.create_goods_category(goods.goods_id, category_id)?;
            }
            for image_url in params.image_url_list.iter().flatten() {
                tables.create_goods_image(goods.goods_id, image_url)?;
            }
            tables.touch_goods(goods.goods_id);

            let detail = tables.goods_detail(goods.goods_id).ok_or_else(|| {
                warn!(goods_id = goods.goods_id, "Created goods is missing");
                StoreError::Database("created goods is missing".to_string())
            })?;

            Ok(CreateGoodsTxResult {
                goods_image_list: tables.goods_image_list(goods.goods_id),
                goods: detail,
            })
        })
        .await
    }

    #[instrument(skip(self, params), fields(goods_id = params.goods_id))]
    async fn update_goods_tx(&self, params: UpdateGoodsTxParams) -> Result<(), StoreError> {
        self.transaction(|tables| {
            let goods_id = params.goods_id;
            tables.update_goods(&params);

            if let Some(default_image_url) = &params.default_image_url {
                if let Some(goods_image_id) = tables.goods_image_by_url(goods_id, default_image_url)
                {
                    tables.delete_goods_image(goods_id, goods_image_id);
                }
            }

            for &category_id in params.add_category_id_list.iter().flatten() {
                tables.create_goods_category(goods_id, category_id)?;
            }
            for &category_id in params.delete_category_id_list.iter().flatten() {
                tables.delete_goods_category(goods_id, category_id);
            }

            for image_url in params.add_image_url_list.iter().flatten() {
                tables.create_goods_image(goods_id, image_url)?;
            }
            for &goods_image_id in params.delete_goods_image_id_list.iter().flatten() {
                tables.delete_goods_image(goods_id, goods_image_id);
            }

            tables.touch_goods(goods_id);
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl CategoryRepository for InMemoryGoodsRepository {
    #[instrument(skip(self))]
    async fn get_category_list(&self) -> Result<Vec<CategoryModel>, StoreError> {
        Ok(self.tables.read().await.categories.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::test_categories;

    fn repo() -> InMemoryGoodsRepository {
        InMemoryGoodsRepository::with_categories(test_categories())
    }

    fn create_params(category_id_list: Vec<i32>) -> CreateGoodsTxParams {
        CreateGoodsTxParams {
            user_id: 5,
            title: "desk".to_string(),
            price: 3000,
            description: "solid oak".to_string(),
            default_image_url: "a.png".to_string(),
            category_id_list,
            image_url_list: Some(vec!["a.png".to_string(), "b.png".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_create_goods_tx() {
        let repo = repo();

        let result = repo.create_goods_tx(create_params(vec![1, 2])).await.unwrap();
        assert_eq!(result.goods.goods.user_id, 5);
        assert_eq!(
            result.goods.category_title_list(),
            vec!["digital", "furniture"]
        );
        assert_eq!(result.goods_image_list.len(), 2);
        // Newest first
        assert_eq!(result.goods_image_list[0].image_url, "b.png");
    }

    #[tokio::test]
    async fn test_create_goods_tx_rolls_back_on_missing_category() {
        let repo = repo();

        let err = repo
            .create_goods_tx(create_params(vec![1, 99]))
            .await
            .unwrap_err();
        assert!(err.is_foreign_key_violation(GOODS_CATEGORIES_CATEGORY_ID_FKEY));

        assert_eq!(repo.goods_count().await, 0);
        assert!(repo.get_goods(1).await.unwrap().is_none());
        assert!(repo.get_goods_image_list(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_goods_without_category_stays_visible() {
        let repo = repo();
        repo.create_goods_tx(create_params(vec![1])).await.unwrap();

        repo.update_goods_tx(UpdateGoodsTxParams {
            goods_id: 1,
            delete_category_id_list: Some(vec![1]),
            ..Default::default()
        })
        .await
        .unwrap();

        let goods = repo.get_goods(1).await.unwrap().unwrap();
        assert_eq!(goods.goods.title, "desk");
        assert!(goods.category_title_list().is_empty());

        repo.delete_goods(1).await.unwrap();
        assert_eq!(repo.goods_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_duplicate_category_rolls_back() {
        let repo = repo();
        repo.create_goods_tx(create_params(vec![1])).await.unwrap();

        let err = repo
            .update_goods_tx(UpdateGoodsTxParams {
                goods_id: 1,
                title: Some("renamed".to_string()),
                add_category_id_list: Some(vec![2, 1]),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_unique_violation(GOODS_CATEGORIES_PKEY));

        let goods = repo.get_goods(1).await.unwrap().unwrap();
        assert_eq!(goods.goods.title, "desk");
        assert_eq!(goods.category_title_list(), vec!["digital"]);
    }

    #[tokio::test]
    async fn test_add_then_delete_same_category_is_noop() {
        let repo = repo();
        repo.create_goods_tx(create_params(vec![1])).await.unwrap();

        repo.update_goods_tx(UpdateGoodsTxParams {
            goods_id: 1,
            add_category_id_list: Some(vec![3]),
            delete_category_id_list: Some(vec![3]),
            ..Default::default()
        })
        .await
        .unwrap();

        let goods = repo.get_goods(1).await.unwrap().unwrap();
        assert_eq!(goods.category_title_list(), vec!["digital"]);
    }

    #[tokio::test]
    async fn test_image_delete_scoped_to_goods() {
        let repo = repo();
        let first = repo.create_goods_tx(create_params(vec![1])).await.unwrap();
        repo.create_goods_tx(create_params(vec![1])).await.unwrap();

        let foreign_image_id = first.goods_image_list[0].goods_image_id;
        repo.update_goods_tx(UpdateGoodsTxParams {
            goods_id: 2,
            delete_goods_image_id_list: Some(vec![foreign_image_id]),
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(repo.get_goods_image_list(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_goods_cascades() {
        let repo = repo();
        repo.create_goods_tx(create_params(vec![1, 2])).await.unwrap();

        repo.delete_goods(1).await.unwrap();

        assert!(repo.get_goods(1).await.unwrap().is_none());
        assert!(repo.get_goods_image_list(1).await.unwrap().is_empty());
        assert_eq!(repo.goods_count().await, 0);
    }

    #[tokio::test]
    async fn test_get_goods_list_pagination() {
        let repo = repo();
        for _ in 0..12 {
            repo.create_goods_tx(create_params(vec![1])).await.unwrap();
        }

        let first_page = repo
            .get_goods_list(GetGoodsListParams {
                limit: 10,
                offset: 0,
            })
            .await
            .unwrap();
        assert_eq!(first_page.len(), 10);
        assert_eq!(first_page[0].goods_id, 12);

        let second_page = repo
            .get_goods_list(GetGoodsListParams {
                limit: 10,
                offset: 10,
            })
            .await
            .unwrap();
        let ids: Vec<i32> = second_page.iter().map(|g| g.goods_id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_get_category_list() {
        let categories = repo().get_category_list().await.unwrap();
        let titles: Vec<&str> = categories.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["digital", "furniture", "clothing"]);
    }
}
