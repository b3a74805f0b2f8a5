use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument, warn};

use super::models::{CategoryModel, GoodsDetailModel, GoodsImageModel, GoodsModel};
use super::repository::{
    CategoryRepository, CreateGoodsTxParams, CreateGoodsTxResult, GetGoodsListParams,
    GoodsRepository, UpdateGoodsTxParams,
};
use crate::store::{finish_tx, StoreError};

const GOODS_COLUMNS: &str = "goods_id, user_id, title, price, description, default_image_url, \
    created_at, updated_at";
const GOODS_IMAGE_COLUMNS: &str = "goods_image_id, goods_id, image_url, created_at";

/// A listing with no category association reads back with empty titles
const GET_GOODS: &str = "SELECT g.goods_id, g.user_id, g.title, g.price, g.description, \
    g.default_image_url, g.created_at, g.updated_at, \
    COALESCE(string_agg(c.title, ',' ORDER BY c.category_id), '') AS category_titles \
    FROM goods g \
    LEFT JOIN goods_categories gc ON gc.goods_id = g.goods_id \
    LEFT JOIN categories c ON c.category_id = gc.category_id \
    WHERE g.goods_id = $1 \
    GROUP BY g.goods_id";

/// PostgreSQL implementation of goods and category repositories
pub struct PostgresGoodsRepository {
    pool: PgPool,
}

impl PostgresGoodsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Transaction-scoped steps. Each runs on the connection owned by the caller's transaction.

async fn fetch_goods(
    conn: &mut PgConnection,
    goods_id: i32,
) -> Result<Option<GoodsDetailModel>, StoreError> {
    let goods = sqlx::query_as::<_, GoodsDetailModel>(GET_GOODS)
        .bind(goods_id)
        .fetch_optional(conn)
        .await?;
    Ok(goods)
}

async fn fetch_goods_image_list(
    conn: &mut PgConnection,
    goods_id: i32,
) -> Result<Vec<GoodsImageModel>, StoreError> {
    let query = format!(
        "SELECT {GOODS_IMAGE_COLUMNS} FROM goods_images WHERE goods_id = $1 \
         ORDER BY created_at DESC, goods_image_id DESC"
    );
    let images = sqlx::query_as::<_, GoodsImageModel>(&query)
        .bind(goods_id)
        .fetch_all(conn)
        .await?;
    Ok(images)
}

async fn insert_goods(
    conn: &mut PgConnection,
    params: &CreateGoodsTxParams,
) -> Result<GoodsModel, StoreError> {
    let query = format!(
        "INSERT INTO goods (user_id, title, price, description, default_image_url) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {GOODS_COLUMNS}"
    );
    let goods = sqlx::query_as::<_, GoodsModel>(&query)
        .bind(params.user_id)
        .bind(&params.title)
        .bind(params.price)
        .bind(&params.description)
        .bind(&params.default_image_url)
        .fetch_one(conn)
        .await?;
    Ok(goods)
}

async fn update_goods_scalars(
    conn: &mut PgConnection,
    params: &UpdateGoodsTxParams,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE goods SET \
         title = COALESCE($2, title), \
         price = COALESCE($3, price), \
         description = COALESCE($4, description), \
         default_image_url = COALESCE($5, default_image_url) \
         WHERE goods_id = $1",
    )
    .bind(params.goods_id)
    .bind(params.title.as_deref())
    .bind(params.price)
    .bind(params.description.as_deref())
    .bind(params.default_image_url.as_deref())
    .execute(conn)
    .await?;
    Ok(())
}

async fn touch_goods(conn: &mut PgConnection, goods_id: i32) -> Result<(), StoreError> {
    sqlx::query("UPDATE goods SET updated_at = now() WHERE goods_id = $1")
        .bind(goods_id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn insert_goods_category(
    conn: &mut PgConnection,
    goods_id: i32,
    category_id: i32,
) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO goods_categories (goods_id, category_id) VALUES ($1, $2)")
        .bind(goods_id)
        .bind(category_id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn delete_goods_category(
    conn: &mut PgConnection,
    goods_id: i32,
    category_id: i32,
) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM goods_categories WHERE goods_id = $1 AND category_id = $2")
        .bind(goods_id)
        .bind(category_id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn insert_goods_image(
    conn: &mut PgConnection,
    goods_id: i32,
    image_url: &str,
) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO goods_images (goods_id, image_url) VALUES ($1, $2)")
        .bind(goods_id)
        .bind(image_url)
        .execute(conn)
        .await?;
    Ok(())
}

async fn delete_goods_image(
    conn: &mut PgConnection,
    goods_id: i32,
    goods_image_id: i32,
) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM goods_images WHERE goods_image_id = $1 AND goods_id = $2")
        .bind(goods_image_id)
        .bind(goods_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Locks the image row against concurrent changes until the transaction ends
async fn lock_goods_image_by_url(
    conn: &mut PgConnection,
    goods_id: i32,
    image_url: &str,
) -> Result<Option<GoodsImageModel>, StoreError> {
    let query = format!(
        "SELECT {GOODS_IMAGE_COLUMNS} FROM goods_images \
         WHERE goods_id = $1 AND image_url = $2 \
         FOR NO KEY UPDATE"
    );
    let image = sqlx::query_as::<_, GoodsImageModel>(&query)
        .bind(goods_id)
        .bind(image_url)
        .fetch_optional(conn)
        .await?;
    Ok(image)
}

async fn create_goods_steps(
    conn: &mut PgConnection,
    params: &CreateGoodsTxParams,
) -> Result<CreateGoodsTxResult, StoreError> {
    let goods = insert_goods(&mut *conn, params).await?;

    for &category_id in &params.category_id_list {
        insert_goods_category(&mut *conn, goods.goods_id, category_id).await?;
    }
    for image_url in params.image_url_list.iter().flatten() {
        insert_goods_image(&mut *conn, goods.goods_id, image_url).await?;
    }
    touch_goods(&mut *conn, goods.goods_id).await?;

    let detail = fetch_goods(&mut *conn, goods.goods_id)
        .await?
        .ok_or_else(|| StoreError::Database("created goods is missing".to_string()))?;
    let goods_image_list = fetch_goods_image_list(&mut *conn, goods.goods_id).await?;

    Ok(CreateGoodsTxResult {
        goods: detail,
        goods_image_list,
    })
}

async fn update_goods_steps(
    conn: &mut PgConnection,
    params: &UpdateGoodsTxParams,
) -> Result<(), StoreError> {
    let goods_id = params.goods_id;
    update_goods_scalars(&mut *conn, params).await?;

    if let Some(default_image_url) = &params.default_image_url {
        if let Some(image) = lock_goods_image_by_url(&mut *conn, goods_id, default_image_url).await?
        {
            debug!(goods_image_id = image.goods_image_id, "Removing image promoted to default");
            delete_goods_image(&mut *conn, goods_id, image.goods_image_id).await?;
        }
    }

    for &category_id in params.add_category_id_list.iter().flatten() {
        insert_goods_category(&mut *conn, goods_id, category_id).await?;
    }
    for &category_id in params.delete_category_id_list.iter().flatten() {
        delete_goods_category(&mut *conn, goods_id, category_id).await?;
    }

    for image_url in params.add_image_url_list.iter().flatten() {
        insert_goods_image(&mut *conn, goods_id, image_url).await?;
    }
    for &goods_image_id in params.delete_goods_image_id_list.iter().flatten() {
        delete_goods_image(&mut *conn, goods_id, goods_image_id).await?;
    }

    touch_goods(&mut *conn, goods_id).await
}

#[async_trait]
impl GoodsRepository for PostgresGoodsRepository {
    #[instrument(skip(self))]
    async fn get_goods(&self, goods_id: i32) -> Result<Option<GoodsDetailModel>, StoreError> {
        let goods = sqlx::query_as::<_, GoodsDetailModel>(GET_GOODS)
            .bind(goods_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(goods)
    }

    #[instrument(skip(self))]
    async fn get_goods_list(
        &self,
        params: GetGoodsListParams,
    ) -> Result<Vec<GoodsModel>, StoreError> {
        let query = format!(
            "SELECT {GOODS_COLUMNS} FROM goods ORDER BY goods_id DESC LIMIT $1 OFFSET $2"
        );
        let goods_list = sqlx::query_as::<_, GoodsModel>(&query)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(goods_list)
    }

    #[instrument(skip(self))]
    async fn get_goods_image_list(
        &self,
        goods_id: i32,
    ) -> Result<Vec<GoodsImageModel>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        fetch_goods_image_list(&mut conn, goods_id).await
    }

    #[instrument(skip(self))]
    async fn delete_goods(&self, goods_id: i32) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM goods WHERE goods_id = $1")
            .bind(goods_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, goods_id, "Failed to delete goods");
                StoreError::from(e)
            })?;
        Ok(())
    }

    #[instrument(skip(self, params), fields(user_id = params.user_id))]
    async fn create_goods_tx(
        &self,
        params: CreateGoodsTxParams,
    ) -> Result<CreateGoodsTxResult, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = create_goods_steps(&mut tx, &params).await;
        finish_tx(tx, result).await
    }

    #[instrument(skip(self, params), fields(goods_id = params.goods_id))]
    async fn update_goods_tx(&self, params: UpdateGoodsTxParams) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = update_goods_steps(&mut tx, &params).await;
        finish_tx(tx, result).await
    }
}

#[async_trait]
impl CategoryRepository for PostgresGoodsRepository {
    #[instrument(skip(self))]
    async fn get_category_list(&self) -> Result<Vec<CategoryModel>, StoreError> {
        let categories = sqlx::query_as::<_, CategoryModel>(
            "SELECT category_id, title, created_at, updated_at FROM categories ORDER BY category_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }
}
