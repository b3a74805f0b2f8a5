// Public API - what other modules can use
pub use handlers::{
    create_goods, delete_goods, get_category_list, get_goods, get_goods_list, update_goods,
};
pub use models::{
    CategoryModel, GoodsCategoryModel, GoodsDetailModel, GoodsImageModel, GoodsModel,
};
pub use postgres::PostgresGoodsRepository;
pub use repository::{
    CategoryRepository, CreateGoodsTxParams, CreateGoodsTxResult, GetGoodsListParams,
    GoodsRepository, InMemoryGoodsRepository, UpdateGoodsTxParams,
};
pub use service::GoodsService;
pub use types::{
    CategoryListResponse, CreateGoodsRequest, GoodsListQuery, GoodsListResponse, GoodsResponse,
    UpdateGoodsRequest,
};

// Internal modules
mod handlers;
pub mod models;
mod postgres;
pub mod repository;
mod service;
mod types;
