use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "asset")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub file_url: String,
    pub image_url: Option<String>,
    pub category: String,

    pub is_premium: bool,
    /// Set iff `is_premium`.
    pub price: Option<f64>,
    /// Set iff `is_premium`.
    pub sellix_product_id: Option<String>,

    pub downloads: i64,

    /// Identity of the admin who uploaded the asset.
    pub user_id: String,

    /// SHA-256 key of the content in the file store.
    #[sea_orm(indexed)]
    pub file_hash: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub file_size: i64,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
