use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, ExprTrait, Func, LikeExpr};
use sea_orm::*;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::entity::asset;
use crate::error::AppError;
use crate::models::asset::{AssetChanges, AssetListQuery, PriceTier, ValidatedMetadata};
use crate::models::shared::escape_like;
use crate::models::stats::StatsResponse;

/// Where an uploaded file ended up.
#[derive(Debug, Clone)]
pub struct StoredAssetFile {
    pub url: String,
    pub hash: String,
    pub name: String,
    pub content_type: Option<String>,
    pub size: i64,
}

#[derive(Debug, Clone)]
pub struct NewAsset {
    pub metadata: ValidatedMetadata,
    /// Uploading admin.
    pub user_id: String,
    pub file: StoredAssetFile,
}

/// Data access for assets. Every handler goes through this trait.
#[async_trait]
pub trait AssetRepository: Send + Sync {
    /// Matching assets, newest first.
    async fn list(&self, filter: &AssetListQuery) -> Result<Vec<asset::Model>, AppError>;

    async fn create(&self, new: NewAsset) -> Result<asset::Model, AppError>;

    async fn get(&self, id: Uuid) -> Result<asset::Model, AppError>;

    async fn update(&self, id: Uuid, changes: AssetChanges) -> Result<asset::Model, AppError>;

    /// Remove the record and return what was removed.
    async fn delete(&self, id: Uuid) -> Result<asset::Model, AppError>;

    /// Count one download of a free asset and return its file URL.
    async fn record_download(&self, id: Uuid) -> Result<String, AppError>;

    /// A free asset whose content has the given hash, if any.
    async fn find_free_by_hash(&self, hash: &str) -> Result<Option<asset::Model>, AppError>;

    /// Whether any asset, free or premium, still points at the content.
    async fn file_in_use(&self, hash: &str) -> Result<bool, AppError>;

    /// Distinct lower-cased categories, sorted.
    async fn categories(&self, is_premium: Option<bool>) -> Result<Vec<String>, AppError>;

    /// Most downloaded free assets and newest premium assets.
    async fn featured(
        &self,
        limit: u64,
    ) -> Result<(Vec<asset::Model>, Vec<asset::Model>), AppError>;

    async fn stats(&self) -> Result<StatsResponse, AppError>;
}

pub struct DbAssetRepository {
    db: DatabaseConnection,
}

impl DbAssetRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AssetRepository for DbAssetRepository {
    #[instrument(skip(self))]
    async fn list(&self, filter: &AssetListQuery) -> Result<Vec<asset::Model>, AppError> {
        let mut select =
            asset::Entity::find().filter(asset::Column::IsPremium.eq(filter.is_premium));

        if let Some(ref category) = filter.category {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(asset::Column::Category)))
                    .eq(category.to_lowercase()),
            );
        }
        if let Some(ref search) = filter.search {
            select = select.filter(search_condition(search));
        }
        if let Some(tier) = filter.price_tier {
            select = select.filter(price_tier_condition(tier));
        }

        let assets = select
            .order_by_desc(asset::Column::CreatedAt)
            .order_by_desc(asset::Column::Id)
            .all(&self.db)
            .await?;
        debug!(count = assets.len(), "listed assets");
        Ok(assets)
    }

    #[instrument(skip(self, new), fields(title = %new.metadata.title))]
    async fn create(&self, new: NewAsset) -> Result<asset::Model, AppError> {
        let NewAsset {
            metadata,
            user_id,
            file,
        } = new;
        let now = Utc::now();

        let model = asset::ActiveModel {
            id: Set(Uuid::now_v7()),
            title: Set(metadata.title),
            description: Set(metadata.description),
            file_url: Set(file.url),
            image_url: Set(metadata.image_url),
            category: Set(metadata.category),
            is_premium: Set(metadata.pricing.is_premium()),
            price: Set(metadata.pricing.price()),
            sellix_product_id: Set(metadata.pricing.sellix_product_id()),
            downloads: Set(0),
            user_id: Set(user_id),
            file_hash: Set(file.hash),
            file_name: Set(file.name),
            content_type: Set(file.content_type),
            file_size: Set(file.size),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn get(&self, id: Uuid) -> Result<asset::Model, AppError> {
        find_asset(&self.db, id).await
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: Uuid, changes: AssetChanges) -> Result<asset::Model, AppError> {
        let txn = self.db.begin().await?;

        let existing = find_asset(&txn, id).await?;
        let pricing = changes.pricing_for(&existing)?;
        let mut active: asset::ActiveModel = existing.into();

        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(category) = changes.category {
            active.category = Set(category);
        }
        if let Some(image_url) = changes.image_url {
            active.image_url = Set(image_url);
        }
        if let Some(pricing) = pricing {
            active.is_premium = Set(pricing.is_premium());
            active.price = Set(pricing.price());
            active.sellix_product_id = Set(pricing.sellix_product_id());
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(&txn).await?;
        txn.commit().await?;

        Ok(model)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<asset::Model, AppError> {
        let existing = find_asset(&self.db, id).await?;
        let result = asset::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Asset not found".into()));
        }
        Ok(existing)
    }

    #[instrument(skip(self))]
    async fn record_download(&self, id: Uuid) -> Result<String, AppError> {
        let asset = find_asset(&self.db, id).await?;
        if asset.is_premium {
            return Err(AppError::PremiumAsset);
        }

        let result = asset::Entity::update_many()
            .col_expr(
                asset::Column::Downloads,
                Expr::col(asset::Column::Downloads).add(1),
            )
            .filter(asset::Column::Id.eq(id))
            .filter(asset::Column::IsPremium.eq(false))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            // Deleted or made premium since it was read.
            let current = find_asset(&self.db, id).await?;
            debug!(premium = current.is_premium, "download lost a race");
            return Err(AppError::PremiumAsset);
        }

        Ok(asset.file_url)
    }

    async fn find_free_by_hash(&self, hash: &str) -> Result<Option<asset::Model>, AppError> {
        Ok(asset::Entity::find()
            .filter(asset::Column::FileHash.eq(hash))
            .filter(asset::Column::IsPremium.eq(false))
            .order_by_asc(asset::Column::CreatedAt)
            .one(&self.db)
            .await?)
    }

    async fn file_in_use(&self, hash: &str) -> Result<bool, AppError> {
        let holder = asset::Entity::find()
            .filter(asset::Column::FileHash.eq(hash))
            .one(&self.db)
            .await?;
        Ok(holder.is_some())
    }

    async fn categories(&self, is_premium: Option<bool>) -> Result<Vec<String>, AppError> {
        let mut select = asset::Entity::find()
            .select_only()
            .column(asset::Column::Category)
            .distinct();
        if let Some(is_premium) = is_premium {
            select = select.filter(asset::Column::IsPremium.eq(is_premium));
        }

        let rows: Vec<String> = select.into_tuple().all(&self.db).await?;
        let unique: BTreeSet<String> = rows.into_iter().map(|c| c.to_lowercase()).collect();
        Ok(unique.into_iter().collect())
    }

    async fn featured(
        &self,
        limit: u64,
    ) -> Result<(Vec<asset::Model>, Vec<asset::Model>), AppError> {
        let free = asset::Entity::find()
            .filter(asset::Column::IsPremium.eq(false))
            .order_by_desc(asset::Column::Downloads)
            .order_by_desc(asset::Column::CreatedAt)
            .limit(Some(limit))
            .all(&self.db)
            .await?;

        let premium = asset::Entity::find()
            .filter(asset::Column::IsPremium.eq(true))
            .order_by_desc(asset::Column::CreatedAt)
            .order_by_desc(asset::Column::Id)
            .limit(Some(limit))
            .all(&self.db)
            .await?;

        Ok((free, premium))
    }

    async fn stats(&self) -> Result<StatsResponse, AppError> {
        let rows: Vec<(String, bool, i64)> = asset::Entity::find()
            .select_only()
            .column(asset::Column::Category)
            .column(asset::Column::IsPremium)
            .column(asset::Column::Downloads)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(StatsResponse::from_rows(rows))
    }
}

async fn find_asset<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<asset::Model, AppError> {
    asset::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Asset not found".into()))
}

/// Case-insensitive substring match on title or description.
fn search_condition(term: &str) -> Condition {
    let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
    let matches = |column: asset::Column| {
        Expr::expr(Func::lower(Expr::col(column)))
            .like(LikeExpr::new(pattern.clone()).escape('\\'))
    };

    Condition::any()
        .add(matches(asset::Column::Title))
        .add(matches(asset::Column::Description))
}

/// Unpriced (free) assets never fall into a tier.
fn price_tier_condition(tier: PriceTier) -> Condition {
    let price = asset::Column::Price;
    let bound = match tier {
        PriceTier::Under20 => price.lt(20.0),
        PriceTier::From20To50 => price.between(20.0, 50.0),
        PriceTier::Over50 => price.gt(50.0),
    };
    Condition::all().add(price.is_not_null()).add(bound)
}
