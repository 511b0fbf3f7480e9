use std::time::Duration;

use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::entity::asset;

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // Set connection pool options
    opt.max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("assetvault::entity::*")
        .sync(&db)
        .await?;
    ensure_indexes(&db).await;

    Ok(db)
}

/// Create the catalog listing index. Schema sync only knows single-column
/// constraints, so composite indexes are created here.
async fn ensure_indexes(db: &DatabaseConnection) {
    // SELECT … FROM asset WHERE is_premium = ? ORDER BY created_at DESC
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_asset_premium_created")
        .table(asset::Entity)
        .col(asset::Column::IsPremium)
        .col(asset::Column::CreatedAt)
        .to_owned();

    let backend = db.get_database_backend();
    match db.execute_raw(backend.build(&stmt)).await {
        Ok(_) => info!("Ensured index idx_asset_premium_created exists"),
        Err(e) => warn!("Failed to create index idx_asset_premium_created: {}", e),
    }
}
