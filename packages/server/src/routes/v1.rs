use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/assets", asset_routes(config))
        .nest("/files", file_routes())
        .nest("/admin", admin_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::auth::me))
}

fn asset_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::asset::list_assets,
            handlers::asset::create_asset
        ))
        .routes(routes!(handlers::asset::list_categories))
        .routes(routes!(handlers::asset::featured_assets))
        .routes(routes!(handlers::asset::download_asset))
        .routes(routes!(
            handlers::asset::get_asset,
            handlers::asset::update_asset,
            handlers::asset::delete_asset
        ))
        .layer(handlers::asset::upload_body_limit(&config.storage))
}

fn file_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::file::get_file))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::admin::stats))
}
