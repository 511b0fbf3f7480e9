use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AdminUser;
use crate::models::stats::StatsResponse;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/stats",
    tag = "Admin",
    operation_id = "assetStats",
    summary = "Catalog statistics",
    description = "Asset counts by kind, total downloads and a per-category breakdown.",
    responses(
        (status = 200, description = "Statistics", body = StatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, UNAUTHORIZED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, admin), fields(user_id = %admin.0.user_id))]
pub async fn stats(
    admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    Ok(Json(state.assets.stats().await?))
}
