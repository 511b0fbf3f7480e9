use axum::Json;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::auth::MeResponse;

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "getCurrentUser",
    summary = "Get current user",
    description = "Returns the identity carried by the bearer token.",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user), fields(user_id = %auth_user.user_id))]
pub async fn me(auth_user: AuthUser) -> Result<Json<MeResponse>, AppError> {
    Ok(Json(MeResponse {
        is_admin: auth_user.is_admin(),
        user_id: auth_user.user_id,
        role: auth_user.role,
    }))
}
