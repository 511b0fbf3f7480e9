use serde::Serialize;

/// Identity of the caller as carried by their credential.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    /// User ID assigned by the identity provider.
    #[schema(example = "user_2x9")]
    pub user_id: String,
    /// Role claim.
    #[schema(example = "admin")]
    pub role: String,
    /// Whether the role grants asset management.
    pub is_admin: bool,
}
