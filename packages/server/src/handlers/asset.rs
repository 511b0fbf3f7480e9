use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use storage::{BoxReader, FileKey, FileStore, StoredFile};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AdminUser;
use crate::extractors::json::AppJson;
use crate::extractors::query::AppQuery;
use crate::models::asset::{
    AssetListQuery, AssetMetadata, AssetResponse, CategoryQuery, DeleteResponse,
    DownloadResponse, FeaturedQuery, FeaturedResponse, UpdateAssetRequest, validate_metadata,
    validate_update,
};
use crate::repository::{AssetRepository, NewAsset, StoredAssetFile};
use crate::state::AppState;

/// Multipart overhead allowed on top of the configured file size.
const FORM_OVERHEAD: usize = 1024 * 1024;

pub fn upload_body_limit(storage: &StorageConfig) -> DefaultBodyLimit {
    let max = usize::try_from(storage.max_file_size).unwrap_or(usize::MAX);
    DefaultBodyLimit::max(max.saturating_add(FORM_OVERHEAD))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Assets",
    operation_id = "listAssets",
    summary = "List assets",
    description = "Returns the free assets, or the premium ones with `isPremium=true`, newest \
        first. `category` is matched case-insensitively; the other filters are optional.",
    params(AssetListQuery),
    responses(
        (status = 200, description = "Matching assets", body = Vec<AssetResponse>),
        (status = 400, description = "Invalid filter value (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_assets(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<AssetListQuery>,
) -> Result<Json<Vec<AssetResponse>>, AppError> {
    let assets = state.assets.list(&query.normalized()).await?;
    Ok(Json(assets.into_iter().map(AssetResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Assets",
    operation_id = "createAsset",
    summary = "Upload a new asset",
    description = "Multipart form with a `file` part holding the asset content and a `data` \
        part holding the JSON metadata. Premium assets require `price` and `sellixProductId`; \
        free assets never store them.",
    request_body(content_type = "multipart/form-data", description = "`file` plus JSON `data`"),
    responses(
        (status = 201, description = "Asset created", body = AssetResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, UNAUTHORIZED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, admin, multipart), fields(user_id = %admin.0.user_id))]
pub async fn create_asset(
    admin: AdminUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_upload_form(&mut multipart, &state).await?;
    let UploadForm { file, data } = form;

    let file = match file {
        Some(file) => file,
        None => return Err(AppError::Validation("Missing 'file' field".into())),
    };

    let created = async {
        let data = data.ok_or_else(|| AppError::Validation("Missing 'data' field".into()))?;
        let metadata: AssetMetadata = serde_json::from_str(&data)
            .map_err(|e| AppError::Validation(format!("Invalid asset data: {e}")))?;
        let metadata = validate_metadata(metadata)?;

        let hash = file.stored.key.to_hex();
        state
            .assets
            .create(NewAsset {
                metadata,
                user_id: admin.0.user_id.clone(),
                file: StoredAssetFile {
                    url: state.config.storage.file_url(&hash),
                    hash,
                    name: file.name.clone(),
                    content_type: file.content_type.clone(),
                    size: i64::try_from(file.stored.size).unwrap_or(i64::MAX),
                },
            })
            .await
    }
    .await;

    match created {
        Ok(asset) => {
            info!(asset_id = %asset.id, premium = asset.is_premium, "asset created");
            Ok((StatusCode::CREATED, Json(AssetResponse::from(asset))))
        }
        Err(e) => {
            discard_upload(&state, &file.stored).await;
            Err(e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Assets",
    operation_id = "getAsset",
    summary = "Get an asset",
    params(("id" = String, Path, description = "Asset ID (UUID)")),
    responses(
        (status = 200, description = "Asset", body = AssetResponse),
        (status = 404, description = "Asset not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AssetResponse>, AppError> {
    let asset = state.assets.get(parse_asset_id(&id)?).await?;
    Ok(Json(asset.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Assets",
    operation_id = "updateAsset",
    summary = "Update an asset",
    description = "Partial update. `imageUrl`, `price` and `sellixProductId` accept `null` to \
        clear. Switching an asset to free clears its price and product ID.",
    params(("id" = String, Path, description = "Asset ID (UUID)")),
    request_body = UpdateAssetRequest,
    responses(
        (status = 200, description = "Updated asset", body = AssetResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Asset not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, admin, payload), fields(user_id = %admin.0.user_id))]
pub async fn update_asset(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateAssetRequest>,
) -> Result<Json<AssetResponse>, AppError> {
    let id = parse_asset_id(&id)?;
    let changes = validate_update(payload)?;

    let asset = if changes.is_empty() {
        state.assets.get(id).await?
    } else {
        state.assets.update(id, changes).await?
    };

    Ok(Json(asset.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Assets",
    operation_id = "deleteAsset",
    summary = "Delete an asset",
    description = "Permanently removes the asset record. The stored file goes with it unless \
        another asset shares the same content.",
    params(("id" = String, Path, description = "Asset ID (UUID)")),
    responses(
        (status = 200, description = "Asset deleted", body = DeleteResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Asset not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, admin), fields(user_id = %admin.0.user_id))]
pub async fn delete_asset(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = parse_asset_id(&id)?;
    let removed = state.assets.delete(id).await?;
    info!(asset_id = %id, "asset deleted");
    match removed.file_hash.parse::<FileKey>() {
        Ok(key) => release_file(&*state.assets, &*state.files, &key).await,
        Err(e) => warn!(asset_id = %id, error = %e, "stored file hash is unreadable"),
    }
    Ok(Json(DeleteResponse { success: true }))
}

#[utoipa::path(
    get,
    path = "/download/{id}",
    tag = "Assets",
    operation_id = "downloadAsset",
    summary = "Download a free asset",
    description = "Counts one download and returns the file URL. Premium assets are refused \
        and their counter is left untouched.",
    params(("id" = String, Path, description = "Asset ID (UUID)")),
    responses(
        (status = 200, description = "Download URL", body = DownloadResponse),
        (status = 403, description = "Premium asset (PREMIUM_ASSET)", body = ErrorBody),
        (status = 404, description = "Asset not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn download_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DownloadResponse>, AppError> {
    let download_url = state.assets.record_download(parse_asset_id(&id)?).await?;
    Ok(Json(DownloadResponse { download_url }))
}

#[utoipa::path(
    get,
    path = "/categories",
    tag = "Assets",
    operation_id = "listCategories",
    summary = "List categories in use",
    description = "Sorted, de-duplicated, lower-cased categories, optionally restricted to free \
        or premium assets.",
    params(CategoryQuery),
    responses(
        (status = 200, description = "Categories", body = Vec<String>),
        (status = 400, description = "Invalid filter value (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_categories(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CategoryQuery>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.assets.categories(query.is_premium).await?))
}

#[utoipa::path(
    get,
    path = "/featured",
    tag = "Assets",
    operation_id = "featuredAssets",
    summary = "Featured assets",
    description = "The most downloaded free assets and the newest premium assets.",
    params(FeaturedQuery),
    responses(
        (status = 200, description = "Featured assets", body = FeaturedResponse),
        (status = 400, description = "Invalid limit (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn featured_assets(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<FeaturedQuery>,
) -> Result<Json<FeaturedResponse>, AppError> {
    let (free, premium) = state.assets.featured(query.limit()?).await?;
    Ok(Json(FeaturedResponse {
        free: free.into_iter().map(AssetResponse::from).collect(),
        premium: premium.into_iter().map(AssetResponse::from).collect(),
    }))
}

/// No record can carry an ID that is not a UUID.
fn parse_asset_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::NotFound("Asset not found".into()))
}

struct UploadedFile {
    stored: StoredFile,
    name: String,
    content_type: Option<String>,
}

#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    data: Option<String>,
}

/// Read the `file` and `data` parts. A stored file is discarded again if the
/// form turns out to be unusable.
async fn read_upload_form(
    multipart: &mut Multipart,
    state: &AppState,
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    if let Err(e) = fill_upload_form(multipart, state, &mut form).await {
        if let Some(ref file) = form.file {
            discard_upload(state, &file.stored).await;
        }
        return Err(e);
    }
    Ok(form)
}

async fn fill_upload_form(
    multipart: &mut Multipart,
    state: &AppState,
    form: &mut UploadForm,
) -> Result<(), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("file") => {
                if form.file.is_some() {
                    return Err(AppError::Validation("Only one 'file' field is allowed".into()));
                }
                let name = field
                    .file_name()
                    .map(base_name)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| {
                        AppError::Validation("File field must have a filename".into())
                    })?;
                let content_type = mime_guess::from_path(&name)
                    .first()
                    .map(|m| m.to_string())
                    .or_else(|| field.content_type().map(str::to_owned));

                let stored = stream_field_to_store(
                    field,
                    &*state.files,
                    state.config.storage.max_file_size,
                )
                .await?;
                form.file = Some(UploadedFile {
                    stored,
                    name,
                    content_type,
                });
            }
            Some("data") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read data: {e}")))?;
                form.data = Some(text);
            }
            _ => {} // Ignore unknown fields.
        }
    }
    Ok(())
}

/// Last component of a client-supplied path.
fn base_name(file_name: &str) -> String {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim()
        .to_string()
}

/// Stream a multipart field to the file store via a temp file.
async fn stream_field_to_store(
    mut field: axum::extract::multipart::Field<'_>,
    files: &dyn FileStore,
    max_size: u64,
) -> Result<StoredFile, AppError> {
    let temp_path = std::env::temp_dir().join(format!("assetvault-upload-{}", Uuid::new_v4()));

    let result = async {
        let mut temp_file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?;

        let mut total_size: u64 = 0;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            total_size += chunk.len() as u64;
            if total_size > max_size {
                return Err(AppError::Validation(format!(
                    "File exceeds maximum size of {max_size} bytes"
                )));
            }
            temp_file
                .write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Temp file write failed: {e}")))?;
        }

        if total_size == 0 {
            return Err(AppError::Validation("File is empty".into()));
        }

        temp_file
            .flush()
            .await
            .map_err(|e| AppError::Internal(format!("Temp file flush failed: {e}")))?;
        drop(temp_file);

        let file = tokio::fs::File::open(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {e}")))?;
        let reader: BoxReader = Box::new(file);
        Ok(files.put_stream(reader).await?)
    }
    .await;

    // Best effort.
    let _ = tokio::fs::remove_file(&temp_path).await;

    result
}

/// Remove bytes stored by a failed upload. Content that was already present
/// belongs to another asset and stays.
async fn discard_upload(state: &AppState, stored: &StoredFile) {
    if stored.fresh {
        release_file(&*state.assets, &*state.files, &stored.key).await;
    }
}

/// Remove a stored file once no asset row points at it. Failures are logged
/// and leave the file in place.
async fn release_file(assets: &dyn AssetRepository, files: &dyn FileStore, key: &FileKey) {
    match assets.file_in_use(&key.to_hex()).await {
        Ok(true) => debug!(%key, "file still referenced"),
        Ok(false) => match files.remove(key).await {
            Ok(removed) => debug!(%key, removed, "released file"),
            Err(e) => warn!(%key, error = %e, "failed to remove file"),
        },
        Err(e) => warn!(%key, error = ?e, "could not check file references"),
    }
}
