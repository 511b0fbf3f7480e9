use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use storage::FileKey;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::entity::asset;
use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/{hash}",
    tag = "Files",
    operation_id = "getFile",
    summary = "Fetch the content of a free asset",
    description = "Streams stored bytes by content hash. Supports ETag-based caching via \
        If-None-Match. Content that belongs to no free asset is not served.",
    params(("hash" = String, Path, description = "SHA-256 content hash (hex)")),
    responses(
        (status = 200, description = "File content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn get_file(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound("File not found".into());

    let key: FileKey = hash.parse().map_err(|_| not_found())?;
    let asset = state
        .assets
        .find_free_by_hash(&key.to_hex())
        .await?
        .ok_or_else(not_found)?;

    build_file_response(&asset, key, &headers, &state).await
}

/// Build a streaming response for the content of `asset`.
async fn build_file_response(
    asset: &asset::Model,
    key: FileKey,
    headers: &HeaderMap,
    state: &AppState,
) -> Result<Response, AppError> {
    let etag_value = format!("\"{}\"", asset.file_hash);
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let reader = state.files.open(&key).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let content_type = asset
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, asset.file_size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&asset.file_name),
        )
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "public, max-age=86400, immutable")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987
/// `filename*` for the uploaded name.
fn content_disposition_value(filename: &str) -> String {
    let ascii_name: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_name.is_empty() {
        "download".to_string()
    } else {
        ascii_name
    };

    let mut encoded = String::with_capacity(filename.len());
    for b in filename.bytes() {
        if b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b) {
            encoded.push(b as char);
        } else {
            encoded.push_str(&format!("%{b:02X}"));
        }
    }

    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
