//! HTTP API for the model repository
//!
//! Thin plumbing over the Repository façade: multipart upload, per-file
//! download, version listing, and metadata patching. The repository handle
//! is injected as shared axum state; there is no module-level instance.

use crate::manifest::{Manifest, ManifestError};
use crate::repository::{Repository, RepositoryError, UploadOptions};
use crate::store::ContentHash;
use crate::version::Version;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{Cursor, Read};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Uniform response envelope
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub manifest_cid: ContentHash,
    pub version: Version,
}

#[derive(Serialize)]
pub struct ManifestResponse {
    pub manifest_cid: ContentHash,
    pub manifest: Manifest,
}

#[derive(Serialize)]
pub struct ModelSummary {
    pub model_id: String,
    pub version: Version,
    pub manifest_cid: ContentHash,
    pub total_size: u64,
    pub created_at: DateTime<Utc>,
    pub release_notes: Option<String>,
}

#[derive(Serialize)]
pub struct VersionsResponse {
    pub versions: Vec<Version>,
}

#[derive(Serialize)]
pub struct LatestResponse {
    pub latest_version: Version,
}

#[derive(Serialize)]
pub struct PatchResponse {
    pub manifest_cid: ContentHash,
}

/// Build the API router over a shared repository handle
pub fn router(repo: Arc<Repository>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/models", get(list_models))
        .route("/api/models/{model_id}/upload", post(upload_model))
        .route("/api/models/{model_id}/versions", get(list_versions))
        .route("/api/models/{model_id}/latest", get(get_latest))
        .route(
            "/api/models/{model_id}/versions/{version}/manifest",
            get(get_manifest),
        )
        .route(
            "/api/models/{model_id}/versions/{version}/files/{filename}",
            get(download_file),
        )
        .route(
            "/api/models/{model_id}/versions/{version}/metadata",
            patch(update_metadata),
        )
        .layer(CorsLayer::permissive())
        .with_state(repo)
}

fn status_for(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::VersionNotFound { .. }
        | RepositoryError::NoVersionsAvailable(_)
        | RepositoryError::FileNotFound { .. } => StatusCode::NOT_FOUND,
        RepositoryError::Manifest(ManifestError::MissingCarryForwardSource(_)) => {
            StatusCode::BAD_REQUEST
        }
        RepositoryError::InvalidManifest { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn repo_error<T>(err: RepositoryError) -> (StatusCode, Json<ApiResponse<T>>) {
    log::warn!("request failed: {}", err);
    (status_for(&err), Json(ApiResponse::error(err.to_string())))
}

fn bad_request<T>(message: String) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message)))
}

fn parse_version<T>(s: &str) -> Result<Version, (StatusCode, Json<ApiResponse<T>>)> {
    s.parse()
        .map_err(|_| bad_request(format!("invalid version: {:?}", s)))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Upload a new version of a model.
///
/// Multipart fields: any number of file parts (named by their filename),
/// plus optional `release_notes`, `major_version` ("true"/"false"), and
/// `carry_forward` (JSON map of prior filename to new filename).
async fn upload_model(
    State(repo): State<Arc<Repository>>,
    Path(model_id): Path<String>,
    mut multipart: Multipart,
) -> (StatusCode, Json<ApiResponse<UploadResponse>>) {
    let mut file_parts: Vec<(String, Vec<u8>)> = Vec::new();
    let mut options = UploadOptions::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return bad_request(format!("malformed multipart body: {}", e)),
        };

        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("release_notes") => match field.text().await {
                Ok(text) => options.release_notes = Some(text),
                Err(e) => return bad_request(format!("bad release_notes field: {}", e)),
            },
            Some("major_version") => match field.text().await {
                Ok(text) => options.force_major_bump = text.trim() == "true" || text.trim() == "1",
                Err(e) => return bad_request(format!("bad major_version field: {}", e)),
            },
            Some("carry_forward") => {
                let text = match field.text().await {
                    Ok(text) => text,
                    Err(e) => return bad_request(format!("bad carry_forward field: {}", e)),
                };
                options.carry_forward = match serde_json::from_str(&text) {
                    Ok(map) => map,
                    Err(e) => return bad_request(format!("carry_forward is not a JSON map: {}", e)),
                };
            }
            _ => {
                let filename = match field.file_name().map(str::to_string) {
                    Some(name) if !name.is_empty() => name,
                    _ => return bad_request("file part without a filename".to_string()),
                };
                match field.bytes().await {
                    Ok(bytes) => file_parts.push((filename, bytes.to_vec())),
                    Err(e) => return bad_request(format!("failed reading file part: {}", e)),
                }
            }
        }
    }

    if file_parts.is_empty() && options.carry_forward.is_empty() {
        return bad_request("upload needs at least one file or carry-forward entry".to_string());
    }

    let new_files: Vec<(String, Box<dyn Read + Send>)> = file_parts
        .into_iter()
        .map(|(name, bytes)| (name, Box::new(Cursor::new(bytes)) as Box<dyn Read + Send>))
        .collect();

    match repo.upload(&model_id, new_files, options) {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::success(UploadResponse {
                manifest_cid: outcome.manifest_hash,
                version: outcome.version,
            })),
        ),
        Err(e) => repo_error(e),
    }
}

/// List every model at its latest version
async fn list_models(
    State(repo): State<Arc<Repository>>,
) -> (StatusCode, Json<ApiResponse<Vec<ModelSummary>>>) {
    match repo.all_latest() {
        Ok(latest) => {
            let summaries = latest
                .into_iter()
                .map(|p| ModelSummary {
                    model_id: p.manifest.model_id,
                    version: p.manifest.version,
                    manifest_cid: p.hash,
                    total_size: p.manifest.total_size,
                    created_at: p.manifest.created_at,
                    release_notes: p.manifest.release_notes,
                })
                .collect();
            (StatusCode::OK, Json(ApiResponse::success(summaries)))
        }
        Err(e) => repo_error(e),
    }
}

async fn list_versions(
    State(repo): State<Arc<Repository>>,
    Path(model_id): Path<String>,
) -> (StatusCode, Json<ApiResponse<VersionsResponse>>) {
    match repo.list_versions(&model_id) {
        Ok(versions) => (
            StatusCode::OK,
            Json(ApiResponse::success(VersionsResponse { versions })),
        ),
        Err(e) => repo_error(e),
    }
}

async fn get_latest(
    State(repo): State<Arc<Repository>>,
    Path(model_id): Path<String>,
) -> (StatusCode, Json<ApiResponse<LatestResponse>>) {
    match repo.get_latest_version(&model_id) {
        Ok(latest_version) => (
            StatusCode::OK,
            Json(ApiResponse::success(LatestResponse { latest_version })),
        ),
        Err(e) => repo_error(e),
    }
}

async fn get_manifest(
    State(repo): State<Arc<Repository>>,
    Path((model_id, version)): Path<(String, String)>,
) -> (StatusCode, Json<ApiResponse<ManifestResponse>>) {
    let version = match parse_version(&version) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match repo.get_manifest(&model_id, version) {
        Ok(pinned) => (
            StatusCode::OK,
            Json(ApiResponse::success(ManifestResponse {
                manifest_cid: pinned.hash,
                manifest: pinned.manifest,
            })),
        ),
        Err(e) => repo_error(e),
    }
}

/// Stream one file of one version as raw bytes
async fn download_file(
    State(repo): State<Arc<Repository>>,
    Path((model_id, version, filename)): Path<(String, String, String)>,
) -> Response {
    let version = match parse_version::<()>(&version) {
        Ok(v) => v,
        Err(resp) => return resp.into_response(),
    };

    match repo.download_file(&model_id, version, &filename) {
        Ok(bytes) => (
            [
                (
                    header::CONTENT_TYPE,
                    "application/octet-stream".to_string(),
                ),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => repo_error::<()>(e).into_response(),
    }
}

async fn update_metadata(
    State(repo): State<Arc<Repository>>,
    Path((model_id, version)): Path<(String, String)>,
    Json(patch): Json<serde_json::Map<String, serde_json::Value>>,
) -> (StatusCode, Json<ApiResponse<PatchResponse>>) {
    let version = match parse_version(&version) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match repo.update_metadata(&model_id, version, patch) {
        Ok(manifest_cid) => (
            StatusCode::OK,
            Json(ApiResponse::success(PatchResponse { manifest_cid })),
        ),
        Err(e) => repo_error(e),
    }
}
