use std::path::Path as FsPath;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Json;
use axum::extract::{FromRequestParts, Multipart, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::ai::mime_for_path;
use crate::auth::{INVALID_TOKEN, bearer_token_bytes};
use crate::constants::pagination::DEFAULT_LIMIT;
use crate::report::render_markdown;
use crate::storage::{Database, SharedDatabase};
use crate::types::{AnalysisResult, Inspection, InspectionStatus, NewInspection, QcError};

pub const ANALYSIS_UNAVAILABLE: &str = "Analysis Service not available. Check server logs.";

/// User id resolved from the bearer token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ApiResult<Self> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .map(HeaderValue::as_bytes);
        let token = bearer_token_bytes(header)?;

        match state.verifier.verify(token).await {
            Ok(user_id) => Ok(CurrentUser(user_id)),
            Err(err) => {
                debug!(verifier = state.verifier.name(), error = %err, "Token rejected");
                Err(QcError::Auth(INVALID_TOKEN.to_string()).into())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    skip: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// Run blocking database work off the async workers
async fn with_db<F, T>(db: &SharedDatabase, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> crate::types::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = Arc::clone(db);
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| QcError::Storage(format!("Database task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Fetch an inspection the caller owns
async fn owned_inspection(
    state: &AppState,
    id: i64,
    user_id: &str,
    forbidden: &str,
) -> ApiResult<Inspection> {
    let inspection = with_db(&state.db, move |db| db.get_inspection(id))
        .await?
        .ok_or_else(|| QcError::NotFound("Inspection not found".to_string()))?;

    if !inspection.is_owned_by(user_id) {
        return Err(QcError::Forbidden(forbidden.to_string()).into());
    }
    Ok(inspection)
}

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let database = with_db(&state.db, |db| db.connection().map(|_| ()))
        .await
        .is_ok();

    Json(json!({
        "message": "Quality Control Inspector API is running",
        "health": "/health",
        "env_check": {
            "database": if database { "OK" } else { "Failed" },
            "analysis_service": if state.analysis.is_some() {
                "OK"
            } else {
                "Failed (check GOOGLE_API_KEY)"
            },
            "base_url": &*state.base_url,
        }
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Store an uploaded image, analyze it and persist the outcome
pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<Json<Inspection>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let file_name = field.file_name().map(String::from);
            let bytes = field.bytes().await?;
            upload = Some((file_name, bytes));
            break;
        }
    }
    let (file_name, bytes) =
        upload.ok_or_else(|| QcError::Validation("Missing multipart field: file".to_string()))?;

    let stored = state.uploads.save(&bytes, file_name.as_deref()).await?;
    info!(file = %stored, user = %user_id, bytes = bytes.len(), "Upload received");

    let result = match &state.analysis {
        Some(service) => {
            let mime = mime_for_path(FsPath::new(&stored));
            service.analyze_bytes(bytes.to_vec(), mime).await
        }
        None => {
            warn!("Analysis service unavailable, storing failure");
            AnalysisResult::failure(ANALYSIS_UNAVAILABLE)
        }
    };

    let status = if result.is_failed() {
        warn!(error = result.error.as_deref().unwrap_or_default(), "Analysis reported error");
        InspectionStatus::Failed
    } else {
        InspectionStatus::Completed
    };

    let new = NewInspection {
        image_path: stored.clone(),
        analysis_result: Some(result.to_value()),
        status,
        user_id: Some(user_id),
    };

    match with_db(&state.db, move |db| db.insert_inspection(&new)).await {
        Ok(inspection) => Ok(Json(inspection.with_image_url(&state.base_url))),
        Err(err) => {
            if let Err(cleanup) = state.uploads.remove(&stored).await {
                warn!(file = %stored, error = %cleanup, "Failed to clean up upload");
            }
            Err(err)
        }
    }
}

pub async fn my_inspections(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Inspection>>> {
    debug!(user = %user_id, skip = page.skip, limit = page.limit, "Listing own inspections");
    let inspections = with_db(&state.db, move |db| {
        db.list_user_inspections(&user_id, page.skip, page.limit)
    })
    .await?;
    Ok(Json(with_urls(inspections, &state.base_url)))
}

pub async fn list_inspections(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Inspection>>> {
    let inspections =
        with_db(&state.db, move |db| db.list_inspections(page.skip, page.limit)).await?;
    Ok(Json(with_urls(inspections, &state.base_url)))
}

fn with_urls(inspections: Vec<Inspection>, base_url: &str) -> Vec<Inspection> {
    inspections
        .into_iter()
        .map(|i| i.with_image_url(base_url))
        .collect()
}

pub async fn get_inspection(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Inspection>> {
    let inspection = owned_inspection(
        &state,
        id,
        &user_id,
        "Not authorized to access this inspection",
    )
    .await?;
    Ok(Json(inspection.with_image_url(&state.base_url)))
}

/// Delete the record and its image; a missing image does not block deletion
pub async fn delete_inspection(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let inspection = owned_inspection(
        &state,
        id,
        &user_id,
        "Not authorized to delete this inspection",
    )
    .await?;

    match state.uploads.remove(&inspection.image_path).await {
        Ok(true) => info!(file = %inspection.image_path, "Deleted upload"),
        Ok(false) => {}
        Err(err) => warn!(file = %inspection.image_path, error = %err, "Failed to delete upload"),
    }

    with_db(&state.db, move |db| db.delete_inspection(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_inspection(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let inspection = owned_inspection(
        &state,
        id,
        &user_id,
        "Not authorized to access this inspection",
    )
    .await?;

    let disposition = format!("attachment; filename=inspection_report_{}.md", id);
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| QcError::Validation(format!("Invalid header value: {}", e)))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/markdown; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        render_markdown(&inspection),
    )
        .into_response())
}

pub async fn serve_upload(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> ApiResult<Response> {
    let bytes = state.uploads.read(&file).await?;
    let mime = mime_for_path(FsPath::new(&file));
    Ok(([(header::CONTENT_TYPE, HeaderValue::from_static(mime))], bytes).into_response())
}
