use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewSubmission, Page, Pagination, Source, Submission, SubmissionFilter};
use crate::state::SharedState;
use crate::submission::{fields, parser};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub id: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub source: Option<String>,
    pub user_type: Option<String>,
}

fn not_found() -> AppError {
    AppError::NotFound("Form submission not found".to_string())
}

/// A malformed identifier can't name a stored record, so it is a 404 too.
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| not_found())
}

/// Same as `parse_id`, for an id segment that may not have decoded at all.
fn path_id(path: Result<Path<String>, PathRejection>) -> Result<Uuid, AppError> {
    let Path(raw) = path.map_err(|_| not_found())?;
    parse_id(&raw)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

fn read_object(headers: &HeaderMap, body: &[u8]) -> Result<Map<String, Value>, AppError> {
    parser::parse_object(content_type(headers), body).map_err(AppError::BadRequest)
}

async fn fetch(state: &SharedState, id: Uuid) -> Result<Submission, AppError> {
    state.store.find_by_id(id).await?.ok_or_else(not_found)
}

pub async fn list(
    State(state): State<SharedState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = params?;

    if let Some(id) = non_empty(params.id) {
        let submission = fetch(&state, parse_id(&id)?).await?;
        return Ok(Json(json!({ "success": true, "data": submission })));
    }

    let source = match non_empty(params.source) {
        Some(s) => Some(
            Source::parse(&s)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid source filter: {s}")))?,
        ),
        None => None,
    };
    let filter = SubmissionFilter {
        source,
        user_type: non_empty(params.user_type),
    };
    let page = Page::new(params.page, params.limit);

    let listing = state.store.list(&filter, page).await?;

    Ok(Json(json!({
        "success": true,
        "data": listing.items,
        "pagination": Pagination::new(page, listing.total),
    })))
}

pub async fn get(
    State(state): State<SharedState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let submission = fetch(&state, path_id(id)?).await?;
    Ok(Json(json!({ "success": true, "data": submission })))
}

/// Single submission, or a bulk import when the body carries `csvData`.
pub async fn create(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let payload = read_object(&headers, &body?)?;

    if let Some(rows) = parser::csv_rows(&payload).map_err(AppError::BadRequest)? {
        return import(&state, rows).await;
    }

    let patch = fields::sort_fields(&payload).map_err(AppError::BadRequest)?;
    let submission = state.store.create(NewSubmission::form(patch)).await?;
    tracing::info!(id = %submission.id, "Form submission created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Form submitted successfully",
            "data": submission,
        })),
    ))
}

pub async fn import_csv(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let payload = read_object(&headers, &body?)?;
    let rows = parser::csv_rows(&payload)
        .map_err(AppError::BadRequest)?
        .ok_or_else(|| {
            AppError::BadRequest("csvData is required and must be an array".to_string())
        })?;

    import(&state, rows).await
}

async fn import(
    state: &SharedState,
    rows: Vec<Map<String, Value>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let inserted = state.store.bulk_create_from_csv(rows).await?;
    let count = inserted.len();
    tracing::info!(count, "CSV rows imported");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": format!("{count} records imported successfully"),
            "data": inserted,
            "count": count,
        })),
    ))
}

pub async fn update(
    State(state): State<SharedState>,
    id: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, AppError> {
    let id = path_id(id)?;
    let payload = read_object(&headers, &body?)?;
    let patch = fields::sort_fields(&payload).map_err(AppError::BadRequest)?;

    let submission = state.store.update(id, &patch).await?.ok_or_else(not_found)?;

    Ok(Json(json!({
        "success": true,
        "message": "Form submission updated successfully",
        "data": submission,
    })))
}

pub async fn delete(
    State(state): State<SharedState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let id = path_id(id)?;
    let removed = state.store.delete(id).await?.ok_or_else(not_found)?;
    tracing::info!(%id, "Form submission deleted");

    Ok(Json(json!({
        "success": true,
        "message": "Form submission deleted successfully",
        "data": removed,
    })))
}

pub async fn search(
    State(state): State<SharedState>,
    query: Result<Path<String>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(query) = query
        .map_err(|e| AppError::BadRequest(format!("Invalid search text: {}", e.body_text())))?;
    let results = state.store.search(&query).await?;
    let count = results.len();

    Ok(Json(json!({
        "success": true,
        "data": results,
        "count": count,
    })))
}
