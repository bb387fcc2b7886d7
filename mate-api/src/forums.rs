use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListThreadsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateThreadRequest {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

/// GET /v1/forums/threads
pub async fn list_threads(
    State(state): State<AppState>,
    Query(query): Query<ListThreadsQuery>,
) -> Result<Json<Vec<Value>>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);

    let threads = state
        .forums
        .list_threads(limit)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(threads))
}

/// POST /v1/forums/threads
pub async fn create_thread(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateThreadRequest>,
) -> Result<Json<CreatedResponse>, AppError> {
    let author_id = claims.user_id()?;

    if req.title.trim().is_empty() || req.body.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Title and body are required".to_string(),
        ));
    }

    let id = state
        .forums
        .create_thread(author_id, req.title.trim(), &req.body)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(CreatedResponse { id }))
}

/// GET /v1/forums/threads/{id}
pub async fn get_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let thread = state
        .forums
        .get_thread(thread_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("Thread not found".to_string()))?;

    Ok(Json(thread))
}

/// POST /v1/forums/threads/{id}/posts
pub async fn add_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(thread_id): Path<Uuid>,
    Json(req): Json<CreatePostRequest>,
) -> Result<Json<CreatedResponse>, AppError> {
    let author_id = claims.user_id()?;

    if req.body.trim().is_empty() {
        return Err(AppError::ValidationError("Body is required".to_string()));
    }

    let id = state
        .forums
        .add_post(thread_id, author_id, &req.body)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("Thread not found".to_string()))?;

    Ok(Json(CreatedResponse { id }))
}
