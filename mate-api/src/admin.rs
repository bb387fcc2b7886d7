use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DecideApplicationRequest {
    pub approve: bool,
}

/// GET /v1/admin/summary
pub async fn platform_summary(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let summary = mate_store::PgBookingRepository::new(state.db.pool.clone())
        .platform_summary()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(summary))
}

/// GET /v1/admin/owners/applications
pub async fn list_applications(State(state): State<AppState>) -> Result<Json<Vec<Value>>, AppError> {
    let applications = state
        .users
        .list_pending_applications()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(applications))
}

/// POST /v1/admin/owners/applications/{id}/decide
/// Deciding twice is a 404: the row is only PENDING once.
pub async fn decide_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(application_id): Path<Uuid>,
    Json(req): Json<DecideApplicationRequest>,
) -> Result<Json<Value>, AppError> {
    let decided = state
        .users
        .decide_application(application_id, req.approve, &claims.sub)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| {
            AppError::NotFoundError("No pending application with that id".to_string())
        })?;

    tracing::info!(
        "Application {} {} by admin {}",
        application_id,
        if req.approve { "approved" } else { "rejected" },
        claims.sub
    );

    Ok(Json(decided))
}
