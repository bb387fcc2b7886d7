use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OwnerApplicationRequest {
    pub business_name: String,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OwnerApplicationResponse {
    pub application_id: Uuid,
    pub status: String,
}

/// POST /v1/owners/apply
/// One PENDING application per user; a second submit while the first is
/// undecided comes back as a conflict.
pub async fn apply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<OwnerApplicationRequest>,
) -> Result<Json<OwnerApplicationResponse>, AppError> {
    let user_id = claims.user_id()?;

    if req.business_name.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Business name is required".to_string(),
        ));
    }

    let application_id = state
        .users
        .submit_owner_application(user_id, req.business_name.trim(), req.message.as_deref())
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("duplicate key") {
                AppError::ConflictError("You already have a pending application".to_string())
            } else {
                AppError::InternalServerError(msg)
            }
        })?;

    tracing::info!("Owner application {} submitted by {}", application_id, user_id);

    Ok(Json(OwnerApplicationResponse {
        application_id,
        status: "PENDING".to_string(),
    }))
}

/// GET /v1/owners/application
pub async fn my_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, AppError> {
    let user_id = claims.user_id()?;

    let application = state
        .users
        .latest_application_for(user_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("No application on file".to_string()))?;

    Ok(Json(application))
}
