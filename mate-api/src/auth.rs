use axum::{extract::State, Json};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::{Claims, ROLE_GUEST};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GuestLoginRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user_id: Uuid,
    pub role: String,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: String,
}

/// POST /v1/auth/guest
/// Mint a guest session. Every caller gets a fresh user id; the token is
/// the only credential for the rest of the flow.
pub async fn login_guest(
    State(state): State<AppState>,
    Json(req): Json<GuestLoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user_id = Uuid::new_v4();

    state
        .users
        .ensure_user(user_id, req.email.as_deref(), ROLE_GUEST)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let expires_at = Utc::now().timestamp() + state.auth.expiration as i64;
    let claims = Claims {
        sub: user_id.to_string(),
        email: req.email,
        role: ROLE_GUEST.to_string(),
        exp: expires_at as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    tracing::info!("Guest session issued for user {}", user_id);

    Ok(Json(TokenResponse {
        token,
        user_id,
        role: claims.role,
        expires_at,
    }))
}

/// GET /v1/auth/me
/// Echo the caller's identity. The role comes from the database, not the
/// token, so an owner promotion shows up without re-login.
pub async fn me(
    State(state): State<AppState>,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<MeResponse>, AppError> {
    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthenticationError("Invalid token".to_string()))?;

    let claims = token_data.claims;
    let user_id = claims.user_id()?;

    let role = state
        .users
        .get_role(user_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .unwrap_or(claims.role);

    Ok(Json(MeResponse {
        user_id,
        email: claims.email,
        role,
    }))
}
