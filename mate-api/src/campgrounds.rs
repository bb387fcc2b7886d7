use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use mate_catalog::{Campground, Campsite};
use mate_core::booking::StayRange;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCampgroundRequest {
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub base_price_cents: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCampgroundRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub base_price_cents: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCampsiteRequest {
    pub name: String,
    pub capacity: Option<i32>,
    pub price_cents: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct CampgroundDetailResponse {
    #[serde(flatten)]
    pub campground: Campground,
    pub campsites: Vec<Campsite>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub campsite_id: Uuid,
    pub booked: Vec<StayRange>,
}

// ============================================================================
// Public browsing
// ============================================================================

/// GET /v1/campgrounds
pub async fn browse(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<Vec<Campground>>, AppError> {
    let campgrounds = state
        .campgrounds
        .list_active(query.location.as_deref())
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(campgrounds))
}

/// GET /v1/campgrounds/{id}
pub async fn detail(
    State(state): State<AppState>,
    Path(campground_id): Path<Uuid>,
) -> Result<Json<CampgroundDetailResponse>, AppError> {
    let campground = state
        .campgrounds
        .get(campground_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("Campground not found".to_string()))?;

    let campsites = state
        .campgrounds
        .list_campsites(campground_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(CampgroundDetailResponse {
        campground,
        campsites,
    }))
}

/// GET /v1/campsites/{id}/availability
/// Booked ranges for calendar rendering, cached in Redis.
pub async fn campsite_availability(
    State(state): State<AppState>,
    Path(campsite_id): Path<Uuid>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    // Cache hit path
    if let Ok(Some(cached)) = state.redis.get_cached_availability(&campsite_id).await {
        if let Ok(booked) = serde_json::from_str::<Vec<StayRange>>(&cached) {
            return Ok(Json(AvailabilityResponse { campsite_id, booked }));
        }
    }

    state
        .campgrounds
        .get_campsite(campsite_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("Campsite not found".to_string()))?;

    let booked = state
        .campgrounds
        .booked_ranges(campsite_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    if let Ok(payload) = serde_json::to_string(&booked) {
        // Short TTL; the worker also invalidates on each confirmed booking
        let _ = state
            .redis
            .cache_availability(&campsite_id, &payload, 60)
            .await;
    }

    Ok(Json(AvailabilityResponse { campsite_id, booked }))
}

/// GET /v1/campgrounds/{id}/stream
/// SSE feed of bookings landing on this campground, for live calendars.
pub async fn booking_stream(
    State(state): State<AppState>,
    Path(campground_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.sse_tx.subscribe();

    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(move |result| {
        async move {
            match result {
                Ok(event) if event.campground_id == campground_id => {
                    let data = serde_json::to_string(&event).ok()?;
                    Some(Ok(Event::default().event("booking_confirmed").data(data)))
                }
                _ => None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ============================================================================
// Owner management
// ============================================================================

/// POST /v1/campgrounds
pub async fn create_campground(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCampgroundRequest>,
) -> Result<Json<Campground>, AppError> {
    let owner_id = claims.user_id()?;

    if req.base_price_cents <= 0 {
        return Err(AppError::ValidationError(
            "Nightly price must be positive".to_string(),
        ));
    }

    let now = Utc::now();
    let campground = Campground {
        id: Uuid::new_v4(),
        owner_id,
        name: req.name,
        description: req.description,
        location: req.location,
        base_price_cents: req.base_price_cents,
        currency: state.business_rules.currency.clone(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    state
        .campgrounds
        .create(&campground)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    tracing::info!("Campground {} created by owner {}", campground.id, owner_id);

    Ok(Json(campground))
}

/// GET /v1/owners/campgrounds
pub async fn list_own_campgrounds(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Campground>>, AppError> {
    let owner_id = claims.user_id()?;

    let campgrounds = state
        .campgrounds
        .list_for_owner(owner_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(campgrounds))
}

/// PUT /v1/campgrounds/{id}
pub async fn update_campground(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(campground_id): Path<Uuid>,
    Json(req): Json<UpdateCampgroundRequest>,
) -> Result<Json<Campground>, AppError> {
    let mut campground = owned_campground(&state, &claims, campground_id).await?;

    if let Some(name) = req.name {
        campground.name = name;
    }
    if let Some(description) = req.description {
        campground.description = Some(description);
    }
    if let Some(location) = req.location {
        campground.location = location;
    }
    if let Some(price) = req.base_price_cents {
        if price <= 0 {
            return Err(AppError::ValidationError(
                "Nightly price must be positive".to_string(),
            ));
        }
        campground.base_price_cents = price;
    }
    if let Some(is_active) = req.is_active {
        campground.is_active = is_active;
    }
    campground.updated_at = Utc::now();

    state
        .campgrounds
        .update(&campground)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(campground))
}

/// POST /v1/campgrounds/{id}/campsites
pub async fn add_campsite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(campground_id): Path<Uuid>,
    Json(req): Json<CreateCampsiteRequest>,
) -> Result<Json<Campsite>, AppError> {
    let campground = owned_campground(&state, &claims, campground_id).await?;

    let campsite = Campsite {
        id: Uuid::new_v4(),
        campground_id: campground.id,
        name: req.name,
        capacity: req.capacity.unwrap_or(4),
        price_cents: req.price_cents,
        is_active: true,
    };

    state
        .campgrounds
        .add_campsite(&campsite)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(campsite))
}

/// Fetch a campground and verify the caller owns it (admins pass).
async fn owned_campground(
    state: &AppState,
    claims: &Claims,
    campground_id: Uuid,
) -> Result<Campground, AppError> {
    let user_id = claims.user_id()?;

    let campground = state
        .campgrounds
        .get(campground_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("Campground not found".to_string()))?;

    if campground.owner_id != user_id && claims.role != crate::middleware::auth::ROLE_ADMIN {
        return Err(AppError::AuthorizationError(
            "Campground does not belong to you".to_string(),
        ));
    }

    Ok(campground)
}
