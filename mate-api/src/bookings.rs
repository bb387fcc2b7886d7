use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use mate_booking::BookingLifecycle;
use mate_catalog::{QuoteEngine, QuoteRules};
use mate_core::booking::{Booking, BookingStatus, StayRange};
use mate_core::payment::{CheckoutSession, CheckoutSessionStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

/// Longest stay a single checkout may cover.
const MAX_STAY_NIGHTS: i64 = 90;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub campsite_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub nights: i64,
    pub base_cents: i64,
    pub taxes_cents: i64,
    pub fee_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    pub hold_expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub payment_session_id: String,
    pub campground_id: Uuid,
    pub campsite_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub total_cents: i32,
    pub currency: String,
    pub status: String,
    /// True when this call found a booking that an earlier (or concurrent)
    /// call already persisted for the same payment session.
    pub already_recorded: bool,
}

impl BookingResponse {
    fn from_booking(b: &Booking, already_recorded: bool) -> Self {
        Self {
            id: b.id,
            payment_session_id: b.payment_session_id.clone(),
            campground_id: b.campground_id,
            campsite_id: b.campsite_id,
            check_in: b.stay.check_in,
            check_out: b.stay.check_out,
            total_cents: b.total_cents,
            currency: b.currency.clone(),
            status: b.status.to_string(),
            already_recorded,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/bookings/checkout
/// Quote the stay, hold the dates, open a provider checkout session.
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let guest_id = claims.user_id()?;

    let stay = StayRange::new(req.check_in, req.check_out)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;
    if stay.nights() > MAX_STAY_NIGHTS {
        return Err(AppError::ValidationError(format!(
            "Stays are limited to {} nights",
            MAX_STAY_NIGHTS
        )));
    }

    // 1. Resolve campsite and campground
    let campsite = state
        .campgrounds
        .get_campsite(req.campsite_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("Campsite not found".to_string()))?;

    let campground = state
        .campgrounds
        .get(campsite.campground_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("Campground not found".to_string()))?;

    if !campsite.is_active || !campground.is_active {
        return Err(AppError::ValidationError(
            "Listing is not currently bookable".to_string(),
        ));
    }

    // 2. Reject stays that overlap an existing booking
    let taken = state
        .campgrounds
        .has_overlapping_booking(campsite.id, &stay)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if taken {
        return Err(AppError::ConflictError(
            "Campsite is already booked for those dates".to_string(),
        ));
    }

    // 3. Quote
    let quote = QuoteEngine::new(quote_rules(&state)).quote(campsite.nightly_price(&campground), &stay);

    // 4. Hold the dates while the guest pays
    let session_id = format!("cs_{}", Uuid::new_v4().simple());
    let ttl = state.business_rules.stay_hold_seconds;
    let held = state
        .redis
        .acquire_stay_hold(&campsite.id, &stay, &session_id, ttl)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if !held {
        return Err(AppError::ConflictError(
            "Another guest is currently checking out these dates".to_string(),
        ));
    }

    // 5. Open the provider session
    let session = CheckoutSession {
        id: session_id,
        guest_id,
        campground_id: campground.id,
        campsite_id: campsite.id,
        stay,
        amount_cents: checkout_amount(quote.total_cents)?,
        currency: state.business_rules.currency.clone(),
        status: CheckoutSessionStatus::Open,
        created_at: Utc::now(),
    };

    let session = state
        .payments
        .create_session(&session)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    tracing::info!(
        "Checkout session {} opened for campsite {} ({} nights)",
        session.id,
        campsite.id,
        quote.nights
    );

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        nights: quote.nights,
        base_cents: quote.base_cents,
        taxes_cents: quote.taxes_cents,
        fee_cents: quote.fee_cents,
        total_cents: quote.total_cents,
        currency: session.currency,
        hold_expires_at: Utc::now().timestamp() + ttl as i64,
    }))
}

/// POST /v1/bookings/sessions/{session_id}/success
/// Idempotently convert a completed checkout session into the one booking
/// record for that session. Safe to call any number of times.
pub async fn booking_success(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let guest_id = claims.user_id()?;

    let outcome = state
        .reconciler
        .reconcile(&session_id, guest_id)
        .await
        .map_err(|e| {
            state.metrics.reconcile_failures.inc();
            AppError::from_reconcile(e)
        })?;

    // The confirmation event, hold release and cache drop all ran inside
    // the reconciler's fan-out; if any failed, the booking is on the
    // retry scan and the worker replays them.
    if outcome.already_recorded() {
        state.metrics.bookings_duplicate.inc();
    } else {
        state.metrics.bookings_created.inc();
    }

    Ok(Json(BookingResponse::from_booking(
        outcome.booking(),
        outcome.already_recorded(),
    )))
}

/// GET /v1/bookings
pub async fn list_my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let guest_id = claims.user_id()?;

    let bookings = state
        .bookings
        .list_for_guest(guest_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(
        bookings
            .iter()
            .map(|b| BookingResponse::from_booking(b, false))
            .collect(),
    ))
}

/// GET /v1/bookings/{id}
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let guest_id = claims.user_id()?;

    let booking = state
        .bookings
        .find_by_id(booking_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("Booking not found".to_string()))?;

    if booking.guest_id != guest_id && claims.role != crate::middleware::auth::ROLE_ADMIN {
        return Err(AppError::AuthorizationError(
            "Booking does not belong to you".to_string(),
        ));
    }

    Ok(Json(BookingResponse::from_booking(&booking, false)))
}

/// POST /v1/bookings/{id}/cancel
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let guest_id = claims.user_id()?;

    let booking = state
        .bookings
        .find_by_id(booking_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("Booking not found".to_string()))?;

    if booking.guest_id != guest_id {
        return Err(AppError::AuthorizationError(
            "Booking does not belong to you".to_string(),
        ));
    }

    if booking.status == BookingStatus::Cancelled {
        // Cancelling twice is fine
        return Ok(Json(BookingResponse::from_booking(&booking, false)));
    }

    if !BookingLifecycle::cancellable(booking.status) {
        return Err(AppError::ConflictError(format!(
            "Booking in status {} can no longer be cancelled",
            booking.status
        )));
    }

    // Guarded in the store: loses cleanly if the status moved on (e.g. an
    // owner check-in) between our read and the update. Frees booked_dates
    // in the same transaction.
    let cancelled = state
        .bookings
        .cancel(booking_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if !cancelled {
        return Err(AppError::ConflictError(
            "Booking status changed, it can no longer be cancelled".to_string(),
        ));
    }

    let _ = state.redis.invalidate_availability(&booking.campsite_id).await;

    tracing::info!("Booking {} cancelled by guest", booking_id);

    let mut booking = booking;
    booking.status = BookingStatus::Cancelled;
    Ok(Json(BookingResponse::from_booking(&booking, false)))
}

fn quote_rules(state: &AppState) -> QuoteRules {
    let rules = &state.business_rules;
    QuoteRules {
        tax_rate: rules.tax_rate,
        booking_fee_cents: rules.booking_fee_cents,
        seasonal_multiplier: rules.seasonal_multiplier,
        sale_start: rules.sale_start.clone(),
        sale_end: rules.sale_end.clone(),
    }
}

/// Quote totals are i64; the provider and the bookings table carry i32
/// cents, so anything larger is rejected rather than wrapped.
fn checkout_amount(total_cents: i64) -> Result<i32, AppError> {
    i32::try_from(total_cents).map_err(|_| {
        AppError::ValidationError("Stay total exceeds the maximum bookable amount".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_overlong_stay_exceeds_limit() {
        let stay = StayRange::new(d("2026-07-01"), d("2027-07-01")).unwrap();
        assert!(stay.nights() > MAX_STAY_NIGHTS);
    }

    #[test]
    fn test_checkout_amount_rejects_overflow() {
        // A decades-long stay quotes more cents than i32 can carry; the
        // amount must be rejected, never truncated into a wrapped total
        let stay = StayRange::new(d("2026-01-01"), d("9999-01-01")).unwrap();
        let quote = QuoteEngine::new(QuoteRules::default()).quote(10_000, &stay);
        assert!(quote.total_cents > i32::MAX as i64);

        assert!(checkout_amount(quote.total_cents).is_err());
        assert!(checkout_amount(i32::MAX as i64 + 1).is_err());
        assert_eq!(checkout_amount(15_350).unwrap(), 15_350);
    }
}
