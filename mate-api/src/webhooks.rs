use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Payment provider webhook payload. We only act on session completion;
/// everything else is acknowledged and dropped.
#[derive(Debug, Deserialize)]
pub struct PaymentWebhookPayload {
    #[serde(rename = "type")]
    pub event_type: String,
    pub session_id: String,
    pub guest_id: Uuid,
}

/// POST /v1/webhooks/payments
/// Server-side completion path. The provider retries webhooks, and the
/// guest may hit the success endpoint at the same time; both paths run
/// through the same reconciler so there is still only one booking.
pub async fn payment_webhook(
    State(state): State<AppState>,
    Json(payload): Json<PaymentWebhookPayload>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if payload.event_type != "checkout.session.completed" {
        tracing::debug!("Ignoring webhook event type: {}", payload.event_type);
        return Ok((StatusCode::OK, Json(json!({ "ignored": true }))));
    }

    let outcome = state
        .reconciler
        .reconcile(&payload.session_id, payload.guest_id)
        .await
        .map_err(|e| {
            state.metrics.reconcile_failures.inc();
            AppError::from_reconcile(e)
        })?;

    // Fan-out (event, hold release, cache drop) ran inside the reconciler;
    // the worker replays it if any step failed
    if outcome.already_recorded() {
        state.metrics.bookings_duplicate.inc();
    } else {
        state.metrics.bookings_created.inc();
    }

    Ok((
        StatusCode::OK,
        Json(json!({
            "booking_id": outcome.booking().id,
            "already_recorded": outcome.already_recorded(),
        })),
    ))
}
