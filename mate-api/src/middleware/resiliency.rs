use axum::{
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq)]
enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Consecutive-failure breaker. Trips after `trip_after` failures in a
/// row, rejects calls for `cooldown`, then lets a single trial request
/// through to decide between closing again and re-opening.
pub struct CircuitBreaker {
    name: String,
    state: RwLock<BreakerState>,
    consecutive_failures: AtomicUsize,
    trip_after: usize,
    cooldown: Duration,
    opened_at: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(name: &str, trip_after: usize, cooldown: Duration) -> Self {
        Self {
            name: name.to_string(),
            state: RwLock::new(BreakerState::Closed),
            consecutive_failures: AtomicUsize::new(0),
            trip_after,
            cooldown,
            opened_at: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn allow(&self) -> bool {
        match *self.state.read().await {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let opened = *self.opened_at.read().await;
                match opened {
                    Some(at) if at.elapsed() >= self.cooldown => {
                        *self.state.write().await = BreakerState::HalfOpen;
                        tracing::info!(
                            "{} breaker cooled down, letting a trial request through",
                            self.name
                        );
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    pub async fn record_success(&self) {
        let mut state = self.state.write().await;
        if *state != BreakerState::Closed {
            tracing::info!("{} breaker closed again", self.name);
        }
        *state = BreakerState::Closed;
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    pub async fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.write().await;

        // A half-open trial failing re-opens immediately
        if failures >= self.trip_after || *state == BreakerState::HalfOpen {
            if *state != BreakerState::Open {
                tracing::warn!(
                    "{} breaker opened after {} consecutive failure(s)",
                    self.name,
                    failures
                );
            }
            *state = BreakerState::Open;
            *self.opened_at.write().await = Some(Instant::now());
        }
    }
}

/// The payment provider is the only external dependency flaky enough to
/// warrant a breaker; everything else is our own Postgres/Redis.
pub struct Resiliency {
    pub payment_cb: CircuitBreaker,
}

impl Resiliency {
    pub fn new() -> Self {
        Self {
            payment_cb: CircuitBreaker::new("payment", 5, Duration::from_secs(30)),
        }
    }
}

impl Default for Resiliency {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn circuit_breaker_middleware(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> impl IntoResponse {
    // Only the payment-facing booking routes run behind the breaker
    let path = req.uri().path();
    let cb = if path.contains("/bookings") && (path.contains("/checkout") || path.contains("/success"))
    {
        Some(&state.resiliency.payment_cb)
    } else {
        None
    };

    if let Some(cb) = cb {
        if !cb.allow().await {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("{} dependency is unavailable, try again shortly", cb.name()),
            )
                .into_response();
        }

        let response = next.run(req).await;

        if response.status().is_server_error() {
            cb.record_failure().await;
        } else {
            cb.record_success().await;
        }

        response.into_response()
    } else {
        next.run(req).await.into_response()
    }
}
