use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mate_api::error::AppError;
use mate_api::middleware::auth::{Claims, ROLE_GUEST};
use mate_api::middleware::resiliency::CircuitBreaker;
use mate_booking::ReconcileError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::time::Duration;
use uuid::Uuid;

const SECRET: &str = "test-secret";

fn mint_token(claims: &Claims) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_jwt_round_trip() {
    let user_id = Uuid::new_v4();
    let claims = Claims {
        sub: user_id.to_string(),
        email: Some("camper@example.com".to_string()),
        role: ROLE_GUEST.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };

    let token = mint_token(&claims);
    let decoded = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(SECRET.as_bytes()),
        &Validation::default(),
    )
    .unwrap()
    .claims;

    assert_eq!(decoded.user_id().unwrap(), user_id);
    assert_eq!(decoded.role, ROLE_GUEST);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        email: None,
        role: ROLE_GUEST.to_string(),
        exp: (chrono::Utc::now().timestamp() - 3600) as usize,
    };

    let token = mint_token(&claims);
    let result = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(SECRET.as_bytes()),
        &Validation::default(),
    );

    assert!(result.is_err());
}

#[tokio::test]
async fn test_malformed_subject_claim_rejected() {
    let claims = Claims {
        sub: "not-a-uuid".to_string(),
        email: None,
        role: ROLE_GUEST.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };

    assert!(claims.user_id().is_err());
}

#[test]
fn test_reconcile_errors_map_to_statuses() {
    let cases = vec![
        (
            AppError::from_reconcile(ReconcileError::SessionNotFound("cs_x".to_string())),
            StatusCode::NOT_FOUND,
        ),
        (
            AppError::from_reconcile(ReconcileError::SessionNotPaid {
                session_id: "cs_x".to_string(),
                status: "Open".to_string(),
            }),
            StatusCode::PAYMENT_REQUIRED,
        ),
        (
            AppError::from_reconcile(ReconcileError::GuestMismatch),
            StatusCode::FORBIDDEN,
        ),
        (
            AppError::from_reconcile(ReconcileError::Store("db down".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (err, expected) in cases {
        assert_eq!(err.into_response().status(), expected);
    }
}

#[tokio::test]
async fn test_circuit_breaker_trips_and_recovers() {
    let cb = CircuitBreaker::new("payment", 3, Duration::from_millis(50));

    assert!(cb.allow().await);

    for _ in 0..3 {
        cb.record_failure().await;
    }
    assert!(!cb.allow().await, "breaker should be open after threshold");

    // After the cooldown a trial request goes through
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(cb.allow().await, "breaker should move to half-open");

    cb.record_success().await;
    assert!(cb.allow().await, "breaker should close after a success");
}

#[tokio::test]
async fn test_circuit_breaker_reopens_on_half_open_failure() {
    let cb = CircuitBreaker::new("payment", 1, Duration::from_millis(50));

    cb.record_failure().await;
    assert!(!cb.allow().await);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(cb.allow().await);

    // The trial failed, so the breaker snaps back open
    cb.record_failure().await;
    assert!(!cb.allow().await);
}
