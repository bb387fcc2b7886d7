extern crate mate_core;
use axum::{
    extract::State,
    http::Method,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod campgrounds;
pub mod error;
pub mod forums;
pub mod metrics;
pub mod middleware;
pub mod notify;
pub mod owners;
pub mod state;
pub mod webhooks;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Open to anyone, token or not
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/v1/auth/guest", post(auth::login_guest))
        .route("/v1/auth/me", get(auth::me))
        .route("/v1/campgrounds", get(campgrounds::browse))
        .route("/v1/campgrounds/{id}", get(campgrounds::detail))
        .route("/v1/campgrounds/{id}/stream", get(campgrounds::booking_stream))
        .route(
            "/v1/campsites/{id}/availability",
            get(campgrounds::campsite_availability),
        )
        .route("/v1/forums/threads", get(forums::list_threads))
        .route("/v1/forums/threads/{id}", get(forums::get_thread))
        .route("/v1/webhooks/payments", post(webhooks::payment_webhook));

    // Any authenticated caller
    let user_routes = Router::new()
        .route("/v1/bookings/checkout", post(bookings::create_checkout))
        .route(
            "/v1/bookings/sessions/{session_id}/success",
            post(bookings::booking_success),
        )
        .route("/v1/bookings", get(bookings::list_my_bookings))
        .route("/v1/bookings/{id}", get(bookings::get_booking))
        .route("/v1/bookings/{id}/cancel", post(bookings::cancel_booking))
        .route("/v1/owners/apply", post(owners::apply))
        .route("/v1/owners/application", get(owners::my_application))
        .route("/v1/forums/threads", post(forums::create_thread))
        .route("/v1/forums/threads/{id}/posts", post(forums::add_post))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::user_auth_middleware,
        ));

    // Same paths as the public campground reads; the write methods merge
    // into the same method routers with their own auth layer
    let owner_routes = Router::new()
        .route("/v1/campgrounds", post(campgrounds::create_campground))
        .route("/v1/campgrounds/{id}", put(campgrounds::update_campground))
        .route(
            "/v1/campgrounds/{id}/campsites",
            post(campgrounds::add_campsite),
        )
        .route("/v1/owners/campgrounds", get(campgrounds::list_own_campgrounds))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::owner_auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/v1/admin/summary", get(admin::platform_summary))
        .route(
            "/v1/admin/owners/applications",
            get(admin::list_applications),
        )
        .route(
            "/v1/admin/owners/applications/{id}/decide",
            post(admin::decide_application),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(owner_routes)
        .merge(admin_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::resiliency::circuit_breaker_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.render()
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<SocketAddr>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, impl IntoResponse> {
    let ip = addr.ip().to_string();
    let key = format!("ratelimit:{}", ip);

    match state.redis.check_rate_limit(&key, 100, 60).await {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => Err((
            axum::http::StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded",
        )),
        Err(_) => Ok(next.run(req).await), // Fail open
    }
}
