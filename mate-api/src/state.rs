use mate_booking::Reconciler;
use mate_core::events::BookingConfirmedEvent;
use mate_core::payment::PaymentProvider;
use mate_core::repository::BookingRepository;
use mate_store::{
    DbClient, PgCampgroundRepository, PgForumRepository, PgUserRepository, RedisClient,
};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::metrics::Metrics;
use crate::middleware::resiliency::Resiliency;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbClient>,
    pub redis: Arc<RedisClient>,
    pub bookings: Arc<dyn BookingRepository>,
    pub campgrounds: Arc<PgCampgroundRepository>,
    pub users: Arc<PgUserRepository>,
    pub forums: Arc<PgForumRepository>,
    pub payments: Arc<dyn PaymentProvider>,
    pub reconciler: Arc<Reconciler>,
    pub sse_tx: broadcast::Sender<BookingConfirmedEvent>,
    pub auth: AuthConfig,
    pub business_rules: mate_store::app_config::BusinessRules,
    pub metrics: Arc<Metrics>,
    pub resiliency: Arc<Resiliency>,
}
