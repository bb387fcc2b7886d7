use mate_api::{
    app,
    metrics::Metrics,
    middleware::resiliency::Resiliency,
    notify::BookingEventNotifier,
    state::{AppState, AuthConfig},
    worker,
};
use mate_booking::{ConfirmationNotifier, Reconciler};
use mate_core::payment::MockPaymentProvider;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mate_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = mate_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting AdventureMate API on port {}", config.server.port);

    // Postgres
    let db = mate_store::DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");
    let db = Arc::new(db);

    // Config defaults with per-key admin overrides from the DB
    let business_rules = db
        .fetch_business_rules(config.business_rules.clone())
        .await
        .expect("Failed to load business rules");

    // Redis
    let redis = Arc::new(
        mate_store::RedisClient::new(&config.redis.url)
            .await
            .expect("Failed to connect to Redis"),
    );

    // Kafka
    let kafka = Arc::new(
        mate_store::EventProducer::new(&config.kafka.brokers)
            .expect("Failed to create Kafka producer"),
    );

    // Repositories
    let bookings: Arc<dyn mate_core::repository::BookingRepository> =
        Arc::new(mate_store::PgBookingRepository::new(db.pool.clone()));
    let campgrounds = Arc::new(mate_store::PgCampgroundRepository::new(db.pool.clone()));
    let users = Arc::new(mate_store::PgUserRepository::new(db.pool.clone()));
    let forums = Arc::new(mate_store::PgForumRepository::new(db.pool.clone()));

    // In-process payment provider; a hosted provider plugs in behind the
    // same trait.
    let payments: Arc<dyn mate_core::payment::PaymentProvider> =
        Arc::new(MockPaymentProvider::new());

    // SSE broadcast channel
    let (sse_tx, _) = tokio::sync::broadcast::channel(100);

    // Fan-out sink: Kafka event, hold release, cache drop, SSE. Replayed by
    // the worker for any booking whose fan-out did not complete.
    let notifier: Arc<dyn ConfirmationNotifier> = Arc::new(BookingEventNotifier::new(
        kafka,
        redis.clone(),
        sse_tx.clone(),
    ));

    let reconciler = Arc::new(Reconciler::new(
        bookings.clone(),
        payments.clone(),
        notifier,
    ));

    let app_state = AppState {
        db: db.clone(),
        redis: redis.clone(),
        bookings,
        campgrounds,
        users,
        forums,
        payments,
        reconciler: reconciler.clone(),
        sse_tx,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        business_rules,
        metrics: Arc::new(Metrics::new().expect("Failed to register metrics")),
        resiliency: Arc::new(Resiliency::new()),
    };

    // Background workers
    tokio::spawn(worker::start_availability_worker(
        config.kafka.brokers.clone(),
        config.kafka.consumer_group.clone(),
        redis,
    ));
    tokio::spawn(worker::start_fanout_worker(reconciler, 30));

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
