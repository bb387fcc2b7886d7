use mate_booking::Reconciler;
use mate_core::events::BookingConfirmedEvent;
use mate_store::RedisClient;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

/// Consumes booking.confirmed events and drops the cached availability for
/// the affected campsite so the next read reflects the new booking.
pub async fn start_availability_worker(brokers: String, group_id: String, redis: Arc<RedisClient>) {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &brokers)
        .set("group.id", &group_id)
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "earliest")
        .create()
        .expect("Consumer creation failed");

    consumer
        .subscribe(&[mate_store::events::BOOKING_CONFIRMED_TOPIC])
        .expect("Can't subscribe");

    info!("Availability worker started, listening for confirmed bookings...");

    loop {
        match consumer.recv().await {
            Err(e) => error!("Kafka error: {}", e),
            Ok(m) => {
                if let Some(Ok(payload)) = m.payload_view::<str>() {
                    match serde_json::from_str::<BookingConfirmedEvent>(payload) {
                        Ok(event) => {
                            info!(
                                "Processing booking {} for campsite {}",
                                event.booking_id, event.campsite_id
                            );
                            if let Err(e) = redis.invalidate_availability(&event.campsite_id).await
                            {
                                error!("Failed to invalidate availability cache: {}", e);
                            }
                        }
                        Err(e) => error!("Malformed booking event payload: {}", e),
                    }
                }
            }
        }
    }
}

/// Replays fan-out for bookings that were persisted without finishing their
/// reference updates. Each pass is idempotent, so running it alongside live
/// reconciliation is safe.
pub async fn start_fanout_worker(reconciler: Arc<Reconciler>, interval_seconds: u64) {
    info!(
        "Fan-out retry worker started (every {}s)",
        interval_seconds
    );

    loop {
        sleep(Duration::from_secs(interval_seconds)).await;

        match reconciler.retry_pending(50).await {
            Ok(0) => {}
            Ok(n) => info!("Fan-out retry pass completed {} booking(s)", n),
            Err(e) => warn!("Fan-out retry pass failed: {}", e),
        }
    }
}
