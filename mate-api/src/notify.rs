use async_trait::async_trait;
use chrono::Utc;
use mate_booking::ConfirmationNotifier;
use mate_core::booking::Booking;
use mate_core::events::BookingConfirmedEvent;
use mate_core::repository::RepoError;
use mate_store::{EventProducer, RedisClient};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Production fan-out sink: Kafka event, checkout-hold release, availability
/// cache drop, SSE broadcast. Runs inside the reconciler's retryable fan-out,
/// so every step here is safe to replay for the same booking.
pub struct BookingEventNotifier {
    kafka: Arc<EventProducer>,
    redis: Arc<RedisClient>,
    sse_tx: broadcast::Sender<BookingConfirmedEvent>,
}

impl BookingEventNotifier {
    pub fn new(
        kafka: Arc<EventProducer>,
        redis: Arc<RedisClient>,
        sse_tx: broadcast::Sender<BookingConfirmedEvent>,
    ) -> Self {
        Self {
            kafka,
            redis,
            sse_tx,
        }
    }
}

#[async_trait]
impl ConfirmationNotifier for BookingEventNotifier {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<(), RepoError> {
        let event = BookingConfirmedEvent {
            booking_id: booking.id,
            campground_id: booking.campground_id,
            campsite_id: booking.campsite_id,
            check_in: booking.stay.check_in,
            check_out: booking.stay.check_out,
            confirmed_at: Utc::now().timestamp(),
        };

        // Keyed by booking id, so consumers can dedupe a replay
        self.kafka.publish_booking_confirmed(&event).await?;

        // Both deletes are no-ops on replay
        self.redis
            .release_stay_hold(&booking.campsite_id, &booking.stay)
            .await?;
        self.redis
            .invalidate_availability(&booking.campsite_id)
            .await?;

        // An empty subscriber list is not a failure
        let _ = self.sse_tx.send(event);

        Ok(())
    }
}
