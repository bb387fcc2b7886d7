use crate::booking::Booking;
use async_trait::async_trait;
use uuid::Uuid;

pub type RepoError = Box<dyn std::error::Error + Send + Sync>;

/// Result of inserting a booking keyed by its payment-session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Another request already persisted a booking for this session id.
    DuplicateSession,
}

/// Repository trait for booking persistence and fan-out bookkeeping.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_session(&self, session_id: &str) -> Result<Option<Booking>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, RepoError>;

    /// Insert the booking, deduplicating on the payment-session id.
    /// Must never overwrite an existing row for the same session.
    async fn insert(&self, booking: &Booking) -> Result<InsertOutcome, RepoError>;

    /// Apply the booking's fan-out effects (campsite booked-dates record,
    /// related reference updates). Must be idempotent per booking id.
    async fn apply_fanout(&self, booking: &Booking) -> Result<(), RepoError>;

    async fn mark_fanout_complete(&self, id: Uuid) -> Result<(), RepoError>;

    /// Bookings whose fan-out has not completed, oldest first.
    async fn list_fanout_pending(&self, limit: i64) -> Result<Vec<Booking>, RepoError>;

    async fn list_for_guest(&self, guest_id: Uuid) -> Result<Vec<Booking>, RepoError>;

    async fn update_status(&self, id: Uuid, status: &str) -> Result<(), RepoError>;

    /// Cancel the booking and free its booked dates, but only if it is
    /// still PENDING or CONFIRMED at the moment of the update. Returns
    /// false when the status changed underneath the caller.
    async fn cancel(&self, id: Uuid) -> Result<bool, RepoError>;
}
