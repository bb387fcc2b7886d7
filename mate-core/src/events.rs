use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Published to `booking.confirmed` once a booking row is persisted, and
/// broadcast over SSE so browsing clients can grey out taken dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub campground_id: Uuid,
    pub campsite_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub confirmed_at: i64,
}
