use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A confirmed (or in-flight) reservation of a campsite for a date range.
///
/// `payment_session_id` is the idempotency key: at most one booking row
/// ever exists for a given checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub payment_session_id: String,
    pub guest_id: Uuid,
    pub campground_id: Uuid,
    pub campsite_id: Uuid,
    pub stay: StayRange,
    pub total_cents: i32,
    pub currency: String,
    pub status: BookingStatus,
    /// False until the campsite booked-dates record, availability cache
    /// invalidation and confirmation event have all been applied.
    pub fanout_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    Completed,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::CheckedIn => "CHECKED_IN",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

impl BookingStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CHECKED_IN" => Some(BookingStatus::CheckedIn),
            "COMPLETED" => Some(BookingStatus::Completed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// Half-open stay interval: the guest occupies [check_in, check_out).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, crate::CoreError> {
        if check_out <= check_in {
            return Err(crate::CoreError::ValidationError(format!(
                "check-out {} must be after check-in {}",
                check_out, check_in
            )));
        }
        Ok(Self { check_in, check_out })
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Two stays conflict when their half-open intervals intersect.
    /// Back-to-back stays (A checks out the day B checks in) do not.
    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_stay_range_validation() {
        assert!(StayRange::new(d("2026-07-01"), d("2026-07-04")).is_ok());
        assert!(StayRange::new(d("2026-07-04"), d("2026-07-04")).is_err());
        assert!(StayRange::new(d("2026-07-04"), d("2026-07-01")).is_err());
    }

    #[test]
    fn test_nights() {
        let stay = StayRange::new(d("2026-07-01"), d("2026-07-04")).unwrap();
        assert_eq!(stay.nights(), 3);
    }

    #[test]
    fn test_overlap_is_half_open() {
        let a = StayRange::new(d("2026-07-01"), d("2026-07-04")).unwrap();
        let b = StayRange::new(d("2026-07-04"), d("2026-07-06")).unwrap();
        let c = StayRange::new(d("2026-07-03"), d("2026-07-05")).unwrap();

        // Back-to-back is fine
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));

        // True intersection conflicts
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }
}
