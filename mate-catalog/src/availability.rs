use mate_core::booking::StayRange;
use std::collections::HashMap;
use uuid::Uuid;

/// In-memory booked-range index per campsite. The Postgres `booked_dates`
/// table is the source of truth; this mirrors it for the availability
/// worker and for unit tests.
pub struct AvailabilityCalendar {
    booked: HashMap<Uuid, Vec<(Uuid, StayRange)>>,
}

impl AvailabilityCalendar {
    pub fn new() -> Self {
        Self {
            booked: HashMap::new(),
        }
    }

    /// Is the campsite free for the whole stay?
    pub fn is_free(&self, campsite_id: &Uuid, stay: &StayRange) -> bool {
        match self.booked.get(campsite_id) {
            Some(ranges) => !ranges.iter().any(|(_, r)| r.overlaps(stay)),
            None => true,
        }
    }

    /// Block a stay for a booking. Idempotent per booking id, so replaying
    /// a fan-out never double-blocks.
    pub fn block(
        &mut self,
        campsite_id: Uuid,
        booking_id: Uuid,
        stay: StayRange,
    ) -> Result<(), AvailabilityError> {
        let ranges = self.booked.entry(campsite_id).or_default();

        if ranges.iter().any(|(id, _)| *id == booking_id) {
            return Ok(());
        }
        if ranges.iter().any(|(_, r)| r.overlaps(&stay)) {
            return Err(AvailabilityError::Conflict {
                campsite_id: campsite_id.to_string(),
            });
        }

        ranges.push((booking_id, stay));
        Ok(())
    }

    /// Release the dates held by a booking (cancellation).
    pub fn release(&mut self, campsite_id: &Uuid, booking_id: &Uuid) -> usize {
        match self.booked.get_mut(campsite_id) {
            Some(ranges) => {
                let before = ranges.len();
                ranges.retain(|(id, _)| id != booking_id);
                before - ranges.len()
            }
            None => 0,
        }
    }

    pub fn booked_count(&self, campsite_id: &Uuid) -> usize {
        self.booked.get(campsite_id).map_or(0, |r| r.len())
    }
}

impl Default for AvailabilityCalendar {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Campsite {campsite_id} already booked for an overlapping stay")]
    Conflict { campsite_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stay(from: &str, to: &str) -> StayRange {
        StayRange::new(
            NaiveDate::parse_from_str(from, "%Y-%m-%d").unwrap(),
            NaiveDate::parse_from_str(to, "%Y-%m-%d").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_block_and_conflict() {
        let mut cal = AvailabilityCalendar::new();
        let site = Uuid::new_v4();

        cal.block(site, Uuid::new_v4(), stay("2026-07-01", "2026-07-04"))
            .unwrap();

        // Overlapping stay is rejected
        let result = cal.block(site, Uuid::new_v4(), stay("2026-07-03", "2026-07-05"));
        assert!(result.is_err());

        // Back-to-back stay is fine
        cal.block(site, Uuid::new_v4(), stay("2026-07-04", "2026-07-06"))
            .unwrap();
        assert_eq!(cal.booked_count(&site), 2);
    }

    #[test]
    fn test_block_is_idempotent_per_booking() {
        let mut cal = AvailabilityCalendar::new();
        let site = Uuid::new_v4();
        let booking = Uuid::new_v4();
        let range = stay("2026-07-01", "2026-07-04");

        cal.block(site, booking, range).unwrap();
        // Fan-out replay: same booking id blocks the same dates without error
        cal.block(site, booking, range).unwrap();
        assert_eq!(cal.booked_count(&site), 1);
    }

    #[test]
    fn test_release_frees_dates() {
        let mut cal = AvailabilityCalendar::new();
        let site = Uuid::new_v4();
        let booking = Uuid::new_v4();
        let range = stay("2026-07-01", "2026-07-04");

        cal.block(site, booking, range).unwrap();
        assert!(!cal.is_free(&site, &range));

        assert_eq!(cal.release(&site, &booking), 1);
        assert!(cal.is_free(&site, &range));
    }
}
