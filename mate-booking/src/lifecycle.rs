use mate_core::booking::BookingStatus;

/// Validates booking state transitions.
///
/// Pending -> Confirmed -> CheckedIn -> Completed, with Cancelled reachable
/// from Pending and Confirmed only. Reconciliation always lands a booking
/// in Confirmed; everything after that is guest/owner driven.
pub struct BookingLifecycle;

impl BookingLifecycle {
    pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (from, to),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, CheckedIn)
                | (Confirmed, Cancelled)
                | (CheckedIn, Completed)
        )
    }

    pub fn transition(
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<BookingStatus, LifecycleError> {
        if Self::can_transition(from, to) {
            Ok(to)
        } else {
            Err(LifecycleError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }

    /// May the guest still cancel?
    pub fn cancellable(status: BookingStatus) -> bool {
        Self::can_transition(status, BookingStatus::Cancelled)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use mate_core::booking::BookingStatus::*;

    #[test]
    fn test_happy_path() {
        let s = BookingLifecycle::transition(Pending, Confirmed).unwrap();
        let s = BookingLifecycle::transition(s, CheckedIn).unwrap();
        let s = BookingLifecycle::transition(s, Completed).unwrap();
        assert_eq!(s, Completed);
    }

    #[test]
    fn test_cancellation_rules() {
        assert!(BookingLifecycle::cancellable(Pending));
        assert!(BookingLifecycle::cancellable(Confirmed));
        assert!(!BookingLifecycle::cancellable(CheckedIn));
        assert!(!BookingLifecycle::cancellable(Completed));
        assert!(!BookingLifecycle::cancellable(Cancelled));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(BookingLifecycle::transition(Pending, Completed).is_err());
        assert!(BookingLifecycle::transition(Cancelled, Confirmed).is_err());
        assert!(BookingLifecycle::transition(Completed, CheckedIn).is_err());
    }
}
