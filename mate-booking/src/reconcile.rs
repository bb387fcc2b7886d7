use async_trait::async_trait;
use chrono::Utc;
use mate_core::booking::{Booking, BookingStatus};
use mate_core::payment::{CheckoutSessionStatus, PaymentProvider};
use mate_core::repository::{BookingRepository, InsertOutcome, RepoError};
use std::sync::Arc;
use uuid::Uuid;

/// Side effects that accompany a confirmed booking: the confirmation event,
/// hold release, availability cache drop. Runs inside the retryable fan-out,
/// so implementations must tolerate being called more than once per booking.
#[async_trait]
pub trait ConfirmationNotifier: Send + Sync {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<(), RepoError>;
}

/// Result of reconciling a payment session. `AlreadyRecorded` covers both
/// duplicate client calls and the losing side of a concurrent insert race.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    Created(Booking),
    AlreadyRecorded(Booking),
}

impl ReconcileOutcome {
    pub fn booking(&self) -> &Booking {
        match self {
            ReconcileOutcome::Created(b) => b,
            ReconcileOutcome::AlreadyRecorded(b) => b,
        }
    }

    pub fn already_recorded(&self) -> bool {
        matches!(self, ReconcileOutcome::AlreadyRecorded(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Payment session not found: {0}")]
    SessionNotFound(String),

    #[error("Payment session {session_id} is not completed (status {status})")]
    SessionNotPaid { session_id: String, status: String },

    #[error("Payment session does not belong to this guest")]
    GuestMismatch,

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Booking store error: {0}")]
    Store(String),

    #[error("Confirmation fan-out error: {0}")]
    Notify(String),
}

/// Converts a completed checkout session into exactly one persisted booking.
///
/// Idempotency holds at three layers:
/// 1. a fast-path lookup by session id absorbs duplicate client calls;
/// 2. the store's insert deduplicates on the unique session id, so of two
///    concurrent racers exactly one inserts and the other re-reads;
/// 3. fan-out (booked-dates record, confirmation event, cache drops) is
///    applied after the insert, keyed by booking id, and left retryable
///    when any step fails.
pub struct Reconciler {
    store: Arc<dyn BookingRepository>,
    provider: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn ConfirmationNotifier>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn BookingRepository>,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn ConfirmationNotifier>,
    ) -> Self {
        Self {
            store,
            provider,
            notifier,
        }
    }

    pub async fn reconcile(
        &self,
        session_id: &str,
        guest_id: Uuid,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        // 1. Fast path: duplicate submission for an already-persisted booking
        if let Some(existing) = self
            .store
            .find_by_session(session_id)
            .await
            .map_err(|e| ReconcileError::Store(e.to_string()))?
        {
            if existing.guest_id != guest_id {
                return Err(ReconcileError::GuestMismatch);
            }
            tracing::info!(
                "Session {} already reconciled to booking {}",
                session_id,
                existing.id
            );
            return Ok(ReconcileOutcome::AlreadyRecorded(existing));
        }

        // 2. Verify the session with the provider
        let session = self
            .provider
            .get_session(session_id)
            .await
            .map_err(|e| ReconcileError::Provider(e.to_string()))?
            .ok_or_else(|| ReconcileError::SessionNotFound(session_id.to_string()))?;

        if session.guest_id != guest_id {
            return Err(ReconcileError::GuestMismatch);
        }
        if session.status != CheckoutSessionStatus::Completed {
            return Err(ReconcileError::SessionNotPaid {
                session_id: session_id.to_string(),
                status: format!("{:?}", session.status),
            });
        }

        // 3. Insert, deduplicating on the session id
        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            payment_session_id: session.id.clone(),
            guest_id: session.guest_id,
            campground_id: session.campground_id,
            campsite_id: session.campsite_id,
            stay: session.stay,
            total_cents: session.amount_cents,
            currency: session.currency.clone(),
            status: BookingStatus::Confirmed,
            fanout_complete: false,
            created_at: now,
            updated_at: now,
        };

        match self
            .store
            .insert(&booking)
            .await
            .map_err(|e| ReconcileError::Store(e.to_string()))?
        {
            InsertOutcome::Inserted => {}
            InsertOutcome::DuplicateSession => {
                // Lost the race: the winner's row is authoritative
                let winner = self
                    .store
                    .find_by_session(session_id)
                    .await
                    .map_err(|e| ReconcileError::Store(e.to_string()))?
                    .ok_or_else(|| {
                        ReconcileError::Store(format!(
                            "insert reported duplicate but no booking found for session {}",
                            session_id
                        ))
                    })?;
                tracing::info!(
                    "Lost insert race for session {}, returning booking {}",
                    session_id,
                    winner.id
                );
                return Ok(ReconcileOutcome::AlreadyRecorded(winner));
            }
        }

        // 4. Fan-out. Failure here is not fatal: the booking exists and the
        // worker will replay the fan-out until it completes.
        match self.apply_fanout(&booking).await {
            Ok(()) => {
                tracing::info!("Booking {} reconciled with fan-out complete", booking.id);
                let mut done = booking;
                done.fanout_complete = true;
                Ok(ReconcileOutcome::Created(done))
            }
            Err(e) => {
                tracing::warn!(
                    "Booking {} persisted but fan-out pending: {}",
                    booking.id,
                    e
                );
                Ok(ReconcileOutcome::Created(booking))
            }
        }
    }

    /// Replay fan-out for bookings that were persisted without completing
    /// their reference updates. Called by the background worker.
    pub async fn retry_pending(&self, limit: i64) -> Result<usize, ReconcileError> {
        let pending = self
            .store
            .list_fanout_pending(limit)
            .await
            .map_err(|e| ReconcileError::Store(e.to_string()))?;

        let mut completed = 0;
        for booking in &pending {
            match self.apply_fanout(booking).await {
                Ok(()) => completed += 1,
                Err(e) => {
                    tracing::warn!("Fan-out retry for booking {} failed: {}", booking.id, e)
                }
            }
        }
        Ok(completed)
    }

    /// All fan-out steps run before `fanout_complete` is set, so a failure
    /// anywhere leaves the booking on the retry scan. Replays are safe: the
    /// booked-dates insert is keyed by booking id and the notifier's event
    /// and cache drops are idempotent per booking.
    async fn apply_fanout(&self, booking: &Booking) -> Result<(), ReconcileError> {
        self.store
            .apply_fanout(booking)
            .await
            .map_err(|e| ReconcileError::Store(e.to_string()))?;
        self.notifier
            .booking_confirmed(booking)
            .await
            .map_err(|e| ReconcileError::Notify(e.to_string()))?;
        self.store
            .mark_fanout_complete(booking.id)
            .await
            .map_err(|e| ReconcileError::Store(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mate_core::booking::StayRange;
    use mate_core::payment::{CheckoutSession, MockPaymentProvider};
    use mate_core::repository::RepoError;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MemoryStore {
        bookings: Mutex<HashMap<Uuid, Booking>>,
        booked_dates: Mutex<HashSet<Uuid>>,
        fail_fanout: AtomicBool,
        fanout_applied: AtomicUsize,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                bookings: Mutex::new(HashMap::new()),
                booked_dates: Mutex::new(HashSet::new()),
                fail_fanout: AtomicBool::new(false),
                fanout_applied: AtomicUsize::new(0),
            }
        }
    }

    struct RecordingNotifier {
        fail: AtomicBool,
        published: AtomicUsize,
    }

    impl RecordingNotifier {
        fn new() -> Self {
            Self {
                fail: AtomicBool::new(false),
                published: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ConfirmationNotifier for RecordingNotifier {
        async fn booking_confirmed(&self, _booking: &Booking) -> Result<(), RepoError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err("event broker unavailable".into());
            }
            self.published.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl BookingRepository for MemoryStore {
        async fn find_by_session(&self, session_id: &str) -> Result<Option<Booking>, RepoError> {
            Ok(self
                .bookings
                .lock()
                .unwrap()
                .values()
                .find(|b| b.payment_session_id == session_id)
                .cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, RepoError> {
            Ok(self.bookings.lock().unwrap().get(&id).cloned())
        }

        async fn insert(&self, booking: &Booking) -> Result<InsertOutcome, RepoError> {
            let mut bookings = self.bookings.lock().unwrap();
            if bookings
                .values()
                .any(|b| b.payment_session_id == booking.payment_session_id)
            {
                return Ok(InsertOutcome::DuplicateSession);
            }
            bookings.insert(booking.id, booking.clone());
            Ok(InsertOutcome::Inserted)
        }

        async fn apply_fanout(&self, booking: &Booking) -> Result<(), RepoError> {
            if self.fail_fanout.load(Ordering::SeqCst) {
                return Err("booked_dates insert failed".into());
            }
            if self.booked_dates.lock().unwrap().insert(booking.id) {
                self.fanout_applied.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }

        async fn mark_fanout_complete(&self, id: Uuid) -> Result<(), RepoError> {
            if let Some(b) = self.bookings.lock().unwrap().get_mut(&id) {
                b.fanout_complete = true;
            }
            Ok(())
        }

        async fn list_fanout_pending(&self, limit: i64) -> Result<Vec<Booking>, RepoError> {
            Ok(self
                .bookings
                .lock()
                .unwrap()
                .values()
                .filter(|b| !b.fanout_complete)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn list_for_guest(&self, guest_id: Uuid) -> Result<Vec<Booking>, RepoError> {
            Ok(self
                .bookings
                .lock()
                .unwrap()
                .values()
                .filter(|b| b.guest_id == guest_id)
                .cloned()
                .collect())
        }

        async fn update_status(&self, id: Uuid, status: &str) -> Result<(), RepoError> {
            if let Some(b) = self.bookings.lock().unwrap().get_mut(&id) {
                b.status = BookingStatus::parse(status).ok_or("unknown status")?;
            }
            Ok(())
        }

        async fn cancel(&self, id: Uuid) -> Result<bool, RepoError> {
            let mut bookings = self.bookings.lock().unwrap();
            match bookings.get_mut(&id) {
                Some(b)
                    if b.status == BookingStatus::Pending
                        || b.status == BookingStatus::Confirmed =>
                {
                    b.status = BookingStatus::Cancelled;
                    self.booked_dates.lock().unwrap().remove(&id);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    fn completed_session(guest_id: Uuid) -> CheckoutSession {
        CheckoutSession {
            id: format!("cs_{}", Uuid::new_v4().simple()),
            guest_id,
            campground_id: Uuid::new_v4(),
            campsite_id: Uuid::new_v4(),
            stay: StayRange::new(
                NaiveDate::parse_from_str("2026-07-01", "%Y-%m-%d").unwrap(),
                NaiveDate::parse_from_str("2026-07-04", "%Y-%m-%d").unwrap(),
            )
            .unwrap(),
            amount_cents: 15350,
            currency: "USD".to_string(),
            status: CheckoutSessionStatus::Completed,
            created_at: Utc::now(),
        }
    }

    fn setup(session: &CheckoutSession) -> (Arc<MemoryStore>, Arc<RecordingNotifier>, Reconciler) {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(MockPaymentProvider::new());
        provider.put_session(session.clone());
        let notifier = Arc::new(RecordingNotifier::new());
        let reconciler = Reconciler::new(store.clone(), provider, notifier.clone());
        (store, notifier, reconciler)
    }

    #[tokio::test]
    async fn test_duplicate_calls_create_one_booking() {
        let guest = Uuid::new_v4();
        let session = completed_session(guest);
        let (store, _, reconciler) = setup(&session);

        let first = reconciler.reconcile(&session.id, guest).await.unwrap();
        assert!(!first.already_recorded());

        let second = reconciler.reconcile(&session.id, guest).await.unwrap();
        assert!(second.already_recorded());
        assert_eq!(second.booking().id, first.booking().id);

        assert_eq!(store.bookings.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_converge() {
        let guest = Uuid::new_v4();
        let session = completed_session(guest);
        let (store, _, reconciler) = setup(&session);
        let reconciler = Arc::new(reconciler);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let r = reconciler.clone();
            let sid = session.id.clone();
            handles.push(tokio::spawn(async move { r.reconcile(&sid, guest).await }));
        }

        let mut booking_ids = Vec::new();
        for h in handles {
            booking_ids.push(h.await.unwrap().unwrap().booking().id);
        }

        // All callers see the same booking, and only one row exists
        assert!(booking_ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.bookings.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_session_rejected() {
        let guest = Uuid::new_v4();
        let session = completed_session(guest);
        let (_, _, reconciler) = setup(&session);

        let err = reconciler.reconcile("cs_missing", guest).await.unwrap_err();
        assert!(matches!(err, ReconcileError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_open_session_rejected() {
        let guest = Uuid::new_v4();
        let mut session = completed_session(guest);
        session.status = CheckoutSessionStatus::Open;
        let (store, _, reconciler) = setup(&session);

        let err = reconciler.reconcile(&session.id, guest).await.unwrap_err();
        assert!(matches!(err, ReconcileError::SessionNotPaid { .. }));
        assert!(store.bookings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guest_mismatch_rejected() {
        let guest = Uuid::new_v4();
        let session = completed_session(guest);
        let (_, _, reconciler) = setup(&session);

        let err = reconciler
            .reconcile(&session.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::GuestMismatch));

        // Also after the booking exists (fast path)
        reconciler.reconcile(&session.id, guest).await.unwrap();
        let err = reconciler
            .reconcile(&session.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::GuestMismatch));
    }

    #[tokio::test]
    async fn test_fanout_failure_keeps_booking_retryable() {
        let guest = Uuid::new_v4();
        let session = completed_session(guest);
        let (store, _, reconciler) = setup(&session);

        store.fail_fanout.store(true, Ordering::SeqCst);
        let outcome = reconciler.reconcile(&session.id, guest).await.unwrap();

        // Booking persisted despite fan-out failure
        assert!(!outcome.already_recorded());
        assert!(!outcome.booking().fanout_complete);
        assert_eq!(store.fanout_applied.load(Ordering::SeqCst), 0);

        // Worker retry completes the fan-out exactly once
        store.fail_fanout.store(false, Ordering::SeqCst);
        assert_eq!(reconciler.retry_pending(10).await.unwrap(), 1);
        assert_eq!(store.fanout_applied.load(Ordering::SeqCst), 1);
        assert_eq!(reconciler.retry_pending(10).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_event_publish_failure_keeps_fanout_retryable() {
        let guest = Uuid::new_v4();
        let session = completed_session(guest);
        let (store, notifier, reconciler) = setup(&session);

        // Dates land but the confirmation event cannot be published
        notifier.fail.store(true, Ordering::SeqCst);
        let outcome = reconciler.reconcile(&session.id, guest).await.unwrap();
        assert!(!outcome.booking().fanout_complete);
        assert_eq!(notifier.published.load(Ordering::SeqCst), 0);

        // The worker replays the whole fan-out until the event goes out
        notifier.fail.store(false, Ordering::SeqCst);
        assert_eq!(reconciler.retry_pending(10).await.unwrap(), 1);
        assert_eq!(notifier.published.load(Ordering::SeqCst), 1);

        // Once complete, neither the worker nor a duplicate success call
        // publishes again
        assert_eq!(reconciler.retry_pending(10).await.unwrap(), 0);
        let dup = reconciler.reconcile(&session.id, guest).await.unwrap();
        assert!(dup.already_recorded());
        assert_eq!(notifier.published.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_frees_booked_dates() {
        let guest = Uuid::new_v4();
        let session = completed_session(guest);
        let (store, _, reconciler) = setup(&session);

        let booking_id = reconciler
            .reconcile(&session.id, guest)
            .await
            .unwrap()
            .booking()
            .id;
        assert!(store.booked_dates.lock().unwrap().contains(&booking_id));

        assert!(store.cancel(booking_id).await.unwrap());
        assert!(store.booked_dates.lock().unwrap().is_empty());
        assert_eq!(
            store.find_by_id(booking_id).await.unwrap().unwrap().status,
            BookingStatus::Cancelled
        );

        // Cancelling a cancelled booking is a no-op
        assert!(!store.cancel(booking_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_yields_to_concurrent_checkin() {
        let guest = Uuid::new_v4();
        let session = completed_session(guest);
        let (store, _, reconciler) = setup(&session);

        let booking_id = reconciler
            .reconcile(&session.id, guest)
            .await
            .unwrap()
            .booking()
            .id;

        // The owner checked the guest in between the caller's read and the
        // cancel; the guarded update must not overwrite it
        store.update_status(booking_id, "CHECKED_IN").await.unwrap();
        assert!(!store.cancel(booking_id).await.unwrap());
        assert_eq!(
            store.find_by_id(booking_id).await.unwrap().unwrap().status,
            BookingStatus::CheckedIn
        );
        assert!(store.booked_dates.lock().unwrap().contains(&booking_id));
    }
}
