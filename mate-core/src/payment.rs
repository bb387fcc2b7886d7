use crate::booking::StayRange;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutSessionStatus {
    Open,
    Completed,
    Expired,
}

/// A payment-provider checkout session. The provider-issued `id` is the
/// idempotency key for booking creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String, // Provider's ID (e.g., cs_123)
    pub guest_id: Uuid,
    pub campground_id: Uuid,
    pub campsite_id: Uuid,
    pub stay: StayRange,
    pub amount_cents: i32,
    pub currency: String,
    pub status: CheckoutSessionStatus,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Open a checkout session with the provider for a quoted stay.
    async fn create_session(
        &self,
        session: &CheckoutSession,
    ) -> Result<CheckoutSession, Box<dyn std::error::Error + Send + Sync>>;

    /// Retrieve a session by provider id. `Ok(None)` when the provider
    /// does not know the id.
    async fn get_session(
        &self,
        session_id: &str,
    ) -> Result<Option<CheckoutSession>, Box<dyn std::error::Error + Send + Sync>>;
}

/// In-memory provider used in development and tests. Sessions created
/// through it are immediately retrievable; tests flip `status` to simulate
/// completed or expired checkouts.
pub struct MockPaymentProvider {
    sessions: std::sync::Mutex<std::collections::HashMap<String, CheckoutSession>>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self {
            sessions: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    pub fn put_session(&self, session: CheckoutSession) {
        self.sessions
            .lock()
            .expect("mock provider lock poisoned")
            .insert(session.id.clone(), session);
    }

    pub fn complete_session(&self, session_id: &str) {
        if let Some(s) = self
            .sessions
            .lock()
            .expect("mock provider lock poisoned")
            .get_mut(session_id)
        {
            s.status = CheckoutSessionStatus::Completed;
        }
    }
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_session(
        &self,
        session: &CheckoutSession,
    ) -> Result<CheckoutSession, Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!("Mock checkout session created: {}", session.id);
        self.put_session(session.clone());
        Ok(session.clone())
    }

    async fn get_session(
        &self,
        session_id: &str,
    ) -> Result<Option<CheckoutSession>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .sessions
            .lock()
            .expect("mock provider lock poisoned")
            .get(session_id)
            .cloned())
    }
}
