use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bookable listing owned by a verified platform owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campground {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub base_price_cents: i32,
    pub currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single pitch within a campground. Price falls back to the campground
/// base price when not set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campsite {
    pub id: Uuid,
    pub campground_id: Uuid,
    pub name: String,
    pub capacity: i32,
    pub price_cents: Option<i32>,
    pub is_active: bool,
}

impl Campsite {
    pub fn nightly_price(&self, campground: &Campground) -> i32 {
        self.price_cents.unwrap_or(campground.base_price_cents)
    }
}
