pub mod availability;
pub mod campground;
pub mod pricing;

pub use availability::{AvailabilityCalendar, AvailabilityError};
pub use campground::{Campground, Campsite};
pub use pricing::{QuoteEngine, QuoteRules, StayQuote};
