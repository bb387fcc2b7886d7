use chrono::{DateTime, Utc};
use mate_core::booking::StayRange;
use serde::{Deserialize, Serialize};

/// Business rules that feed a quote. Loaded from config with optional DB
/// overrides (see mate-store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRules {
    pub tax_rate: f64,
    pub booking_fee_cents: i32,
    #[serde(default = "default_multiplier")]
    pub seasonal_multiplier: f64,
    /// Sale window outside of which the multiplier is ignored. ISO 8601.
    pub sale_start: Option<String>,
    pub sale_end: Option<String>,
}

fn default_multiplier() -> f64 {
    1.0
}

impl Default for QuoteRules {
    fn default() -> Self {
        Self {
            tax_rate: 0.0,
            booking_fee_cents: 0,
            seasonal_multiplier: 1.0,
            sale_start: None,
            sale_end: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StayQuote {
    pub nights: i64,
    pub base_cents: i64,
    pub taxes_cents: i64,
    pub fee_cents: i64,
    pub total_cents: i64,
}

/// Quotes a stay: nights x nightly price, seasonal adjustment inside the
/// sale window, then taxes and the flat booking fee.
pub struct QuoteEngine {
    rules: QuoteRules,
}

impl QuoteEngine {
    pub fn new(rules: QuoteRules) -> Self {
        Self { rules }
    }

    pub fn quote(&self, nightly_price_cents: i32, stay: &StayRange) -> StayQuote {
        self.quote_at(nightly_price_cents, stay, Utc::now())
    }

    /// Deterministic variant for tests: the sale window is evaluated
    /// against `now` rather than the wall clock.
    pub fn quote_at(
        &self,
        nightly_price_cents: i32,
        stay: &StayRange,
        now: DateTime<Utc>,
    ) -> StayQuote {
        let nights = stay.nights();
        let raw_base = nights * nightly_price_cents as i64;

        let multiplier = if self.sale_active(now) {
            self.rules.seasonal_multiplier
        } else {
            1.0
        };

        let base = ((raw_base as f64) * multiplier).round() as i64;
        let base = base.max(0);
        let taxes = ((base as f64) * self.rules.tax_rate).round() as i64;
        let fee = self.rules.booking_fee_cents as i64;

        StayQuote {
            nights,
            base_cents: base,
            taxes_cents: taxes,
            fee_cents: fee,
            total_cents: base + taxes + fee,
        }
    }

    fn sale_active(&self, now: DateTime<Utc>) -> bool {
        if let Some(start_str) = &self.rules.sale_start {
            if let Ok(start) = DateTime::parse_from_rfc3339(start_str) {
                if now < start.with_timezone(&Utc) {
                    return false;
                }
            }
        }
        if let Some(end_str) = &self.rules.sale_end {
            if let Ok(end) = DateTime::parse_from_rfc3339(end_str) {
                if now > end.with_timezone(&Utc) {
                    return false;
                }
            }
        }
        true
    }
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
    fn test_quote_basic() {
        let engine = QuoteEngine::new(QuoteRules {
            tax_rate: 0.1,
            booking_fee_cents: 500,
            ..Default::default()
        });

        // 3 nights at $45.00
        let quote = engine.quote(4500, &stay("2026-07-01", "2026-07-04"));
        assert_eq!(quote.nights, 3);
        assert_eq!(quote.base_cents, 13500);
        assert_eq!(quote.taxes_cents, 1350);
        assert_eq!(quote.fee_cents, 500);
        assert_eq!(quote.total_cents, 15350);
    }

    #[test]
    fn test_seasonal_multiplier_respects_sale_window() {
        let engine = QuoteEngine::new(QuoteRules {
            seasonal_multiplier: 0.8,
            sale_start: Some("2026-06-01T00:00:00Z".to_string()),
            sale_end: Some("2026-06-30T00:00:00Z".to_string()),
            ..Default::default()
        });
        let range = stay("2026-07-01", "2026-07-03");

        let inside = "2026-06-15T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let outside = "2026-08-15T12:00:00Z".parse::<DateTime<Utc>>().unwrap();

        assert_eq!(engine.quote_at(5000, &range, inside).base_cents, 8000);
        assert_eq!(engine.quote_at(5000, &range, outside).base_cents, 10000);
    }

    #[test]
    fn test_quote_never_negative() {
        let engine = QuoteEngine::new(QuoteRules {
            seasonal_multiplier: -2.0, // Misconfigured rule
            ..Default::default()
        });

        let quote = engine.quote(4500, &stay("2026-07-01", "2026-07-02"));
        assert_eq!(quote.base_cents, 0);
        assert_eq!(quote.total_cents, 0);
    }
}
