use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

/// Reconciliation counters exposed at /metrics.
pub struct Metrics {
    registry: Registry,
    pub bookings_created: IntCounter,
    pub bookings_duplicate: IntCounter,
    pub reconcile_failures: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let bookings_created = IntCounter::new(
            "mate_bookings_created_total",
            "Bookings created by payment-session reconciliation",
        )?;
        let bookings_duplicate = IntCounter::new(
            "mate_bookings_duplicate_total",
            "Reconciliation calls absorbed as duplicates",
        )?;
        let reconcile_failures = IntCounter::new(
            "mate_reconcile_failures_total",
            "Reconciliation calls rejected or errored",
        )?;

        registry.register(Box::new(bookings_created.clone()))?;
        registry.register(Box::new(bookings_duplicate.clone()))?;
        registry.register(Box::new(reconcile_failures.clone()))?;

        Ok(Self {
            registry,
            bookings_created,
            bookings_duplicate,
            reconcile_failures,
        })
    }

    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            tracing::error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_render() {
        let metrics = Metrics::new().unwrap();
        metrics.bookings_created.inc();
        metrics.bookings_duplicate.inc();
        metrics.bookings_duplicate.inc();

        let text = metrics.render();
        assert!(text.contains("mate_bookings_created_total 1"));
        assert!(text.contains("mate_bookings_duplicate_total 2"));
    }
}
