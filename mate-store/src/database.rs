use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, Row};
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Business rules live in config, with per-key overrides in the
    /// `business_rules` table so admins can adjust without redeploying.
    /// Expected row format: {"value": <number/string>}.
    pub async fn fetch_business_rules(
        &self,
        defaults: crate::app_config::BusinessRules,
    ) -> Result<crate::app_config::BusinessRules, sqlx::Error> {
        let rows = sqlx::query("SELECT rule_key, rule_value FROM business_rules")
            .fetch_all(&self.pool)
            .await?;

        let mut rules = defaults;

        for row in rows {
            let rule_key: String = row.get("rule_key");
            let rule_value: Value = row.get("rule_value");

            if let Some(v) = rule_value.get("value") {
                match rule_key.as_str() {
                    "tax_rate" => {
                        if let Some(f) = v.as_f64() {
                            rules.tax_rate = f;
                        }
                    }
                    "booking_fee_cents" => {
                        if let Some(i) = v.as_i64() {
                            rules.booking_fee_cents = i as i32;
                        }
                    }
                    "seasonal_multiplier" => {
                        if let Some(f) = v.as_f64() {
                            rules.seasonal_multiplier = f;
                        }
                    }
                    "stay_hold_seconds" => {
                        if let Some(u) = v.as_u64() {
                            rules.stay_hold_seconds = u;
                        }
                    }
                    "sale_start" => {
                        if let Some(s) = v.as_str() {
                            rules.sale_start = Some(String::from(s));
                        }
                    }
                    "sale_end" => {
                        if let Some(s) = v.as_str() {
                            rules.sale_end = Some(String::from(s));
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(rules)
    }
}
