use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// TTL of the Redis date-range hold placed at checkout
    pub stay_hold_seconds: u64,
    pub tax_rate: f64,
    pub booking_fee_cents: i32,
    #[serde(default = "default_multiplier")]
    pub seasonal_multiplier: f64,
    pub sale_start: Option<String>, // ISO 8601
    pub sale_end: Option<String>,   // ISO 8601
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub consumer_group: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Env vars, e.g. MATE__SERVER__PORT=8080
            .add_source(config::Environment::with_prefix("MATE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
