use mate_core::booking::StayRange;
use redis::{AsyncCommands, RedisResult};
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Try to hold a campsite/date-range for one guest while they pay.
    /// SET NX: first caller wins, everyone else gets a conflict until the
    /// TTL expires or the hold is released.
    pub async fn acquire_stay_hold(
        &self,
        campsite_id: &Uuid,
        stay: &StayRange,
        session_id: &str,
        ttl_seconds: u64,
    ) -> Result<bool, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = hold_key(campsite_id, stay);

        let result: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(session_id)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;

        if result.is_some() {
            info!("Stay hold set: {} -> {}", key, session_id);
        }
        Ok(result.is_some())
    }

    pub async fn release_stay_hold(
        &self,
        campsite_id: &Uuid,
        stay: &StayRange,
    ) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del(hold_key(campsite_id, stay)).await
    }

    /// Cached booked-ranges JSON for calendar rendering.
    pub async fn get_cached_availability(
        &self,
        campsite_id: &Uuid,
    ) -> RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(availability_key(campsite_id)).await
    }

    pub async fn cache_availability(
        &self,
        campsite_id: &Uuid,
        payload: &str,
        ttl_seconds: u64,
    ) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(availability_key(campsite_id), payload, ttl_seconds)
            .await
    }

    /// Dropped whenever a booking lands on the campsite; the next read
    /// re-seeds from Postgres.
    pub async fn invalidate_availability(&self, campsite_id: &Uuid) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del(availability_key(campsite_id)).await
    }

    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: i64,
        window_seconds: i64,
    ) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

fn hold_key(campsite_id: &Uuid, stay: &StayRange) -> String {
    format!(
        "hold:site:{}:{}:{}",
        campsite_id, stay.check_in, stay.check_out
    )
}

fn availability_key(campsite_id: &Uuid) -> String {
    format!("site:{}:availability", campsite_id)
}
