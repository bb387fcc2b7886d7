use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mate_core::booking::{Booking, BookingStatus, StayRange};
use mate_core::repository::{BookingRepository, InsertOutcome, RepoError};
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Platform analytics for the admin dashboard.
    pub async fn platform_summary(&self) -> Result<Value, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM bookings) AS total_bookings,
                (SELECT COUNT(*) FROM bookings WHERE status = 'CONFIRMED') AS confirmed_bookings,
                (SELECT COALESCE(SUM(total_cents), 0) FROM bookings
                    WHERE status IN ('CONFIRMED', 'CHECKED_IN', 'COMPLETED')) AS revenue_cents,
                (SELECT COUNT(*) FROM campgrounds WHERE is_active) AS active_campgrounds,
                (SELECT COUNT(*) FROM users WHERE role = 'OWNER') AS owners,
                (SELECT COUNT(*) FROM owner_applications WHERE status = 'PENDING') AS pending_applications
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(serde_json::json!({
            "total_bookings": row.get::<i64, _>("total_bookings"),
            "confirmed_bookings": row.get::<i64, _>("confirmed_bookings"),
            "revenue_cents": row.get::<i64, _>("revenue_cents"),
            "active_campgrounds": row.get::<i64, _>("active_campgrounds"),
            "owners": row.get::<i64, _>("owners"),
            "pending_applications": row.get::<i64, _>("pending_applications"),
        }))
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    payment_session_id: String,
    guest_id: Uuid,
    campground_id: Uuid,
    campsite_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
    total_cents: i32,
    currency: String,
    status: String,
    fanout_complete: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, RepoError> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| format!("unknown booking status in DB: {}", self.status))?;
        Ok(Booking {
            id: self.id,
            payment_session_id: self.payment_session_id,
            guest_id: self.guest_id,
            campground_id: self.campground_id,
            campsite_id: self.campsite_id,
            stay: StayRange {
                check_in: self.check_in,
                check_out: self.check_out,
            },
            total_cents: self.total_cents,
            currency: self.currency,
            status,
            fanout_complete: self.fanout_complete,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const BOOKING_COLUMNS: &str = "id, payment_session_id, guest_id, campground_id, campsite_id, \
     check_in, check_out, total_cents, currency, status, fanout_complete, created_at, updated_at";

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn find_by_session(&self, session_id: &str) -> Result<Option<Booking>, RepoError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE payment_session_id = $1",
            BOOKING_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, RepoError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn insert(&self, booking: &Booking) -> Result<InsertOutcome, RepoError> {
        // The unique index on payment_session_id is the idempotency anchor:
        // concurrent inserts for the same session leave exactly one row.
        let result = sqlx::query(
            r#"
            INSERT INTO bookings (id, payment_session_id, guest_id, campground_id, campsite_id,
                check_in, check_out, total_cents, currency, status, fanout_complete, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (payment_session_id) DO NOTHING
            "#,
        )
        .bind(booking.id)
        .bind(&booking.payment_session_id)
        .bind(booking.guest_id)
        .bind(booking.campground_id)
        .bind(booking.campsite_id)
        .bind(booking.stay.check_in)
        .bind(booking.stay.check_out)
        .bind(booking.total_cents)
        .bind(&booking.currency)
        .bind(booking.status.to_string())
        .bind(booking.fanout_complete)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::DuplicateSession)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn apply_fanout(&self, booking: &Booking) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;

        // booked_dates is keyed by booking id, so a replay is a no-op
        sqlx::query(
            r#"
            INSERT INTO booked_dates (booking_id, campsite_id, check_in, check_out)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (booking_id) DO NOTHING
            "#,
        )
        .bind(booking.id)
        .bind(booking.campsite_id)
        .bind(booking.stay.check_in)
        .bind(booking.stay.check_out)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE campgrounds SET updated_at = NOW() WHERE id = $1")
            .bind(booking.campground_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn mark_fanout_complete(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("UPDATE bookings SET fanout_complete = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_fanout_pending(&self, limit: i64) -> Result<Vec<Booking>, RepoError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE NOT fanout_complete AND status = 'CONFIRMED' \
             ORDER BY created_at ASC LIMIT $1",
            BOOKING_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn list_for_guest(&self, guest_id: Uuid) -> Result<Vec<Booking>, RepoError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE guest_id = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(guest_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn update_status(&self, id: Uuid, status: &str) -> Result<(), RepoError> {
        sqlx::query("UPDATE bookings SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn cancel(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut tx = self.pool.begin().await?;

        // Guarded update: a concurrent check-in between the caller's read
        // and this statement makes it a no-op instead of an overwrite
        let result = sqlx::query(
            r#"
            UPDATE bookings SET status = 'CANCELLED', updated_at = NOW()
            WHERE id = $1 AND status IN ('PENDING', 'CONFIRMED')
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        // Free the dates so the calendar and overlap checks agree again
        sqlx::query("DELETE FROM booked_dates WHERE booking_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
