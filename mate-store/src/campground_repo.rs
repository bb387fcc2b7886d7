use chrono::{DateTime, Utc};
use mate_core::booking::StayRange;
use mate_core::repository::RepoError;
use mate_catalog::{Campground, Campsite};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct PgCampgroundRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct CampgroundRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    description: Option<String>,
    location: String,
    base_price_cents: i32,
    currency: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CampgroundRow> for Campground {
    fn from(r: CampgroundRow) -> Self {
        Campground {
            id: r.id,
            owner_id: r.owner_id,
            name: r.name,
            description: r.description,
            location: r.location,
            base_price_cents: r.base_price_cents,
            currency: r.currency,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CampsiteRow {
    id: Uuid,
    campground_id: Uuid,
    name: String,
    capacity: i32,
    price_cents: Option<i32>,
    is_active: bool,
}

impl From<CampsiteRow> for Campsite {
    fn from(r: CampsiteRow) -> Self {
        Campsite {
            id: r.id,
            campground_id: r.campground_id,
            name: r.name,
            capacity: r.capacity,
            price_cents: r.price_cents,
            is_active: r.is_active,
        }
    }
}

const CAMPGROUND_COLUMNS: &str = "id, owner_id, name, description, location, base_price_cents, \
     currency, is_active, created_at, updated_at";

impl PgCampgroundRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, campground: &Campground) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO campgrounds (id, owner_id, name, description, location,
                base_price_cents, currency, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(campground.id)
        .bind(campground.owner_id)
        .bind(&campground.name)
        .bind(&campground.description)
        .bind(&campground.location)
        .bind(campground.base_price_cents)
        .bind(&campground.currency)
        .bind(campground.is_active)
        .bind(campground.created_at)
        .bind(campground.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update(&self, campground: &Campground) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            UPDATE campgrounds
            SET name = $1, description = $2, location = $3, base_price_cents = $4,
                is_active = $5, updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(&campground.name)
        .bind(&campground.description)
        .bind(&campground.location)
        .bind(campground.base_price_cents)
        .bind(campground.is_active)
        .bind(campground.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Campground>, RepoError> {
        let row: Option<CampgroundRow> = sqlx::query_as(&format!(
            "SELECT {} FROM campgrounds WHERE id = $1",
            CAMPGROUND_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn list_active(&self, location: Option<&str>) -> Result<Vec<Campground>, RepoError> {
        let rows: Vec<CampgroundRow> = match location {
            Some(loc) => {
                sqlx::query_as(&format!(
                    "SELECT {} FROM campgrounds WHERE is_active AND location ILIKE $1 \
                     ORDER BY created_at DESC",
                    CAMPGROUND_COLUMNS
                ))
                .bind(format!("%{}%", loc))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {} FROM campgrounds WHERE is_active ORDER BY created_at DESC",
                    CAMPGROUND_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<Campground>, RepoError> {
        let rows: Vec<CampgroundRow> = sqlx::query_as(&format!(
            "SELECT {} FROM campgrounds WHERE owner_id = $1 ORDER BY created_at DESC",
            CAMPGROUND_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn add_campsite(&self, campsite: &Campsite) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO campsites (id, campground_id, name, capacity, price_cents, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(campsite.id)
        .bind(campsite.campground_id)
        .bind(&campsite.name)
        .bind(campsite.capacity)
        .bind(campsite.price_cents)
        .bind(campsite.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_campsite(&self, id: Uuid) -> Result<Option<Campsite>, RepoError> {
        let row: Option<CampsiteRow> = sqlx::query_as(
            "SELECT id, campground_id, name, capacity, price_cents, is_active \
             FROM campsites WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn list_campsites(&self, campground_id: Uuid) -> Result<Vec<Campsite>, RepoError> {
        let rows: Vec<CampsiteRow> = sqlx::query_as(
            "SELECT id, campground_id, name, capacity, price_cents, is_active \
             FROM campsites WHERE campground_id = $1 AND is_active ORDER BY name",
        )
        .bind(campground_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Authoritative availability check against the bookings table itself,
    /// not booked_dates, so confirmed bookings whose fan-out is still
    /// pending already block the dates.
    pub async fn has_overlapping_booking(
        &self,
        campsite_id: Uuid,
        stay: &StayRange,
    ) -> Result<bool, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM bookings
                WHERE campsite_id = $1
                  AND status IN ('CONFIRMED', 'CHECKED_IN')
                  AND check_in < $3 AND $2 < check_out
            ) AS taken
            "#,
        )
        .bind(campsite_id)
        .bind(stay.check_in)
        .bind(stay.check_out)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<bool, _>("taken"))
    }

    /// Booked ranges for a campsite, for calendar rendering.
    pub async fn booked_ranges(&self, campsite_id: Uuid) -> Result<Vec<StayRange>, RepoError> {
        let rows = sqlx::query(
            "SELECT check_in, check_out FROM booked_dates WHERE campsite_id = $1 ORDER BY check_in",
        )
        .bind(campsite_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| StayRange {
                check_in: r.get("check_in"),
                check_out: r.get("check_out"),
            })
            .collect())
    }
}
