use chrono::{DateTime, Utc};
use mate_core::repository::RepoError;
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct PgUserRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: Uuid,
    user_id: Uuid,
    business_name: String,
    message: Option<String>,
    status: String,
    submitted_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
    decided_by: Option<String>,
}

impl ApplicationRow {
    fn into_json(self) -> Value {
        serde_json::json!({
            "id": self.id,
            "user_id": self.user_id,
            "business_name": self.business_name,
            "message": self.message,
            "status": self.status,
            "submitted_at": self.submitted_at.to_rfc3339(),
            "decided_at": self.decided_at.map(|t| t.to_rfc3339()),
            "decided_by": self.decided_by,
        })
    }
}

const APPLICATION_COLUMNS: &str =
    "id, user_id, business_name, message, status, submitted_at, decided_at, decided_by";

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert the user row from JWT claims. First sight of a subject
    /// creates the record; later sights refresh the email.
    pub async fn ensure_user(
        &self,
        id: Uuid,
        email: Option<&str>,
        role: &str,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
                SET email = COALESCE(EXCLUDED.email, users.email), updated_at = NOW()
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_role(&self, id: Uuid) -> Result<Option<String>, RepoError> {
        let row = sqlx::query("SELECT role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("role")))
    }

    pub async fn submit_owner_application(
        &self,
        user_id: Uuid,
        business_name: &str,
        message: Option<&str>,
    ) -> Result<Uuid, RepoError> {
        let id = Uuid::new_v4();
        // The partial unique index rejects a second PENDING application
        sqlx::query(
            r#"
            INSERT INTO owner_applications (id, user_id, business_name, message)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(business_name)
        .bind(message)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn latest_application_for(&self, user_id: Uuid) -> Result<Option<Value>, RepoError> {
        let row: Option<ApplicationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM owner_applications WHERE user_id = $1 \
             ORDER BY submitted_at DESC LIMIT 1",
            APPLICATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ApplicationRow::into_json))
    }

    pub async fn list_pending_applications(&self) -> Result<Vec<Value>, RepoError> {
        let rows: Vec<ApplicationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM owner_applications WHERE status = 'PENDING' ORDER BY submitted_at",
            APPLICATION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ApplicationRow::into_json).collect())
    }

    /// Approve or reject an application. Approval promotes the applicant
    /// to OWNER in the same transaction.
    pub async fn decide_application(
        &self,
        application_id: Uuid,
        approve: bool,
        decided_by: &str,
    ) -> Result<Option<Value>, RepoError> {
        let mut tx = self.pool.begin().await?;

        let status = if approve { "APPROVED" } else { "REJECTED" };
        let row: Option<ApplicationRow> = sqlx::query_as(&format!(
            "UPDATE owner_applications \
             SET status = $1, decided_at = NOW(), decided_by = $2 \
             WHERE id = $3 AND status = 'PENDING' \
             RETURNING {}",
            APPLICATION_COLUMNS
        ))
        .bind(status)
        .bind(decided_by)
        .bind(application_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(app) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        if approve {
            sqlx::query("UPDATE users SET role = 'OWNER', updated_at = NOW() WHERE id = $1")
                .bind(app.user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(Some(app.into_json()))
    }
}
