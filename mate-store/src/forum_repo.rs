use chrono::{DateTime, Utc};
use mate_core::repository::RepoError;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgForumRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ThreadRow {
    id: Uuid,
    author_id: Uuid,
    title: String,
    body: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    thread_id: Uuid,
    author_id: Uuid,
    body: String,
    created_at: DateTime<Utc>,
}

impl PgForumRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_thread(
        &self,
        author_id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<Uuid, RepoError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO forum_threads (id, author_id, title, body) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(author_id)
        .bind(title)
        .bind(body)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn list_threads(&self, limit: i64) -> Result<Vec<Value>, RepoError> {
        let rows: Vec<ThreadRow> = sqlx::query_as(
            "SELECT id, author_id, title, body, created_at FROM forum_threads \
             ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|t| {
                serde_json::json!({
                    "id": t.id,
                    "author_id": t.author_id,
                    "title": t.title,
                    "body": t.body,
                    "created_at": t.created_at.to_rfc3339(),
                })
            })
            .collect())
    }

    pub async fn get_thread(&self, id: Uuid) -> Result<Option<Value>, RepoError> {
        let thread: Option<ThreadRow> = sqlx::query_as(
            "SELECT id, author_id, title, body, created_at FROM forum_threads WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(thread) = thread else {
            return Ok(None);
        };

        let posts: Vec<PostRow> = sqlx::query_as(
            "SELECT id, thread_id, author_id, body, created_at FROM forum_posts \
             WHERE thread_id = $1 ORDER BY created_at",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let posts: Vec<Value> = posts
            .into_iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id,
                    "thread_id": p.thread_id,
                    "author_id": p.author_id,
                    "body": p.body,
                    "created_at": p.created_at.to_rfc3339(),
                })
            })
            .collect();

        Ok(Some(serde_json::json!({
            "id": thread.id,
            "author_id": thread.author_id,
            "title": thread.title,
            "body": thread.body,
            "created_at": thread.created_at.to_rfc3339(),
            "posts": posts,
        })))
    }

    pub async fn add_post(
        &self,
        thread_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<Option<Uuid>, RepoError> {
        // Reject posts to a missing thread without relying on the FK error
        let exists = sqlx::query("SELECT 1 FROM forum_threads WHERE id = $1")
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO forum_posts (id, thread_id, author_id, body) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(thread_id)
        .bind(author_id)
        .bind(body)
        .execute(&self.pool)
        .await?;
        Ok(Some(id))
    }
}
