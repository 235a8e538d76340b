use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::companies::repo::contains_pattern;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub company_id: Option<Uuid>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub job_type: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Job {
    pub async fn list(db: &PgPool, limit: i64, offset: i64) -> sqlx::Result<Vec<Job>> {
        let rows = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, title, description, company_id, location, salary_range, job_type,
                   created_at, updated_at
            FROM jobs
            ORDER BY created_at DESC, id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn get(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, title, description, company_id, location, salary_range, job_type,
                   created_at, updated_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(job)
    }

    /// Case-insensitive substring match on title or description.
    pub async fn search(db: &PgPool, query: &str, limit: i64) -> sqlx::Result<Vec<Job>> {
        let rows = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, title, description, company_id, location, salary_range, job_type,
                   created_at, updated_at
            FROM jobs
            WHERE title ILIKE $1 OR description ILIKE $1
            ORDER BY created_at DESC, id
            LIMIT $2
            "#,
        )
        .bind(contains_pattern(query))
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_by_company(db: &PgPool, company_id: Uuid) -> sqlx::Result<Vec<Job>> {
        let rows = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, title, description, company_id, location, salary_range, job_type,
                   created_at, updated_at
            FROM jobs
            WHERE company_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(company_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
