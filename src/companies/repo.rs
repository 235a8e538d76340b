use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::jobs::repo::Job;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields of a partial update; `None` leaves the column unchanged.
#[derive(Debug, Default)]
pub struct CompanyChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
}

/// `%term%` for ILIKE, with the user's own wildcards escaped.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl Company {
    pub async fn get(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, description, website, created_at, updated_at
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(company)
    }

    /// All companies, or those whose name or description contains `search`.
    pub async fn list(db: &PgPool, search: Option<&str>) -> sqlx::Result<Vec<Company>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(contains_pattern);
        let rows = sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, description, website, created_at, updated_at
            FROM companies
            WHERE $1::text IS NULL
               OR name ILIKE $1
               OR description ILIKE $1
            ORDER BY name ASC
            "#,
        )
        .bind(pattern)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn create(
        db: &PgPool,
        name: &str,
        description: Option<&str>,
        website: Option<&str>,
    ) -> sqlx::Result<Company> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, description, website)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, website, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(website)
        .fetch_one(db)
        .await?;
        Ok(company)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        changes: CompanyChanges,
    ) -> sqlx::Result<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
               SET name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   website = COALESCE($4, website),
                   updated_at = now()
             WHERE id = $1
            RETURNING id, name, description, website, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.website)
        .fetch_optional(db)
        .await?;
        Ok(company)
    }

    /// Returns whether a row was removed. Jobs go with it (ON DELETE CASCADE).
    pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn jobs(db: &PgPool, id: Uuid) -> sqlx::Result<Vec<Job>> {
        Job::list_by_company(db, id).await
    }
}
