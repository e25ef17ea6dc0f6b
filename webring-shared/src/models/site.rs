/// Site model and database operations
///
/// ```sql
/// CREATE TABLE sites (
///     id UUID PRIMARY KEY,
///     name VARCHAR(100) NOT NULL,
///     url VARCHAR(2048) NOT NULL,
///     webring_id UUID NOT NULL REFERENCES webrings (id) ON DELETE CASCADE,
///     added_by UUID NOT NULL REFERENCES users (id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (webring_id, url)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// A member entry of exactly one webring
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Site {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub webring_id: Uuid,
    /// User who added the site
    pub added_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateSite {
    pub name: String,
    pub url: String,
    pub webring_id: Uuid,
    pub added_by: Uuid,
}

impl Site {
    pub async fn create(pool: &PgPool, data: CreateSite) -> Result<Self, sqlx::Error> {
        let site = sqlx::query_as::<_, Site>(
            r#"
            INSERT INTO sites (id, name, url, webring_id, added_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, url, webring_id, added_by, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.name)
        .bind(data.url)
        .bind(data.webring_id)
        .bind(data.added_by)
        .fetch_one(pool)
        .await?;

        Ok(site)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let site = sqlx::query_as::<_, Site>(
            r#"
            SELECT id, name, url, webring_id, added_by, created_at
            FROM sites
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(site)
    }

    pub async fn find_by_webring_and_url(
        pool: &PgPool,
        webring_id: Uuid,
        url: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let site = sqlx::query_as::<_, Site>(
            r#"
            SELECT id, name, url, webring_id, added_by, created_at
            FROM sites
            WHERE webring_id = $1 AND url = $2
            "#,
        )
        .bind(webring_id)
        .bind(url)
        .fetch_optional(pool)
        .await?;

        Ok(site)
    }

    /// Lists a webring's sites in the order they were added
    pub async fn list_by_webring(
        pool: &PgPool,
        webring_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sites = sqlx::query_as::<_, Site>(
            r#"
            SELECT id, name, url, webring_id, added_by, created_at
            FROM sites
            WHERE webring_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(webring_id)
        .fetch_all(pool)
        .await?;

        Ok(sites)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sites WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
