/// Webring model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE webrings (
///     id UUID PRIMARY KEY,
///     url VARCHAR(64) NOT NULL UNIQUE,
///     name VARCHAR(100) NOT NULL,
///     owner_id UUID NOT NULL REFERENCES users (id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Deleting a webring cascades to its sites and tag links.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::tag::Tag;

/// A named collection of member sites, addressed by its unique url slug
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Webring {
    pub id: Uuid,

    /// Normalised slug, unique across all webrings
    pub url: String,

    pub name: String,

    pub owner_id: Uuid,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateWebring {
    pub url: String,
    pub name: String,
    pub owner_id: Uuid,
}

pub const DEFAULT_SEARCH_LIMIT: i64 = 20;
pub const MAX_SEARCH_LIMIT: i64 = 100;

/// Filter for `Webring::search`
///
/// `term` matches webring name, url and member site names case-insensitively;
/// `tag` must be a normalised label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebringSearch {
    pub term: Option<String>,
    pub tag: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for WebringSearch {
    fn default() -> Self {
        Self {
            term: None,
            tag: None,
            limit: DEFAULT_SEARCH_LIMIT,
            offset: 0,
        }
    }
}

impl Webring {
    /// Inserts a webring and links its tags in a single transaction
    pub async fn create(
        pool: &PgPool,
        data: CreateWebring,
        tags: &[String],
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let webring = sqlx::query_as::<_, Webring>(
            r#"
            INSERT INTO webrings (id, url, name, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, url, name, owner_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.url)
        .bind(data.name)
        .bind(data.owner_id)
        .fetch_one(&mut *tx)
        .await?;

        for label in tags {
            let tag = Tag::find_or_create(&mut *tx, label).await?;
            Tag::attach(&mut *tx, webring.id, tag.id).await?;
        }

        tx.commit().await?;

        Ok(webring)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let webring = sqlx::query_as::<_, Webring>(
            r#"
            SELECT id, url, name, owner_id, created_at
            FROM webrings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(webring)
    }

    pub async fn find_by_url(pool: &PgPool, url: &str) -> Result<Option<Self>, sqlx::Error> {
        let webring = sqlx::query_as::<_, Webring>(
            r#"
            SELECT id, url, name, owner_id, created_at
            FROM webrings
            WHERE url = $1
            "#,
        )
        .bind(url)
        .fetch_optional(pool)
        .await?;

        Ok(webring)
    }

    /// Deletes a webring together with its sites and tag links
    ///
    /// Returns false if the webring did not exist.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM webrings WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Searches webrings, newest first
    pub async fn search(pool: &PgPool, search: &WebringSearch) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = search
            .term
            .as_deref()
            .map(|term| format!("%{}%", escape_like(term)));

        let webrings = sqlx::query_as::<_, Webring>(
            r#"
            SELECT w.id, w.url, w.name, w.owner_id, w.created_at
            FROM webrings w
            WHERE ($1::TEXT IS NULL
                   OR w.name ILIKE $1
                   OR w.url ILIKE $1
                   OR EXISTS (
                       SELECT 1 FROM sites s
                       WHERE s.webring_id = w.id AND s.name ILIKE $1
                   ))
              AND ($2::TEXT IS NULL
                   OR EXISTS (
                       SELECT 1 FROM webring_tags wt
                       JOIN tags t ON t.id = wt.tag_id
                       WHERE wt.webring_id = w.id AND t.label = $2
                   ))
            ORDER BY w.created_at DESC, w.id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(pattern)
        .bind(search.tag.as_deref())
        .bind(search.limit)
        .bind(search.offset)
        .fetch_all(pool)
        .await?;

        Ok(webrings)
    }
}

/// Escapes LIKE wildcards so user input is matched literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
