/// Tag model
///
/// Tags are free-form labels attached to webrings and used by search. A label
/// row is created the first time any webring uses it.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    /// Normalised label, unique
    pub label: String,
}

impl Tag {
    /// Returns the tag with this label, creating it if needed
    pub async fn find_or_create(
        conn: &mut PgConnection,
        label: &str,
    ) -> Result<Self, sqlx::Error> {
        // The no-op update makes RETURNING yield the existing row on conflict
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (id, label)
            VALUES ($1, $2)
            ON CONFLICT (label) DO UPDATE SET label = EXCLUDED.label
            RETURNING id, label
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(label)
        .fetch_one(conn)
        .await?;

        Ok(tag)
    }

    /// Links a tag to a webring; linking twice is a no-op
    pub async fn attach(
        conn: &mut PgConnection,
        webring_id: Uuid,
        tag_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO webring_tags (webring_id, tag_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(webring_id)
        .bind(tag_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Tags of a webring, alphabetically
    pub async fn list_by_webring(
        pool: &PgPool,
        webring_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.label
            FROM tags t
            JOIN webring_tags wt ON wt.tag_id = t.id
            WHERE wt.webring_id = $1
            ORDER BY t.label ASC
            "#,
        )
        .bind(webring_id)
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }
}
