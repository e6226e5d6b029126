//! Editorial cooking guides

use chrono::Utc;
use resepi_common::db::Guide;
use resepi_common::slug::{slugify, unique_slug};
use resepi_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

pub async fn list_published_guides(pool: &SqlitePool) -> Result<Vec<Guide>> {
    let guides = sqlx::query_as::<_, Guide>(
        "SELECT * FROM guides WHERE published = 1 ORDER BY created_at DESC, title",
    )
    .fetch_all(pool)
    .await?;
    Ok(guides)
}

pub async fn list_all_guides(pool: &SqlitePool) -> Result<Vec<Guide>> {
    let guides = sqlx::query_as::<_, Guide>("SELECT * FROM guides ORDER BY updated_at DESC, title")
        .fetch_all(pool)
        .await?;
    Ok(guides)
}

pub async fn get_guide(pool: &SqlitePool, guid: &str) -> Result<Option<Guide>> {
    let guide = sqlx::query_as::<_, Guide>("SELECT * FROM guides WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;
    Ok(guide)
}

pub async fn get_published_guide_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Guide>> {
    let guide = sqlx::query_as::<_, Guide>("SELECT * FROM guides WHERE slug = ? AND published = 1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(guide)
}

pub async fn create_guide(pool: &SqlitePool, title: &str, body: &str, published: bool) -> Result<Guide> {
    let guid = Uuid::new_v4().to_string();
    let slug = unique_slug(pool, "guides", title, None).await?;
    let now = Utc::now().naive_utc();

    sqlx::query(
        "INSERT INTO guides (guid, slug, title, body, published, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&guid)
    .bind(&slug)
    .bind(title.trim())
    .bind(body.trim())
    .bind(published)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    info!(guide_id = %guid, slug = %slug, "Created guide");

    get_guide(pool, &guid)
        .await?
        .ok_or_else(|| Error::Internal(format!("Guide vanished after insert: {}", guid)))
}

pub async fn update_guide(pool: &SqlitePool, guid: &str, title: &str, body: &str, published: bool) -> Result<Guide> {
    let existing = get_guide(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Guide {}", guid)))?;

    let slug = if slugify(title) == existing.slug {
        existing.slug
    } else {
        unique_slug(pool, "guides", title, Some(guid)).await?
    };

    sqlx::query("UPDATE guides SET slug = ?, title = ?, body = ?, published = ?, updated_at = ? WHERE guid = ?")
        .bind(&slug)
        .bind(title.trim())
        .bind(body.trim())
        .bind(published)
        .bind(Utc::now().naive_utc())
        .bind(guid)
        .execute(pool)
        .await?;

    get_guide(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Guide {}", guid)))
}

pub async fn delete_guide(pool: &SqlitePool, guid: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM guides WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Guide {}", guid)));
    }
    Ok(())
}
