//! Recipe image rows and the primary-image flag
//!
//! At most one image per recipe is primary (enforced by a partial unique
//! index); every flag change clears the old primary first inside one
//! transaction.

use chrono::Utc;
use resepi_common::db::RecipeImage;
use resepi_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;

/// Columns for a new image row; files are already on disk
#[derive(Debug, Clone)]
pub struct NewImage {
    pub guid: String,
    pub recipe_id: String,
    pub original_path: String,
    pub medium_path: String,
    pub thumbnail_path: String,
    pub width: u32,
    pub height: u32,
    pub alt_text: String,
}

pub async fn images_for_recipe(pool: &SqlitePool, recipe_id: &str) -> Result<Vec<RecipeImage>> {
    let images = sqlx::query_as::<_, RecipeImage>(
        "SELECT * FROM recipe_images WHERE recipe_id = ? ORDER BY is_primary DESC, created_at, guid",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;
    Ok(images)
}

pub async fn get_image(pool: &SqlitePool, guid: &str) -> Result<Option<RecipeImage>> {
    let image = sqlx::query_as::<_, RecipeImage>("SELECT * FROM recipe_images WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;
    Ok(image)
}

/// Insert an image; it becomes primary when requested or when it is the
/// recipe's first image
pub async fn insert_image(pool: &SqlitePool, image: &NewImage, make_primary: bool) -> Result<RecipeImage> {
    let mut tx = pool.begin().await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipe_images WHERE recipe_id = ?")
        .bind(&image.recipe_id)
        .fetch_one(&mut *tx)
        .await?;
    let primary = make_primary || existing == 0;

    if primary {
        sqlx::query("UPDATE recipe_images SET is_primary = 0 WHERE recipe_id = ? AND is_primary = 1")
            .bind(&image.recipe_id)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO recipe_images (
            guid, recipe_id, original_path, medium_path, thumbnail_path,
            width, height, alt_text, is_primary, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&image.guid)
    .bind(&image.recipe_id)
    .bind(&image.original_path)
    .bind(&image.medium_path)
    .bind(&image.thumbnail_path)
    .bind(image.width as i64)
    .bind(image.height as i64)
    .bind(image.alt_text.trim())
    .bind(primary)
    .bind(Utc::now().naive_utc())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(image_id = %image.guid, recipe_id = %image.recipe_id, primary, "Stored recipe image");

    get_image(pool, &image.guid)
        .await?
        .ok_or_else(|| Error::Internal(format!("Image vanished after insert: {}", image.guid)))
}

/// Move the primary flag to `guid`; returns the image
pub async fn set_primary(pool: &SqlitePool, guid: &str) -> Result<RecipeImage> {
    let image = get_image(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Image {}", guid)))?;

    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE recipe_images SET is_primary = 0 WHERE recipe_id = ? AND is_primary = 1")
        .bind(&image.recipe_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE recipe_images SET is_primary = 1 WHERE guid = ?")
        .bind(guid)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(RecipeImage {
        is_primary: true,
        ..image
    })
}

/// Delete an image row; promotes the oldest remaining image when the
/// deleted one was primary. Returns the deleted row for file cleanup.
pub async fn delete_image(pool: &SqlitePool, guid: &str) -> Result<RecipeImage> {
    let image = get_image(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Image {}", guid)))?;

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM recipe_images WHERE guid = ?")
        .bind(guid)
        .execute(&mut *tx)
        .await?;

    if image.is_primary {
        sqlx::query(
            r#"
            UPDATE recipe_images SET is_primary = 1
            WHERE guid = (
                SELECT guid FROM recipe_images WHERE recipe_id = ?
                ORDER BY created_at, guid LIMIT 1
            )
            "#,
        )
        .bind(&image.recipe_id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!(image_id = %guid, recipe_id = %image.recipe_id, "Deleted recipe image");
    Ok(image)
}
