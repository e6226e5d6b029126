//! Saved-recipe collections

use resepi_common::Result;
use sqlx::SqlitePool;

/// Save a recipe; saving twice is a no-op
pub async fn save_recipe(pool: &SqlitePool, user_id: &str, recipe_id: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO saved_recipes (user_id, recipe_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn unsave_recipe(pool: &SqlitePool, user_id: &str, recipe_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM saved_recipes WHERE user_id = ? AND recipe_id = ?")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn is_saved(pool: &SqlitePool, user_id: &str, recipe_id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM saved_recipes WHERE user_id = ? AND recipe_id = ?")
        .bind(user_id)
        .bind(recipe_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}
