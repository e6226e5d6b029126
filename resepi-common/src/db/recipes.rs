//! Recipe write operations shared by the web admin and the drafts tool

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::db::models::{Difficulty, Recipe, RecipeStatus, Tag};
use crate::slug::{slugify, unique_slug, unique_slug_conn};
use crate::{Error, Result};

/// Upper bound for prep and cook minutes
pub const MAX_MINUTES: i64 = 10_000;
pub const MAX_SERVINGS: i64 = 100;

/// Validated recipe fields for insert or update
#[derive(Debug, Clone)]
pub struct RecipeInput {
    pub title: String,
    pub summary: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub prep_minutes: Option<i64>,
    pub cook_minutes: Option<i64>,
    pub servings: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub category_id: Option<String>,
    pub tags: Vec<String>,
}

pub async fn get_recipe(pool: &SqlitePool, guid: &str) -> Result<Option<Recipe>> {
    let recipe = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;
    Ok(recipe)
}

/// Insert a new recipe with its tags; returns the stored row
pub async fn insert_recipe(
    pool: &SqlitePool,
    input: &RecipeInput,
    status: RecipeStatus,
    author_id: Option<&str>,
) -> Result<Recipe> {
    let mut tx = pool.begin().await?;
    let guid = insert_recipe_tx(&mut tx, input, status, author_id).await?;
    tx.commit().await?;

    get_recipe(pool, &guid)
        .await?
        .ok_or_else(|| Error::Internal(format!("Recipe vanished after insert: {}", guid)))
}

/// Insert a recipe inside a caller's transaction; returns the new guid
///
/// The row is written under its guid first and slugged afterwards, so the
/// slug lookup runs while this transaction holds the write lock.
pub async fn insert_recipe_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    input: &RecipeInput,
    status: RecipeStatus,
    author_id: Option<&str>,
) -> Result<String> {
    let guid = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();
    let published_at = (status == RecipeStatus::Published).then_some(now);

    sqlx::query(
        r#"
        INSERT INTO recipes (
            guid, slug, title, summary, ingredients, instructions,
            prep_minutes, cook_minutes, servings, difficulty, category_id,
            author_id, status, published_at, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(&guid)
    .bind(input.title.trim())
    .bind(input.summary.trim())
    .bind(input.ingredients.join("\n"))
    .bind(input.instructions.join("\n"))
    .bind(input.prep_minutes)
    .bind(input.cook_minutes)
    .bind(input.servings)
    .bind(input.difficulty)
    .bind(&input.category_id)
    .bind(author_id)
    .bind(status)
    .bind(published_at)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    let slug = unique_slug_conn(&mut **tx, "recipes", &input.title, Some(&guid)).await?;
    sqlx::query("UPDATE recipes SET slug = ? WHERE guid = ?")
        .bind(&slug)
        .bind(&guid)
        .execute(&mut **tx)
        .await?;

    set_recipe_tags_tx(tx, &guid, &input.tags).await?;

    debug!(recipe_id = %guid, slug = %slug, "Inserted recipe");

    Ok(guid)
}

/// Update content fields and tags of an existing recipe
///
/// The slug follows the title but stays unique; status is untouched.
pub async fn update_recipe(pool: &SqlitePool, guid: &str, input: &RecipeInput) -> Result<Recipe> {
    let existing = get_recipe(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Recipe {}", guid)))?;

    let slug = if slugify(&input.title) == existing.slug {
        existing.slug.clone()
    } else {
        unique_slug(pool, "recipes", &input.title, Some(guid)).await?
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE recipes SET
            slug = ?, title = ?, summary = ?, ingredients = ?, instructions = ?,
            prep_minutes = ?, cook_minutes = ?, servings = ?, difficulty = ?,
            category_id = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&slug)
    .bind(input.title.trim())
    .bind(input.summary.trim())
    .bind(input.ingredients.join("\n"))
    .bind(input.instructions.join("\n"))
    .bind(input.prep_minutes)
    .bind(input.cook_minutes)
    .bind(input.servings)
    .bind(input.difficulty)
    .bind(&input.category_id)
    .bind(Utc::now().naive_utc())
    .bind(guid)
    .execute(&mut *tx)
    .await?;

    set_recipe_tags_tx(&mut tx, guid, &input.tags).await?;

    tx.commit().await?;

    get_recipe(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Recipe {}", guid)))
}

/// Change publication status; `published_at` is set on first publish only
pub async fn set_recipe_status(pool: &SqlitePool, guid: &str, status: RecipeStatus) -> Result<()> {
    let now = Utc::now().naive_utc();
    let result = sqlx::query(
        r#"
        UPDATE recipes SET
            status = ?,
            published_at = CASE
                WHEN ? = 'published' AND published_at IS NULL THEN ?
                ELSE published_at
            END,
            updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(status)
    .bind(status.as_str())
    .bind(now)
    .bind(now)
    .bind(guid)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Recipe {}", guid)));
    }
    Ok(())
}

/// Fill in missing time/difficulty columns without touching set values
pub async fn fill_recipe_gaps(
    pool: &SqlitePool,
    guid: &str,
    prep_minutes: Option<i64>,
    cook_minutes: Option<i64>,
    difficulty: Option<Difficulty>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE recipes SET
            prep_minutes = COALESCE(prep_minutes, ?),
            cook_minutes = COALESCE(cook_minutes, ?),
            difficulty = COALESCE(difficulty, ?),
            updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(prep_minutes)
    .bind(cook_minutes)
    .bind(difficulty)
    .bind(Utc::now().naive_utc())
    .bind(guid)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Find or create a tag by display name (case-insensitive)
async fn ensure_tag_tx(tx: &mut sqlx::SqliteConnection, name: &str) -> Result<Tag> {
    if let Some(tag) = sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE name = ? COLLATE NOCASE")
        .bind(name)
        .fetch_optional(&mut *tx)
        .await?
    {
        return Ok(tag);
    }

    let mut base = slugify(name);
    if base.is_empty() {
        base = "tag".to_string();
    }
    let mut slug = base.clone();
    let mut suffix = 2;
    loop {
        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE slug = ?")
            .bind(&slug)
            .fetch_one(&mut *tx)
            .await?;
        if taken == 0 {
            break;
        }
        slug = format!("{}-{}", base, suffix);
        suffix += 1;
    }

    let tag = Tag {
        guid: Uuid::new_v4().to_string(),
        name: name.to_string(),
        slug,
    };

    sqlx::query("INSERT INTO tags (guid, name, slug) VALUES (?, ?, ?)")
        .bind(&tag.guid)
        .bind(&tag.name)
        .bind(&tag.slug)
        .execute(&mut *tx)
        .await?;

    Ok(tag)
}

async fn set_recipe_tags_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    recipe_id: &str,
    tags: &[String],
) -> Result<()> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;

    for name in normalize_tag_names(tags) {
        let tag = ensure_tag_tx(&mut **tx, &name).await?;
        sqlx::query("INSERT OR IGNORE INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(&tag.guid)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

/// Trim, drop blanks and case-insensitive duplicates, keep first spelling
pub fn normalize_tag_names(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .map(|t| t.trim().trim_start_matches('#').trim().to_string())
        .filter(|t| !t.is_empty() && t.chars().count() <= 50)
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect()
}

/// Split a comma-separated tag field
pub fn parse_tag_list(text: &str) -> Vec<String> {
    normalize_tag_names(&text.split(',').map(str::to_string).collect::<Vec<_>>())
}

/// Category id for a display name (case-insensitive), if one exists
pub async fn find_category_id_by_name(conn: &mut sqlx::SqliteConnection, name: &str) -> Result<Option<String>> {
    let id = sqlx::query_scalar::<_, String>(
        "SELECT guid FROM categories WHERE name = ? COLLATE NOCASE OR slug = ?",
    )
    .bind(name.trim())
    .bind(slugify(name))
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn tags_for_recipe(pool: &SqlitePool, recipe_id: &str) -> Result<Vec<Tag>> {
    let tags = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.* FROM tags t
        JOIN recipe_tags rt ON rt.tag_id = t.guid
        WHERE rt.recipe_id = ?
        ORDER BY t.name COLLATE NOCASE
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tag_names_dedupes_case_insensitively() {
        let tags = vec![
            " Pedas ".to_string(),
            "pedas".to_string(),
            "#Ayam".to_string(),
            "".to_string(),
        ];
        assert_eq!(normalize_tag_names(&tags), vec!["Pedas", "Ayam"]);
    }

    #[test]
    fn test_parse_tag_list() {
        assert_eq!(parse_tag_list("kek, coklat,, Kek "), vec!["kek", "coklat"]);
        assert!(parse_tag_list("  ").is_empty());
    }
}
