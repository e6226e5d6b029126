//! Categories and tags

use resepi_common::db::{Category, Tag};
use resepi_common::slug::unique_slug;
use resepi_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

/// Category with its published recipe count
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryWithCount {
    pub guid: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub sort_order: i64,
    pub recipe_count: i64,
}

pub async fn list_categories(pool: &SqlitePool) -> Result<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories ORDER BY sort_order, name COLLATE NOCASE",
    )
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

pub async fn list_categories_with_counts(pool: &SqlitePool) -> Result<Vec<CategoryWithCount>> {
    let categories = sqlx::query_as::<_, CategoryWithCount>(
        r#"
        SELECT c.guid, c.name, c.slug, c.description, c.sort_order,
               COUNT(r.guid) AS recipe_count
        FROM categories c
        LEFT JOIN recipes r ON r.category_id = c.guid AND r.status = 'published'
        GROUP BY c.guid
        ORDER BY c.sort_order, c.name COLLATE NOCASE
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

pub async fn get_category(pool: &SqlitePool, guid: &str) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;
    Ok(category)
}

pub async fn get_category_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(category)
}

fn map_unique(err: sqlx::Error, name: &str) -> Error {
    let err = Error::from(err);
    if err.is_unique_violation() {
        Error::Conflict(format!("Category \"{}\" already exists", name))
    } else {
        err
    }
}

pub async fn create_category(pool: &SqlitePool, name: &str, description: &str, sort_order: i64) -> Result<Category> {
    let guid = Uuid::new_v4().to_string();
    let slug = unique_slug(pool, "categories", name, None).await?;

    sqlx::query("INSERT INTO categories (guid, name, slug, description, sort_order) VALUES (?, ?, ?, ?, ?)")
        .bind(&guid)
        .bind(name.trim())
        .bind(&slug)
        .bind(description.trim())
        .bind(sort_order)
        .execute(pool)
        .await
        .map_err(|e| map_unique(e, name))?;

    info!(category_id = %guid, slug = %slug, "Created category");

    get_category(pool, &guid)
        .await?
        .ok_or_else(|| Error::Internal(format!("Category vanished after insert: {}", guid)))
}

pub async fn update_category(
    pool: &SqlitePool,
    guid: &str,
    name: &str,
    description: &str,
    sort_order: i64,
) -> Result<Category> {
    let existing = get_category(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Category {}", guid)))?;

    let slug = if existing.name == name.trim() {
        existing.slug
    } else {
        unique_slug(pool, "categories", name, Some(guid)).await?
    };

    sqlx::query("UPDATE categories SET name = ?, slug = ?, description = ?, sort_order = ? WHERE guid = ?")
        .bind(name.trim())
        .bind(&slug)
        .bind(description.trim())
        .bind(sort_order)
        .bind(guid)
        .execute(pool)
        .await
        .map_err(|e| map_unique(e, name))?;

    get_category(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Category {}", guid)))
}

/// Delete a category; its recipes become uncategorised
pub async fn delete_category(pool: &SqlitePool, guid: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM categories WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Category {}", guid)));
    }
    info!(category_id = %guid, "Deleted category");
    Ok(())
}

pub async fn get_tag_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Tag>> {
    let tag = sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(tag)
}

/// Tag with the number of recipes (any status) using it
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TagWithCount {
    pub guid: String,
    pub name: String,
    pub slug: String,
    pub recipe_count: i64,
}

pub async fn list_tags_with_counts(pool: &SqlitePool) -> Result<Vec<TagWithCount>> {
    let tags = sqlx::query_as::<_, TagWithCount>(
        r#"
        SELECT t.guid, t.name, t.slug, COUNT(rt.recipe_id) AS recipe_count
        FROM tags t
        LEFT JOIN recipe_tags rt ON rt.tag_id = t.guid
        GROUP BY t.guid
        ORDER BY t.name COLLATE NOCASE
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(tags)
}

/// Rename a tag; the slug follows the new name
pub async fn rename_tag(pool: &SqlitePool, guid: &str, name: &str) -> Result<()> {
    let slug = unique_slug(pool, "tags", name, Some(guid)).await?;

    let result = sqlx::query("UPDATE tags SET name = ?, slug = ? WHERE guid = ?")
        .bind(name.trim())
        .bind(&slug)
        .bind(guid)
        .execute(pool)
        .await
        .map_err(|e| {
            let err = Error::from(e);
            if err.is_unique_violation() {
                Error::Conflict(format!("Tag \"{}\" already exists", name.trim()))
            } else {
                err
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Tag {}", guid)));
    }
    info!(tag_id = %guid, slug = %slug, "Renamed tag");
    Ok(())
}

/// Delete a tag; recipe links go with it
pub async fn delete_tag(pool: &SqlitePool, guid: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM tags WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Tag {}", guid)));
    }
    info!(tag_id = %guid, "Deleted tag");
    Ok(())
}
