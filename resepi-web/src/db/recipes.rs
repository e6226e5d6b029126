//! Recipe read queries for listings, search and the admin table

use chrono::NaiveDateTime;
use resepi_common::db::{Difficulty, Recipe, RecipeStatus};
use resepi_common::{Error, Result};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Recipe summary shown on cards and in JSON listings
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecipeCard {
    pub guid: String,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub prep_minutes: Option<i64>,
    pub cook_minutes: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub view_count: i64,
    pub published_at: Option<NaiveDateTime>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    /// Relative to the media directory
    pub thumbnail_path: Option<String>,
}

impl RecipeCard {
    pub fn total_minutes(&self) -> Option<i64> {
        match (self.prep_minutes, self.cook_minutes) {
            (None, None) => None,
            (prep, cook) => Some(prep.unwrap_or(0) + cook.unwrap_or(0)),
        }
    }
}

/// Public listing order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecipeSort {
    #[default]
    Newest,
    Oldest,
    Popular,
    Title,
}

impl RecipeSort {
    /// Unknown values fall back to newest
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("oldest") => RecipeSort::Oldest,
            Some("popular") => RecipeSort::Popular,
            Some("title") => RecipeSort::Title,
            _ => RecipeSort::Newest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeSort::Newest => "newest",
            RecipeSort::Oldest => "oldest",
            RecipeSort::Popular => "popular",
            RecipeSort::Title => "title",
        }
    }

    fn order_clause(&self) -> &'static str {
        match self {
            RecipeSort::Newest => " ORDER BY r.published_at DESC, r.created_at DESC, r.guid",
            RecipeSort::Oldest => " ORDER BY r.published_at ASC, r.created_at ASC, r.guid",
            RecipeSort::Popular => " ORDER BY r.view_count DESC, r.published_at DESC, r.guid",
            RecipeSort::Title => " ORDER BY r.title COLLATE NOCASE ASC, r.guid",
        }
    }
}

/// Conditions for public listings and search; all combine with AND
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub category_id: Option<String>,
    pub tag_id: Option<String>,
    /// Matched against title, summary, ingredients and tag names
    pub text: Option<String>,
    pub difficulty: Option<Difficulty>,
    /// Prep plus cook time; recipes without any time are excluded
    pub max_minutes: Option<i64>,
}

/// Escape `%`, `_` and `\` for a LIKE pattern using `ESCAPE '\'`
pub fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

const CARD_SELECT: &str = r#"
    SELECT r.guid, r.slug, r.title, r.summary, r.prep_minutes, r.cook_minutes,
           r.difficulty, r.view_count, r.published_at,
           c.name AS category_name, c.slug AS category_slug,
           (SELECT i.thumbnail_path FROM recipe_images i
             WHERE i.recipe_id = r.guid AND i.is_primary = 1) AS thumbnail_path
    FROM recipes r
    LEFT JOIN categories c ON c.guid = r.category_id
"#;

fn push_published_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a RecipeFilter) {
    builder.push(" WHERE r.status = 'published'");

    if let Some(category_id) = &filter.category_id {
        builder.push(" AND r.category_id = ").push_bind(category_id);
    }

    if let Some(tag_id) = &filter.tag_id {
        builder
            .push(" AND EXISTS (SELECT 1 FROM recipe_tags rt WHERE rt.recipe_id = r.guid AND rt.tag_id = ")
            .push_bind(tag_id)
            .push(")");
    }

    if let Some(text) = filter.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(text);
        builder
            .push(" AND (r.title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR r.summary LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR r.ingredients LIKE ")
            .push_bind(pattern.clone())
            .push(
                " ESCAPE '\\' OR EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.guid = rt.tag_id \
                 WHERE rt.recipe_id = r.guid AND t.name LIKE ",
            )
            .push_bind(pattern)
            .push(" ESCAPE '\\'))");
    }

    if let Some(difficulty) = filter.difficulty {
        builder.push(" AND r.difficulty = ").push_bind(difficulty);
    }

    if let Some(max_minutes) = filter.max_minutes {
        builder
            .push(" AND (r.prep_minutes IS NOT NULL OR r.cook_minutes IS NOT NULL)")
            .push(" AND COALESCE(r.prep_minutes, 0) + COALESCE(r.cook_minutes, 0) <= ")
            .push_bind(max_minutes);
    }
}

pub async fn count_published(pool: &SqlitePool, filter: &RecipeFilter) -> Result<i64> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM recipes r");
    push_published_filter(&mut builder, filter);

    let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

pub async fn list_published(
    pool: &SqlitePool,
    filter: &RecipeFilter,
    sort: RecipeSort,
    limit: i64,
    offset: i64,
) -> Result<Vec<RecipeCard>> {
    let mut builder = QueryBuilder::<Sqlite>::new(CARD_SELECT);
    push_published_filter(&mut builder, filter);
    builder.push(sort.order_clause());
    builder.push(" LIMIT ").push_bind(limit);
    builder.push(" OFFSET ").push_bind(offset);

    let cards = builder.build_query_as::<RecipeCard>().fetch_all(pool).await?;
    Ok(cards)
}

pub async fn get_recipe_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Recipe>> {
    let recipe = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(recipe)
}

pub async fn increment_view_count(pool: &SqlitePool, guid: &str) -> Result<()> {
    sqlx::query("UPDATE recipes SET view_count = view_count + 1 WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;
    Ok(())
}

/// Published recipes a user saved, most recent save first
pub async fn saved_cards(pool: &SqlitePool, user_id: &str) -> Result<Vec<RecipeCard>> {
    let sql = format!(
        "{} JOIN saved_recipes s ON s.recipe_id = r.guid \
         WHERE s.user_id = ? AND r.status = 'published' ORDER BY s.created_at DESC, r.guid",
        CARD_SELECT
    );
    let cards = sqlx::query_as::<_, RecipeCard>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(cards)
}

pub async fn delete_recipe(pool: &SqlitePool, guid: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM recipes WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Recipe {}", guid)));
    }
    Ok(())
}

/// Recipe counts per status for the dashboard
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusCounts {
    pub draft: i64,
    pub published: i64,
    pub archived: i64,
}

pub async fn count_by_status(pool: &SqlitePool) -> Result<StatusCounts> {
    let rows: Vec<(RecipeStatus, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM recipes GROUP BY status")
            .fetch_all(pool)
            .await?;

    let mut counts = StatusCounts::default();
    for (status, count) in rows {
        match status {
            RecipeStatus::Draft => counts.draft = count,
            RecipeStatus::Published => counts.published = count,
            RecipeStatus::Archived => counts.archived = count,
        }
    }
    Ok(counts)
}

/// Row of the admin recipe table
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminRecipeRow {
    pub guid: String,
    pub slug: String,
    pub title: String,
    pub status: RecipeStatus,
    pub category_name: Option<String>,
    pub view_count: i64,
    pub updated_at: NaiveDateTime,
}

/// Admin table sort column; only these reach SQL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdminSort {
    Title,
    #[default]
    Updated,
    Views,
}

impl AdminSort {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("title") => AdminSort::Title,
            Some("views") => AdminSort::Views,
            _ => AdminSort::Updated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminSort::Title => "title",
            AdminSort::Updated => "updated",
            AdminSort::Views => "views",
        }
    }

    fn column(&self) -> &'static str {
        match self {
            AdminSort::Title => "r.title COLLATE NOCASE",
            AdminSort::Updated => "r.updated_at",
            AdminSort::Views => "r.view_count",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdminRecipeFilter {
    pub text: Option<String>,
    pub status: Option<RecipeStatus>,
    pub category_id: Option<String>,
    pub sort: AdminSort,
    pub descending: bool,
}

fn push_admin_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a AdminRecipeFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(text) = filter.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(text);
        builder
            .push(" AND (r.title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR r.slug LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
    if let Some(status) = filter.status {
        builder.push(" AND r.status = ").push_bind(status);
    }
    if let Some(category_id) = &filter.category_id {
        builder.push(" AND r.category_id = ").push_bind(category_id);
    }
}

pub async fn admin_count(pool: &SqlitePool, filter: &AdminRecipeFilter) -> Result<i64> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM recipes r");
    push_admin_filter(&mut builder, filter);
    let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

pub async fn admin_list(
    pool: &SqlitePool,
    filter: &AdminRecipeFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<AdminRecipeRow>> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT r.guid, r.slug, r.title, r.status, c.name AS category_name,
               r.view_count, r.updated_at
        FROM recipes r
        LEFT JOIN categories c ON c.guid = r.category_id
        "#,
    );
    push_admin_filter(&mut builder, filter);
    builder
        .push(" ORDER BY ")
        .push(filter.sort.column())
        .push(if filter.descending { " DESC" } else { " ASC" })
        .push(", r.guid LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = builder.build_query_as::<AdminRecipeRow>().fetch_all(pool).await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ayam"), "%ayam%");
        assert_eq!(like_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }

    #[test]
    fn test_sort_parsing_falls_back() {
        assert_eq!(RecipeSort::parse(Some("POPULAR")), RecipeSort::Popular);
        assert_eq!(RecipeSort::parse(Some("random")), RecipeSort::Newest);
        assert_eq!(RecipeSort::parse(None), RecipeSort::Newest);
        assert_eq!(AdminSort::parse(Some("views")), AdminSort::Views);
        assert_eq!(AdminSort::parse(Some("title; DROP TABLE recipes")), AdminSort::Updated);
    }
}
