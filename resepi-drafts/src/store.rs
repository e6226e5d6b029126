//! Persistence of generated drafts and their review lifecycle

use chrono::Utc;
use resepi_common::db::recipes::{find_category_id_by_name, get_recipe, insert_recipe_tx};
use resepi_common::db::{DraftStatus, Recipe, RecipeDraftRow, RecipeStatus};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::coerce::CoercedDraft;
use crate::error::{DraftError, DraftResult};

/// Store a coerced draft awaiting review
pub async fn save_draft(
    pool: &SqlitePool,
    prompt: &str,
    raw_response: &str,
    draft: &CoercedDraft,
    created_by: Option<&str>,
) -> DraftResult<RecipeDraftRow> {
    let guid = Uuid::new_v4().to_string();
    let payload = serde_json::to_string(draft)
        .map_err(|e| DraftError::InvalidResponse(format!("Cannot serialize draft: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO recipe_drafts (guid, prompt, raw_response, title, payload, status, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, 'pending', ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(prompt)
    .bind(raw_response)
    .bind(&draft.title)
    .bind(&payload)
    .bind(created_by)
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;

    get_draft(pool, &guid)
        .await?
        .ok_or_else(|| DraftError::Common(resepi_common::Error::Internal(format!("Draft vanished: {}", guid))))
}

pub async fn get_draft(pool: &SqlitePool, guid: &str) -> DraftResult<Option<RecipeDraftRow>> {
    let row = sqlx::query_as::<_, RecipeDraftRow>("SELECT * FROM recipe_drafts WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Drafts newest first, optionally filtered by status
pub async fn list_drafts(pool: &SqlitePool, status: Option<DraftStatus>) -> DraftResult<Vec<RecipeDraftRow>> {
    let rows = match status {
        Some(status) => {
            sqlx::query_as::<_, RecipeDraftRow>(
                "SELECT * FROM recipe_drafts WHERE status = ? ORDER BY created_at DESC, guid",
            )
            .bind(status)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, RecipeDraftRow>("SELECT * FROM recipe_drafts ORDER BY created_at DESC, guid")
                .fetch_all(pool)
                .await?
        }
    };
    Ok(rows)
}

pub async fn count_drafts(pool: &SqlitePool, status: DraftStatus) -> DraftResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipe_drafts WHERE status = ?")
        .bind(status)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Decode the stored payload of a draft row
pub fn draft_payload(row: &RecipeDraftRow) -> DraftResult<CoercedDraft> {
    serde_json::from_str(&row.payload)
        .map_err(|e| DraftError::InvalidResponse(format!("Corrupt draft payload {}: {}", row.guid, e)))
}

/// Why a draft could not move out of `pending`
async fn not_pending(pool: &SqlitePool, guid: &str) -> DraftError {
    match get_draft(pool, guid).await {
        Ok(Some(row)) => resepi_common::Error::Conflict(format!("Draft {} is already {}", guid, row.status)).into(),
        Ok(None) => resepi_common::Error::NotFound(format!("Draft {}", guid)).into(),
        Err(e) => e,
    }
}

/// Turn a pending draft into a recipe with status `draft`
///
/// The draft is claimed and the recipe inserted in one transaction, so a
/// draft yields at most one recipe. The suggested category is matched by
/// name; unknown names leave the recipe uncategorised.
pub async fn accept_draft(pool: &SqlitePool, guid: &str, author_id: Option<&str>) -> DraftResult<Recipe> {
    let mut tx = pool.begin().await?;

    let claimed = sqlx::query("UPDATE recipe_drafts SET status = 'accepted' WHERE guid = ? AND status = 'pending'")
        .bind(guid)
        .execute(&mut *tx)
        .await?;
    if claimed.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(not_pending(pool, guid).await);
    }

    let row = sqlx::query_as::<_, RecipeDraftRow>("SELECT * FROM recipe_drafts WHERE guid = ?")
        .bind(guid)
        .fetch_one(&mut *tx)
        .await?;
    let draft = draft_payload(&row)?;

    let category_id = match draft.category.as_deref() {
        Some(name) => find_category_id_by_name(&mut *tx, name).await?,
        None => None,
    };

    let recipe_id = insert_recipe_tx(&mut tx, &draft.to_recipe_input(category_id), RecipeStatus::Draft, author_id).await?;

    sqlx::query("UPDATE recipe_drafts SET recipe_id = ? WHERE guid = ?")
        .bind(&recipe_id)
        .bind(guid)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let recipe = get_recipe(pool, &recipe_id)
        .await?
        .ok_or_else(|| resepi_common::Error::Internal(format!("Recipe vanished after accept: {}", recipe_id)))?;

    info!(draft_id = %guid, recipe_id = %recipe.guid, slug = %recipe.slug, "Accepted recipe draft");

    Ok(recipe)
}

pub async fn discard_draft(pool: &SqlitePool, guid: &str) -> DraftResult<()> {
    let result = sqlx::query("UPDATE recipe_drafts SET status = 'discarded' WHERE guid = ? AND status = 'pending'")
        .bind(guid)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_pending(pool, guid).await);
    }

    info!(draft_id = %guid, "Discarded recipe draft");
    Ok(())
}
