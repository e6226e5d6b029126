//! Comments and moderation

use chrono::{NaiveDateTime, Utc};
use resepi_common::db::{Comment, CommentStatus};
use resepi_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

/// Approved comment with its author's display name
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PublicComment {
    pub guid: String,
    pub author_name: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}

/// Row in the moderation queue
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ModerationRow {
    pub guid: String,
    pub body: String,
    pub status: CommentStatus,
    pub created_at: NaiveDateTime,
    pub author_name: String,
    pub author_email: String,
    pub recipe_title: String,
    pub recipe_slug: String,
}

pub async fn create_comment(
    pool: &SqlitePool,
    recipe_id: &str,
    user_id: &str,
    body: &str,
    status: CommentStatus,
) -> Result<Comment> {
    let guid = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();

    sqlx::query("INSERT INTO comments (guid, recipe_id, user_id, body, status, created_at) VALUES (?, ?, ?, ?, ?, ?)")
        .bind(&guid)
        .bind(recipe_id)
        .bind(user_id)
        .bind(body)
        .bind(status)
        .bind(now)
        .execute(pool)
        .await?;

    info!(comment_id = %guid, recipe_id = %recipe_id, status = %status, "Comment posted");

    get_comment(pool, &guid)
        .await?
        .ok_or_else(|| Error::Internal(format!("Comment vanished after insert: {}", guid)))
}

pub async fn get_comment(pool: &SqlitePool, guid: &str) -> Result<Option<Comment>> {
    let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;
    Ok(comment)
}

/// Approved comments, oldest first
pub async fn approved_for_recipe(pool: &SqlitePool, recipe_id: &str) -> Result<Vec<PublicComment>> {
    let comments = sqlx::query_as::<_, PublicComment>(
        r#"
        SELECT c.guid, u.display_name AS author_name, c.body, c.created_at
        FROM comments c
        JOIN users u ON u.guid = c.user_id
        WHERE c.recipe_id = ? AND c.status = 'approved'
        ORDER BY c.created_at, c.guid
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;
    Ok(comments)
}

pub async fn count_by_status(pool: &SqlitePool, status: CommentStatus) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE status = ?")
        .bind(status)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn moderation_queue(
    pool: &SqlitePool,
    status: CommentStatus,
    limit: i64,
    offset: i64,
) -> Result<Vec<ModerationRow>> {
    let rows = sqlx::query_as::<_, ModerationRow>(
        r#"
        SELECT c.guid, c.body, c.status, c.created_at,
               u.display_name AS author_name, u.email AS author_email,
               r.title AS recipe_title, r.slug AS recipe_slug
        FROM comments c
        JOIN users u ON u.guid = c.user_id
        JOIN recipes r ON r.guid = c.recipe_id
        WHERE c.status = ?
        ORDER BY c.created_at, c.guid
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Set a comment's moderation status
///
/// Re-applying the current status succeeds without touching the row.
pub async fn moderate(pool: &SqlitePool, guid: &str, status: CommentStatus, moderator_id: &str) -> Result<()> {
    let comment = get_comment(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Comment {}", guid)))?;

    if comment.status == status {
        return Ok(());
    }

    sqlx::query("UPDATE comments SET status = ?, moderated_at = ?, moderated_by = ? WHERE guid = ?")
        .bind(status)
        .bind(Utc::now().naive_utc())
        .bind(moderator_id)
        .bind(guid)
        .execute(pool)
        .await?;

    info!(comment_id = %guid, status = %status, moderator = %moderator_id, "Comment moderated");
    Ok(())
}

pub async fn delete_comment(pool: &SqlitePool, guid: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM comments WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Comment {}", guid)));
    }
    Ok(())
}
