//! Newsletter subscribers

use chrono::Utc;
use resepi_common::auth::generate_link_token;
use resepi_common::db::{NewsletterSubscriber, SubscriberStatus};
use resepi_common::Result;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

/// What a subscribe request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Created,
    Reactivated,
    AlreadySubscribed,
}

pub async fn get_by_email(pool: &SqlitePool, email: &str) -> Result<Option<NewsletterSubscriber>> {
    let subscriber = sqlx::query_as::<_, NewsletterSubscriber>(
        "SELECT * FROM newsletter_subscribers WHERE email = ?",
    )
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;
    Ok(subscriber)
}

pub async fn subscribe(pool: &SqlitePool, email: &str, name: &str) -> Result<SubscribeOutcome> {
    match get_by_email(pool, email).await? {
        Some(existing) if existing.status == SubscriberStatus::Subscribed => Ok(SubscribeOutcome::AlreadySubscribed),
        Some(existing) => {
            sqlx::query(
                r#"
                UPDATE newsletter_subscribers
                SET status = 'subscribed', unsubscribed_at = NULL,
                    name = CASE WHEN ? = '' THEN name ELSE ? END
                WHERE guid = ?
                "#,
            )
            .bind(name.trim())
            .bind(name.trim())
            .bind(&existing.guid)
            .execute(pool)
            .await?;
            info!(subscriber_id = %existing.guid, "Newsletter subscription reactivated");
            Ok(SubscribeOutcome::Reactivated)
        }
        None => {
            let guid = Uuid::new_v4().to_string();
            sqlx::query(
                r#"
                INSERT INTO newsletter_subscribers (guid, email, name, status, unsubscribe_token, created_at)
                VALUES (?, ?, ?, 'subscribed', ?, ?)
                "#,
            )
            .bind(&guid)
            .bind(email.trim())
            .bind(name.trim())
            .bind(generate_link_token())
            .bind(Utc::now().naive_utc())
            .execute(pool)
            .await?;
            info!(subscriber_id = %guid, "Newsletter subscription created");
            Ok(SubscribeOutcome::Created)
        }
    }
}

/// Unsubscribe by link token; false when the token is unknown
pub async fn unsubscribe(pool: &SqlitePool, token: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE newsletter_subscribers
        SET status = 'unsubscribed',
            unsubscribed_at = COALESCE(unsubscribed_at, ?)
        WHERE unsubscribe_token = ?
        "#,
    )
    .bind(Utc::now().naive_utc())
    .bind(token)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_subscribers(pool: &SqlitePool, status: Option<SubscriberStatus>) -> Result<i64> {
    let count: i64 = match status {
        Some(status) => {
            sqlx::query_scalar("SELECT COUNT(*) FROM newsletter_subscribers WHERE status = ?")
                .bind(status)
                .fetch_one(pool)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM newsletter_subscribers")
                .fetch_one(pool)
                .await?
        }
    };
    Ok(count)
}

/// Subscribers newest first; `limit` of `None` returns everyone (export)
pub async fn list_subscribers(
    pool: &SqlitePool,
    status: Option<SubscriberStatus>,
    limit: Option<i64>,
    offset: i64,
) -> Result<Vec<NewsletterSubscriber>> {
    let limit = limit.unwrap_or(-1);
    let rows = sqlx::query_as::<_, NewsletterSubscriber>(
        r#"
        SELECT * FROM newsletter_subscribers
        WHERE (?1 IS NULL OR status = ?1)
        ORDER BY created_at DESC, email
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
