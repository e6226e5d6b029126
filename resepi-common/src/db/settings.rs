//! Settings database operations
//!
//! Key-value runtime configuration stored in the `settings` table.

use sqlx::SqlitePool;
use tracing::debug;

use crate::{Error, Result};

pub const SITE_NAME: &str = "site_name";
pub const PAGE_SIZE: &str = "page_size";
pub const ADMIN_PAGE_SIZE: &str = "admin_page_size";
pub const COMMENTS_REQUIRE_APPROVAL: &str = "comments_require_approval";
pub const SESSION_TTL_HOURS: &str = "session_ttl_hours";
pub const IMAGE_MAX_UPLOAD_BYTES: &str = "image_max_upload_bytes";
pub const IMAGE_THUMBNAIL_WIDTH: &str = "image_thumbnail_width";
pub const IMAGE_MEDIUM_WIDTH: &str = "image_medium_width";
pub const LLM_API_KEY: &str = "llm_api_key";
pub const LLM_MODEL: &str = "llm_model";
pub const LLM_RATE_LIMIT_MS: &str = "llm_rate_limit_ms";

/// Defaults written at startup when a key is missing or NULL
///
/// `llm_api_key` is deliberately absent: an unset key falls through to
/// the environment and TOML sources.
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    (SITE_NAME, "ResepiCheNom"),
    (PAGE_SIZE, "12"),
    (ADMIN_PAGE_SIZE, "25"),
    (COMMENTS_REQUIRE_APPROVAL, "true"),
    (SESSION_TTL_HOURS, "720"),
    (IMAGE_MAX_UPLOAD_BYTES, "8388608"),
    (IMAGE_THUMBNAIL_WIDTH, "320"),
    (IMAGE_MEDIUM_WIDTH, "960"),
    (LLM_MODEL, "gpt-4o-mini"),
    (LLM_RATE_LIMIT_MS, "1000"),
];

/// Keys editable from the admin settings page, in display order
pub const EDITABLE_SETTINGS: &[&str] = &[
    SITE_NAME,
    PAGE_SIZE,
    ADMIN_PAGE_SIZE,
    COMMENTS_REQUIRE_APPROVAL,
    SESSION_TTL_HOURS,
    IMAGE_MAX_UPLOAD_BYTES,
    IMAGE_THUMBNAIL_WIDTH,
    IMAGE_MEDIUM_WIDTH,
    LLM_MODEL,
    LLM_RATE_LIMIT_MS,
];

/// Generic setting getter
pub async fn get_setting<T>(db: &SqlitePool, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match row.and_then(|(value,)| value) {
        Some(value) => {
            let parsed = value
                .trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting {} failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Setting getter with a fallback for missing or unparsable values
pub async fn get_setting_or<T>(db: &SqlitePool, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_setting(db, key).await {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Ok(default),
        Err(Error::Config(msg)) => {
            debug!("{} (using default)", msg);
            Ok(default)
        }
        Err(e) => Err(e),
    }
}

/// Generic setting setter (upsert)
pub async fn set_setting<T: ToString>(db: &SqlitePool, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

pub async fn delete_setting(db: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn get_llm_api_key(db: &SqlitePool) -> Result<Option<String>> {
    get_setting::<String>(db, LLM_API_KEY).await
}

pub async fn set_llm_api_key(db: &SqlitePool, key: &str) -> Result<()> {
    set_setting(db, LLM_API_KEY, key.trim()).await
}

/// Runtime settings read once per request where several are needed
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub site_name: String,
    pub page_size: i64,
    pub admin_page_size: i64,
    pub comments_require_approval: bool,
    pub session_ttl_hours: i64,
}

impl SiteSettings {
    pub async fn load(db: &SqlitePool) -> Result<Self> {
        Ok(Self {
            site_name: get_setting_or(db, SITE_NAME, "ResepiCheNom".to_string()).await?,
            page_size: get_setting_or(db, PAGE_SIZE, 12i64).await?.clamp(1, 100),
            admin_page_size: get_setting_or(db, ADMIN_PAGE_SIZE, 25i64).await?.clamp(1, 500),
            comments_require_approval: get_setting_or(db, COMMENTS_REQUIRE_APPROVAL, true).await?,
            session_ttl_hours: get_setting_or(db, SESSION_TTL_HOURS, 720i64).await?.max(1),
        })
    }
}

/// Image variant settings
#[derive(Debug, Clone, Copy)]
pub struct ImageSettings {
    pub max_upload_bytes: usize,
    pub thumbnail_width: u32,
    pub medium_width: u32,
}

impl ImageSettings {
    pub async fn load(db: &SqlitePool) -> Result<Self> {
        Ok(Self {
            max_upload_bytes: get_setting_or(db, IMAGE_MAX_UPLOAD_BYTES, 8 * 1024 * 1024usize).await?,
            thumbnail_width: get_setting_or(db, IMAGE_THUMBNAIL_WIDTH, 320u32).await?.max(16),
            medium_width: get_setting_or(db, IMAGE_MEDIUM_WIDTH, 960u32).await?.max(16),
        })
    }
}
