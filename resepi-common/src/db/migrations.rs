//! Database schema migrations
//!
//! Versioned, idempotent schema changes applied after the base tables
//! exist. Each migration checks before it alters, so re-running on an
//! up-to-date database is harmless.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the wild already ran them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Use ALTER TABLE / CREATE INDEX IF NOT EXISTS** - preserve data

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 3;

/// Get current schema version from database (0 when none recorded)
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    if current_version < 3 {
        migrate_v3(pool).await?;
        set_schema_version(pool, 3).await?;
        info!("✓ Migration v3 completed");
    }

    Ok(())
}

/// Migration v1: lookup indexes for listing and moderation queries
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_recipes_status_published ON recipes(status, published_at)",
        "CREATE INDEX IF NOT EXISTS idx_recipes_category ON recipes(category_id)",
        "CREATE INDEX IF NOT EXISTS idx_recipe_tags_tag ON recipe_tags(tag_id)",
        "CREATE INDEX IF NOT EXISTS idx_comments_recipe_status ON comments(recipe_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_comments_status_created ON comments(status, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_recipe_images_recipe ON recipe_images(recipe_id)",
    ];

    for sql in statements {
        sqlx::query(sql).execute(pool).await?;
    }

    info!("Migration v1: Created lookup indexes");
    Ok(())
}

/// Migration v2: at most one primary image per recipe
///
/// Databases written before this index may hold several primary rows; all
/// but the oldest are demoted first so the unique index can be created.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    let demoted = sqlx::query(
        r#"
        UPDATE recipe_images SET is_primary = 0
        WHERE is_primary = 1
          AND guid NOT IN (
              SELECT guid FROM recipe_images ri
              WHERE ri.is_primary = 1
                AND ri.created_at = (
                    SELECT MIN(created_at) FROM recipe_images x
                    WHERE x.recipe_id = ri.recipe_id AND x.is_primary = 1
                )
              GROUP BY ri.recipe_id
          )
        "#,
    )
    .execute(pool)
    .await?
    .rows_affected();

    if demoted > 0 {
        warn!("Migration v2: Demoted {} duplicate primary images", demoted);
    }

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_recipe_images_one_primary \
         ON recipe_images(recipe_id) WHERE is_primary = 1",
    )
    .execute(pool)
    .await?;

    info!("Migration v2: Enforced single primary image per recipe");
    Ok(())
}

/// Migration v3: `moderated_by` on comments for databases created before it
async fn migrate_v3(pool: &SqlitePool) -> Result<()> {
    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('comments') WHERE name = 'moderated_by'",
    )
    .fetch_one(pool)
    .await?;

    if has_column == 0 {
        sqlx::query("ALTER TABLE comments ADD COLUMN moderated_by TEXT REFERENCES users(guid)")
            .execute(pool)
            .await?;
        info!("Migration v3: Added moderated_by to comments table");
    }

    Ok(())
}
