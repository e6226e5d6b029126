//! Database initialization, migration and settings tests

use resepi_common::db::migrations::{get_schema_version, CURRENT_SCHEMA_VERSION};
use resepi_common::db::settings::{self, SiteSettings};
use resepi_common::db::{init_database, init_schema, run_migrations};
use resepi_common::db::recipes::{insert_recipe, RecipeInput};
use resepi_common::db::RecipeStatus;
use resepi_common::slug::unique_slug;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Single-connection pool so every query sees the same in-memory database
async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    pool
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp = tempfile::tempdir().unwrap();
    let db_path = temp.path().join("sub").join("resepichenom.db");

    let pool = init_database(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp = tempfile::tempdir().unwrap();
    let db_path = temp.path().join("resepichenom.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO categories (guid, name, slug) VALUES ('c1', 'Kek', 'kek')")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1, "Existing data must survive re-initialization");
}

#[tokio::test]
async fn test_schema_version_recorded_and_migrations_idempotent() {
    let pool = memory_pool().await;

    assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);

    run_migrations(&pool).await.unwrap();
    init_schema(&pool).await.unwrap();
    assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let pool = memory_pool().await;

    let site = SiteSettings::load(&pool).await.unwrap();
    assert_eq!(site.site_name, "ResepiCheNom");
    assert_eq!(site.page_size, 12);
    assert!(site.comments_require_approval);

    // LLM key is never seeded
    assert_eq!(settings::get_llm_api_key(&pool).await.unwrap(), None);
}

#[tokio::test]
async fn test_null_setting_reset_to_default_but_custom_value_kept() {
    let pool = memory_pool().await;

    sqlx::query("UPDATE settings SET value = NULL WHERE key = 'page_size'")
        .execute(&pool)
        .await
        .unwrap();
    settings::set_setting(&pool, settings::SITE_NAME, "Dapur Kita").await.unwrap();

    init_schema(&pool).await.unwrap();

    let site = SiteSettings::load(&pool).await.unwrap();
    assert_eq!(site.page_size, 12);
    assert_eq!(site.site_name, "Dapur Kita");
}

#[tokio::test]
async fn test_unparsable_setting_falls_back() {
    let pool = memory_pool().await;
    settings::set_setting(&pool, settings::PAGE_SIZE, "banyak").await.unwrap();

    let value = settings::get_setting_or(&pool, settings::PAGE_SIZE, 7i64).await.unwrap();
    assert_eq!(value, 7);
}

#[tokio::test]
async fn test_single_primary_image_enforced() {
    let pool = memory_pool().await;

    sqlx::query("INSERT INTO recipes (guid, slug, title) VALUES ('r1', 'kek', 'Kek')")
        .execute(&pool)
        .await
        .unwrap();

    let insert = "INSERT INTO recipe_images \
        (guid, recipe_id, original_path, medium_path, thumbnail_path, width, height, is_primary) \
        VALUES (?, 'r1', 'o', 'm', 't', 10, 10, 1)";

    sqlx::query(insert).bind("i1").execute(&pool).await.unwrap();
    let second = sqlx::query(insert).bind("i2").execute(&pool).await;
    assert!(second.is_err(), "Second primary image must violate the unique index");
}

#[tokio::test]
async fn test_deleting_recipe_cascades() {
    let pool = memory_pool().await;

    sqlx::query(
        "INSERT INTO users (guid, email, display_name, password_hash, password_salt) \
         VALUES ('u1', 'a@b.my', 'A', 'h', 's')",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO recipes (guid, slug, title) VALUES ('r1', 'kek', 'Kek')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO comments (guid, recipe_id, user_id, body) VALUES ('c1', 'r1', 'u1', 'Sedap')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO saved_recipes (user_id, recipe_id) VALUES ('u1', 'r1')")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("DELETE FROM recipes WHERE guid = 'r1'")
        .execute(&pool)
        .await
        .unwrap();

    let comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
        .fetch_one(&pool)
        .await
        .unwrap();
    let saved: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM saved_recipes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(comments, 0);
    assert_eq!(saved, 0);
}

#[tokio::test]
async fn test_unique_slug_appends_suffix() {
    let pool = memory_pool().await;

    sqlx::query("INSERT INTO recipes (guid, slug, title) VALUES ('r1', 'rendang', 'Rendang')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO recipes (guid, slug, title) VALUES ('r2', 'rendang-2', 'Rendang')")
        .execute(&pool)
        .await
        .unwrap();

    let slug = unique_slug(&pool, "recipes", "Rendang", None).await.unwrap();
    assert_eq!(slug, "rendang-3");

    // A row keeps its own slug on update
    let own = unique_slug(&pool, "recipes", "Rendang", Some("r1")).await.unwrap();
    assert_eq!(own, "rendang");

    assert!(unique_slug(&pool, "users", "x", None).await.is_err());
}

#[tokio::test]
async fn test_concurrent_inserts_get_distinct_slugs() {
    let temp = tempfile::tempdir().unwrap();
    let pool = init_database(&temp.path().join("resepichenom.db")).await.unwrap();

    let input = RecipeInput {
        title: "Rendang Tok".to_string(),
        summary: String::new(),
        ingredients: vec!["1 kg daging".to_string()],
        instructions: vec!["Masak perlahan.".to_string()],
        prep_minutes: None,
        cook_minutes: None,
        servings: None,
        difficulty: None,
        category_id: None,
        tags: vec!["Perak".to_string()],
    };

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let pool = pool.clone();
            let input = input.clone();
            tokio::spawn(async move { insert_recipe(&pool, &input, RecipeStatus::Draft, None).await })
        })
        .collect();

    let mut slugs = Vec::new();
    for task in tasks {
        slugs.push(task.await.unwrap().unwrap().slug);
    }
    slugs.sort();
    assert_eq!(slugs, vec!["rendang-tok", "rendang-tok-2", "rendang-tok-3", "rendang-tok-4"]);
}
