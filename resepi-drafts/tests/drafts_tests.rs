//! Draft generation, review lifecycle and audit against an in-memory database

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use resepi_common::db::{init_database, init_schema, Difficulty, DraftStatus, RecipeStatus};
use resepi_drafts::audit::audit_recipes;
use resepi_drafts::generate::generate_drafts;
use resepi_drafts::store::{accept_draft, count_drafts, discard_draft, draft_payload, list_drafts};
use resepi_drafts::{CompletionProvider, CompletionRequest, DraftError, DraftResult};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Replays canned completions in order and records the prompts it saw
struct ScriptedProvider {
    responses: Mutex<VecDeque<DraftResult<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<DraftResult<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> DraftResult<String> {
        self.prompts.lock().unwrap().push(request.user.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DraftError::InvalidResponse("script exhausted".to_string())))
    }
}

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    pool
}

async fn add_category(pool: &SqlitePool, name: &str, slug: &str) -> String {
    let guid = uuid::Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO categories (guid, name, slug) VALUES (?, ?, ?)")
        .bind(&guid)
        .bind(name)
        .bind(slug)
        .execute(pool)
        .await
        .unwrap();
    guid
}

fn rendang_json() -> String {
    r#"{"title": "Rendang Daging", "summary": "Rendang kering.",
        "ingredients": ["1 kg daging", "2 cawan santan"],
        "instructions": ["Tumis rempah.", "Masak hingga kering."],
        "prep_time": "30 minit", "cook_time": "3 jam", "servings": "6 orang",
        "difficulty": "sukar", "category": "lauk", "tags": ["Raya", "daging"]}"#
        .to_string()
}

#[tokio::test]
async fn test_generate_stores_pending_drafts_and_skips_garbage() {
    let pool = test_pool().await;
    add_category(&pool, "Lauk", "lauk").await;

    let provider = ScriptedProvider::new(vec![
        Ok(rendang_json()),
        Ok("Sorry, I can only talk about cooking.".to_string()),
    ]);

    let drafts = generate_drafts(&pool, &provider, "rendang untuk raya", 2, None)
        .await
        .unwrap();

    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].title, "Rendang Daging");
    assert_eq!(drafts[0].status, DraftStatus::Pending);
    assert_eq!(drafts[0].prompt, "rendang untuk raya");

    let payload = draft_payload(&drafts[0]).unwrap();
    assert_eq!(payload.cook_minutes, Some(180));
    assert_eq!(payload.difficulty, Some(Difficulty::Hard));

    // Category names are offered to the model
    assert!(provider.prompts()[0].contains("Lauk"));
    assert_eq!(count_drafts(&pool, DraftStatus::Pending).await.unwrap(), 1);
}

#[tokio::test]
async fn test_generate_fails_when_nothing_usable() {
    let pool = test_pool().await;
    let provider = ScriptedProvider::new(vec![Ok("{}".to_string())]);

    let result = generate_drafts(&pool, &provider, "kuih", 1, None).await;
    assert!(matches!(result, Err(DraftError::InvalidResponse(_))));
    assert!(list_drafts(&pool, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_generate_rejects_short_idea_and_stops_on_transport_error() {
    let pool = test_pool().await;
    let provider = ScriptedProvider::new(vec![]);
    assert!(matches!(
        generate_drafts(&pool, &provider, " a ", 1, None).await,
        Err(DraftError::InvalidInput(_))
    ));

    let provider = ScriptedProvider::new(vec![
        Err(DraftError::Network("connection refused".to_string())),
        Ok(rendang_json()),
    ]);
    assert!(matches!(
        generate_drafts(&pool, &provider, "rendang", 2, None).await,
        Err(DraftError::Network(_))
    ));
    assert_eq!(provider.prompts().len(), 1);
}

#[tokio::test]
async fn test_accept_creates_draft_recipe_with_category_and_tags() {
    let pool = test_pool().await;
    let category_id = add_category(&pool, "Lauk", "lauk").await;
    let provider = ScriptedProvider::new(vec![Ok(rendang_json())]);
    let drafts = generate_drafts(&pool, &provider, "rendang", 1, None).await.unwrap();

    let recipe = accept_draft(&pool, &drafts[0].guid, None).await.unwrap();
    assert_eq!(recipe.slug, "rendang-daging");
    assert_eq!(recipe.status, RecipeStatus::Draft);
    assert!(recipe.published_at.is_none());
    assert_eq!(recipe.category_id.as_deref(), Some(category_id.as_str()));
    assert_eq!(recipe.servings, Some(6));
    assert_eq!(recipe.ingredient_lines(), vec!["1 kg daging", "2 cawan santan"]);

    let tags = resepi_common::db::recipes::tags_for_recipe(&pool, &recipe.guid).await.unwrap();
    let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["daging", "raya"]);

    let row = resepi_drafts::store::get_draft(&pool, &drafts[0].guid).await.unwrap().unwrap();
    assert_eq!(row.status, DraftStatus::Accepted);
    assert_eq!(row.recipe_id.as_deref(), Some(recipe.guid.as_str()));

    // Second accept is a conflict, not a duplicate recipe
    let again = accept_draft(&pool, &drafts[0].guid, None).await;
    assert!(matches!(again, Err(DraftError::Common(resepi_common::Error::Conflict(_)))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_accepts_create_one_recipe() {
    let temp = tempfile::tempdir().unwrap();
    let pool = init_database(&temp.path().join("resepichenom.db")).await.unwrap();
    let provider = ScriptedProvider::new(vec![Ok(rendang_json())]);
    let drafts = generate_drafts(&pool, &provider, "rendang", 1, None).await.unwrap();
    let guid = drafts[0].guid.clone();

    let first = tokio::spawn({
        let pool = pool.clone();
        let guid = guid.clone();
        async move { accept_draft(&pool, &guid, None).await }
    });
    let second = tokio::spawn({
        let pool = pool.clone();
        let guid = guid.clone();
        async move { accept_draft(&pool, &guid, None).await }
    });
    let results = [first.await.unwrap(), second.await.unwrap()];

    let accepted: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(accepted.len(), 1, "exactly one accept wins");
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(DraftError::Common(resepi_common::Error::Conflict(_))))));

    let recipes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(recipes, 1);

    let row = resepi_drafts::store::get_draft(&pool, &guid).await.unwrap().unwrap();
    assert_eq!(row.status, DraftStatus::Accepted);
    assert_eq!(row.recipe_id.as_deref(), Some(accepted[0].guid.as_str()));

    // An accepted draft can no longer be discarded
    assert!(matches!(
        discard_draft(&pool, &guid).await,
        Err(DraftError::Common(resepi_common::Error::Conflict(_)))
    ));
}

#[tokio::test]
async fn test_discard_and_unknown_draft() {
    let pool = test_pool().await;
    let provider = ScriptedProvider::new(vec![Ok(rendang_json())]);
    let drafts = generate_drafts(&pool, &provider, "rendang", 1, None).await.unwrap();

    discard_draft(&pool, &drafts[0].guid).await.unwrap();
    let discarded = list_drafts(&pool, Some(DraftStatus::Discarded)).await.unwrap();
    assert_eq!(discarded.len(), 1);
    assert!(accept_draft(&pool, &drafts[0].guid, None).await.is_err());

    assert!(matches!(
        discard_draft(&pool, "missing").await,
        Err(DraftError::Common(resepi_common::Error::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_audit_reports_and_fills_gaps_without_overwriting() {
    let pool = test_pool().await;

    let complete = resepi_common::db::recipes::RecipeInput {
        title: "Teh Tarik".to_string(),
        summary: String::new(),
        ingredients: vec!["teh".to_string()],
        instructions: vec!["tarik".to_string()],
        prep_minutes: Some(5),
        cook_minutes: Some(5),
        servings: Some(2),
        difficulty: Some(Difficulty::Easy),
        category_id: None,
        tags: vec![],
    };
    resepi_common::db::recipes::insert_recipe(&pool, &complete, RecipeStatus::Published, None)
        .await
        .unwrap();

    let partial = resepi_common::db::recipes::RecipeInput {
        title: "Roti Jala".to_string(),
        prep_minutes: Some(10),
        cook_minutes: None,
        difficulty: None,
        ..complete.clone()
    };
    let roti = resepi_common::db::recipes::insert_recipe(&pool, &partial, RecipeStatus::Draft, None)
        .await
        .unwrap();

    let report = audit_recipes(&pool, None).await.unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.incomplete(), 1);
    assert_eq!(report.findings[0].slug, "roti-jala");
    assert!(!report.findings[0].missing_prep);
    assert!(report.findings[0].missing_cook);
    assert_eq!(report.fixed, 0);

    let provider = ScriptedProvider::new(vec![Ok(
        r#"{"prep_time": "99 minutes", "cook_time": "20 minit", "difficulty": "Sederhana"}"#.to_string(),
    )]);
    let report = audit_recipes(&pool, Some(&provider)).await.unwrap();
    assert_eq!(report.fixed, 1);
    assert!(provider.prompts()[0].contains("Roti Jala"));

    let fixed = resepi_common::db::recipes::get_recipe(&pool, &roti.guid).await.unwrap().unwrap();
    assert_eq!(fixed.prep_minutes, Some(10));
    assert_eq!(fixed.cook_minutes, Some(20));
    assert_eq!(fixed.difficulty, Some(Difficulty::Medium));

    assert_eq!(audit_recipes(&pool, None).await.unwrap().incomplete(), 0);

    // An estimate covering only columns that are already set fixes nothing
    let kuih = resepi_common::db::recipes::RecipeInput {
        title: "Kuih Bahulu".to_string(),
        prep_minutes: Some(15),
        cook_minutes: None,
        difficulty: Some(Difficulty::Easy),
        ..complete.clone()
    };
    let kuih = resepi_common::db::recipes::insert_recipe(&pool, &kuih, RecipeStatus::Draft, None)
        .await
        .unwrap();

    let provider = ScriptedProvider::new(vec![Ok(r#"{"prep_time": "40 minit", "difficulty": "sukar"}"#.to_string())]);
    let report = audit_recipes(&pool, Some(&provider)).await.unwrap();
    assert_eq!(report.fixed, 0);
    assert_eq!(report.failed, 1);
    assert!(!report.findings[0].fixed);

    let unchanged = resepi_common::db::recipes::get_recipe(&pool, &kuih.guid).await.unwrap().unwrap();
    assert_eq!(unchanged.prep_minutes, Some(15));
    assert_eq!(unchanged.cook_minutes, None);
    assert_eq!(unchanged.difficulty, Some(Difficulty::Easy));
    assert_eq!(unchanged.updated_at, kuih.updated_at);
}

#[tokio::test]
async fn test_audit_records_failures() {
    let pool = test_pool().await;
    let input = resepi_common::db::recipes::RecipeInput {
        title: "Cucur Udang".to_string(),
        summary: String::new(),
        ingredients: vec!["udang".to_string()],
        instructions: vec!["goreng".to_string()],
        prep_minutes: None,
        cook_minutes: None,
        servings: None,
        difficulty: None,
        category_id: None,
        tags: vec![],
    };
    resepi_common::db::recipes::insert_recipe(&pool, &input, RecipeStatus::Draft, None)
        .await
        .unwrap();

    let provider = ScriptedProvider::new(vec![Err(DraftError::RateLimited)]);
    let report = audit_recipes(&pool, Some(&provider)).await.unwrap();
    assert_eq!(report.failed, 1);
    assert!(report.findings[0].error.is_some());
    assert!(!report.findings[0].fixed);
}
