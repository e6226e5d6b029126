//! Admin dashboard: recipes, taxonomy, guides, newsletter, users, settings

mod common;

use axum::http::{header, StatusCode};
use common::*;
use resepi_common::db::recipes::get_recipe;
use resepi_common::db::settings::{get_llm_api_key, get_setting, set_llm_api_key, PAGE_SIZE};
use resepi_common::db::RecipeStatus;

const RECIPE_BODY: &str = "title=Kari+Kepala+Ikan&summary=Pedas&ingredients=1+kepala+ikan%0D%0A2+sudu+serbuk+kari%0D%0A&instructions=Tumis.%0D%0AMasak.&prep_minutes=20&cook_minutes=40&servings=4&difficulty=medium&category_id=&tags=Pedas%2C+ikan%2C+pedas";

#[tokio::test]
async fn test_admin_requires_login() {
    let (state, _media) = test_state().await;

    let response = get(&state, "/admin/recipes", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Fadmin%2Frecipes");
}

#[tokio::test]
async fn test_create_recipe_from_form() {
    let (state, _media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;

    let response = post_form(&state, "/admin/recipes/new", RECIPE_BODY, Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response);
    let id = target
        .strip_prefix("/admin/recipes/")
        .and_then(|rest| rest.split('/').next())
        .unwrap()
        .to_string();

    let recipe = get_recipe(&state.db, &id).await.unwrap().unwrap();
    assert_eq!(recipe.title, "Kari Kepala Ikan");
    assert_eq!(recipe.slug, "kari-kepala-ikan");
    assert_eq!(recipe.status, RecipeStatus::Draft);
    assert_eq!(recipe.ingredients, "1 kepala ikan\n2 sudu serbuk kari");
    assert!(recipe.published_at.is_none());

    let tags: Vec<String> = sqlx::query_scalar(
        "SELECT t.name FROM tags t JOIN recipe_tags rt ON rt.tag_id = t.guid WHERE rt.recipe_id = ? ORDER BY t.name",
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await
    .unwrap();
    assert_eq!(tags.len(), 2);

    let edit = get(&state, &target, Some(&admin)).await;
    assert_eq!(edit.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_recipe_form_rerenders() {
    let (state, _media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;

    let body = "title=Ab&ingredients=&instructions=Masak&servings=0&difficulty=mustahil";
    let response = post_form(&state, "/admin/recipes/new", body, Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_string(response).await;
    assert!(html.contains("Title must be"));
    assert!(html.contains("At least one ingredient"));
    assert!(html.contains("Servings"));
    assert!(html.contains("Difficulty"));

    let body = RECIPE_BODY.replace("category_id=", "category_id=tiada-kategori");
    let response = post_form(&state, "/admin/recipes/new", &body, Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("Selected category does not exist"));
}

#[tokio::test]
async fn test_publishing_sets_published_at_once() {
    let (state, _media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;
    let recipe = add_recipe(&state, "Mi Rebus", RecipeStatus::Draft).await;
    let uri = format!("/admin/recipes/{}/status", recipe.guid);

    let response = post_form(&state, &uri, "status=published", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let first = get_recipe(&state.db, &recipe.guid).await.unwrap().unwrap();
    assert_eq!(first.status, RecipeStatus::Published);
    let published_at = first.published_at.unwrap();

    post_form(&state, &uri, "status=archived", Some(&admin)).await;
    post_form(&state, &uri, "status=published", Some(&admin)).await;
    let again = get_recipe(&state.db, &recipe.guid).await.unwrap().unwrap();
    assert_eq!(again.published_at, Some(published_at));

    let response = post_form(&state, &uri, "status=hilang", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recipe_table_filters_and_deletes() {
    let (state, _media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;
    add_recipe(&state, "Mi Rebus", RecipeStatus::Draft).await;
    let published = add_recipe(&state, "Mi Kari", RecipeStatus::Published).await;

    let html = body_string(get(&state, "/admin/recipes?status=published&sort=views&order=asc", Some(&admin)).await).await;
    assert!(html.contains("Mi Kari"));
    assert!(!html.contains("Mi Rebus"));

    // Unknown sort columns fall back to the default ordering
    let response = get(&state, "/admin/recipes?sort=password_hash", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_form(&state, &format!("/admin/recipes/{}/delete", published.guid), "", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(get_recipe(&state.db, &published.guid).await.unwrap().is_none());
}

#[tokio::test]
async fn test_reader_cannot_edit_recipes() {
    let (state, _media) = test_state().await;
    register(&state, "admin@resepi.test", "Mak Som").await;
    let reader = register(&state, "pembaca@resepi.test", "Ali").await;

    let response = post_form(&state, "/admin/recipes/new", RECIPE_BODY, Some(&reader)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_editor_reaches_content_but_not_settings() {
    let (state, _media) = test_state().await;
    register(&state, "admin@resepi.test", "Mak Som").await;
    let editor = register(&state, "editor@resepi.test", "Siti").await;
    promote(&state, "editor@resepi.test", "editor").await;

    assert_eq!(get(&state, "/admin/recipes", Some(&editor)).await.status(), StatusCode::OK);
    assert_eq!(get(&state, "/admin/drafts", Some(&editor)).await.status(), StatusCode::OK);
    assert_eq!(get(&state, "/admin/settings", Some(&editor)).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(get(&state, "/admin/users", Some(&editor)).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(get(&state, "/admin/newsletter", Some(&editor)).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_category_crud_and_conflict() {
    let (state, _media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;

    let response = post_form(&state, "/admin/categories", "name=Kuih-muih&description=&sort_order=2", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = post_form(&state, "/admin/categories", "name=Kuih-muih&description=&sort_order=", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let id: String = sqlx::query_scalar("SELECT guid FROM categories WHERE slug = 'kuih-muih'")
        .fetch_one(&state.db)
        .await
        .unwrap();
    let response = post_form(
        &state,
        &format!("/admin/categories/{}/edit", id),
        "name=Kuih+Tradisional&description=Warisan&sort_order=1",
        Some(&admin),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let json = body_json(get(&state, "/api/categories", None).await).await;
    assert_eq!(json["categories"][0]["name"], "Kuih Tradisional");

    post_form(&state, &format!("/admin/categories/{}/delete", id), "", Some(&admin)).await;
    let json = body_json(get(&state, "/api/categories", None).await).await;
    assert_eq!(json["categories"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_tag_rename_and_delete() {
    let (state, _media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;
    let recipe = add_recipe(&state, "Roti Canai", RecipeStatus::Published).await;

    let tag_id: String = sqlx::query_scalar("SELECT guid FROM tags WHERE name = 'Sarapan'")
        .fetch_one(&state.db)
        .await
        .unwrap();
    let response = post_form(&state, &format!("/admin/tags/{}/rename", tag_id), "name=Pagi", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let json = body_json(get(&state, &format!("/api/recipes/{}", recipe.slug), None).await).await;
    assert_eq!(json["tags"][0]["name"], "Pagi");

    post_form(&state, &format!("/admin/tags/{}/delete", tag_id), "", Some(&admin)).await;
    let json = body_json(get(&state, &format!("/api/recipes/{}", recipe.slug), None).await).await;
    assert_eq!(json["tags"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_guide_admin_flow() {
    let (state, _media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;

    let response = post_form(&state, "/admin/guides/new", "title=Ab&body=", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_form(
        &state,
        "/admin/guides/new",
        "title=Memilih+Santan&body=Pilih+yang+segar.&published=true",
        Some(&admin),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let html = body_string(get(&state, "/guides/memilih-santan", None).await).await;
    assert!(html.contains("Pilih yang segar."));
}

#[tokio::test]
async fn test_newsletter_subscribe_unsubscribe_and_export() {
    let (state, _media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;

    let response = post_form(&state, "/newsletter/subscribe", "email=bukan-emel", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = "email=Kak.Ros%40Contoh.Test&name=Ros%2C+Kak";
    let first = body_string(post_form(&state, "/newsletter/subscribe", body, None).await).await;
    // A repeat looks exactly like a first subscription
    let second = body_string(post_form(&state, "/newsletter/subscribe", body, None).await).await;
    assert_eq!(first, second);

    let token: String = sqlx::query_scalar("SELECT unsubscribe_token FROM newsletter_subscribers WHERE email = ?")
        .bind("kak.ros@contoh.test")
        .fetch_one(&state.db)
        .await
        .unwrap();

    let response = get(&state, "/admin/newsletter/export.csv", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment"));
    let csv = body_string(response).await;
    let mut lines = csv.split("\r\n");
    assert_eq!(lines.next(), Some("email,name,status,subscribed_at"));
    assert!(lines.next().unwrap().starts_with("kak.ros@contoh.test,\"Ros, Kak\",subscribed,"));

    let response = get(&state, &format!("/newsletter/unsubscribe?token={}", token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = get(&state, "/newsletter/unsubscribe?token=palsu", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let csv = body_string(get(&state, "/admin/newsletter/export.csv?status=subscribed", Some(&admin)).await).await;
    assert_eq!(csv, "email,name,status,subscribed_at\r\n");

    // Subscribing again reactivates the same row
    post_form(&state, "/newsletter/subscribe", "email=kak.ros%40contoh.test", None).await;
    let status: String = sqlx::query_scalar("SELECT status FROM newsletter_subscribers")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(status, "subscribed");

    let html = body_string(get(&state, "/admin/newsletter", Some(&admin)).await).await;
    assert!(html.contains("kak.ros@contoh.test"));
}

#[tokio::test]
async fn test_admin_cannot_demote_self() {
    let (state, _media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;
    register(&state, "siti@resepi.test", "Siti").await;
    let admin_id = user_id(&state, "admin@resepi.test").await;
    let siti_id = user_id(&state, "siti@resepi.test").await;

    let response = post_form(&state, &format!("/admin/users/{}/role", admin_id), "role=reader", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_form(&state, &format!("/admin/users/{}/role", siti_id), "role=editor", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let role: String = sqlx::query_scalar("SELECT role FROM users WHERE guid = ?")
        .bind(&siti_id)
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(role, "editor");

    let html = body_string(get(&state, "/admin/users", Some(&admin)).await).await;
    assert!(html.contains("siti@resepi.test"));
}

#[tokio::test]
async fn test_settings_validate_and_mask_api_key() {
    let (state, _media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;
    set_llm_api_key(&state.db, "sk-rahsia-betul-9876").await.unwrap();

    let html = body_string(get(&state, "/admin/settings", Some(&admin)).await).await;
    assert!(html.contains("9876"));
    assert!(!html.contains("sk-rahsia-betul"));

    let valid = "site_name=Dapur+Kita&page_size=24&admin_page_size=50&comments_require_approval=true\
        &session_ttl_hours=48&image_max_upload_bytes=1048576&image_thumbnail_width=300\
        &image_medium_width=900&llm_model=gpt-4o-mini&llm_rate_limit_ms=500&llm_api_key=";
    let response = post_form(&state, "/admin/settings", valid, Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(get_setting::<i64>(&state.db, PAGE_SIZE).await.unwrap(), Some(24));
    // A blank key field keeps the stored key
    assert_eq!(get_llm_api_key(&state.db).await.unwrap().as_deref(), Some("sk-rahsia-betul-9876"));

    let invalid = valid.replace("page_size=24", "page_size=0");
    let response = post_form(&state, "/admin/settings", &invalid, Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_setting::<i64>(&state.db, PAGE_SIZE).await.unwrap(), Some(24));

    let cleared = format!("{}&clear_llm_api_key=true", valid);
    post_form(&state, "/admin/settings", &cleared, Some(&admin)).await;
    assert_eq!(get_llm_api_key(&state.db).await.unwrap(), None);
}

#[tokio::test]
async fn test_dashboard_counts() {
    let (state, _media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Mak Som").await;
    add_recipe(&state, "Mi Rebus", RecipeStatus::Draft).await;
    add_recipe(&state, "Mi Kari", RecipeStatus::Published).await;

    let response = get(&state, "/admin", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
