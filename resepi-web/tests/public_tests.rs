//! Public pages and the JSON API through the full router

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::*;
use resepi_common::db::recipes::set_recipe_status;
use resepi_common::db::RecipeStatus;

#[tokio::test]
async fn test_health_endpoint() {
    let (state, _media) = test_state().await;

    let response = get(&state, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "resepi-web");
}

#[tokio::test]
async fn test_home_lists_only_published_recipes() {
    let (state, _media) = test_state().await;
    add_recipe(&state, "Nasi Lemak", RecipeStatus::Published).await;
    add_recipe(&state, "Laksa Rahsia", RecipeStatus::Draft).await;

    let response = get(&state, "/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("Nasi Lemak"));
    assert!(!html.contains("Laksa Rahsia"));
}

#[tokio::test]
async fn test_recipe_detail_counts_views_and_hides_drafts() {
    let (state, _media) = test_state().await;
    let published = add_recipe(&state, "Roti Jala", RecipeStatus::Published).await;
    let draft = add_recipe(&state, "Kuih Baru", RecipeStatus::Draft).await;

    let uri = format!("/recipes/{}", published.slug);
    assert_eq!(get(&state, &uri, None).await.status(), StatusCode::OK);
    let html = body_string(get(&state, &uri, None).await).await;
    assert!(html.contains("Roti Jala"));
    assert!(html.contains("2 cawan beras"));

    let views: i64 = sqlx::query_scalar("SELECT view_count FROM recipes WHERE guid = ?")
        .bind(&published.guid)
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(views, 2);

    let response = get(&state, &format!("/recipes/{}", draft.slug), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_editor_can_preview_draft() {
    let (state, _media) = test_state().await;
    let admin = register(&state, "admin@resepi.test", "Admin").await;
    let draft = add_recipe(&state, "Kuih Baru", RecipeStatus::Draft).await;

    let response = get(&state, &format!("/recipes/{}", draft.slug), Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_page_renders_html_404() {
    let (state, _media) = test_state().await;

    let response = get(&state, "/tiada-di-sini", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
}

#[tokio::test]
async fn test_search_matches_text_and_ignores_bad_filters() {
    let (state, _media) = test_state().await;
    add_recipe(&state, "Nasi Lemak", RecipeStatus::Published).await;
    add_recipe(&state, "Mee Goreng", RecipeStatus::Published).await;

    let html = body_string(get(&state, "/search?q=lemak&difficulty=mudah-sekali", None).await).await;
    assert!(html.contains("Nasi Lemak"));
    assert!(!html.contains("Mee Goreng"));

    // A blank query shows the form without results
    let response = get(&state, "/search?q=", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(!html.contains("Nasi Lemak"));
}

#[tokio::test]
async fn test_category_page_filters_recipes() {
    let (state, _media) = test_state().await;
    let category = add_category(&state, "Kuih-muih").await;

    let mut input = recipe_input("Kuih Lapis");
    input.category_id = Some(category);
    let kuih = resepi_common::db::recipes::insert_recipe(&state.db, &input, RecipeStatus::Published, None)
        .await
        .unwrap();
    add_recipe(&state, "Sup Ayam", RecipeStatus::Published).await;

    let html = body_string(get(&state, "/categories/kuih-muih", None).await).await;
    assert!(html.contains(&kuih.title));
    assert!(!html.contains("Sup Ayam"));

    assert_eq!(get(&state, "/categories/tiada", None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_recipe_list_and_detail() {
    let (state, _media) = test_state().await;
    let recipe = add_recipe(&state, "Ayam Percik", RecipeStatus::Published).await;
    add_recipe(&state, "Belum Siap", RecipeStatus::Draft).await;

    let request = Request::builder()
        .uri("/api/recipes")
        .header(header::ORIGIN, "https://contoh.test")
        .body(Body::empty())
        .unwrap();
    let response = send(&state, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let json = body_json(response).await;
    assert_eq!(json["pagination"]["total"], 1);
    assert_eq!(json["recipes"][0]["slug"], recipe.slug.as_str());

    let json = body_json(get(&state, &format!("/api/recipes/{}", recipe.slug), None).await).await;
    assert_eq!(json["recipe"]["title"], "Ayam Percik");
    assert_eq!(json["tags"][0]["name"], "Sarapan");

    // API reads are not views
    let views: i64 = sqlx::query_scalar("SELECT view_count FROM recipes WHERE guid = ?")
        .bind(&recipe.guid)
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(views, 0);
}

#[tokio::test]
async fn test_api_errors_use_json_envelope() {
    let (state, _media) = test_state().await;
    let recipe = add_recipe(&state, "Arkib Lama", RecipeStatus::Published).await;
    set_recipe_status(&state.db, &recipe.guid, RecipeStatus::Archived).await.unwrap();

    let response = get(&state, &format!("/api/recipes/{}", recipe.slug), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_api_search_with_empty_query_is_empty() {
    let (state, _media) = test_state().await;
    add_recipe(&state, "Nasi Lemak", RecipeStatus::Published).await;

    let json = body_json(get(&state, "/api/search", None).await).await;
    assert_eq!(json["recipes"].as_array().unwrap().len(), 0);
    assert_eq!(json["pagination"]["total"], 0);

    let json = body_json(get(&state, "/api/search?q=nasi", None).await).await;
    assert_eq!(json["recipes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_api_categories_count_published_recipes() {
    let (state, _media) = test_state().await;
    let category = add_category(&state, "Lauk").await;
    let mut input = recipe_input("Rendang");
    input.category_id = Some(category.clone());
    resepi_common::db::recipes::insert_recipe(&state.db, &input, RecipeStatus::Published, None)
        .await
        .unwrap();
    let mut input = recipe_input("Gulai");
    input.category_id = Some(category);
    resepi_common::db::recipes::insert_recipe(&state.db, &input, RecipeStatus::Draft, None)
        .await
        .unwrap();

    let json = body_json(get(&state, "/api/categories", None).await).await;
    assert_eq!(json["categories"][0]["name"], "Lauk");
    assert_eq!(json["categories"][0]["recipe_count"], 1);
}

#[tokio::test]
async fn test_guides_show_only_published() {
    let (state, _media) = test_state().await;
    let guide = resepi_web::db::guides::create_guide(&state.db, "Asas Santan", "Perenggan satu.\n\nPerenggan dua.", true)
        .await
        .unwrap();
    resepi_web::db::guides::create_guide(&state.db, "Draf Panduan", "Belum siap.", false)
        .await
        .unwrap();

    let html = body_string(get(&state, "/guides", None).await).await;
    assert!(html.contains("Asas Santan"));
    assert!(!html.contains("Draf Panduan"));

    let html = body_string(get(&state, &format!("/guides/{}", guide.slug), None).await).await;
    assert!(html.contains("<p>Perenggan dua.</p>"));
}
