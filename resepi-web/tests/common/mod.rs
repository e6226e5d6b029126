//! Shared fixtures for resepi-web integration tests
#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use resepi_common::config::TomlConfig;
use resepi_common::db::recipes::{insert_recipe, RecipeInput};
use resepi_common::db::{init_schema, Difficulty, Recipe, RecipeStatus};
use resepi_web::{build_router, AppState};
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "rahsia-dapur-123";

/// App state over an in-memory database and a temporary media folder
///
/// The `TempDir` must outlive the test.
pub async fn test_state() -> (AppState, TempDir) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();

    let media = tempfile::tempdir().unwrap();
    let state = AppState::new(pool, media.path().to_path_buf(), TomlConfig::default()).with_llm_rate_limit_ms(0);
    (state, media)
}

pub fn app(state: &AppState) -> Router {
    build_router(state.clone())
}

pub async fn send(state: &AppState, request: Request<Body>) -> Response {
    app(state).oneshot(request).await.unwrap()
}

pub async fn get(state: &AppState, uri: &str, cookie: Option<&str>) -> Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    send(state, builder.body(Body::empty()).unwrap()).await
}

pub async fn post_form(state: &AppState, uri: &str, body: &str, cookie: Option<&str>) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    send(state, builder.body(Body::from(body.to_string())).unwrap()).await
}

pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// `name=value` pair of the session cookie set by a response
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("resepi_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Register an account and return its session cookie
///
/// The first account registered in a database is the admin.
pub async fn register(state: &AppState, email: &str, name: &str) -> String {
    let body = format!(
        "email={}&display_name={}&password={}",
        urlencoding::encode(email),
        urlencoding::encode(name),
        PASSWORD
    );
    let response = post_form(state, "/register", &body, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER, "registration of {} failed", email);
    session_cookie(&response).expect("session cookie")
}

pub async fn user_id(state: &AppState, email: &str) -> String {
    sqlx::query_scalar("SELECT guid FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(&state.db)
        .await
        .unwrap()
}

pub async fn promote(state: &AppState, email: &str, role: &str) {
    sqlx::query("UPDATE users SET role = ? WHERE email = ?")
        .bind(role)
        .bind(email)
        .execute(&state.db)
        .await
        .unwrap();
}

pub fn recipe_input(title: &str) -> RecipeInput {
    RecipeInput {
        title: title.to_string(),
        summary: format!("{} ala kampung", title),
        ingredients: vec!["2 cawan beras".to_string(), "1 cawan santan".to_string()],
        instructions: vec!["Basuh beras.".to_string(), "Masak bersama santan.".to_string()],
        prep_minutes: Some(15),
        cook_minutes: Some(30),
        servings: Some(4),
        difficulty: Some(Difficulty::Easy),
        category_id: None,
        tags: vec!["Sarapan".to_string()],
    }
}

pub async fn add_recipe(state: &AppState, title: &str, status: RecipeStatus) -> Recipe {
    insert_recipe(&state.db, &recipe_input(title), status, None).await.unwrap()
}

pub async fn add_category(state: &AppState, name: &str) -> String {
    resepi_web::db::taxonomy::create_category(&state.db, name, "", 0)
        .await
        .unwrap()
        .guid
}
