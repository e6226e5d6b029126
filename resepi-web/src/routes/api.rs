//! Read-only JSON mirror of the public site
//!
//! Only published content is exposed. Reads here do not count as views.

use axum::{
    extract::{Path, Query, State},
    http::Method,
    routing::get,
    Json, Router,
};
use resepi_common::db::recipes::tags_for_recipe;
use resepi_common::db::settings::SiteSettings;
use resepi_common::db::{Category, Recipe, RecipeImage, Tag};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::db::comments::{approved_for_recipe, PublicComment};
use crate::db::recipes::{get_recipe_by_slug, RecipeCard, RecipeFilter, RecipeSort};
use crate::db::images::images_for_recipe;
use crate::db::taxonomy::{get_category, list_categories_with_counts, CategoryWithCount};
use crate::error::{ApiError, ApiResult, PageError};
use crate::pagination::{calculate_pagination, Pagination};
use crate::AppState;

use super::pages::{filtered_page, search_filter, ListQuery, SearchQuery};
use super::parse_page;

#[derive(Debug, Serialize)]
pub struct RecipeListResponse {
    pub recipes: Vec<RecipeCard>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetailResponse {
    pub recipe: Recipe,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
    pub images: Vec<RecipeImage>,
    pub comments: Vec<PublicComment>,
}

#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<CategoryWithCount>,
}

fn unwrap_page(err: PageError) -> ApiError {
    err.0
}

/// GET /api/recipes
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<RecipeListResponse>> {
    let settings = SiteSettings::load(&state.db).await?;
    let (recipes, pagination) = filtered_page(
        &state.db,
        &RecipeFilter::default(),
        RecipeSort::parse(query.sort.as_deref()),
        parse_page(&query.page),
        settings.page_size,
    )
    .await
    .map_err(unwrap_page)?;

    Ok(Json(RecipeListResponse { recipes, pagination }))
}

/// GET /api/recipes/:slug
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<RecipeDetailResponse>> {
    let recipe = get_recipe_by_slug(&state.db, &slug)
        .await?
        .filter(Recipe::is_published)
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {}", slug)))?;

    let category = match &recipe.category_id {
        Some(id) => get_category(&state.db, id).await?,
        None => None,
    };
    let tags = tags_for_recipe(&state.db, &recipe.guid).await?;
    let images = images_for_recipe(&state.db, &recipe.guid).await?;
    let comments = approved_for_recipe(&state.db, &recipe.guid).await?;

    Ok(Json(RecipeDetailResponse {
        recipe,
        category,
        tags,
        images,
        comments,
    }))
}

/// GET /api/categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<CategoryListResponse>> {
    let categories = list_categories_with_counts(&state.db).await?;
    Ok(Json(CategoryListResponse { categories }))
}

/// GET /api/search
///
/// An empty query returns no results rather than the whole catalogue.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<RecipeListResponse>> {
    let settings = SiteSettings::load(&state.db).await?;
    let page = parse_page(&query.page);

    let Some(filter) = search_filter(&state.db, &query).await.map_err(unwrap_page)? else {
        return Ok(Json(RecipeListResponse {
            recipes: Vec::new(),
            pagination: calculate_pagination(0, page, settings.page_size),
        }));
    };

    let (recipes, pagination) = filtered_page(
        &state.db,
        &filter,
        RecipeSort::parse(query.sort.as_deref()),
        page,
        settings.page_size,
    )
    .await
    .map_err(unwrap_page)?;

    Ok(Json(RecipeListResponse { recipes, pagination }))
}

/// Build JSON API routes (nested under `/api`)
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/:slug", get(get_recipe))
        .route("/categories", get(list_categories))
        .route("/search", get(search))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
}
