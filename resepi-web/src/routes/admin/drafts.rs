//! AI recipe drafts: generate, review, accept or discard

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use resepi_common::db::{DraftStatus, RecipeDraftRow};
use resepi_drafts::generate::{generate_drafts, MAX_DRAFTS_PER_REQUEST};
use resepi_drafts::store::{self, draft_payload};
use resepi_drafts::DraftError;
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiError, PageError, PageResult};
use crate::render::{self, escape};
use crate::routes::{non_blank, page_context};
use crate::session::RequireEditor;
use crate::AppState;

use super::admin_page;

#[derive(Debug, Default, Deserialize)]
pub struct DraftListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateForm {
    pub idea: String,
    pub count: String,
}

/// Requested draft count, clamped to the per-request maximum
fn parse_count(raw: &str) -> u32 {
    raw.trim().parse::<u32>().unwrap_or(1).clamp(1, MAX_DRAFTS_PER_REQUEST)
}

fn draft_rows(drafts: &[RecipeDraftRow]) -> String {
    drafts
        .iter()
        .map(|d| {
            let recipe = match &d.recipe_id {
                Some(id) => format!(r#"<a href="/admin/recipes/{id}/edit">resepi</a>"#, id = escape(id)),
                None => String::new(),
            };
            format!(
                r#"<tr><td><a href="/admin/drafts/{id}">{title}</a></td><td>{prompt}</td><td>{status}</td><td>{created}</td><td>{recipe}</td></tr>"#,
                id = escape(&d.guid),
                title = escape(&d.title),
                prompt = escape(&d.prompt),
                status = d.status,
                created = d.created_at.format("%Y-%m-%d %H:%M"),
                recipe = recipe,
            )
        })
        .collect()
}

async fn drafts_content(state: &AppState, status: Option<DraftStatus>, form: &GenerateForm, error: Option<&str>) -> PageResult<String> {
    let drafts = store::list_drafts(&state.db, status).await?;
    let status_value = status.map(|s| s.as_str().to_string()).unwrap_or_default();
    let mut choices = vec![(String::new(), "Semua".to_string())];
    choices.extend(DraftStatus::ALL.iter().map(|s| (s.as_str().to_string(), s.as_str().to_string())));

    let count = if form.count.trim().is_empty() { "1".to_string() } else { form.count.clone() };

    Ok(format!(
        r#"<h1>Draf AI</h1>
{flash}
<form method="post" action="/admin/drafts/generate">
    <label for="idea">Idea resepi</label>
    <input type="text" id="idea" name="idea" value="{idea}" maxlength="300" required>
    <label for="count">Bilangan draf (maksimum {max})</label>
    <input type="number" id="count" name="count" value="{count}" min="1" max="{max}">
    <p><button type="submit">Jana</button></p>
</form>
<form method="get" action="/admin/drafts">
    <select name="status">{choices}</select>
    <button type="submit">Tapis</button>
</form>
<table><tr><th>Tajuk</th><th>Idea</th><th>Status</th><th>Dicipta</th><th></th></tr>{rows}</table>"#,
        flash = render::flash(error, true),
        idea = escape(&form.idea),
        max = MAX_DRAFTS_PER_REQUEST,
        count = escape(&count),
        choices = render::options(&choices, &status_value),
        rows = draft_rows(&drafts),
    ))
}

/// GET /admin/drafts
pub async fn draft_list(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Query(query): Query<DraftListQuery>,
) -> PageResult<Html<String>> {
    let status = non_blank(&query.status).and_then(|s| s.parse().ok());
    let content = drafts_content(&state, status, &GenerateForm::default(), None).await?;
    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, "Draf AI", &content))
}

/// POST /admin/drafts/generate
///
/// A missing API key or a rejected idea re-renders the form with the
/// reason; other failures surface as an error page.
pub async fn generate(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Form(form): Form<GenerateForm>,
) -> PageResult<Response> {
    let count = parse_count(&form.count);

    let outcome = match state.completion_provider().await {
        Ok(provider) => generate_drafts(&state.db, provider.as_ref(), &form.idea, count, Some(user.guid.as_str()))
            .await
            .map_err(ApiError::from),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(drafts) => {
            info!(user_id = %user.guid, drafts = drafts.len(), "Generated drafts from admin");
            match drafts.as_slice() {
                [only] => Ok(Redirect::to(&format!("/admin/drafts/{}", only.guid)).into_response()),
                _ => Ok(Redirect::to("/admin/drafts?status=pending").into_response()),
            }
        }
        Err(ApiError::Drafts(e @ (DraftError::MissingApiKey | DraftError::InvalidInput(_)))) => {
            let message = e.to_string();
            let content = drafts_content(&state, None, &form, Some(&message)).await?;
            let ctx = page_context(&state, Some(user)).await?;
            Ok((StatusCode::BAD_REQUEST, admin_page(&ctx, "Draf AI", &content)).into_response())
        }
        Err(e) => Err(PageError(e)),
    }
}

fn list_items(items: &[String], ordered: bool) -> String {
    let tag = if ordered { "ol" } else { "ul" };
    let body: String = items.iter().map(|i| format!("<li>{}</li>", escape(i))).collect();
    format!("<{tag}>{body}</{tag}>", tag = tag, body = body)
}

fn minutes(value: Option<u32>) -> String {
    value.map(|m| format!("{} min", m)).unwrap_or_else(|| "-".to_string())
}

/// GET /admin/drafts/:id
pub async fn draft_detail(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<String>,
) -> PageResult<Html<String>> {
    let row = store::get_draft(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Draft {}", id)))?;
    let draft = draft_payload(&row)?;

    let actions = if row.status == DraftStatus::Pending {
        format!(
            r#"<form class="inline" method="post" action="/admin/drafts/{id}/accept"><button type="submit">Terima sebagai resepi</button></form>
<form class="inline" method="post" action="/admin/drafts/{id}/discard"><button class="secondary" type="submit">Buang</button></form>"#,
            id = escape(&row.guid)
        )
    } else {
        format!("<p class=\"meta\">Status: {}</p>", row.status)
    };

    let content = format!(
        r#"<h1>{title}</h1>
<p class="meta">Idea: {prompt}</p>
<p>{summary}</p>
<table>
<tr><th>Persediaan</th><td>{prep}</td></tr>
<tr><th>Memasak</th><td>{cook}</td></tr>
<tr><th>Hidangan</th><td>{servings}</td></tr>
<tr><th>Kesukaran</th><td>{difficulty}</td></tr>
<tr><th>Kategori</th><td>{category}</td></tr>
<tr><th>Tag</th><td>{tags}</td></tr>
</table>
<h2>Bahan</h2>
{ingredients}
<h2>Cara</h2>
{instructions}
{actions}"#,
        title = escape(&draft.title),
        prompt = escape(&row.prompt),
        summary = escape(&draft.summary),
        prep = minutes(draft.prep_minutes),
        cook = minutes(draft.cook_minutes),
        servings = draft.servings.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
        difficulty = draft.difficulty.map(|d| d.label()).unwrap_or("-"),
        category = escape(draft.category.as_deref().unwrap_or("-")),
        tags = escape(&draft.tags.join(", ")),
        ingredients = list_items(&draft.ingredients, false),
        instructions = list_items(&draft.instructions, true),
        actions = actions,
    );

    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, &draft.title, &content))
}

/// POST /admin/drafts/:id/accept
pub async fn accept(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<String>,
) -> PageResult<Redirect> {
    let recipe = store::accept_draft(&state.db, &id, Some(user.guid.as_str())).await?;
    Ok(Redirect::to(&format!("/admin/recipes/{}/edit", recipe.guid)))
}

/// POST /admin/drafts/:id/discard
pub async fn discard(
    State(state): State<AppState>,
    RequireEditor(_user): RequireEditor,
    Path(id): Path<String>,
) -> PageResult<Redirect> {
    store::discard_draft(&state.db, &id).await?;
    Ok(Redirect::to("/admin/drafts"))
}

/// Build draft admin routes
pub fn draft_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/drafts", get(draft_list))
        .route("/admin/drafts/generate", post(generate))
        .route("/admin/drafts/:id", get(draft_detail))
        .route("/admin/drafts/:id/accept", post(accept))
        .route("/admin/drafts/:id/discard", post(discard))
}
