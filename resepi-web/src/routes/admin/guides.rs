//! Guide (cooking article) management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use resepi_common::db::Guide;
use serde::Deserialize;

use crate::db::guides;
use crate::error::{ApiError, PageResult};
use crate::render::{self, escape};
use crate::routes::{checkbox, page_context};
use crate::session::RequireEditor;
use crate::AppState;

use super::admin_page;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GuideForm {
    pub title: String,
    pub body: String,
    pub published: Option<String>,
}

/// Validated (title, body, published)
pub fn parse_guide_form(form: &GuideForm) -> Result<(String, String, bool), String> {
    let title = form.title.trim();
    let len = title.chars().count();
    if !(3..=200).contains(&len) {
        return Err("Title must be 3 to 200 characters".to_string());
    }
    let body = form.body.trim();
    if body.is_empty() {
        return Err("Body is required".to_string());
    }
    Ok((title.to_string(), body.to_string(), checkbox(&form.published)))
}

fn guide_form_html(action: &str, form: &GuideForm, error: Option<&str>) -> String {
    format!(
        r#"{flash}
<form method="post" action="{action}">
    <label for="title">Tajuk</label>
    <input type="text" id="title" name="title" value="{title}" maxlength="200" required>
    <label for="body">Kandungan (perenggan dipisahkan baris kosong)</label>
    <textarea id="body" name="body" style="min-height:300px">{body}</textarea>
    <label><input type="checkbox" name="published" value="true"{checked}> Terbitkan</label>
    <p><button type="submit">Simpan</button></p>
</form>"#,
        flash = render::flash(error, true),
        action = escape(action),
        title = escape(&form.title),
        body = escape(&form.body),
        checked = if checkbox(&form.published) { " checked" } else { "" },
    )
}

/// GET /admin/guides
pub async fn guide_list(State(state): State<AppState>, RequireEditor(user): RequireEditor) -> PageResult<Html<String>> {
    let all = guides::list_all_guides(&state.db).await?;
    let rows: String = all
        .iter()
        .map(|g| {
            format!(
                r#"<tr><td><a href="/admin/guides/{id}/edit">{title}</a></td><td>{state}</td><td>{updated}</td><td><form class="inline" method="post" action="/admin/guides/{id}/delete"><button class="secondary" type="submit">Padam</button></form></td></tr>"#,
                id = escape(&g.guid),
                title = escape(&g.title),
                state = if g.published { "Diterbitkan" } else { "Draf" },
                updated = g.updated_at.format("%Y-%m-%d"),
            )
        })
        .collect();

    let content = format!(
        r#"<h1>Panduan</h1>
<p><a href="/admin/guides/new">+ Panduan baharu</a></p>
<table><tr><th>Tajuk</th><th>Status</th><th>Dikemas kini</th><th></th></tr>{}</table>"#,
        rows
    );
    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, "Panduan", &content))
}

/// GET /admin/guides/new
pub async fn new_guide_page(State(state): State<AppState>, RequireEditor(user): RequireEditor) -> PageResult<Html<String>> {
    let content = format!(
        "<h1>Panduan baharu</h1>\n{}",
        guide_form_html("/admin/guides/new", &GuideForm::default(), None)
    );
    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, "Panduan baharu", &content))
}

/// POST /admin/guides/new
pub async fn create_guide(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Form(form): Form<GuideForm>,
) -> PageResult<Response> {
    match parse_guide_form(&form) {
        Ok((title, body, published)) => {
            guides::create_guide(&state.db, &title, &body, published).await?;
            Ok(Redirect::to("/admin/guides").into_response())
        }
        Err(message) => {
            let content = format!(
                "<h1>Panduan baharu</h1>\n{}",
                guide_form_html("/admin/guides/new", &form, Some(&message))
            );
            let ctx = page_context(&state, Some(user)).await?;
            Ok((StatusCode::BAD_REQUEST, admin_page(&ctx, "Panduan baharu", &content)).into_response())
        }
    }
}

async fn load_guide(state: &AppState, id: &str) -> PageResult<Guide> {
    guides::get_guide(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Guide {}", id)).into())
}

/// GET /admin/guides/:id/edit
pub async fn edit_guide_page(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<String>,
) -> PageResult<Html<String>> {
    let guide = load_guide(&state, &id).await?;
    let form = GuideForm {
        title: guide.title.clone(),
        body: guide.body.clone(),
        published: guide.published.then(|| "true".to_string()),
    };
    let content = format!(
        "<h1>Sunting panduan</h1>\n{}",
        guide_form_html(&format!("/admin/guides/{}/edit", guide.guid), &form, None)
    );
    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, &guide.title, &content))
}

/// POST /admin/guides/:id/edit
pub async fn update_guide(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<String>,
    Form(form): Form<GuideForm>,
) -> PageResult<Response> {
    let guide = load_guide(&state, &id).await?;
    match parse_guide_form(&form) {
        Ok((title, body, published)) => {
            guides::update_guide(&state.db, &guide.guid, &title, &body, published).await?;
            Ok(Redirect::to("/admin/guides").into_response())
        }
        Err(message) => {
            let content = format!(
                "<h1>Sunting panduan</h1>\n{}",
                guide_form_html(&format!("/admin/guides/{}/edit", guide.guid), &form, Some(&message))
            );
            let ctx = page_context(&state, Some(user)).await?;
            Ok((StatusCode::BAD_REQUEST, admin_page(&ctx, &guide.title, &content)).into_response())
        }
    }
}

/// POST /admin/guides/:id/delete
pub async fn delete_guide(
    State(state): State<AppState>,
    RequireEditor(_user): RequireEditor,
    Path(id): Path<String>,
) -> PageResult<Redirect> {
    guides::delete_guide(&state.db, &id).await?;
    Ok(Redirect::to("/admin/guides"))
}

/// Build guide admin routes
pub fn guide_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/guides", get(guide_list))
        .route("/admin/guides/new", get(new_guide_page).post(create_guide))
        .route("/admin/guides/:id/edit", get(edit_guide_page).post(update_guide))
        .route("/admin/guides/:id/delete", post(delete_guide))
}
