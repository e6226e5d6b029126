//! Comment posting and the moderation queue

use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use resepi_common::db::settings::SiteSettings;
use resepi_common::db::CommentStatus;
use serde::Deserialize;

use crate::db::comments;
use crate::error::{ApiError, PageResult};
use crate::pagination::calculate_pagination;
use crate::render::{self, escape};
use crate::session::{RequireEditor, RequireUser};
use crate::AppState;

use super::admin::admin_page;
use super::pages::visible_recipe;
use super::{non_blank, page_context, parse_page};

pub const MIN_COMMENT_CHARS: usize = 2;
pub const MAX_COMMENT_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub body: String,
}

/// Trimmed comment body, or the reason it was refused
pub fn validate_comment(body: &str) -> Result<&str, ApiError> {
    let body = body.trim();
    let len = body.chars().count();
    if len < MIN_COMMENT_CHARS || len > MAX_COMMENT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Comment must be {} to {} characters",
            MIN_COMMENT_CHARS, MAX_COMMENT_CHARS
        )));
    }
    Ok(body)
}

/// POST /recipes/:slug/comments
pub async fn post_comment(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(slug): Path<String>,
    Form(form): Form<CommentForm>,
) -> PageResult<Redirect> {
    let recipe = visible_recipe(&state.db, &slug, Some(&user)).await?;
    let body = validate_comment(&form.body)?;

    let settings = SiteSettings::load(&state.db).await?;
    let status = if settings.comments_require_approval && !user.role.can_edit() {
        CommentStatus::Pending
    } else {
        CommentStatus::Approved
    };

    comments::create_comment(&state.db, &recipe.guid, &user.guid, body, status).await?;

    Ok(Redirect::to(&format!(
        "/recipes/{}?comment={}#comments",
        recipe.slug,
        status.as_str()
    )))
}

#[derive(Debug, Default, Deserialize)]
pub struct QueueQuery {
    pub status: Option<String>,
    pub page: Option<String>,
}

/// Queue being viewed; pending unless another valid status is asked for
fn queue_status(value: &Option<String>) -> CommentStatus {
    non_blank(value)
        .and_then(|s| s.parse().ok())
        .unwrap_or(CommentStatus::Pending)
}

/// GET /admin/comments
pub async fn moderation_page(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Query(query): Query<QueueQuery>,
) -> PageResult<Html<String>> {
    let settings = SiteSettings::load(&state.db).await?;
    let status = queue_status(&query.status);

    let total = comments::count_by_status(&state.db, status).await?;
    let pagination = calculate_pagination(total, parse_page(&query.page), settings.admin_page_size);
    let rows = comments::moderation_queue(&state.db, status, pagination.page_size, pagination.offset).await?;

    let tabs: Vec<String> = CommentStatus::ALL
        .iter()
        .map(|s| {
            if *s == status {
                format!("<strong>{}</strong>", s)
            } else {
                format!(r#"<a href="/admin/comments?status={0}">{0}</a>"#, s)
            }
        })
        .collect();

    let action = |guid: &str, verb: &str, label: &str, class: &str| {
        format!(
            r#"<form class="inline" method="post" action="/admin/comments/{guid}/{verb}"><input type="hidden" name="status" value="{status}"><button class="{class}" type="submit">{label}</button></form>"#,
            guid = escape(guid),
            verb = verb,
            status = status,
            class = class,
            label = label,
        )
    };

    let body_rows: String = rows
        .iter()
        .map(|row| {
            let mut actions = String::new();
            if row.status != CommentStatus::Approved {
                actions.push_str(&action(&row.guid, "approve", "Lulus", ""));
            }
            if row.status != CommentStatus::Rejected {
                actions.push_str(&action(&row.guid, "reject", "Tolak", "secondary"));
            }
            actions.push_str(&action(&row.guid, "delete", "Padam", "secondary"));
            format!(
                r#"<tr><td>{date}</td><td>{author}<br><span class="meta">{email}</span></td><td><a href="/recipes/{slug}">{recipe}</a></td><td>{body}</td><td>{actions}</td></tr>"#,
                date = row.created_at.format("%Y-%m-%d %H:%M"),
                author = escape(&row.author_name),
                email = escape(&row.author_email),
                slug = escape(&row.recipe_slug),
                recipe = escape(&row.recipe_title),
                body = escape(&row.body),
                actions = actions,
            )
        })
        .collect();

    let table = if rows.is_empty() {
        r#"<p class="meta">Tiada komen dalam senarai ini.</p>"#.to_string()
    } else {
        format!(
            "<table><tr><th>Tarikh</th><th>Penulis</th><th>Resepi</th><th>Komen</th><th></th></tr>{}</table>",
            body_rows
        )
    };

    let content = format!(
        r#"<h1>Moderasi komen</h1>
<p>{tabs}</p>
<p class="meta">{total} komen</p>
{table}
{pager}"#,
        tabs = tabs.join(" · "),
        total = pagination.total,
        table = table,
        pager = render::pager(&pagination, "/admin/comments", &[("status", status.as_str().to_string())]),
    );

    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, "Moderasi komen", &content))
}

/// Queue to return to after an action
#[derive(Debug, Default, Deserialize)]
pub struct ActionForm {
    pub status: Option<String>,
}

fn back_to_queue(form: &ActionForm) -> Redirect {
    Redirect::to(&format!("/admin/comments?status={}", queue_status(&form.status)))
}

/// POST /admin/comments/:id/approve
pub async fn approve(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<String>,
    Form(form): Form<ActionForm>,
) -> PageResult<Redirect> {
    comments::moderate(&state.db, &id, CommentStatus::Approved, &user.guid).await?;
    Ok(back_to_queue(&form))
}

/// POST /admin/comments/:id/reject
pub async fn reject(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<String>,
    Form(form): Form<ActionForm>,
) -> PageResult<Redirect> {
    comments::moderate(&state.db, &id, CommentStatus::Rejected, &user.guid).await?;
    Ok(back_to_queue(&form))
}

/// POST /admin/comments/:id/delete
pub async fn delete(
    State(state): State<AppState>,
    RequireEditor(_user): RequireEditor,
    Path(id): Path<String>,
    Form(form): Form<ActionForm>,
) -> PageResult<Redirect> {
    comments::delete_comment(&state.db, &id).await?;
    Ok(back_to_queue(&form))
}

/// Build comment routes
pub fn comment_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/:slug/comments", post(post_comment))
        .route("/admin/comments", get(moderation_page))
        .route("/admin/comments/:id/approve", post(approve))
        .route("/admin/comments/:id/reject", post(reject))
        .route("/admin/comments/:id/delete", post(delete))
}
