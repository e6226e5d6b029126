//! Admin dashboard
//!
//! Editors manage recipes, images, taxonomy, guides, comments and AI
//! drafts. Newsletter, users and settings are admin-only.

pub mod drafts;
pub mod guides;
pub mod images;
pub mod newsletter;
pub mod recipes;
pub mod settings;
pub mod taxonomy;
pub mod users;

use axum::{extract::State, response::Html, routing::get, Router};
use resepi_common::db::{CommentStatus, DraftStatus, Role, SubscriberStatus};
use resepi_drafts::store::count_drafts;

use crate::db::{comments, newsletter as newsletter_db, recipes as recipe_db};
use crate::error::PageResult;
use crate::render::{self, PageContext};
use crate::session::RequireEditor;
use crate::AppState;

use super::page_context;

fn admin_nav(ctx: &PageContext) -> String {
    let is_admin = ctx.user.as_ref().map(|u| u.role == Role::Admin).unwrap_or(false);
    let admin_links = if is_admin {
        r#" · <a href="/admin/newsletter">Surat berita</a> · <a href="/admin/users">Pengguna</a> · <a href="/admin/settings">Tetapan</a>"#
    } else {
        ""
    };
    format!(
        r#"<nav class="meta"><a href="/admin">Papan pemuka</a> · <a href="/admin/recipes">Resepi</a> · <a href="/admin/comments">Komen</a> · <a href="/admin/drafts">Draf AI</a> · <a href="/admin/categories">Kategori</a> · <a href="/admin/tags">Tag</a> · <a href="/admin/guides">Panduan</a>{}</nav>"#,
        admin_links
    )
}

/// Render content inside the site layout with the admin navigation
pub(crate) fn admin_page(ctx: &PageContext, title: &str, content: &str) -> Html<String> {
    Html(render::layout(ctx, title, &format!("{}\n{}", admin_nav(ctx), content)))
}

/// GET /admin
pub async fn dashboard(State(state): State<AppState>, RequireEditor(user): RequireEditor) -> PageResult<Html<String>> {
    let counts = recipe_db::count_by_status(&state.db).await?;
    let pending_comments = comments::count_by_status(&state.db, CommentStatus::Pending).await?;
    let subscribers = newsletter_db::count_subscribers(&state.db, Some(SubscriberStatus::Subscribed)).await?;
    let pending_drafts = count_drafts(&state.db, DraftStatus::Pending).await?;

    let content = format!(
        r#"<h1>Papan pemuka</h1>
<table>
    <tr><th>Resepi diterbitkan</th><td>{published}</td></tr>
    <tr><th>Resepi draf</th><td>{draft}</td></tr>
    <tr><th>Resepi diarkib</th><td>{archived}</td></tr>
    <tr><th><a href="/admin/comments">Komen menunggu</a></th><td>{comments}</td></tr>
    <tr><th>Pelanggan surat berita</th><td>{subscribers}</td></tr>
    <tr><th><a href="/admin/drafts">Draf AI menunggu</a></th><td>{drafts}</td></tr>
</table>
<p><a href="/admin/recipes/new">+ Resepi baharu</a></p>"#,
        published = counts.published,
        draft = counts.draft,
        archived = counts.archived,
        comments = pending_comments,
        subscribers = subscribers,
        drafts = pending_drafts,
    );

    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, "Papan pemuka", &content))
}

/// Build admin routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .merge(recipes::recipe_admin_routes())
        .merge(images::image_routes())
        .merge(taxonomy::taxonomy_routes())
        .merge(guides::guide_admin_routes())
        .merge(newsletter::newsletter_admin_routes())
        .merge(users::user_routes())
        .merge(settings::settings_routes())
        .merge(drafts::draft_routes())
}
