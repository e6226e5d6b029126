//! User roles

use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use resepi_common::db::Role;
use serde::Deserialize;

use crate::db::users;
use crate::error::{ApiError, PageResult};
use crate::render::{self, escape};
use crate::routes::page_context;
use crate::session::RequireAdmin;
use crate::AppState;

use super::admin_page;

/// GET /admin/users
pub async fn user_list(State(state): State<AppState>, RequireAdmin(user): RequireAdmin) -> PageResult<Html<String>> {
    let all = users::list_users(&state.db).await?;
    let choices: Vec<(String, String)> = Role::ALL
        .iter()
        .map(|r| (r.as_str().to_string(), render::role_label(*r).to_string()))
        .collect();

    let rows: String = all
        .iter()
        .map(|u| {
            let control = if u.guid == user.guid {
                render::role_label(u.role).to_string()
            } else {
                format!(
                    r#"<form class="inline" method="post" action="/admin/users/{id}/role"><select name="role">{options}</select> <button type="submit">Simpan</button></form>"#,
                    id = escape(&u.guid),
                    options = render::options(&choices, u.role.as_str()),
                )
            };
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&u.display_name),
                escape(&u.email),
                control,
                u.created_at.format("%Y-%m-%d"),
            )
        })
        .collect();

    let content = format!(
        r#"<h1>Pengguna</h1>
<table><tr><th>Nama</th><th>E-mel</th><th>Peranan</th><th>Didaftar</th></tr>{}</table>"#,
        rows
    );
    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, "Pengguna", &content))
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

/// POST /admin/users/:id/role
pub async fn change_role(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<RoleForm>,
) -> PageResult<Redirect> {
    let role: Role = form.role.trim().parse()?;

    // Admins cannot demote themselves
    if id == user.guid && role != Role::Admin {
        return Err(ApiError::BadRequest("You cannot remove your own admin role".to_string()).into());
    }

    users::set_role(&state.db, &id, role).await?;
    Ok(Redirect::to("/admin/users"))
}

/// Build user admin routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(user_list))
        .route("/admin/users/:id/role", post(change_role))
}
