//! Registration, sign-in and saved recipes

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use resepi_common::auth::MIN_PASSWORD_LEN;
use resepi_common::db::settings::SiteSettings;
use resepi_common::db::User;
use serde::Deserialize;
use tracing::info;

use crate::db::{recipes, saved, users};
use crate::error::{ApiError, PageResult};
use crate::render::{self, escape};
use crate::session::{
    clear_session_cookie, safe_next, session_cookie, session_token, with_cookie, MaybeUser, RequireUser,
};
use crate::AppState;

use super::pages::visible_recipe;
use super::{form_error, html_page, is_valid_email, page_context};

const MAX_DISPLAY_NAME_CHARS: usize = 80;

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Check registration fields; returns the first problem found
pub fn validate_registration(form: &RegisterForm) -> Result<(), String> {
    if !is_valid_email(&form.email) {
        return Err("Sila masukkan alamat e-mel yang sah.".to_string());
    }
    let name_len = form.display_name.trim().chars().count();
    if name_len == 0 || name_len > MAX_DISPLAY_NAME_CHARS {
        return Err(format!("Nama paparan mesti 1 hingga {} aksara.", MAX_DISPLAY_NAME_CHARS));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("Kata laluan mesti sekurang-kurangnya {} aksara.", MIN_PASSWORD_LEN));
    }
    Ok(())
}

fn register_form(error: Option<&str>, form: &RegisterForm) -> String {
    format!(
        r#"<h1>Daftar akaun</h1>
{flash}
<form method="post" action="/register">
    <input type="hidden" name="next" value="{next}">
    <label for="email">E-mel</label>
    <input type="email" id="email" name="email" value="{email}" required>
    <label for="display_name">Nama paparan</label>
    <input type="text" id="display_name" name="display_name" value="{name}" maxlength="80" required>
    <label for="password">Kata laluan</label>
    <input type="password" id="password" name="password" minlength="{min}" required>
    <p><button type="submit">Daftar</button></p>
</form>
<p>Sudah ada akaun? <a href="/login">Log masuk</a></p>"#,
        flash = render::flash(error, true),
        next = escape(form.next.as_deref().unwrap_or_default()),
        email = escape(form.email.trim()),
        name = escape(form.display_name.trim()),
        min = MIN_PASSWORD_LEN,
    )
}

fn login_form(error: Option<&str>, email: &str, next: &str) -> String {
    format!(
        r#"<h1>Log masuk</h1>
{flash}
<form method="post" action="/login">
    <input type="hidden" name="next" value="{next}">
    <label for="email">E-mel</label>
    <input type="email" id="email" name="email" value="{email}" required>
    <label for="password">Kata laluan</label>
    <input type="password" id="password" name="password" required>
    <p><button type="submit">Log masuk</button></p>
</form>
<p>Belum ada akaun? <a href="/register">Daftar</a></p>"#,
        flash = render::flash(error, true),
        next = escape(next),
        email = escape(email),
    )
}

/// Start a session and redirect with the cookie set
async fn sign_in(state: &AppState, user: &User, next: Option<&str>) -> PageResult<Response> {
    let settings = SiteSettings::load(&state.db).await?;
    let token = users::create_session(&state.db, &user.guid, settings.session_ttl_hours).await?;
    let cookie = session_cookie(&token, settings.session_ttl_hours * 3600);
    Ok(with_cookie(Redirect::to(&safe_next(next)).into_response(), &cookie))
}

/// GET /register
pub async fn register_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
) -> PageResult<Html<String>> {
    let ctx = page_context(&state, user).await?;
    let form = RegisterForm {
        next: query.next,
        ..Default::default()
    };
    Ok(html_page(&ctx, "Daftar", &register_form(None, &form)))
}

/// POST /register
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> PageResult<Response> {
    let ctx = page_context(&state, None).await?;

    if let Err(message) = validate_registration(&form) {
        return Ok(form_error(StatusCode::BAD_REQUEST, &ctx, "Daftar", &register_form(Some(&message), &form)));
    }

    let user = match users::create_user(&state.db, form.email.trim(), &form.display_name, &form.password).await {
        Ok(user) => user,
        Err(resepi_common::Error::Conflict(_)) => {
            return Ok(form_error(
                StatusCode::CONFLICT,
                &ctx,
                "Daftar",
                &register_form(Some("Alamat e-mel ini sudah didaftarkan."), &form),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    sign_in(&state, &user, form.next.as_deref()).await
}

/// GET /login
pub async fn login_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
) -> PageResult<Html<String>> {
    let ctx = page_context(&state, user).await?;
    Ok(html_page(
        &ctx,
        "Log masuk",
        &login_form(None, "", query.next.as_deref().unwrap_or_default()),
    ))
}

/// POST /login
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> PageResult<Response> {
    match users::authenticate(&state.db, form.email.trim(), &form.password).await? {
        Some(user) => {
            info!(user_id = %user.guid, "User signed in");
            sign_in(&state, &user, form.next.as_deref()).await
        }
        None => {
            let ctx = page_context(&state, None).await?;
            Ok(form_error(
                StatusCode::UNAUTHORIZED,
                &ctx,
                "Log masuk",
                &login_form(
                    Some("E-mel atau kata laluan tidak betul."),
                    form.email.trim(),
                    form.next.as_deref().unwrap_or_default(),
                ),
            ))
        }
    }
}

/// POST /logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> PageResult<Response> {
    if let Some(token) = session_token(&headers) {
        users::delete_session(&state.db, &token).await?;
    }
    Ok(with_cookie(Redirect::to("/").into_response(), &clear_session_cookie()))
}

/// GET /account
pub async fn account_page(State(state): State<AppState>, RequireUser(user): RequireUser) -> PageResult<Html<String>> {
    let cards = recipes::saved_cards(&state.db, &user.guid).await?;

    let content = format!(
        r#"<h1>Akaun saya</h1>
<table>
    <tr><th>Nama</th><td>{name}</td></tr>
    <tr><th>E-mel</th><td>{email}</td></tr>
    <tr><th>Peranan</th><td>{role}</td></tr>
    <tr><th>Ahli sejak</th><td>{since}</td></tr>
</table>
<h2>Resepi disimpan ({count})</h2>
{cards}"#,
        name = escape(&user.display_name),
        email = escape(&user.email),
        role = render::role_label(user.role),
        since = user.created_at.format("%d/%m/%Y"),
        count = cards.len(),
        cards = render::recipe_cards(&cards),
    );

    let ctx = page_context(&state, Some(user)).await?;
    Ok(html_page(&ctx, "Akaun saya", &content))
}

/// POST /recipes/:slug/save
pub async fn save(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(slug): Path<String>,
) -> PageResult<Redirect> {
    let recipe = visible_recipe(&state.db, &slug, Some(&user)).await?;
    saved::save_recipe(&state.db, &user.guid, &recipe.guid).await?;
    Ok(Redirect::to(&format!("/recipes/{}", recipe.slug)))
}

/// POST /recipes/:slug/unsave
pub async fn unsave(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(slug): Path<String>,
) -> PageResult<Redirect> {
    let recipe = recipes::get_recipe_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {}", slug)))?;
    saved::unsave_recipe(&state.db, &user.guid, &recipe.guid).await?;
    Ok(Redirect::to(&format!("/recipes/{}", recipe.slug)))
}

/// Build account routes
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
        .route("/account", get(account_page))
        .route("/recipes/:slug/save", post(save))
        .route("/recipes/:slug/unsave", post(unsave))
}
