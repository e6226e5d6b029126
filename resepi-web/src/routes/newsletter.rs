//! Public newsletter subscription endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tracing::debug;

use crate::db::newsletter::{self, SubscribeOutcome};
use crate::error::{ApiError, PageResult};
use crate::render;
use crate::session::MaybeUser;
use crate::AppState;

use super::{form_error, html_page, is_valid_email, non_blank, page_context};

const MAX_NAME_CHARS: usize = 80;

#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeQuery {
    pub token: Option<String>,
}

/// POST /newsletter/subscribe
///
/// Every accepted address gets the same answer, so the form cannot be
/// used to probe who is already on the list.
pub async fn subscribe(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<SubscribeForm>,
) -> PageResult<Response> {
    let ctx = page_context(&state, user).await?;
    let email = form.email.trim().to_lowercase();

    if !is_valid_email(&email) {
        let content = format!(
            r#"<h1>Langgan surat berita</h1>{}<p><a href="/">Kembali</a></p>"#,
            render::flash(Some("Sila masukkan alamat e-mel yang sah."), true)
        );
        return Ok(form_error(StatusCode::BAD_REQUEST, &ctx, "Surat berita", &content));
    }

    let name: String = non_blank(&form.name)
        .unwrap_or_default()
        .chars()
        .take(MAX_NAME_CHARS)
        .collect();

    let outcome = newsletter::subscribe(&state.db, &email, &name).await?;
    if outcome == SubscribeOutcome::AlreadySubscribed {
        debug!("Repeat subscription for an active address");
    }

    let content = format!(
        r#"<h1>Terima kasih!</h1>{}<p><a href="/">Kembali ke laman utama</a></p>"#,
        render::flash(Some("Anda telah melanggan surat berita kami."), false)
    );
    Ok(html_page(&ctx, "Surat berita", &content).into_response())
}

/// GET /newsletter/unsubscribe
pub async fn unsubscribe(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<UnsubscribeQuery>,
) -> PageResult<Html<String>> {
    let token = non_blank(&query.token).ok_or_else(|| ApiError::NotFound("Unsubscribe link".to_string()))?;

    if !newsletter::unsubscribe(&state.db, token).await? {
        return Err(ApiError::NotFound("Unsubscribe link".to_string()).into());
    }

    let ctx = page_context(&state, user).await?;
    Ok(html_page(
        &ctx,
        "Surat berita",
        r#"<h1>Langganan dibatalkan</h1><p>Anda tidak akan menerima surat berita lagi.</p>"#,
    ))
}

/// Build newsletter routes
pub fn newsletter_routes() -> Router<AppState> {
    Router::new()
        .route("/newsletter/subscribe", post(subscribe))
        .route("/newsletter/unsubscribe", get(unsubscribe))
}
