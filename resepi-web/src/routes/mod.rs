//! HTTP handlers

pub mod account;
pub mod admin;
pub mod api;
pub mod comments;
pub mod health;
pub mod newsletter;
pub mod pages;

pub use health::health_routes;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use resepi_common::db::settings::SiteSettings;
use resepi_common::db::User;

use crate::error::PageResult;
use crate::render::{self, PageContext};
use crate::AppState;

/// Layout context for the current request
pub(crate) async fn page_context(state: &AppState, user: Option<User>) -> PageResult<PageContext> {
    let settings = SiteSettings::load(&state.db).await?;
    Ok(PageContext {
        site_name: settings.site_name,
        user,
    })
}

/// Render content inside the site layout
pub(crate) fn html_page(ctx: &PageContext, title: &str, content: &str) -> Html<String> {
    Html(render::layout(ctx, title, content))
}

/// Form re-rendered with an error and a non-200 status
pub(crate) fn form_error(status: StatusCode, ctx: &PageContext, title: &str, content: &str) -> Response {
    (status, html_page(ctx, title, content)).into_response()
}

/// Fallback for unknown paths
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(render::error_page(404, "Halaman tidak dijumpai", "Halaman yang dicari tiada.")),
    )
        .into_response()
}

/// Checkbox fields arrive as "on"/"true"/"1" when ticked, absent otherwise
pub(crate) fn checkbox(value: &Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim),
        Some("on") | Some("true") | Some("1") | Some("yes")
    )
}

/// Empty or whitespace-only query values count as absent
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// `?page=` value; anything unparsable is page 1
pub(crate) fn parse_page(value: &Option<String>) -> i64 {
    non_blank(value).and_then(|v| v.parse().ok()).unwrap_or(1)
}

/// Minimal address check: one `@`, a non-empty local part and a dot
/// inside the domain
pub(crate) fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) || email.len() > 254 {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(name, rest)| !name.is_empty() && !rest.is_empty() && !rest.ends_with('.'))
                    .unwrap_or(false)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("mak@example.com"));
        assert!(is_valid_email(" cik.siti@mail.example.my "));
        assert!(!is_valid_email("mak@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("mak@@example.com"));
        assert!(!is_valid_email("mak @example.com"));
        assert!(!is_valid_email("mak@.com"));
    }

    #[test]
    fn test_form_value_helpers() {
        assert!(checkbox(&Some("on".into())));
        assert!(!checkbox(&None));
        assert_eq!(non_blank(&Some("   ".into())), None);
        assert_eq!(parse_page(&Some("3".into())), 3);
        assert_eq!(parse_page(&Some("tiga".into())), 1);
        assert_eq!(parse_page(&None), 1);
    }
}
