//! Subscriber list and CSV export

use axum::{
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use resepi_common::db::settings::SiteSettings;
use resepi_common::db::{NewsletterSubscriber, SubscriberStatus};
use serde::Deserialize;
use tracing::info;

use crate::db::newsletter;
use crate::error::PageResult;
use crate::pagination::calculate_pagination;
use crate::render::{self, escape};
use crate::routes::{non_blank, page_context, parse_page};
use crate::session::RequireAdmin;
use crate::AppState;

use super::admin_page;

#[derive(Debug, Default, Deserialize)]
pub struct SubscriberQuery {
    pub status: Option<String>,
    pub page: Option<String>,
}

fn status_filter(query: &SubscriberQuery) -> Option<SubscriberStatus> {
    non_blank(&query.status).and_then(|s| s.parse().ok())
}

/// Quote a CSV field when it holds a comma, quote or line break
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// RFC 4180 document with CRLF line endings
pub fn subscribers_csv(subscribers: &[NewsletterSubscriber]) -> String {
    let mut out = String::from("email,name,status,subscribed_at\r\n");
    for subscriber in subscribers {
        let fields = [
            csv_field(&subscriber.email),
            csv_field(&subscriber.name),
            csv_field(subscriber.status.as_str()),
            csv_field(&subscriber.created_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        ];
        out.push_str(&fields.join(","));
        out.push_str("\r\n");
    }
    out
}

/// GET /admin/newsletter
pub async fn subscriber_list(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Query(query): Query<SubscriberQuery>,
) -> PageResult<Html<String>> {
    let settings = SiteSettings::load(&state.db).await?;
    let status = status_filter(&query);

    let total = newsletter::count_subscribers(&state.db, status).await?;
    let pagination = calculate_pagination(total, parse_page(&query.page), settings.admin_page_size);
    let subscribers =
        newsletter::list_subscribers(&state.db, status, Some(pagination.page_size), pagination.offset).await?;

    let rows: String = subscribers
        .iter()
        .map(|s| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&s.email),
                escape(&s.name),
                s.status,
                s.created_at.format("%Y-%m-%d"),
            )
        })
        .collect();

    let status_value = status.map(|s| s.as_str().to_string()).unwrap_or_default();
    let mut choices = vec![(String::new(), "Semua".to_string())];
    choices.extend(SubscriberStatus::ALL.iter().map(|s| (s.as_str().to_string(), s.as_str().to_string())));

    let content = format!(
        r#"<h1>Surat berita</h1>
<form method="get" action="/admin/newsletter">
    <select name="status">{choices}</select>
    <button type="submit">Tapis</button>
</form>
<p class="meta">{total} pelanggan · <a href="{export}">Eksport CSV</a></p>
<table><tr><th>E-mel</th><th>Nama</th><th>Status</th><th>Melanggan</th></tr>{rows}</table>
{pager}"#,
        choices = render::options(&choices, &status_value),
        total = pagination.total,
        export = escape(&render::url_with_query(
            "/admin/newsletter/export.csv",
            &[("status", status_value.clone())]
        )),
        rows = rows,
        pager = render::pager(&pagination, "/admin/newsletter", &[("status", status_value.clone())]),
    );

    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, "Surat berita", &content))
}

/// GET /admin/newsletter/export.csv
pub async fn export_csv(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Query(query): Query<SubscriberQuery>,
) -> PageResult<Response> {
    let subscribers = newsletter::list_subscribers(&state.db, status_filter(&query), None, 0).await?;
    info!(user_id = %user.guid, rows = subscribers.len(), "Exported newsletter subscribers");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"newsletter.csv\""),
        ],
        subscribers_csv(&subscribers),
    )
        .into_response())
}

/// Build newsletter admin routes
pub fn newsletter_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/newsletter", get(subscriber_list))
        .route("/admin/newsletter/export.csv", get(export_csv))
}
