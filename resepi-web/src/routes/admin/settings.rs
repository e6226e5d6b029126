//! Runtime settings page
//!
//! Values live in the `settings` table and take effect on the next
//! request that reads them. The LLM rate limit is read at startup.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use resepi_common::db::settings::{self, get_llm_api_key, get_setting, EDITABLE_SETTINGS};
use serde::Deserialize;
use tracing::info;

use crate::error::PageResult;
use crate::render::{self, escape};
use crate::routes::page_context;
use crate::session::RequireAdmin;
use crate::AppState;

use super::admin_page;

/// Render an API key with all but the last four characters hidden
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "••••".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("••••{}", tail)
}

fn label(key: &str) -> &'static str {
    match key {
        settings::SITE_NAME => "Nama laman",
        settings::PAGE_SIZE => "Resepi setiap halaman",
        settings::ADMIN_PAGE_SIZE => "Baris setiap halaman (admin)",
        settings::COMMENTS_REQUIRE_APPROVAL => "Komen perlu kelulusan",
        settings::SESSION_TTL_HOURS => "Tempoh sesi (jam)",
        settings::IMAGE_MAX_UPLOAD_BYTES => "Saiz muat naik maksimum (bait)",
        settings::IMAGE_THUMBNAIL_WIDTH => "Lebar lakaran kecil (px)",
        settings::IMAGE_MEDIUM_WIDTH => "Lebar imej sederhana (px)",
        settings::LLM_MODEL => "Model LLM",
        settings::LLM_RATE_LIMIT_MS => "Selang permintaan LLM (ms)",
        _ => "",
    }
}

fn parse_int(key: &str, raw: &str, min: i64, max: i64) -> Result<String, String> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{} must be a whole number", key))?;
    if value < min || value > max {
        return Err(format!("{} must be between {} and {}", key, min, max));
    }
    Ok(value.to_string())
}

/// Normalize one submitted value, or explain why it is rejected
pub fn validate_setting(key: &str, raw: Option<&str>) -> Result<String, String> {
    let value = raw.unwrap_or_default();
    match key {
        settings::COMMENTS_REQUIRE_APPROVAL => {
            let on = matches!(value.trim(), "on" | "true" | "1" | "yes");
            Ok(on.to_string())
        }
        settings::PAGE_SIZE => parse_int(key, value, 1, 100),
        settings::ADMIN_PAGE_SIZE => parse_int(key, value, 1, 500),
        settings::SESSION_TTL_HOURS => parse_int(key, value, 1, 24 * 365),
        settings::IMAGE_MAX_UPLOAD_BYTES => parse_int(key, value, 1, i64::MAX),
        settings::IMAGE_THUMBNAIL_WIDTH | settings::IMAGE_MEDIUM_WIDTH => parse_int(key, value, 1, 10_000),
        settings::LLM_RATE_LIMIT_MS => parse_int(key, value, 0, 3_600_000),
        settings::SITE_NAME | settings::LLM_MODEL => {
            let trimmed = value.trim();
            if trimmed.is_empty() || trimmed.chars().count() > 200 {
                Err(format!("{} must be 1 to 200 characters", key))
            } else {
                Ok(trimmed.to_string())
            }
        }
        _ => Err(format!("Unknown setting {}", key)),
    }
}

fn field_html(key: &str, value: &str) -> String {
    if key == settings::COMMENTS_REQUIRE_APPROVAL {
        let checked = if value == "true" { " checked" } else { "" };
        return format!(
            r#"<label><input type="checkbox" name="{key}" value="true"{checked}> {label}</label>"#,
            key = key,
            checked = checked,
            label = label(key),
        );
    }
    let kind = match key {
        settings::SITE_NAME | settings::LLM_MODEL => "text",
        _ => "number",
    };
    format!(
        r#"<label for="{key}">{label}</label>
    <input type="{kind}" id="{key}" name="{key}" value="{value}">"#,
        key = key,
        label = label(key),
        kind = kind,
        value = escape(value),
    )
}

async fn settings_content(
    state: &AppState,
    values: &HashMap<String, String>,
    error: Option<&str>,
    saved: bool,
) -> PageResult<String> {
    let fields: Vec<String> = EDITABLE_SETTINGS
        .iter()
        .map(|key| field_html(key, values.get(*key).map(String::as_str).unwrap_or_default()))
        .collect();

    let key_state = match get_llm_api_key(&state.db).await? {
        Some(key) if !key.is_empty() => format!("Kunci semasa: <code>{}</code>", escape(&mask_secret(&key))),
        _ => "Tiada kunci disimpan; pemboleh ubah persekitaran atau fail konfigurasi digunakan.".to_string(),
    };

    let flash = match (error, saved) {
        (Some(message), _) => render::flash(Some(message), true),
        (None, true) => render::flash(Some("Tetapan disimpan."), false),
        _ => String::new(),
    };

    Ok(format!(
        r#"<h1>Tetapan</h1>
{flash}
<form method="post" action="/admin/settings">
    {fields}
    <h2>Kunci API LLM</h2>
    <p class="meta">{key_state}</p>
    <label for="llm_api_key">Kunci baharu (biarkan kosong untuk kekal)</label>
    <input type="password" id="llm_api_key" name="llm_api_key" autocomplete="off">
    <label><input type="checkbox" name="clear_llm_api_key" value="true"> Padam kunci tersimpan</label>
    <p><button type="submit">Simpan</button></p>
</form>"#,
        flash = flash,
        fields = fields.join("\n    "),
        key_state = key_state,
    ))
}

async fn current_values(state: &AppState) -> PageResult<HashMap<String, String>> {
    let mut values = HashMap::new();
    for key in EDITABLE_SETTINGS {
        if let Some(value) = get_setting::<String>(&state.db, key).await? {
            values.insert(key.to_string(), value);
        }
    }
    Ok(values)
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsQuery {
    pub saved: Option<String>,
}

/// GET /admin/settings
pub async fn settings_page(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Query(query): Query<SettingsQuery>,
) -> PageResult<Html<String>> {
    let values = current_values(&state).await?;
    let content = settings_content(&state, &values, None, query.saved.is_some()).await?;
    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, "Tetapan", &content))
}

/// POST /admin/settings
///
/// Every value is validated before any is written.
pub async fn save_settings(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Form(form): Form<HashMap<String, String>>,
) -> PageResult<Response> {
    let mut validated = Vec::with_capacity(EDITABLE_SETTINGS.len());
    let mut errors = Vec::new();
    for key in EDITABLE_SETTINGS {
        match validate_setting(key, form.get(*key).map(String::as_str)) {
            Ok(value) => validated.push((*key, value)),
            Err(message) => errors.push(message),
        }
    }

    if !errors.is_empty() {
        let message = errors.join("; ");
        let content = settings_content(&state, &form, Some(&message), false).await?;
        let ctx = page_context(&state, Some(user)).await?;
        return Ok((StatusCode::BAD_REQUEST, admin_page(&ctx, "Tetapan", &content)).into_response());
    }

    for (key, value) in &validated {
        settings::set_setting(&state.db, key, value).await?;
    }

    let new_key = form.get(settings::LLM_API_KEY).map(|k| k.trim()).unwrap_or_default();
    let clear_key = form
        .get("clear_llm_api_key")
        .is_some_and(|v| matches!(v.trim(), "on" | "true" | "1" | "yes"));
    if clear_key {
        settings::delete_setting(&state.db, settings::LLM_API_KEY).await?;
        info!(user_id = %user.guid, "Cleared stored LLM API key");
    } else if !new_key.is_empty() {
        settings::set_llm_api_key(&state.db, new_key).await?;
        info!(user_id = %user.guid, "Stored new LLM API key");
    }

    info!(user_id = %user.guid, "Settings saved");
    Ok(Redirect::to("/admin/settings?saved=1").into_response())
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/admin/settings", get(settings_page).post(save_settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret_keeps_last_four() {
        assert_eq!(mask_secret("sk-abcdef123456"), "••••3456");
        assert_eq!(mask_secret("abc"), "••••");
    }

    #[test]
    fn test_validate_setting_ranges() {
        assert_eq!(validate_setting(settings::PAGE_SIZE, Some(" 24 ")).unwrap(), "24");
        assert!(validate_setting(settings::PAGE_SIZE, Some("0")).is_err());
        assert!(validate_setting(settings::PAGE_SIZE, Some("101")).is_err());
        assert!(validate_setting(settings::ADMIN_PAGE_SIZE, Some("500")).is_ok());
        assert!(validate_setting(settings::SESSION_TTL_HOURS, Some("lama")).is_err());
        assert_eq!(validate_setting(settings::LLM_RATE_LIMIT_MS, Some("0")).unwrap(), "0");
        assert!(validate_setting(settings::SITE_NAME, Some("   ")).is_err());
    }

    #[test]
    fn test_unchecked_checkbox_is_false() {
        assert_eq!(validate_setting(settings::COMMENTS_REQUIRE_APPROVAL, None).unwrap(), "false");
        assert_eq!(validate_setting(settings::COMMENTS_REQUIRE_APPROVAL, Some("true")).unwrap(), "true");
    }
}
