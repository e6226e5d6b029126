//! Category and tag management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use resepi_common::db::Category;
use serde::Deserialize;

use crate::db::taxonomy;
use crate::error::{ApiError, PageResult};
use crate::render::{self, escape};
use crate::routes::page_context;
use crate::session::RequireEditor;
use crate::AppState;

use super::admin_page;

const MAX_NAME_CHARS: usize = 80;
const MAX_DESCRIPTION_CHARS: usize = 1000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryForm {
    pub name: String,
    pub description: String,
    pub sort_order: String,
}

/// Validated (name, description, sort order)
pub fn parse_category_form(form: &CategoryForm) -> Result<(String, String, i64), String> {
    let name = form.name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
        return Err(format!("Name must be 1 to {} characters", MAX_NAME_CHARS));
    }
    let description = form.description.trim();
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(format!("Description must be at most {} characters", MAX_DESCRIPTION_CHARS));
    }
    let sort_order = match form.sort_order.trim() {
        "" => 0,
        value => value.parse::<i64>().map_err(|_| "Sort order must be a whole number".to_string())?,
    };
    Ok((name.to_string(), description.to_string(), sort_order))
}

fn category_form_html(action: &str, form: &CategoryForm, button: &str) -> String {
    format!(
        r#"<form method="post" action="{action}">
    <label for="name">Nama</label>
    <input type="text" id="name" name="name" value="{name}" maxlength="80" required>
    <label for="description">Keterangan</label>
    <textarea id="description" name="description">{description}</textarea>
    <label for="sort_order">Susunan</label>
    <input type="number" id="sort_order" name="sort_order" value="{sort_order}">
    <p><button type="submit">{button}</button></p>
</form>"#,
        action = escape(action),
        name = escape(&form.name),
        description = escape(&form.description),
        sort_order = escape(&form.sort_order),
        button = button,
    )
}

async fn categories_content(state: &AppState, error: Option<&str>, form: &CategoryForm) -> PageResult<String> {
    let categories = taxonomy::list_categories_with_counts(&state.db).await?;
    let rows: String = categories
        .iter()
        .map(|c| {
            format!(
                r#"<tr><td><a href="/admin/categories/{id}/edit">{name}</a></td><td>/{slug}</td><td>{count}</td><td>{order}</td><td><form class="inline" method="post" action="/admin/categories/{id}/delete"><button class="secondary" type="submit">Padam</button></form></td></tr>"#,
                id = escape(&c.guid),
                name = escape(&c.name),
                slug = escape(&c.slug),
                count = c.recipe_count,
                order = c.sort_order,
            )
        })
        .collect();

    Ok(format!(
        r#"<h1>Kategori</h1>
<table><tr><th>Nama</th><th>Slug</th><th>Resepi diterbitkan</th><th>Susunan</th><th></th></tr>{rows}</table>
<h2>Kategori baharu</h2>
{flash}
{form}"#,
        rows = rows,
        flash = render::flash(error, true),
        form = category_form_html("/admin/categories", form, "Tambah"),
    ))
}

/// GET /admin/categories
pub async fn category_list(State(state): State<AppState>, RequireEditor(user): RequireEditor) -> PageResult<Html<String>> {
    let content = categories_content(&state, None, &CategoryForm::default()).await?;
    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, "Kategori", &content))
}

/// Map a duplicate name to the form's 409 status
fn form_failure(err: resepi_common::Error) -> PageResult<(StatusCode, String)> {
    match err {
        resepi_common::Error::Conflict(message) => Ok((StatusCode::CONFLICT, message)),
        e => Err(e.into()),
    }
}

/// POST /admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Form(form): Form<CategoryForm>,
) -> PageResult<Response> {
    let failure = match parse_category_form(&form) {
        Ok((name, description, sort_order)) => {
            match taxonomy::create_category(&state.db, &name, &description, sort_order).await {
                Ok(_) => return Ok(Redirect::to("/admin/categories").into_response()),
                Err(e) => form_failure(e)?,
            }
        }
        Err(message) => (StatusCode::BAD_REQUEST, message),
    };

    let (status, message) = failure;
    let content = categories_content(&state, Some(&message), &form).await?;
    let ctx = page_context(&state, Some(user)).await?;
    Ok((status, admin_page(&ctx, "Kategori", &content)).into_response())
}

async fn load_category(state: &AppState, id: &str) -> PageResult<Category> {
    taxonomy::get_category(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Category {}", id)).into())
}

fn edit_content(category: &Category, form: &CategoryForm, error: Option<&str>) -> String {
    format!(
        "<h1>Sunting kategori: {}</h1>\n{}\n{}",
        escape(&category.name),
        render::flash(error, true),
        category_form_html(&format!("/admin/categories/{}/edit", category.guid), form, "Simpan"),
    )
}

/// GET /admin/categories/:id/edit
pub async fn edit_category_page(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<String>,
) -> PageResult<Html<String>> {
    let category = load_category(&state, &id).await?;
    let form = CategoryForm {
        name: category.name.clone(),
        description: category.description.clone(),
        sort_order: category.sort_order.to_string(),
    };
    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, &category.name, &edit_content(&category, &form, None)))
}

/// POST /admin/categories/:id/edit
pub async fn update_category(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<String>,
    Form(form): Form<CategoryForm>,
) -> PageResult<Response> {
    let category = load_category(&state, &id).await?;

    let failure = match parse_category_form(&form) {
        Ok((name, description, sort_order)) => {
            match taxonomy::update_category(&state.db, &id, &name, &description, sort_order).await {
                Ok(_) => return Ok(Redirect::to("/admin/categories").into_response()),
                Err(e) => form_failure(e)?,
            }
        }
        Err(message) => (StatusCode::BAD_REQUEST, message),
    };

    let (status, message) = failure;
    let ctx = page_context(&state, Some(user)).await?;
    Ok((status, admin_page(&ctx, &category.name, &edit_content(&category, &form, Some(&message)))).into_response())
}

/// POST /admin/categories/:id/delete
pub async fn delete_category(
    State(state): State<AppState>,
    RequireEditor(_user): RequireEditor,
    Path(id): Path<String>,
) -> PageResult<Redirect> {
    taxonomy::delete_category(&state.db, &id).await?;
    Ok(Redirect::to("/admin/categories"))
}

/// GET /admin/tags
///
/// Tags are created from the recipe form; here they can be renamed or
/// removed.
pub async fn tag_list(State(state): State<AppState>, RequireEditor(user): RequireEditor) -> PageResult<Html<String>> {
    let tags = taxonomy::list_tags_with_counts(&state.db).await?;
    let rows: String = tags
        .iter()
        .map(|t| {
            format!(
                r#"<tr><td><form class="inline" method="post" action="/admin/tags/{id}/rename"><input type="text" name="name" value="{name}" maxlength="50"> <button type="submit">Tukar nama</button></form></td><td><a href="/tags/{slug}">/{slug}</a></td><td>{count}</td><td><form class="inline" method="post" action="/admin/tags/{id}/delete"><button class="secondary" type="submit">Padam</button></form></td></tr>"#,
                id = escape(&t.guid),
                name = escape(&t.name),
                slug = escape(&t.slug),
                count = t.recipe_count,
            )
        })
        .collect();

    let content = format!(
        r#"<h1>Tag</h1>
<table><tr><th>Nama</th><th>Slug</th><th>Resepi</th><th></th></tr>{}</table>"#,
        rows
    );
    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, "Tag", &content))
}

#[derive(Debug, Deserialize)]
pub struct RenameForm {
    pub name: String,
}

/// POST /admin/tags/:id/rename
pub async fn rename_tag(
    State(state): State<AppState>,
    RequireEditor(_user): RequireEditor,
    Path(id): Path<String>,
    Form(form): Form<RenameForm>,
) -> PageResult<Redirect> {
    let name = form.name.trim();
    if name.is_empty() || name.chars().count() > 50 {
        return Err(ApiError::BadRequest("Tag name must be 1 to 50 characters".to_string()).into());
    }
    taxonomy::rename_tag(&state.db, &id, name).await?;
    Ok(Redirect::to("/admin/tags"))
}

/// POST /admin/tags/:id/delete
pub async fn delete_tag(
    State(state): State<AppState>,
    RequireEditor(_user): RequireEditor,
    Path(id): Path<String>,
) -> PageResult<Redirect> {
    taxonomy::delete_tag(&state.db, &id).await?;
    Ok(Redirect::to("/admin/tags"))
}

/// Build category and tag admin routes
pub fn taxonomy_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/categories", get(category_list).post(create_category))
        .route("/admin/categories/:id/edit", get(edit_category_page).post(update_category))
        .route("/admin/categories/:id/delete", post(delete_category))
        .route("/admin/tags", get(tag_list))
        .route("/admin/tags/:id/rename", post(rename_tag))
        .route("/admin/tags/:id/delete", post(delete_tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_form_validation() {
        let form = CategoryForm {
            name: " Kuih-muih ".into(),
            description: "Manisan tradisional".into(),
            sort_order: "".into(),
        };
        assert_eq!(
            parse_category_form(&form).unwrap(),
            ("Kuih-muih".to_string(), "Manisan tradisional".to_string(), 0)
        );

        let blank = CategoryForm::default();
        assert!(parse_category_form(&blank).is_err());

        let bad_order = CategoryForm {
            name: "Sup".into(),
            sort_order: "pertama".into(),
            ..Default::default()
        };
        assert!(parse_category_form(&bad_order).is_err());
    }
}
