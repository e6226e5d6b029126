//! Admin recipe table, editor forms and status changes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use resepi_common::db::recipes::{
    get_recipe, insert_recipe, parse_tag_list, set_recipe_status, tags_for_recipe, update_recipe, RecipeInput,
};
use resepi_common::db::settings::SiteSettings;
use resepi_common::db::{non_empty_lines, Category, Difficulty, Recipe, RecipeStatus};
use serde::Deserialize;
use tracing::info;

use crate::db::recipes::{admin_count, admin_list, delete_recipe, AdminRecipeFilter, AdminSort};
use crate::db::{images, taxonomy};
use crate::error::{ApiError, PageResult};
use crate::media;
use crate::pagination::calculate_pagination;
use crate::render::{self, escape, PageContext};
use crate::session::RequireEditor;
use crate::AppState;

use crate::routes::{non_blank, page_context, parse_page};
use super::admin_page;

pub const MIN_TITLE_CHARS: usize = 3;
pub const MAX_TITLE_CHARS: usize = 200;
pub use resepi_common::db::recipes::{MAX_MINUTES, MAX_SERVINGS};

#[derive(Debug, Default, Deserialize)]
pub struct AdminListQuery {
    pub q: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
}

/// Editor form as submitted; every field is text until validated
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecipeForm {
    pub title: String,
    pub summary: String,
    pub ingredients: String,
    pub instructions: String,
    pub prep_minutes: String,
    pub cook_minutes: String,
    pub servings: String,
    pub difficulty: String,
    pub category_id: String,
    pub tags: String,
    /// Only used when creating
    pub status: String,
}

impl RecipeForm {
    fn from_recipe(recipe: &Recipe, tags: &[String]) -> Self {
        let number = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_default();
        Self {
            title: recipe.title.clone(),
            summary: recipe.summary.clone(),
            ingredients: recipe.ingredients.clone(),
            instructions: recipe.instructions.clone(),
            prep_minutes: number(recipe.prep_minutes),
            cook_minutes: number(recipe.cook_minutes),
            servings: number(recipe.servings),
            difficulty: recipe.difficulty.map(|d| d.as_str().to_string()).unwrap_or_default(),
            category_id: recipe.category_id.clone().unwrap_or_default(),
            tags: tags.join(", "),
            status: recipe.status.as_str().to_string(),
        }
    }
}

fn optional_number(value: &str, label: &str, min: i64, max: i64, errors: &mut Vec<String>) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<i64>() {
        Ok(n) if (min..=max).contains(&n) => Some(n),
        _ => {
            errors.push(format!("{} must be a whole number from {} to {}", label, min, max));
            None
        }
    }
}

/// Validate the form fields that need no database lookup
///
/// Category existence is checked separately by the handler.
pub fn parse_recipe_form(form: &RecipeForm) -> Result<RecipeInput, Vec<String>> {
    let mut errors = Vec::new();

    let title = form.title.trim();
    let title_len = title.chars().count();
    if !(MIN_TITLE_CHARS..=MAX_TITLE_CHARS).contains(&title_len) {
        errors.push(format!(
            "Title must be {} to {} characters",
            MIN_TITLE_CHARS, MAX_TITLE_CHARS
        ));
    }

    let ingredients: Vec<String> = non_empty_lines(&form.ingredients).into_iter().map(str::to_string).collect();
    if ingredients.is_empty() {
        errors.push("At least one ingredient is required".to_string());
    }
    let instructions: Vec<String> = non_empty_lines(&form.instructions).into_iter().map(str::to_string).collect();
    if instructions.is_empty() {
        errors.push("At least one instruction step is required".to_string());
    }

    let prep_minutes = optional_number(&form.prep_minutes, "Prep minutes", 0, MAX_MINUTES, &mut errors);
    let cook_minutes = optional_number(&form.cook_minutes, "Cook minutes", 0, MAX_MINUTES, &mut errors);
    let servings = optional_number(&form.servings, "Servings", 1, MAX_SERVINGS, &mut errors);

    let difficulty = match form.difficulty.trim() {
        "" => None,
        value => match value.parse::<Difficulty>() {
            Ok(d) => Some(d),
            Err(_) => {
                errors.push("Difficulty must be easy, medium or hard".to_string());
                None
            }
        },
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(RecipeInput {
        title: title.to_string(),
        summary: form.summary.trim().to_string(),
        ingredients,
        instructions,
        prep_minutes,
        cook_minutes,
        servings,
        difficulty,
        category_id: Some(form.category_id.trim().to_string()).filter(|c| !c.is_empty()),
        tags: parse_tag_list(&form.tags),
    })
}

/// Full validation including the category lookup
async fn validate(state: &AppState, form: &RecipeForm) -> PageResult<Result<RecipeInput, Vec<String>>> {
    let mut result = parse_recipe_form(form);
    let category_id = form.category_id.trim();
    if !category_id.is_empty() && taxonomy::get_category(&state.db, category_id).await?.is_none() {
        let message = "Selected category does not exist".to_string();
        match &mut result {
            Ok(_) => result = Err(vec![message]),
            Err(errors) => errors.push(message),
        }
    }
    Ok(result)
}

fn status_options(selected: &str) -> String {
    let choices: Vec<(String, String)> = RecipeStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), s.as_str().to_string()))
        .collect();
    render::options(&choices, selected)
}

fn recipe_form_html(action: &str, form: &RecipeForm, categories: &[Category], errors: &[String], creating: bool) -> String {
    let error_box = if errors.is_empty() {
        String::new()
    } else {
        let items: String = errors.iter().map(|e| format!("<li>{}</li>", escape(e))).collect();
        format!(r#"<div class="flash error"><ul>{}</ul></div>"#, items)
    };

    let mut category_choices = vec![(String::new(), "(tiada kategori)".to_string())];
    category_choices.extend(categories.iter().map(|c| (c.guid.clone(), c.name.clone())));
    let mut difficulty_choices = vec![(String::new(), "(tidak dinyatakan)".to_string())];
    difficulty_choices.extend(Difficulty::ALL.iter().map(|d| (d.as_str().to_string(), d.label().to_string())));

    let status_field = if creating {
        let selected = if form.status.is_empty() { "draft" } else { form.status.as_str() };
        format!(
            r#"<label for="status">Status</label><select id="status" name="status">{}</select>"#,
            status_options(selected)
        )
    } else {
        String::new()
    };

    format!(
        r#"{error_box}
<form method="post" action="{action}">
    <label for="title">Tajuk</label>
    <input type="text" id="title" name="title" value="{title}" required maxlength="200">
    <label for="summary">Ringkasan</label>
    <textarea id="summary" name="summary">{summary}</textarea>
    <label for="ingredients">Bahan-bahan (satu setiap baris)</label>
    <textarea id="ingredients" name="ingredients">{ingredients}</textarea>
    <label for="instructions">Langkah (satu setiap baris)</label>
    <textarea id="instructions" name="instructions">{instructions}</textarea>
    <label for="prep_minutes">Masa penyediaan (minit)</label>
    <input type="number" id="prep_minutes" name="prep_minutes" min="0" max="10000" value="{prep}">
    <label for="cook_minutes">Masa memasak (minit)</label>
    <input type="number" id="cook_minutes" name="cook_minutes" min="0" max="10000" value="{cook}">
    <label for="servings">Hidangan</label>
    <input type="number" id="servings" name="servings" min="1" max="100" value="{servings}">
    <label for="difficulty">Tahap</label>
    <select id="difficulty" name="difficulty">{difficulties}</select>
    <label for="category_id">Kategori</label>
    <select id="category_id" name="category_id">{categories}</select>
    <label for="tags">Tag (dipisahkan koma)</label>
    <input type="text" id="tags" name="tags" value="{tags}">
    {status_field}
    <p><button type="submit">Simpan</button></p>
</form>"#,
        error_box = error_box,
        action = escape(action),
        title = escape(&form.title),
        summary = escape(&form.summary),
        ingredients = escape(&form.ingredients),
        instructions = escape(&form.instructions),
        prep = escape(&form.prep_minutes),
        cook = escape(&form.cook_minutes),
        servings = escape(&form.servings),
        difficulties = render::options(&difficulty_choices, form.difficulty.trim()),
        categories = render::options(&category_choices, form.category_id.trim()),
        tags = escape(&form.tags),
        status_field = status_field,
    )
}

/// GET /admin/recipes
pub async fn recipe_table(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Query(query): Query<AdminListQuery>,
) -> PageResult<Html<String>> {
    let settings = SiteSettings::load(&state.db).await?;
    let sort = AdminSort::parse(query.sort.as_deref());
    let descending = match non_blank(&query.order) {
        Some("asc") => false,
        Some("desc") => true,
        _ => sort != AdminSort::Title,
    };
    let filter = AdminRecipeFilter {
        text: non_blank(&query.q).map(str::to_string),
        status: non_blank(&query.status).and_then(|s| s.parse().ok()),
        category_id: non_blank(&query.category).map(str::to_string),
        sort,
        descending,
    };

    let total = admin_count(&state.db, &filter).await?;
    let pagination = calculate_pagination(total, parse_page(&query.page), settings.admin_page_size);
    let rows = admin_list(&state.db, &filter, pagination.page_size, pagination.offset).await?;
    let categories = taxonomy::list_categories(&state.db).await?;

    let params: Vec<(&str, String)> = vec![
        ("q", filter.text.clone().unwrap_or_default()),
        ("status", filter.status.map(|s| s.as_str().to_string()).unwrap_or_default()),
        ("category", filter.category_id.clone().unwrap_or_default()),
        ("sort", sort.as_str().to_string()),
        ("order", if descending { "desc" } else { "asc" }.to_string()),
    ];

    // Clicking the active column flips the order
    let header = |column: AdminSort, label: &str| {
        let order = if column == sort && !descending { "desc" } else { "asc" };
        let mut link_params: Vec<(&str, String)> = params[..3].to_vec();
        link_params.push(("sort", column.as_str().to_string()));
        link_params.push(("order", order.to_string()));
        let marker = match (column == sort, descending) {
            (true, true) => " ▼",
            (true, false) => " ▲",
            _ => "",
        };
        format!(
            r#"<a href="{}">{}{}</a>"#,
            escape(&render::url_with_query("/admin/recipes", &link_params)),
            label,
            marker
        )
    };

    let body_rows: String = rows
        .iter()
        .map(|row| {
            format!(
                r#"<tr><td><a href="/admin/recipes/{id}/edit">{title}</a><br><span class="meta">/{slug}</span></td><td>{status}</td><td>{category}</td><td>{views}</td><td>{updated}</td></tr>"#,
                id = escape(&row.guid),
                title = escape(&row.title),
                slug = escape(&row.slug),
                status = row.status,
                category = escape(row.category_name.as_deref().unwrap_or("-")),
                views = row.view_count,
                updated = row.updated_at.format("%Y-%m-%d %H:%M"),
            )
        })
        .collect();

    let mut status_choices = vec![(String::new(), "Semua status".to_string())];
    status_choices.extend(RecipeStatus::ALL.iter().map(|s| (s.as_str().to_string(), s.as_str().to_string())));
    let mut category_choices = vec![(String::new(), "Semua kategori".to_string())];
    category_choices.extend(categories.iter().map(|c| (c.guid.clone(), c.name.clone())));

    let content = format!(
        r#"<h1>Resepi</h1>
<p><a href="/admin/recipes/new">+ Resepi baharu</a></p>
<form method="get" action="/admin/recipes">
    <input type="text" name="q" value="{q}" placeholder="Cari tajuk atau slug">
    <select name="status">{statuses}</select>
    <select name="category">{categories}</select>
    <input type="hidden" name="sort" value="{sort}">
    <button type="submit">Tapis</button>
</form>
<p class="meta">{total} resepi</p>
<table>
    <tr><th>{title_header}</th><th>Status</th><th>Kategori</th><th>{views_header}</th><th>{updated_header}</th></tr>
    {rows}
</table>
{pager}"#,
        q = escape(filter.text.as_deref().unwrap_or_default()),
        statuses = render::options(&status_choices, filter.status.map(|s| s.as_str()).unwrap_or_default()),
        categories = render::options(&category_choices, filter.category_id.as_deref().unwrap_or_default()),
        sort = sort.as_str(),
        total = pagination.total,
        title_header = header(AdminSort::Title, "Tajuk"),
        views_header = header(AdminSort::Views, "Tontonan"),
        updated_header = header(AdminSort::Updated, "Dikemas kini"),
        rows = body_rows,
        pager = render::pager(&pagination, "/admin/recipes", &params),
    );

    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, "Resepi", &content))
}

/// GET /admin/recipes/new
pub async fn new_recipe_page(State(state): State<AppState>, RequireEditor(user): RequireEditor) -> PageResult<Html<String>> {
    let categories = taxonomy::list_categories(&state.db).await?;
    let content = format!(
        "<h1>Resepi baharu</h1>\n{}",
        recipe_form_html("/admin/recipes/new", &RecipeForm::default(), &categories, &[], true)
    );
    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, "Resepi baharu", &content))
}

fn invalid_form(ctx: &PageContext, title: &str, content: &str) -> Response {
    (StatusCode::BAD_REQUEST, admin_page(ctx, title, content)).into_response()
}

/// POST /admin/recipes/new
pub async fn create_recipe(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Form(form): Form<RecipeForm>,
) -> PageResult<Response> {
    let status = match form.status.trim() {
        "" => RecipeStatus::Draft,
        value => value.parse::<RecipeStatus>()?,
    };

    let input = match validate(&state, &form).await? {
        Ok(input) => input,
        Err(errors) => {
            let categories = taxonomy::list_categories(&state.db).await?;
            let content = format!(
                "<h1>Resepi baharu</h1>\n{}",
                recipe_form_html("/admin/recipes/new", &form, &categories, &errors, true)
            );
            let ctx = page_context(&state, Some(user)).await?;
            return Ok(invalid_form(&ctx, "Resepi baharu", &content));
        }
    };

    let recipe = insert_recipe(&state.db, &input, status, Some(user.guid.as_str())).await?;
    info!(recipe_id = %recipe.guid, user_id = %user.guid, "Recipe created");
    Ok(Redirect::to(&format!("/admin/recipes/{}/edit?saved=1", recipe.guid)).into_response())
}

async fn load_recipe(state: &AppState, id: &str) -> PageResult<Recipe> {
    get_recipe(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {}", id)).into())
}

/// Status, images and danger-zone sections under the edit form
async fn edit_extras(state: &AppState, recipe: &Recipe) -> PageResult<String> {
    let recipe_images = images::images_for_recipe(&state.db, &recipe.guid).await?;
    let id = escape(&recipe.guid);

    let image_rows: String = recipe_images
        .iter()
        .map(|image| {
            let primary = if image.is_primary {
                "<strong>Utama</strong>".to_string()
            } else {
                format!(
                    r#"<form class="inline" method="post" action="/admin/images/{}/primary"><button type="submit">Jadikan utama</button></form>"#,
                    escape(&image.guid)
                )
            };
            format!(
                r#"<tr><td><img src="/media/{thumb}" alt="{alt}" style="height:60px"></td><td>{alt}<br><span class="meta">{w}×{h}</span></td><td>{primary}</td><td><form class="inline" method="post" action="/admin/images/{guid}/delete"><button class="secondary" type="submit">Padam</button></form></td></tr>"#,
                thumb = escape(&image.thumbnail_path),
                alt = escape(&image.alt_text),
                w = image.width,
                h = image.height,
                primary = primary,
                guid = escape(&image.guid),
            )
        })
        .collect();

    Ok(format!(
        r#"<h2>Status</h2>
<form method="post" action="/admin/recipes/{id}/status">
    <select name="status">{statuses}</select>
    <button type="submit">Tukar status</button>
</form>
<h2>Gambar</h2>
<table>{images}</table>
<form method="post" action="/admin/recipes/{id}/images" enctype="multipart/form-data">
    <label for="file">Fail gambar (JPEG, PNG, WebP, GIF)</label>
    <input type="file" id="file" name="file" accept="image/jpeg,image/png,image/webp,image/gif" required>
    <label for="alt_text">Teks alternatif</label>
    <input type="text" id="alt_text" name="alt_text">
    <label><input type="checkbox" name="primary" value="true"> Jadikan gambar utama</label>
    <p><button type="submit">Muat naik</button></p>
</form>
<h2>Padam resepi</h2>
<form method="post" action="/admin/recipes/{id}/delete">
    <button class="secondary" type="submit">Padam resepi ini</button>
</form>"#,
        id = id,
        statuses = status_options(recipe.status.as_str()),
        images = image_rows,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct EditQuery {
    pub saved: Option<String>,
}

/// GET /admin/recipes/:id/edit
pub async fn edit_recipe_page(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<String>,
    Query(query): Query<EditQuery>,
) -> PageResult<Html<String>> {
    let recipe = load_recipe(&state, &id).await?;
    let tags: Vec<String> = tags_for_recipe(&state.db, &recipe.guid)
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();
    let categories = taxonomy::list_categories(&state.db).await?;

    let extras = edit_extras(&state, &recipe).await?;
    let saved = if query.saved.is_some() {
        render::flash(Some("Resepi disimpan."), false)
    } else {
        String::new()
    };
    let content = format!(
        r#"<h1>Sunting: {title}</h1>
{saved}
<p class="meta">Status: {status} · <a href="/recipes/{slug}">Lihat</a></p>
{form}
{extras}"#,
        title = escape(&recipe.title),
        saved = saved,
        status = recipe.status,
        slug = escape(&recipe.slug),
        form = recipe_form_html(
            &format!("/admin/recipes/{}/edit", recipe.guid),
            &RecipeForm::from_recipe(&recipe, &tags),
            &categories,
            &[],
            false,
        ),
        extras = extras,
    );

    let ctx = page_context(&state, Some(user)).await?;
    Ok(admin_page(&ctx, &recipe.title, &content))
}

/// POST /admin/recipes/:id/edit
pub async fn update_recipe_handler(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<String>,
    Form(form): Form<RecipeForm>,
) -> PageResult<Response> {
    let recipe = load_recipe(&state, &id).await?;

    let input = match validate(&state, &form).await? {
        Ok(input) => input,
        Err(errors) => {
            let categories = taxonomy::list_categories(&state.db).await?;
            let extras = edit_extras(&state, &recipe).await?;
            let content = format!(
                "<h1>Sunting: {}</h1>\n{}\n{}",
                escape(&recipe.title),
                recipe_form_html(&format!("/admin/recipes/{}/edit", recipe.guid), &form, &categories, &errors, false),
                extras,
            );
            let ctx = page_context(&state, Some(user)).await?;
            return Ok(invalid_form(&ctx, &recipe.title, &content));
        }
    };

    update_recipe(&state.db, &recipe.guid, &input).await?;
    info!(recipe_id = %recipe.guid, user_id = %user.guid, "Recipe updated");
    Ok(Redirect::to(&format!("/admin/recipes/{}/edit?saved=1", recipe.guid)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// POST /admin/recipes/:id/status
pub async fn change_status(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> PageResult<Redirect> {
    let status: RecipeStatus = form.status.parse()?;
    set_recipe_status(&state.db, &id, status).await?;
    info!(recipe_id = %id, status = %status, user_id = %user.guid, "Recipe status changed");
    Ok(Redirect::to(&format!("/admin/recipes/{}/edit?saved=1", id)))
}

/// POST /admin/recipes/:id/delete
///
/// Rows go first; the image directory is then removed best-effort.
pub async fn delete_recipe_handler(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<String>,
) -> PageResult<Redirect> {
    delete_recipe(&state.db, &id).await?;
    media::remove_recipe_dir(&state.media_dir, &id).await;
    info!(recipe_id = %id, user_id = %user.guid, "Recipe deleted");
    Ok(Redirect::to("/admin/recipes"))
}

/// Build admin recipe routes
pub fn recipe_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/recipes", get(recipe_table))
        .route("/admin/recipes/new", get(new_recipe_page).post(create_recipe))
        .route("/admin/recipes/:id/edit", get(edit_recipe_page).post(update_recipe_handler))
        .route("/admin/recipes/:id/status", post(change_status))
        .route("/admin/recipes/:id/delete", post(delete_recipe_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RecipeForm {
        RecipeForm {
            title: "Nasi Lemak".into(),
            ingredients: "2 cawan beras\n\n1 cawan santan".into(),
            instructions: "Masak nasi".into(),
            prep_minutes: "15".into(),
            cook_minutes: "".into(),
            servings: "4".into(),
            difficulty: "easy".into(),
            tags: "Sarapan, sarapan, pedas".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_form_parses() {
        let input = parse_recipe_form(&valid_form()).unwrap();
        assert_eq!(input.ingredients, vec!["2 cawan beras", "1 cawan santan"]);
        assert_eq!(input.prep_minutes, Some(15));
        assert_eq!(input.cook_minutes, None);
        assert_eq!(input.servings, Some(4));
        assert_eq!(input.difficulty, Some(Difficulty::Easy));
        assert_eq!(input.category_id, None);
        assert_eq!(input.tags, vec!["Sarapan", "pedas"]);
    }

    #[test]
    fn test_invalid_form_collects_every_error() {
        let form = RecipeForm {
            title: "ab".into(),
            ingredients: "  \n ".into(),
            instructions: "".into(),
            prep_minutes: "-1".into(),
            cook_minutes: "10001".into(),
            servings: "0".into(),
            difficulty: "extreme".into(),
            ..Default::default()
        };
        let errors = parse_recipe_form(&form).unwrap_err();
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn test_minutes_accept_bounds() {
        let form = RecipeForm {
            prep_minutes: "0".into(),
            cook_minutes: "10000".into(),
            servings: "100".into(),
            ..valid_form()
        };
        assert!(parse_recipe_form(&form).is_ok());
    }
}
