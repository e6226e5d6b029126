//! Public site pages

use axum::{
    extract::{Path, Query, State},
    response::Html,
    routing::get,
    Router,
};
use resepi_common::db::recipes::tags_for_recipe;
use resepi_common::db::settings::SiteSettings;
use resepi_common::db::{Difficulty, Recipe};
use resepi_common::duration::format_minutes;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::recipes::{count_published, get_recipe_by_slug, increment_view_count, list_published, RecipeFilter, RecipeSort};
use crate::db::{comments, guides, images, saved, taxonomy};
use crate::error::{ApiError, PageResult};
use crate::pagination::{calculate_pagination, Pagination};
use crate::render::{self, escape, PageContext};
use crate::session::MaybeUser;
use crate::AppState;

use super::{html_page, non_blank, parse_page};

/// `?page=&sort=` for listings
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub sort: Option<String>,
}

/// Search form fields; all optional, blank values ignored
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    /// Category slug
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub max_minutes: Option<String>,
    pub page: Option<String>,
    pub sort: Option<String>,
}

impl SearchQuery {
    /// Query parameters to carry over into pager links
    fn params(&self) -> Vec<(&'static str, String)> {
        let value = |v: &Option<String>| non_blank(v).unwrap_or_default().to_string();
        vec![
            ("q", value(&self.q)),
            ("category", value(&self.category)),
            ("difficulty", value(&self.difficulty)),
            ("max_minutes", value(&self.max_minutes)),
            ("sort", value(&self.sort)),
        ]
    }
}

/// Turn search fields into a filter; `None` when nothing was asked
///
/// Unknown category slugs, difficulties and non-positive minute limits
/// are ignored rather than rejected.
pub(crate) async fn search_filter(pool: &SqlitePool, query: &SearchQuery) -> PageResult<Option<RecipeFilter>> {
    let mut filter = RecipeFilter {
        text: non_blank(&query.q).map(str::to_string),
        ..Default::default()
    };

    if let Some(slug) = non_blank(&query.category) {
        filter.category_id = taxonomy::get_category_by_slug(pool, slug).await?.map(|c| c.guid);
    }
    filter.difficulty = non_blank(&query.difficulty).and_then(|d| d.parse::<Difficulty>().ok());
    filter.max_minutes = non_blank(&query.max_minutes)
        .and_then(|m| m.parse::<i64>().ok())
        .filter(|m| *m > 0);

    let asked = filter.text.is_some()
        || filter.category_id.is_some()
        || filter.difficulty.is_some()
        || filter.max_minutes.is_some();
    Ok(asked.then_some(filter))
}

/// One page of published cards matching a filter
pub(crate) async fn filtered_page(
    pool: &SqlitePool,
    filter: &RecipeFilter,
    sort: RecipeSort,
    page: i64,
    page_size: i64,
) -> PageResult<(Vec<crate::db::recipes::RecipeCard>, Pagination)> {
    let total = count_published(pool, filter).await?;
    let pagination = calculate_pagination(total, page, page_size);
    let cards = list_published(pool, filter, sort, pagination.page_size, pagination.offset).await?;
    Ok((cards, pagination))
}

fn context(settings: &SiteSettings, user: Option<resepi_common::db::User>) -> PageContext {
    PageContext {
        site_name: settings.site_name.clone(),
        user,
    }
}

fn sort_links(path: &str, current: RecipeSort) -> String {
    let choices = [
        (RecipeSort::Newest, "Terbaru"),
        (RecipeSort::Oldest, "Terlama"),
        (RecipeSort::Popular, "Popular"),
        (RecipeSort::Title, "Tajuk"),
    ];
    let links: Vec<String> = choices
        .iter()
        .map(|(sort, label)| {
            if *sort == current {
                format!("<strong>{}</strong>", label)
            } else {
                format!(
                    r#"<a href="{}">{}</a>"#,
                    escape(&render::url_with_query(path, &[("sort", sort.as_str().to_string())])),
                    label
                )
            }
        })
        .collect();
    format!(r#"<p class="meta">Susun: {}</p>"#, links.join(" · "))
}

/// Text blocks separated by blank lines become paragraphs
fn paragraphs(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", escape(p).replace('\n', "<br>")))
        .collect()
}

/// GET /
pub async fn home(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> PageResult<Html<String>> {
    let settings = SiteSettings::load(&state.db).await?;
    let cards = list_published(&state.db, &RecipeFilter::default(), RecipeSort::Newest, settings.page_size, 0).await?;
    let categories = taxonomy::list_categories_with_counts(&state.db).await?;

    let category_links: String = categories
        .iter()
        .map(|c| {
            format!(
                r#"<li><a href="/categories/{}">{}</a> <span class="meta">({})</span></li>"#,
                escape(&c.slug),
                escape(&c.name),
                c.recipe_count
            )
        })
        .collect();

    let content = format!(
        r#"<h1>Resepi terkini</h1>
{cards}
<p><a href="/recipes">Semua resepi &raquo;</a></p>
<h2>Kategori</h2>
<ul>{categories}</ul>
<h2>Langgan surat berita</h2>
<form method="post" action="/newsletter/subscribe">
    <label for="email">E-mel</label>
    <input type="email" id="email" name="email" required>
    <label for="name">Nama (pilihan)</label>
    <input type="text" id="name" name="name">
    <p><button type="submit">Langgan</button></p>
</form>"#,
        cards = render::recipe_cards(&cards),
        categories = category_links,
    );

    Ok(html_page(&context(&settings, user), &settings.site_name, &content))
}

/// GET /recipes
pub async fn recipe_list(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<ListQuery>,
) -> PageResult<Html<String>> {
    let settings = SiteSettings::load(&state.db).await?;
    let sort = RecipeSort::parse(query.sort.as_deref());
    let (cards, pagination) = filtered_page(
        &state.db,
        &RecipeFilter::default(),
        sort,
        parse_page(&query.page),
        settings.page_size,
    )
    .await?;

    let content = format!(
        r#"<h1>Semua resepi</h1>
{sort}
{cards}
{pager}"#,
        sort = sort_links("/recipes", sort),
        cards = render::recipe_cards(&cards),
        pager = render::pager(&pagination, "/recipes", &[("sort", sort.as_str().to_string())]),
    );

    Ok(html_page(&context(&settings, user), "Resepi", &content))
}

/// `?comment=` flash after posting a comment
#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    pub comment: Option<String>,
}

/// Fetch a recipe by slug, hiding unpublished ones from non-editors
pub(crate) async fn visible_recipe(
    pool: &SqlitePool,
    slug: &str,
    user: Option<&resepi_common::db::User>,
) -> PageResult<Recipe> {
    let recipe = get_recipe_by_slug(pool, slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {}", slug)))?;

    let is_editor = user.map(|u| u.role.can_edit()).unwrap_or(false);
    if !recipe.is_published() && !is_editor {
        return Err(ApiError::NotFound(format!("Recipe {}", slug)).into());
    }
    Ok(recipe)
}

fn list_items(lines: &[&str], ordered: bool) -> String {
    let items: String = lines.iter().map(|line| format!("<li>{}</li>", escape(line))).collect();
    if ordered {
        format!("<ol>{}</ol>", items)
    } else {
        format!("<ul>{}</ul>", items)
    }
}

/// GET /recipes/:slug
pub async fn recipe_detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(slug): Path<String>,
    Query(query): Query<DetailQuery>,
) -> PageResult<Html<String>> {
    let settings = SiteSettings::load(&state.db).await?;
    let mut recipe = visible_recipe(&state.db, &slug, user.as_ref()).await?;

    if recipe.is_published() {
        increment_view_count(&state.db, &recipe.guid).await?;
        recipe.view_count += 1;
    }

    let images = images::images_for_recipe(&state.db, &recipe.guid).await?;
    let tags = tags_for_recipe(&state.db, &recipe.guid).await?;
    let category = match &recipe.category_id {
        Some(id) => taxonomy::get_category(&state.db, id).await?,
        None => None,
    };
    let approved = comments::approved_for_recipe(&state.db, &recipe.guid).await?;
    let is_saved = match &user {
        Some(u) => saved::is_saved(&state.db, &u.guid, &recipe.guid).await?,
        None => false,
    };

    let hero = images
        .iter()
        .find(|i| i.is_primary)
        .map(|i| {
            format!(
                r#"<img src="/media/{}" alt="{}" style="max-width:100%;border-radius:8px">"#,
                escape(&i.medium_path),
                escape(if i.alt_text.is_empty() { &recipe.title } else { &i.alt_text })
            )
        })
        .unwrap_or_default();
    let gallery: String = images
        .iter()
        .filter(|i| !i.is_primary)
        .map(|i| {
            format!(
                r#"<a href="/media/{}"><img src="/media/{}" alt="{}"></a>"#,
                escape(&i.medium_path),
                escape(&i.thumbnail_path),
                escape(&i.alt_text)
            )
        })
        .collect();

    let status_note = if recipe.is_published() {
        String::new()
    } else {
        render::flash(Some(&format!("Resepi ini berstatus {}.", recipe.status)), true)
    };

    let category_link = category
        .map(|c| format!(r#"<a href="/categories/{}">{}</a>"#, escape(&c.slug), escape(&c.name)))
        .unwrap_or_default();
    let tag_links: Vec<String> = tags
        .iter()
        .map(|t| format!(r##"<a href="/tags/{}">#{}</a>"##, escape(&t.slug), escape(&t.name)))
        .collect();

    let mut facts = Vec::new();
    if let Some(prep) = recipe.prep_minutes {
        facts.push(format!("Penyediaan: {}", format_minutes(prep)));
    }
    if let Some(cook) = recipe.cook_minutes {
        facts.push(format!("Memasak: {}", format_minutes(cook)));
    }
    if let Some(total) = recipe.total_minutes() {
        facts.push(format!("Jumlah: {}", format_minutes(total)));
    }
    if let Some(servings) = recipe.servings {
        facts.push(format!("Hidangan: {} orang", servings));
    }
    if let Some(difficulty) = recipe.difficulty {
        facts.push(format!("Tahap: {}", difficulty.label()));
    }

    let save_form = match &user {
        Some(_) if is_saved => format!(
            r#"<form class="inline" method="post" action="/recipes/{}/unsave"><button class="secondary" type="submit">Buang dari simpanan</button></form>"#,
            escape(&recipe.slug)
        ),
        Some(_) => format!(
            r#"<form class="inline" method="post" action="/recipes/{}/save"><button type="submit">Simpan resepi</button></form>"#,
            escape(&recipe.slug)
        ),
        None => String::new(),
    };

    let comment_flash = match query.comment.as_deref() {
        Some("pending") => render::flash(Some("Komen anda sedang menunggu kelulusan."), false),
        Some("approved") => render::flash(Some("Komen anda telah disiarkan."), false),
        _ => String::new(),
    };
    let comment_list: String = if approved.is_empty() {
        r#"<p class="meta">Belum ada komen.</p>"#.to_string()
    } else {
        approved
            .iter()
            .map(|c| {
                format!(
                    r#"<div class="card"><div class="body"><strong>{}</strong> <span class="meta">{}</span>{}</div></div>"#,
                    escape(&c.author_name),
                    c.created_at.format("%d/%m/%Y"),
                    paragraphs(&c.body)
                )
            })
            .collect()
    };
    let comment_form = match &user {
        Some(_) => format!(
            r#"<form method="post" action="/recipes/{}/comments">
    <label for="body">Tulis komen</label>
    <textarea id="body" name="body" required minlength="2" maxlength="2000"></textarea>
    <p><button type="submit">Hantar komen</button></p>
</form>"#,
            escape(&recipe.slug)
        ),
        None => format!(
            r#"<p><a href="/login?next={}">Log masuk</a> untuk menulis komen atau menyimpan resepi ini.</p>"#,
            urlencoding::encode(&format!("/recipes/{}", recipe.slug))
        ),
    };

    let content = format!(
        r#"{status_note}
<h1>{title}</h1>
<p class="meta">{category} {tags}</p>
{hero}
<p>{summary}</p>
<p class="meta">{facts}</p>
{save_form}
<div class="gallery">{gallery}</div>
<h2>Bahan-bahan</h2>
{ingredients}
<h2>Cara memasak</h2>
{instructions}
<p class="meta">Dilihat {views} kali</p>
<h2 id="comments">Komen</h2>
{comment_flash}
{comment_list}
{comment_form}"#,
        status_note = status_note,
        title = escape(&recipe.title),
        category = category_link,
        tags = tag_links.join(" "),
        hero = hero,
        summary = escape(&recipe.summary),
        facts = escape(&facts.join(" · ")),
        save_form = save_form,
        gallery = gallery,
        ingredients = list_items(&recipe.ingredient_lines(), false),
        instructions = list_items(&recipe.instruction_lines(), true),
        views = recipe.view_count,
        comment_flash = comment_flash,
        comment_list = comment_list,
        comment_form = comment_form,
    );

    debug!(recipe_id = %recipe.guid, "Rendered recipe page");
    Ok(html_page(&context(&settings, user), &recipe.title, &content))
}

/// GET /categories
pub async fn category_index(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> PageResult<Html<String>> {
    let settings = SiteSettings::load(&state.db).await?;
    let categories = taxonomy::list_categories_with_counts(&state.db).await?;

    let rows: String = categories
        .iter()
        .map(|c| {
            format!(
                r#"<article class="card"><div class="body"><h3><a href="/categories/{}">{}</a></h3><p>{}</p><div class="meta">{} resepi</div></div></article>"#,
                escape(&c.slug),
                escape(&c.name),
                escape(&c.description),
                c.recipe_count
            )
        })
        .collect();
    let content = if categories.is_empty() {
        r#"<h1>Kategori</h1><p class="meta">Tiada kategori lagi.</p>"#.to_string()
    } else {
        format!(r#"<h1>Kategori</h1><div class="cards">{}</div>"#, rows)
    };

    Ok(html_page(&context(&settings, user), "Kategori", &content))
}

/// GET /categories/:slug
pub async fn category_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(slug): Path<String>,
    Query(query): Query<ListQuery>,
) -> PageResult<Html<String>> {
    let settings = SiteSettings::load(&state.db).await?;
    let category = taxonomy::get_category_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Category {}", slug)))?;

    let filter = RecipeFilter {
        category_id: Some(category.guid.clone()),
        ..Default::default()
    };
    let sort = RecipeSort::parse(query.sort.as_deref());
    let (cards, pagination) = filtered_page(&state.db, &filter, sort, parse_page(&query.page), settings.page_size).await?;

    let path = format!("/categories/{}", category.slug);
    let content = format!(
        r#"<h1>{name}</h1>
<p>{description}</p>
{sort}
{cards}
{pager}"#,
        name = escape(&category.name),
        description = escape(&category.description),
        sort = sort_links(&path, sort),
        cards = render::recipe_cards(&cards),
        pager = render::pager(&pagination, &path, &[("sort", sort.as_str().to_string())]),
    );

    Ok(html_page(&context(&settings, user), &category.name, &content))
}

/// GET /tags/:slug
pub async fn tag_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(slug): Path<String>,
    Query(query): Query<ListQuery>,
) -> PageResult<Html<String>> {
    let settings = SiteSettings::load(&state.db).await?;
    let tag = taxonomy::get_tag_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Tag {}", slug)))?;

    let filter = RecipeFilter {
        tag_id: Some(tag.guid.clone()),
        ..Default::default()
    };
    let (cards, pagination) =
        filtered_page(&state.db, &filter, RecipeSort::Newest, parse_page(&query.page), settings.page_size).await?;

    let path = format!("/tags/{}", tag.slug);
    let content = format!(
        "<h1>#{name}</h1>\n{cards}\n{pager}",
        name = escape(&tag.name),
        cards = render::recipe_cards(&cards),
        pager = render::pager(&pagination, &path, &[]),
    );

    Ok(html_page(&context(&settings, user), &format!("#{}", tag.name), &content))
}

/// GET /search
pub async fn search(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<SearchQuery>,
) -> PageResult<Html<String>> {
    let settings = SiteSettings::load(&state.db).await?;
    let categories = taxonomy::list_categories(&state.db).await?;

    let mut category_choices = vec![(String::new(), "Semua kategori".to_string())];
    category_choices.extend(categories.iter().map(|c| (c.slug.clone(), c.name.clone())));
    let mut difficulty_choices = vec![(String::new(), "Semua tahap".to_string())];
    difficulty_choices.extend(Difficulty::ALL.iter().map(|d| (d.as_str().to_string(), d.label().to_string())));

    let form = format!(
        r#"<h1>Cari resepi</h1>
<form method="get" action="/search">
    <label for="q">Kata kunci</label>
    <input type="text" id="q" name="q" value="{q}" placeholder="cth. rendang, santan, pedas">
    <label for="category">Kategori</label>
    <select id="category" name="category">{categories}</select>
    <label for="difficulty">Tahap</label>
    <select id="difficulty" name="difficulty">{difficulties}</select>
    <label for="max_minutes">Masa maksimum (minit)</label>
    <input type="number" id="max_minutes" name="max_minutes" min="1" value="{max_minutes}">
    <p><button type="submit">Cari</button></p>
</form>"#,
        q = escape(non_blank(&query.q).unwrap_or_default()),
        categories = render::options(&category_choices, non_blank(&query.category).unwrap_or_default()),
        difficulties = render::options(&difficulty_choices, non_blank(&query.difficulty).unwrap_or_default()),
        max_minutes = escape(non_blank(&query.max_minutes).unwrap_or_default()),
    );

    let results = match search_filter(&state.db, &query).await? {
        Some(filter) => {
            let sort = RecipeSort::parse(query.sort.as_deref());
            let (cards, pagination) =
                filtered_page(&state.db, &filter, sort, parse_page(&query.page), settings.page_size).await?;
            format!(
                r#"<h2>{total} resepi ditemui</h2>
{cards}
{pager}"#,
                total = pagination.total,
                cards = render::recipe_cards(&cards),
                pager = render::pager(&pagination, "/search", &query.params()),
            )
        }
        None => String::new(),
    };

    Ok(html_page(&context(&settings, user), "Cari", &format!("{}\n{}", form, results)))
}

/// GET /guides
pub async fn guide_index(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> PageResult<Html<String>> {
    let settings = SiteSettings::load(&state.db).await?;
    let guides = guides::list_published_guides(&state.db).await?;

    let items: String = guides
        .iter()
        .map(|g| format!(r#"<li><a href="/guides/{}">{}</a></li>"#, escape(&g.slug), escape(&g.title)))
        .collect();
    let content = if guides.is_empty() {
        r#"<h1>Panduan</h1><p class="meta">Tiada panduan lagi.</p>"#.to_string()
    } else {
        format!("<h1>Panduan</h1><ul>{}</ul>", items)
    };

    Ok(html_page(&context(&settings, user), "Panduan", &content))
}

/// GET /guides/:slug
pub async fn guide_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(slug): Path<String>,
) -> PageResult<Html<String>> {
    let settings = SiteSettings::load(&state.db).await?;
    let guide = guides::get_published_guide_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Guide {}", slug)))?;

    let content = format!(
        r#"<h1>{title}</h1>
<p class="meta">Dikemas kini {updated}</p>
{body}
<p><a href="/guides">&laquo; Semua panduan</a></p>"#,
        title = escape(&guide.title),
        updated = guide.updated_at.format("%d/%m/%Y"),
        body = paragraphs(&guide.body),
    );

    Ok(html_page(&context(&settings, user), &guide.title, &content))
}

/// Build public page routes
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/recipes", get(recipe_list))
        .route("/recipes/:slug", get(recipe_detail))
        .route("/categories", get(category_index))
        .route("/categories/:slug", get(category_page))
        .route("/tags/:slug", get(tag_page))
        .route("/search", get(search))
        .route("/guides", get(guide_index))
        .route("/guides/:slug", get(guide_page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_escape_and_split() {
        assert_eq!(
            paragraphs("Satu <b>\nbaris\n\n\nDua"),
            "<p>Satu &lt;b&gt;<br>baris</p><p>Dua</p>"
        );
    }

    #[test]
    fn test_search_params_skip_blank() {
        let query = SearchQuery {
            q: Some(" ayam ".into()),
            category: Some("".into()),
            ..Default::default()
        };
        let params = query.params();
        assert_eq!(params[0], ("q", "ayam".to_string()));
        assert_eq!(params[1], ("category", String::new()));
    }
}
