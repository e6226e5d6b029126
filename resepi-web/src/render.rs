//! HTML rendering helpers
//!
//! Pages are assembled from inline `format!` templates. Every value that
//! came from a user or the database goes through [`escape`].

use resepi_common::db::{Role, User};
use resepi_common::duration::format_minutes;

use crate::db::recipes::RecipeCard;
use crate::pagination::Pagination;

const STYLE: &str = r#"
        * { box-sizing: border-box; }
        body {
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            margin: 0;
            background-color: #fffaf3;
            color: #2b2118;
            line-height: 1.6;
        }
        header {
            background-color: #b5452c;
            color: #fff;
            padding: 12px 20px;
            display: flex;
            justify-content: space-between;
            align-items: center;
            flex-wrap: wrap;
            gap: 10px;
        }
        header a { color: #fff; text-decoration: none; margin-right: 14px; }
        header .brand { font-size: 22px; font-weight: 700; }
        header form { display: inline; }
        main { max-width: 1100px; margin: 0 auto; padding: 20px; }
        footer { text-align: center; color: #8a7a6a; font-size: 13px; padding: 30px 0; }
        .cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(240px, 1fr)); gap: 18px; }
        .card { background: #fff; border: 1px solid #ecdccb; border-radius: 8px; overflow: hidden; }
        .card img { width: 100%; height: 160px; object-fit: cover; display: block; }
        .card .body { padding: 10px 14px; }
        .card h3 { margin: 0 0 6px 0; font-size: 17px; }
        .meta { color: #8a7a6a; font-size: 13px; }
        .pager { margin: 24px 0; display: flex; gap: 12px; align-items: center; }
        .flash { padding: 10px 14px; border-radius: 6px; margin-bottom: 16px; }
        .flash.error { background: #fde2dd; color: #8a1f0a; }
        .flash.ok { background: #e2f4e0; color: #1d5c16; }
        table { border-collapse: collapse; width: 100%; background: #fff; }
        th, td { border-bottom: 1px solid #ecdccb; padding: 6px 8px; text-align: left; vertical-align: top; }
        label { display: block; margin-top: 10px; font-weight: 600; }
        input[type=text], input[type=email], input[type=password], input[type=number], textarea, select {
            width: 100%; padding: 6px 8px; border: 1px solid #cdb9a4; border-radius: 4px; font: inherit;
        }
        textarea { min-height: 120px; }
        button { background: #b5452c; color: #fff; border: 0; border-radius: 4px; padding: 6px 14px; cursor: pointer; }
        button.secondary { background: #8a7a6a; }
        .inline { display: inline; }
        .gallery img { height: 90px; margin-right: 6px; border-radius: 4px; }
"#;

/// Escape text for HTML element content and quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Site-wide values every page needs
#[derive(Debug, Clone)]
pub struct PageContext {
    pub site_name: String,
    pub user: Option<User>,
}

fn nav(ctx: &PageContext) -> String {
    let account = match &ctx.user {
        Some(user) => {
            let admin = if user.role.can_edit() {
                r#"<a href="/admin">Admin</a>"#
            } else {
                ""
            };
            format!(
                r#"{admin}<a href="/account">{name}</a>
<form method="post" action="/logout"><button class="secondary" type="submit">Log keluar</button></form>"#,
                admin = admin,
                name = escape(&user.display_name),
            )
        }
        None => r#"<a href="/login">Log masuk</a><a href="/register">Daftar</a>"#.to_string(),
    };

    format!(
        r#"<header>
    <div>
        <a class="brand" href="/">{site}</a>
        <a href="/recipes">Resepi</a>
        <a href="/categories">Kategori</a>
        <a href="/guides">Panduan</a>
        <a href="/search">Cari</a>
    </div>
    <div>{account}</div>
</header>"#,
        site = escape(&ctx.site_name),
        account = account,
    )
}

/// Wrap page content in the site layout
pub fn layout(ctx: &PageContext, title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="ms">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} | {site}</title>
    <style>{style}</style>
</head>
<body>
{nav}
<main>
{content}
</main>
<footer>{site} v{version}</footer>
</body>
</html>"#,
        title = escape(title),
        site = escape(&ctx.site_name),
        style = STYLE,
        nav = nav(ctx),
        content = content,
        version = env!("CARGO_PKG_VERSION"),
    )
}

/// Standalone error page (no database access needed)
pub fn error_page(status: u16, title: &str, message: &str) -> String {
    let ctx = PageContext {
        site_name: "ResepiCheNom".to_string(),
        user: None,
    };
    layout(
        &ctx,
        title,
        &format!(
            r#"<h1>{status} · {title}</h1>
<p>{message}</p>
<p><a href="/">Kembali ke laman utama</a></p>"#,
            status = status,
            title = escape(title),
            message = escape(message),
        ),
    )
}

/// Flash box for form errors or confirmations
pub fn flash(message: Option<&str>, is_error: bool) -> String {
    match message {
        Some(message) if !message.is_empty() => format!(
            r#"<div class="flash {}">{}</div>"#,
            if is_error { "error" } else { "ok" },
            escape(message)
        ),
        _ => String::new(),
    }
}

/// Build `path?k=v&...` skipping empty values
pub fn url_with_query(path: &str, params: &[(&str, String)]) -> String {
    let query: Vec<String> = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect();

    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query.join("&"))
    }
}

/// Previous/next links preserving the other query parameters
pub fn pager(pagination: &Pagination, path: &str, params: &[(&str, String)]) -> String {
    if pagination.total_pages <= 1 {
        return String::new();
    }

    let link = |page: i64| {
        let mut all: Vec<(&str, String)> = params.to_vec();
        all.push(("page", page.to_string()));
        escape(&url_with_query(path, &all))
    };

    let previous = if pagination.has_previous() {
        format!(r#"<a href="{}">&laquo; Sebelum</a>"#, link(pagination.page - 1))
    } else {
        String::new()
    };
    let next = if pagination.has_next() {
        format!(r#"<a href="{}">Seterusnya &raquo;</a>"#, link(pagination.page + 1))
    } else {
        String::new()
    };

    format!(
        r#"<nav class="pager">{previous}<span>Halaman {page} / {pages}</span>{next}</nav>"#,
        previous = previous,
        page = pagination.page,
        pages = pagination.total_pages,
        next = next,
    )
}

/// "Sederhana · 1 hr 30 min" style summary line
pub fn recipe_meta(total_minutes: Option<i64>, difficulty: Option<resepi_common::db::Difficulty>) -> String {
    let mut parts = Vec::new();
    if let Some(minutes) = total_minutes {
        parts.push(format_minutes(minutes));
    }
    if let Some(difficulty) = difficulty {
        parts.push(difficulty.label().to_string());
    }
    parts.join(" · ")
}

pub fn recipe_card(card: &RecipeCard) -> String {
    let image = match &card.thumbnail_path {
        Some(path) => format!(
            r#"<img src="/media/{}" alt="{}" loading="lazy">"#,
            escape(path),
            escape(&card.title)
        ),
        None => String::new(),
    };
    let category = match (&card.category_name, &card.category_slug) {
        (Some(name), Some(slug)) => format!(
            r#"<a class="meta" href="/categories/{}">{}</a>"#,
            escape(slug),
            escape(name)
        ),
        _ => String::new(),
    };

    format!(
        r#"<article class="card">
    <a href="/recipes/{slug}">{image}</a>
    <div class="body">
        <h3><a href="/recipes/{slug}">{title}</a></h3>
        {category}
        <p>{summary}</p>
        <div class="meta">{meta}</div>
    </div>
</article>"#,
        slug = escape(&card.slug),
        image = image,
        title = escape(&card.title),
        category = category,
        summary = escape(&card.summary),
        meta = escape(&recipe_meta(card.total_minutes(), card.difficulty)),
    )
}

pub fn recipe_cards(cards: &[RecipeCard]) -> String {
    if cards.is_empty() {
        return r#"<p class="meta">Tiada resepi ditemui.</p>"#.to_string();
    }
    let inner: String = cards.iter().map(recipe_card).collect();
    format!(r#"<div class="cards">{}</div>"#, inner)
}

/// `<option>` list with `selected` on the current value
pub fn options(choices: &[(String, String)], selected: &str) -> String {
    choices
        .iter()
        .map(|(value, label)| {
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                escape(value),
                if value == selected { " selected" } else { "" },
                escape(label)
            )
        })
        .collect()
}

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::Reader => "Pembaca",
        Role::Editor => "Editor",
        Role::Admin => "Pentadbir",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x" & 'y')</script>"#),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#39;y&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_url_with_query_skips_empty_and_encodes() {
        assert_eq!(
            url_with_query("/search", &[("q", "nasi lemak".into()), ("category", String::new())]),
            "/search?q=nasi%20lemak"
        );
        assert_eq!(url_with_query("/recipes", &[]), "/recipes");
    }

    #[test]
    fn test_pager_hidden_for_single_page() {
        let p = crate::pagination::calculate_pagination(5, 1, 12);
        assert!(pager(&p, "/recipes", &[]).is_empty());

        let p = crate::pagination::calculate_pagination(30, 2, 12);
        let html = pager(&p, "/recipes", &[("sort", "title".into())]);
        assert!(html.contains("/recipes?sort=title&amp;page=1"));
        assert!(html.contains("/recipes?sort=title&amp;page=3"));
    }

    #[test]
    fn test_recipe_meta() {
        assert_eq!(
            recipe_meta(Some(90), Some(resepi_common::db::Difficulty::Easy)),
            "1 hr 30 min · Mudah"
        );
        assert_eq!(recipe_meta(None, None), "");
    }
}
