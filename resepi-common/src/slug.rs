//! URL slugs for recipes, categories, tags and guides

use sqlx::{SqliteConnection, SqlitePool};

use crate::{Error, Result};

/// Tables that carry a unique `slug` column
const SLUGGED_TABLES: &[&str] = &["recipes", "categories", "tags", "guides"];

/// Maximum slug length before the uniqueness suffix
const MAX_SLUG_LEN: usize = 80;

/// Convert free text into a URL slug
///
/// # Examples
///
/// ```
/// use resepi_common::slug::slugify;
///
/// assert_eq!(slugify("Nasi Lemak Sambal Sotong!"), "nasi-lemak-sambal-sotong");
/// assert_eq!(slugify("  Crème brûlée  "), "creme-brulee");
/// assert_eq!(slugify("!!!"), "");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(fold_char) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    slug
}

/// ASCII-fold the Latin accents that show up in recipe titles
fn fold_char(c: char) -> Vec<char> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' | 'À' | 'Á' | 'Â' | 'Ä' | 'Ã' | 'Å' => 'a',
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' | 'Ò' | 'Ó' | 'Ô' | 'Ö' | 'Õ' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        'ß' => return vec!['s', 's'],
        '&' => return vec![' ', 'd', 'a', 'n', ' '],
        other => other,
    };
    vec![folded]
}

/// Find a free slug in `table`, appending `-2`, `-3`, ... on collision
///
/// `exclude_guid` lets an existing row keep its own slug on update.
pub async fn unique_slug(
    pool: &SqlitePool,
    table: &str,
    text: &str,
    exclude_guid: Option<&str>,
) -> Result<String> {
    let mut conn = pool.acquire().await?;
    unique_slug_conn(&mut conn, table, text, exclude_guid).await
}

/// Same as [`unique_slug`] on an open connection or transaction
pub async fn unique_slug_conn(
    conn: &mut SqliteConnection,
    table: &str,
    text: &str,
    exclude_guid: Option<&str>,
) -> Result<String> {
    if !SLUGGED_TABLES.contains(&table) {
        return Err(Error::Internal(format!("Table has no slug column: {}", table)));
    }

    let mut base = slugify(text);
    if base.is_empty() {
        base = "item".to_string();
    }

    let sql = format!("SELECT COUNT(*) FROM {} WHERE slug = ? AND guid != ?", table);
    let exclude = exclude_guid.unwrap_or("");

    let mut candidate = base.clone();
    let mut suffix = 2;
    loop {
        let taken: i64 = sqlx::query_scalar(&sql)
            .bind(&candidate)
            .bind(exclude)
            .fetch_one(&mut *conn)
            .await?;

        if taken == 0 {
            return Ok(candidate);
        }

        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }
}
