//! Tolerant parsing of model output into typed recipe fields
//!
//! Models are asked for strict JSON but routinely wrap it in code fences,
//! write times as prose ("about 1 jam"), give servings as "4 orang" and
//! answer difficulty in English or Malay. Everything here turns that into
//! the columns stored on a recipe.

use resepi_common::db::recipes::{self, normalize_tag_names, RecipeInput};
use resepi_common::db::Difficulty;
use resepi_common::duration::parse_minutes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DraftError, DraftResult};

const MAX_TITLE_CHARS: usize = 200;
const MAX_SERVINGS: u32 = recipes::MAX_SERVINGS as u32;
const MAX_MINUTES: u32 = recipes::MAX_MINUTES as u32;

/// Recipe draft after coercion; stored as the draft row payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoercedDraft {
    pub title: String,
    pub summary: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub prep_minutes: Option<u32>,
    pub cook_minutes: Option<u32>,
    pub servings: Option<u32>,
    pub difficulty: Option<Difficulty>,
    /// Category name suggested by the model, unresolved
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CoercedDraft {
    /// Recipe fields for insertion; `category_id` is resolved by the caller
    pub fn to_recipe_input(&self, category_id: Option<String>) -> RecipeInput {
        RecipeInput {
            title: self.title.clone(),
            summary: self.summary.clone(),
            ingredients: self.ingredients.clone(),
            instructions: self.instructions.clone(),
            prep_minutes: self.prep_minutes.map(i64::from),
            cook_minutes: self.cook_minutes.map(i64::from),
            servings: self.servings.map(i64::from),
            difficulty: self.difficulty,
            category_id,
            tags: self.tags.clone(),
        }
    }
}

/// Time and difficulty estimate returned by an audit prompt
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Estimate {
    pub prep_minutes: Option<u32>,
    pub cook_minutes: Option<u32>,
    pub difficulty: Option<Difficulty>,
}

impl Estimate {
    pub fn is_empty(&self) -> bool {
        self.prep_minutes.is_none() && self.cook_minutes.is_none() && self.difficulty.is_none()
    }
}

/// Coerce a raw completion into a recipe draft
///
/// Fails when the text holds no JSON object, or when the title,
/// ingredients or instructions are missing.
pub fn coerce_draft(raw: &str) -> DraftResult<CoercedDraft> {
    let object = parse_object(raw)?;

    let title = first_string(&object, &["title", "name", "recipe_name"])
        .map(|t| clean_line(&t))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| DraftError::InvalidResponse("Draft has no title".to_string()))?;
    let title: String = title.chars().take(MAX_TITLE_CHARS).collect();

    let summary = first_string(&object, &["summary", "description", "intro"])
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let ingredients = string_list(first_value(&object, &["ingredients", "bahan", "bahan_bahan"]));
    if ingredients.is_empty() {
        return Err(DraftError::InvalidResponse("Draft has no ingredients".to_string()));
    }

    let instructions = string_list(first_value(
        &object,
        &["instructions", "steps", "method", "cara", "langkah"],
    ));
    if instructions.is_empty() {
        return Err(DraftError::InvalidResponse("Draft has no instructions".to_string()));
    }

    let category = first_string(&object, &["category", "kategori"])
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let tags = normalize_tag_names(
        &string_list(first_value(&object, &["tags", "tag"]))
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect::<Vec<_>>(),
    );

    Ok(CoercedDraft {
        title,
        summary,
        ingredients,
        instructions,
        prep_minutes: minutes_field(&object, &["prep_time", "prep_minutes", "prepTime", "preparation_time"]),
        cook_minutes: minutes_field(&object, &["cook_time", "cook_minutes", "cookTime", "cooking_time"]),
        servings: first_value(&object, &["servings", "serves", "yield", "hidangan"]).and_then(parse_servings_value),
        difficulty: first_string(&object, &["difficulty", "level", "kesukaran"])
            .as_deref()
            .and_then(parse_difficulty),
        category,
        tags,
    })
}

/// Coerce a raw audit completion into a time/difficulty estimate
pub fn coerce_estimate(raw: &str) -> DraftResult<Estimate> {
    let object = parse_object(raw)?;

    Ok(Estimate {
        prep_minutes: minutes_field(&object, &["prep_time", "prep_minutes", "prepTime"]),
        cook_minutes: minutes_field(&object, &["cook_time", "cook_minutes", "cookTime"]),
        difficulty: first_string(&object, &["difficulty", "level"])
            .as_deref()
            .and_then(parse_difficulty),
    })
}

/// Map an English or Malay difficulty word onto [`Difficulty`]
///
/// Harder words are checked first so "not too difficult" style answers
/// do not read as easy.
pub fn parse_difficulty(text: &str) -> Option<Difficulty> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let has = |candidates: &[&str]| words.iter().any(|w| candidates.contains(w));

    if has(&["hard", "sukar", "susah", "difficult", "advanced", "challenging"]) {
        Some(Difficulty::Hard)
    } else if has(&["medium", "sederhana", "intermediate", "moderate"]) {
        Some(Difficulty::Medium)
    } else if has(&["easy", "mudah", "senang", "simple", "beginner"]) {
        Some(Difficulty::Easy)
    } else {
        None
    }
}

/// Servings from free text; ranges resolve to the lower bound
///
/// "4 orang" → 4, "serves 4-6" → 4, "untuk 2 hingga 3" → 2.
pub fn parse_servings(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits
        .parse::<u32>()
        .ok()
        .filter(|n| (1..=MAX_SERVINGS).contains(n))
}

/// Remove a surrounding Markdown code fence, if present
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the language tag line ("```json")
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };

    body.trim_end().trim_end_matches("```").trim()
}

fn parse_object(raw: &str) -> DraftResult<Map<String, Value>> {
    let body = strip_code_fences(raw);

    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(_) => {
            // Prose around the object: take the outermost braces
            let start = body.find('{');
            let end = body.rfind('}');
            match (start, end) {
                (Some(start), Some(end)) if start < end => serde_json::from_str(&body[start..=end])
                    .map_err(|e| DraftError::InvalidResponse(format!("Malformed JSON: {}", e)))?,
                _ => {
                    return Err(DraftError::InvalidResponse(
                        "No JSON object in response".to_string(),
                    ))
                }
            }
        }
    };

    let map = match value {
        Value::Object(map) => map,
        // Some models wrap the recipe: {"recipe": {...}} or [{...}]
        Value::Array(items) => match items.into_iter().next() {
            Some(Value::Object(map)) => map,
            _ => return Err(DraftError::InvalidResponse("Expected a JSON object".to_string())),
        },
        _ => return Err(DraftError::InvalidResponse("Expected a JSON object".to_string())),
    };

    Ok(unwrap_recipe_key(map))
}

fn unwrap_recipe_key(mut map: Map<String, Value>) -> Map<String, Value> {
    if map.len() == 1 {
        if let Some(Value::Object(inner)) = map.remove("recipe") {
            return inner;
        }
    }
    map
}

fn first_value<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

fn first_string(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    first_value(object, keys).and_then(value_to_text)
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn minutes_field(object: &Map<String, Value>, keys: &[&str]) -> Option<u32> {
    match first_value(object, keys)? {
        Value::Number(n) => n
            .as_f64()
            .filter(|m| m.is_finite() && *m >= 0.0 && *m <= f64::from(MAX_MINUTES))
            .map(|m| m.round() as u32),
        Value::String(s) => parse_minutes(s).filter(|m| *m <= MAX_MINUTES),
        _ => None,
    }
}

fn parse_servings_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|s| s.is_finite())
            .map(|s| s.round() as u32)
            .filter(|n| (1..=MAX_SERVINGS).contains(n)),
        Value::String(s) => parse_servings(s),
        _ => None,
    }
}

/// Flatten a list-ish value into cleaned, de-duplicated lines
fn string_list(value: Option<&Value>) -> Vec<String> {
    let raw: Vec<String> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(list_item_text).collect(),
        Some(Value::String(s)) => s.lines().map(str::to_string).collect(),
        _ => Vec::new(),
    };

    let mut seen = std::collections::HashSet::new();
    raw.iter()
        .map(|line| clean_line(line))
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_lowercase()))
        .collect()
}

/// Text of one list entry; objects like `{"quantity": "2 cawan", "item": "tepung"}` are joined
fn list_item_text(item: &Value) -> Option<String> {
    match item {
        Value::Object(map) => {
            let parts: Vec<String> = ["quantity", "amount", "unit", "item", "name", "ingredient", "step", "text"]
                .iter()
                .filter_map(|key| map.get(*key).and_then(value_to_text))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        other => value_to_text(other),
    }
}

/// Trim and drop list markers such as "1.", "2)", "-", "*", "•"
fn clean_line(line: &str) -> String {
    let mut text = line.trim();

    text = text.trim_start_matches(['-', '*', '•']).trim_start();

    let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &text[digits..];
        let marker = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')'));
        // "1.5 cawan" is a quantity, not a step number
        if let Some(stripped) = marker.filter(|s| s.is_empty() || s.starts_with(char::is_whitespace)) {
            text = stripped.trim_start();
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"```json
{
  "title": "Nasi Lemak Sambal Sotong",
  "summary": "Nasi lemak wangi dengan sambal sotong pedas.",
  "ingredients": ["2 cawan beras", "1 cawan santan", "2 cawan beras", "  "],
  "instructions": ["1. Basuh beras.", "2. Masak dengan santan."],
  "prep_time": "20 minit",
  "cook_time": "1 jam 15 minit",
  "servings": "4 orang",
  "difficulty": "Sederhana",
  "category": "Nasi",
  "tags": ["Pedas", "pedas", "sarapan"]
}
```"#;

    #[test]
    fn test_coerce_full_draft() {
        let draft = coerce_draft(SAMPLE).unwrap();
        assert_eq!(draft.title, "Nasi Lemak Sambal Sotong");
        assert_eq!(draft.ingredients, vec!["2 cawan beras", "1 cawan santan"]);
        assert_eq!(draft.instructions, vec!["Basuh beras.", "Masak dengan santan."]);
        assert_eq!(draft.prep_minutes, Some(20));
        assert_eq!(draft.cook_minutes, Some(75));
        assert_eq!(draft.servings, Some(4));
        assert_eq!(draft.difficulty, Some(Difficulty::Medium));
        assert_eq!(draft.category.as_deref(), Some("Nasi"));
        assert_eq!(draft.tags, vec!["pedas", "sarapan"]);
    }

    #[test]
    fn test_numeric_fields_and_prose_wrapper() {
        let raw = r#"Here you go: {"title": "Kuih Lapis", "ingredients": "tepung\nsantan",
            "steps": ["kukus lapis demi lapis"], "prep_time": 30, "cook_time": 45.4,
            "servings": 12, "difficulty": "hard"} Enjoy!"#;
        let draft = coerce_draft(raw).unwrap();
        assert_eq!(draft.ingredients, vec!["tepung", "santan"]);
        assert_eq!(draft.instructions.len(), 1);
        assert_eq!(draft.prep_minutes, Some(30));
        assert_eq!(draft.cook_minutes, Some(45));
        assert_eq!(draft.servings, Some(12));
        assert_eq!(draft.difficulty, Some(Difficulty::Hard));
        assert!(draft.summary.is_empty());
    }

    #[test]
    fn test_out_of_range_times_dropped() {
        let raw = r#"{"title": "Tapai Pulut", "ingredients": ["pulut"], "instructions": ["peram"],
            "prep_time": 99999, "cook_time": 1e12}"#;
        let draft = coerce_draft(raw).unwrap();
        assert_eq!(draft.prep_minutes, None);
        assert_eq!(draft.cook_minutes, None);

        let raw = r#"{"title": "Tapai Pulut", "ingredients": ["pulut"], "instructions": ["peram"],
            "prep_time": 10000, "cook_time": "7 hari"}"#;
        let draft = coerce_draft(raw).unwrap();
        assert_eq!(draft.prep_minutes, Some(10_000));
        assert_eq!(draft.cook_minutes, None);

        let estimate = coerce_estimate(r#"{"prep_time": 20000, "difficulty": "mudah"}"#).unwrap();
        assert_eq!(estimate.prep_minutes, None);
        assert_eq!(estimate.difficulty, Some(Difficulty::Easy));
    }

    #[test]
    fn test_wrapped_recipe_object_and_ingredient_objects() {
        let raw = r#"{"recipe": {"title": "Teh Tarik",
            "ingredients": [{"quantity": "2 sudu", "item": "teh"}, {"name": "susu pekat"}],
            "instructions": ["Tarik."]}}"#;
        let draft = coerce_draft(raw).unwrap();
        assert_eq!(draft.title, "Teh Tarik");
        assert_eq!(draft.ingredients, vec!["2 sudu teh", "susu pekat"]);
        assert_eq!(draft.prep_minutes, None);
        assert_eq!(draft.difficulty, None);
    }

    #[test]
    fn test_missing_required_fields_rejected() {
        assert!(matches!(
            coerce_draft(r#"{"ingredients": ["a"], "instructions": ["b"]}"#),
            Err(DraftError::InvalidResponse(_))
        ));
        assert!(coerce_draft(r#"{"title": "X", "ingredients": [], "instructions": ["b"]}"#).is_err());
        assert!(coerce_draft(r#"{"title": "X", "ingredients": ["a"]}"#).is_err());
        assert!(coerce_draft("I cannot help with that.").is_err());
        assert!(coerce_draft("[1, 2]").is_err());
    }

    #[test]
    fn test_parse_difficulty_words() {
        assert_eq!(parse_difficulty("Mudah"), Some(Difficulty::Easy));
        assert_eq!(parse_difficulty("senang sahaja"), Some(Difficulty::Easy));
        assert_eq!(parse_difficulty("Intermediate"), Some(Difficulty::Medium));
        assert_eq!(parse_difficulty("agak susah"), Some(Difficulty::Hard));
        assert_eq!(parse_difficulty("Advanced"), Some(Difficulty::Hard));
        assert_eq!(parse_difficulty("???"), None);
    }

    #[test]
    fn test_parse_servings() {
        assert_eq!(parse_servings("4 orang"), Some(4));
        assert_eq!(parse_servings("serves 4-6"), Some(4));
        assert_eq!(parse_servings("untuk 2 hingga 3"), Some(2));
        assert_eq!(parse_servings("ramai"), None);
        assert_eq!(parse_servings("0"), None);
        assert_eq!(parse_servings("500 people"), None);
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn test_clean_line_markers() {
        assert_eq!(clean_line("  1. Panaskan minyak "), "Panaskan minyak");
        assert_eq!(clean_line("2) Tumis   bawang"), "Tumis bawang");
        assert_eq!(clean_line("• garam"), "garam");
        assert_eq!(clean_line("250g gula"), "250g gula");
        assert_eq!(clean_line("1.5 cawan tepung"), "1.5 cawan tepung");
    }

    #[test]
    fn test_coerce_estimate() {
        let estimate =
            coerce_estimate(r#"{"prep_time": "15 mins", "cook_time": "half an hour", "difficulty": "easy"}"#)
                .unwrap();
        assert_eq!(estimate.prep_minutes, Some(15));
        assert_eq!(estimate.cook_minutes, Some(30));
        assert_eq!(estimate.difficulty, Some(Difficulty::Easy));
        assert!(coerce_estimate("{}").unwrap().is_empty());
    }

    #[test]
    fn test_to_recipe_input() {
        let draft = coerce_draft(SAMPLE).unwrap();
        let input = draft.to_recipe_input(Some("cat-1".to_string()));
        assert_eq!(input.cook_minutes, Some(75));
        assert_eq!(input.servings, Some(4));
        assert_eq!(input.category_id.as_deref(), Some("cat-1"));
        assert_eq!(input.tags, vec!["pedas", "sarapan"]);
    }
}
