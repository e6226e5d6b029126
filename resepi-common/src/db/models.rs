//! Database models
//!
//! Row structs map 1:1 onto the tables created in [`crate::db::init`].
//! Status-like columns are TEXT in SQLite and strongly typed enums here.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Generates `as_str`, `Display` and `FromStr` for a TEXT-backed enum
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::InvalidInput(format!(
                        "Unknown {} value: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Reader,
    Editor,
    Admin,
}

text_enum!(Role { Reader => "reader", Editor => "editor", Admin => "admin" });

impl Role {
    /// Editors and admins manage content
    pub fn can_edit(&self) -> bool {
        matches!(self, Role::Editor | Role::Admin)
    }
}

/// Publication state of a recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RecipeStatus {
    Draft,
    Published,
    Archived,
}

text_enum!(RecipeStatus { Draft => "draft", Published => "published", Archived => "archived" });

/// Recipe difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

text_enum!(Difficulty { Easy => "easy", Medium => "medium", Hard => "hard" });

impl Difficulty {
    /// Display label used on recipe pages
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Mudah",
            Difficulty::Medium => "Sederhana",
            Difficulty::Hard => "Sukar",
        }
    }
}

/// Moderation state of a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(CommentStatus { Pending => "pending", Approved => "approved", Rejected => "rejected" });

/// Newsletter subscription state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SubscriberStatus {
    Subscribed,
    Unsubscribed,
}

text_enum!(SubscriberStatus { Subscribed => "subscribed", Unsubscribed => "unsubscribed" });

/// Review state of an AI-generated recipe draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DraftStatus {
    Pending,
    Accepted,
    Discarded,
}

text_enum!(DraftStatus { Pending => "pending", Accepted => "accepted", Discarded => "discarded" });

/// Registered user (credentials excluded)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub guid: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub guid: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub guid: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Recipe {
    pub guid: String,
    pub slug: String,
    pub title: String,
    pub summary: String,
    /// One ingredient per line
    pub ingredients: String,
    /// One step per line
    pub instructions: String,
    pub prep_minutes: Option<i64>,
    pub cook_minutes: Option<i64>,
    pub servings: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub category_id: Option<String>,
    pub author_id: Option<String>,
    pub status: RecipeStatus,
    pub published_at: Option<NaiveDateTime>,
    pub view_count: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Recipe {
    pub fn ingredient_lines(&self) -> Vec<&str> {
        non_empty_lines(&self.ingredients)
    }

    pub fn instruction_lines(&self) -> Vec<&str> {
        non_empty_lines(&self.instructions)
    }

    /// Prep plus cook time, when at least one is known
    pub fn total_minutes(&self) -> Option<i64> {
        match (self.prep_minutes, self.cook_minutes) {
            (None, None) => None,
            (prep, cook) => Some(prep.unwrap_or(0) + cook.unwrap_or(0)),
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == RecipeStatus::Published
    }
}

/// Split a newline-separated text column, dropping blank lines
pub fn non_empty_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecipeImage {
    pub guid: String,
    pub recipe_id: String,
    /// Paths are relative to the media directory
    pub original_path: String,
    pub medium_path: String,
    pub thumbnail_path: String,
    pub width: i64,
    pub height: i64,
    pub alt_text: String,
    pub is_primary: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub guid: String,
    pub recipe_id: String,
    pub user_id: String,
    pub body: String,
    pub status: CommentStatus,
    pub created_at: NaiveDateTime,
    pub moderated_at: Option<NaiveDateTime>,
    pub moderated_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Guide {
    pub guid: String,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub published: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NewsletterSubscriber {
    pub guid: String,
    pub email: String,
    pub name: String,
    pub status: SubscriberStatus,
    #[serde(skip_serializing)]
    pub unsubscribe_token: String,
    pub created_at: NaiveDateTime,
    pub unsubscribed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecipeDraftRow {
    pub guid: String,
    pub prompt: String,
    pub raw_response: String,
    pub title: String,
    /// JSON of the coerced draft
    pub payload: String,
    pub status: DraftStatus,
    pub recipe_id: Option<String>,
    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_round_trip_through_text() {
        assert_eq!("published".parse::<RecipeStatus>().unwrap(), RecipeStatus::Published);
        assert_eq!(" Hard ".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!(CommentStatus::Rejected.as_str(), "rejected");
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_ordering_and_permissions() {
        assert!(Role::Admin > Role::Editor);
        assert!(Role::Editor > Role::Reader);
        assert!(Role::Editor.can_edit());
        assert!(!Role::Reader.can_edit());
    }

    #[test]
    fn test_non_empty_lines_trims_and_skips_blanks() {
        let lines = non_empty_lines("  2 cawan tepung \n\n 1 biji telur\n   \n");
        assert_eq!(lines, vec!["2 cawan tepung", "1 biji telur"]);
    }
}
