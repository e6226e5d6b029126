//! Query functions used by the HTTP handlers
//!
//! Schema, models and recipe writes live in `resepi_common::db`.

pub mod comments;
pub mod guides;
pub mod images;
pub mod newsletter;
pub mod recipes;
pub mod saved;
pub mod taxonomy;
pub mod users;
