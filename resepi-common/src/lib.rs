//! # ResepiCheNom Common Library
//!
//! Shared code for the ResepiCheNom binaries including:
//! - Database schema, migrations and models
//! - Configuration loading and root folder resolution
//! - Password and session token helpers
//! - Slug and cooking-time utilities

pub mod auth;
pub mod config;
pub mod db;
pub mod duration;
pub mod error;
pub mod slug;

pub use error::{Error, Result};
