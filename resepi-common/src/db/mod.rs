//! Database schema, models and settings store

pub mod init;
pub mod migrations;
pub mod models;
pub mod recipes;
pub mod settings;

pub use init::{init_database, init_schema};
pub use migrations::run_migrations;
pub use models::*;
