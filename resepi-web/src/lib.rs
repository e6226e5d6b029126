//! resepi-web library - ResepiCheNom website
//!
//! Server-rendered public site, accounts, comments, newsletter, the
//! admin dashboard and its JSON mirror, over a SQLite database and a
//! media directory in the root folder.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use resepi_common::config::TomlConfig;
use resepi_drafts::config::resolve_llm_config;
use resepi_drafts::{CompletionProvider, LlmClient, RateLimiter};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod db;
pub mod error;
pub mod media;
pub mod pagination;
pub mod render;
pub mod routes;
pub mod session;

use error::ApiResult;

/// Default spacing between LLM requests when the setting is unreadable
pub const DEFAULT_LLM_RATE_LIMIT_MS: u64 = 1000;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Root of uploaded files, served under `/media`
    pub media_dir: PathBuf,
    pub config: Arc<TomlConfig>,
    /// Shared by every LLM client this process creates
    pub llm_rate_limiter: Arc<RateLimiter>,
    /// Replaces the configured LLM client when set
    completion_override: Option<Arc<dyn CompletionProvider>>,
}

impl AppState {
    pub fn new(db: SqlitePool, media_dir: PathBuf, config: TomlConfig) -> Self {
        Self {
            db,
            media_dir,
            config: Arc::new(config),
            llm_rate_limiter: Arc::new(RateLimiter::new(DEFAULT_LLM_RATE_LIMIT_MS)),
            completion_override: None,
        }
    }

    pub fn with_llm_rate_limit_ms(mut self, min_interval_ms: u64) -> Self {
        self.llm_rate_limiter = Arc::new(RateLimiter::new(min_interval_ms));
        self
    }

    /// Use a fixed completion provider instead of the configured endpoint
    pub fn with_completion_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.completion_override = Some(provider);
        self
    }

    /// Provider for draft generation and audits
    ///
    /// The API key and model are resolved on every call so changes made
    /// on the settings page apply without a restart.
    pub async fn completion_provider(&self) -> ApiResult<Arc<dyn CompletionProvider>> {
        if let Some(provider) = &self.completion_override {
            return Ok(provider.clone());
        }

        let llm_config = resolve_llm_config(&self.db, &self.config).await?;
        let client = LlmClient::with_rate_limiter(llm_config, self.llm_rate_limiter.clone())?;
        Ok(Arc::new(client))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let media_dir = state.media_dir.clone();

    Router::new()
        .merge(routes::health_routes())
        .merge(routes::pages::page_routes())
        .merge(routes::account::account_routes())
        .merge(routes::comments::comment_routes())
        .merge(routes::newsletter::newsletter_routes())
        .merge(routes::admin::admin_routes())
        .nest("/api", routes::api::api_routes())
        .nest_service("/media", tower_http::services::ServeDir::new(media_dir))
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
