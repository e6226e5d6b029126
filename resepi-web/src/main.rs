//! resepi-web - ResepiCheNom website server
//!
//! Serves the public recipe site, reader accounts, the admin dashboard
//! and the read-only JSON API from one SQLite database in the root
//! folder.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resepi_common::config::{load_toml_config, CompiledDefaults, RootFolderInitializer, RootFolderResolver};
use resepi_common::db::settings::{get_setting_or, LLM_RATE_LIMIT_MS};
use resepi_web::db::users::purge_expired_sessions;
use resepi_web::{build_router, AppState, DEFAULT_LLM_RATE_LIMIT_MS};

const MODULE_NAME: &str = "web";

/// Command-line arguments for resepi-web
#[derive(Parser, Debug)]
#[command(name = "resepi-web")]
#[command(about = "ResepiCheNom recipe website")]
#[command(version)]
struct Args {
    /// Root folder holding the database and media
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = load_toml_config(MODULE_NAME);
    let defaults = CompiledDefaults::for_current_platform();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "resepi_web={0},resepi_common={0},resepi_drafts={0},tower_http=info",
            toml_config.logging.level
        )
        .into()
    });

    // Log to the configured file when one is set, otherwise stderr
    let log_file = match &toml_config.logging.file {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?,
        ),
        None => None,
    };
    let stderr_layer = log_file.is_none().then(|| tracing_subscriber::fmt::layer());
    let file_layer = log_file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    info!(
        "Starting ResepiCheNom web (resepi-web) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let pool = resepi_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    match purge_expired_sessions(&pool).await {
        Ok(0) => {}
        Ok(purged) => info!(purged, "Removed expired sessions"),
        Err(e) => warn!(error = %e, "Could not purge expired sessions"),
    }

    let rate_limit_ms = get_setting_or(&pool, LLM_RATE_LIMIT_MS, DEFAULT_LLM_RATE_LIMIT_MS).await?;

    let media_dir = initializer.media_path();
    info!("Media: {}", media_dir.display());

    let bind = args
        .bind
        .or_else(|| toml_config.bind.clone())
        .unwrap_or(defaults.bind);
    let port = args.port.or(toml_config.port).unwrap_or(defaults.port);

    let state = AppState::new(pool.clone(), media_dir, toml_config).with_llm_rate_limit_ms(rate_limit_ms);
    let app = build_router(state);

    let address = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("resepi-web listening on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("resepi-web stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
