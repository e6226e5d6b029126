//! resepi-drafts - AI recipe drafting and recipe audit tool
//!
//! `generate` asks the configured model for recipe drafts that editors
//! review in the admin area. `audit` lists recipes missing prep/cook time
//! or difficulty and, with `--fix`, fills them from model estimates.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resepi_common::config::{load_toml_config, RootFolderInitializer, RootFolderResolver};
use resepi_drafts::audit::audit_recipes;
use resepi_drafts::config::resolve_llm_config;
use resepi_drafts::generate::generate_drafts;
use resepi_drafts::{CompletionProvider, LlmClient};

const MODULE_NAME: &str = "drafts";

/// Command-line arguments for resepi-drafts
#[derive(Parser, Debug)]
#[command(name = "resepi-drafts")]
#[command(about = "AI recipe drafts and recipe audits for ResepiCheNom")]
#[command(version)]
struct Args {
    /// Root folder holding the database and media
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate recipe drafts from an idea
    Generate {
        /// Dish or theme, e.g. "kuih untuk berbuka puasa"
        idea: String,

        /// Number of drafts to request
        #[arg(short, long, default_value_t = 1)]
        count: u32,
    },
    /// Report recipes missing prep/cook time or difficulty
    Audit {
        /// Ask the model to estimate missing values and store them
        #[arg(long)]
        fix: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = load_toml_config(MODULE_NAME);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("resepi_drafts={0},resepi_common={0}", toml_config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "resepi-drafts {} [{}] built {} ({})",
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

    match args.command {
        Command::Generate { idea, count } => {
            let client = LlmClient::new(resolve_llm_config(&pool, &toml_config).await?)?;
            let drafts = generate_drafts(&pool, &client, &idea, count, None).await?;

            for draft in &drafts {
                println!("{}  {}", draft.guid, draft.title);
            }
            println!("{} draft(s) waiting for review at /admin/drafts", drafts.len());
        }
        Command::Audit { fix } => {
            let client = if fix {
                Some(LlmClient::new(resolve_llm_config(&pool, &toml_config).await?)?)
            } else {
                None
            };
            let provider = client.as_ref().map(|c| c as &dyn CompletionProvider);

            let report = audit_recipes(&pool, provider).await?;

            for finding in &report.findings {
                let mut missing = Vec::new();
                if finding.missing_prep {
                    missing.push("prep");
                }
                if finding.missing_cook {
                    missing.push("cook");
                }
                if finding.missing_difficulty {
                    missing.push("difficulty");
                }

                let outcome = match (&finding.error, finding.fixed) {
                    (Some(error), _) => format!("  FAILED: {}", error),
                    (None, true) => "  fixed".to_string(),
                    (None, false) => String::new(),
                };
                println!("{:<40} missing {}{}", finding.slug, missing.join(", "), outcome);
            }

            println!(
                "Scanned {} recipe(s): {} incomplete, {} fixed, {} failed",
                report.scanned,
                report.incomplete(),
                report.fixed,
                report.failed
            );
        }
    }

    pool.close().await;
    Ok(())
}
