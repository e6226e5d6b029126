//! Audit of stored recipes for missing time and difficulty columns
//!
//! Without a provider the audit only reports. With one, each incomplete
//! recipe is sent to the model and the coerced estimate fills the gaps;
//! values already set are never overwritten.

use resepi_common::db::recipes::fill_recipe_gaps;
use resepi_common::db::Recipe;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::coerce::coerce_estimate;
use crate::error::DraftResult;
use crate::llm_client::CompletionProvider;
use crate::prompt::build_audit_prompt;

/// One recipe with at least one missing column
#[derive(Debug, Clone, Serialize)]
pub struct AuditFinding {
    pub recipe_id: String,
    pub slug: String,
    pub title: String,
    pub missing_prep: bool,
    pub missing_cook: bool,
    pub missing_difficulty: bool,
    /// Set when a fix was written
    pub fixed: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub scanned: usize,
    pub findings: Vec<AuditFinding>,
    pub fixed: usize,
    pub failed: usize,
}

impl AuditReport {
    pub fn incomplete(&self) -> usize {
        self.findings.len()
    }
}

/// Scan all recipes; pass a provider to also fix what is missing
pub async fn audit_recipes(pool: &SqlitePool, fix: Option<&dyn CompletionProvider>) -> DraftResult<AuditReport> {
    let recipes = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes ORDER BY created_at, guid")
        .fetch_all(pool)
        .await?;

    let mut report = AuditReport {
        scanned: recipes.len(),
        ..Default::default()
    };

    for recipe in recipes {
        let mut finding = AuditFinding {
            recipe_id: recipe.guid.clone(),
            slug: recipe.slug.clone(),
            title: recipe.title.clone(),
            missing_prep: recipe.prep_minutes.is_none(),
            missing_cook: recipe.cook_minutes.is_none(),
            missing_difficulty: recipe.difficulty.is_none(),
            fixed: false,
            error: None,
        };

        if !(finding.missing_prep || finding.missing_cook || finding.missing_difficulty) {
            continue;
        }

        if let Some(provider) = fix {
            match fix_recipe(pool, provider, &recipe).await {
                Ok(true) => {
                    finding.fixed = true;
                    report.fixed += 1;
                }
                Ok(false) => {
                    finding.error = Some("Model returned no usable values".to_string());
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(recipe_id = %recipe.guid, error = %e, "Audit fix failed");
                    finding.error = Some(e.to_string());
                    report.failed += 1;
                }
            }
        }

        report.findings.push(finding);
    }

    info!(
        scanned = report.scanned,
        incomplete = report.incomplete(),
        fixed = report.fixed,
        failed = report.failed,
        "Recipe audit complete"
    );

    Ok(report)
}

/// Write the estimated values for columns that are still empty
///
/// Returns false when the model supplied nothing for any missing column.
async fn fix_recipe(pool: &SqlitePool, provider: &dyn CompletionProvider, recipe: &Recipe) -> DraftResult<bool> {
    let raw = provider.complete(&build_audit_prompt(recipe)).await?;
    let estimate = coerce_estimate(&raw)?;

    let prep_minutes = estimate.prep_minutes.filter(|_| recipe.prep_minutes.is_none()).map(i64::from);
    let cook_minutes = estimate.cook_minutes.filter(|_| recipe.cook_minutes.is_none()).map(i64::from);
    let difficulty = estimate.difficulty.filter(|_| recipe.difficulty.is_none());

    if prep_minutes.is_none() && cook_minutes.is_none() && difficulty.is_none() {
        return Ok(false);
    }

    let updated = fill_recipe_gaps(pool, &recipe.guid, prep_minutes, cook_minutes, difficulty).await?;

    Ok(updated > 0)
}
