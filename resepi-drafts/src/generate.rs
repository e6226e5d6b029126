//! Draft generation: prompt, complete, coerce, store

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::coerce::coerce_draft;
use crate::error::{DraftError, DraftResult};
use crate::llm_client::CompletionProvider;
use crate::prompt::build_draft_prompt;
use crate::store::save_draft;
use resepi_common::db::RecipeDraftRow;

/// Most drafts produced by one request
pub const MAX_DRAFTS_PER_REQUEST: u32 = 5;

/// Generate up to `count` drafts for one idea
///
/// Responses that cannot be coerced are logged and skipped; the call
/// fails only when no draft at all could be stored.
pub async fn generate_drafts(
    pool: &SqlitePool,
    provider: &dyn CompletionProvider,
    idea: &str,
    count: u32,
    created_by: Option<&str>,
) -> DraftResult<Vec<RecipeDraftRow>> {
    let idea = idea.trim();
    if idea.chars().count() < 3 {
        return Err(DraftError::InvalidInput("Idea must be at least 3 characters".to_string()));
    }

    let count = count.clamp(1, MAX_DRAFTS_PER_REQUEST);
    let category_names: Vec<String> =
        sqlx::query_scalar("SELECT name FROM categories ORDER BY sort_order, name")
            .fetch_all(pool)
            .await?;

    let request = build_draft_prompt(idea, &category_names);

    info!(provider = provider.name(), idea = %idea, count, "Generating recipe drafts");

    let mut drafts = Vec::new();
    let mut last_error = None;

    for attempt in 1..=count {
        let raw = match provider.complete(&request).await {
            Ok(raw) => raw,
            // Transport failures will not improve on retry within this call
            Err(e @ (DraftError::MissingApiKey | DraftError::Network(_) | DraftError::Api(..))) => {
                return Err(e)
            }
            Err(e) => {
                warn!(attempt, error = %e, "Completion failed");
                last_error = Some(e);
                continue;
            }
        };

        match coerce_draft(&raw) {
            Ok(draft) => {
                let row = save_draft(pool, idea, &raw, &draft, created_by).await?;
                info!(draft_id = %row.guid, title = %row.title, "Stored recipe draft");
                drafts.push(row);
            }
            Err(e) => {
                warn!(attempt, error = %e, "Discarding unusable model response");
                last_error = Some(e);
            }
        }
    }

    if drafts.is_empty() {
        return Err(last_error
            .unwrap_or_else(|| DraftError::InvalidResponse("No drafts generated".to_string())));
    }

    Ok(drafts)
}
