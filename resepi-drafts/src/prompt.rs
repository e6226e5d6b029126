//! Prompt construction for draft generation and recipe audits

use resepi_common::db::Recipe;

use crate::llm_client::CompletionRequest;

const DRAFT_SYSTEM_PROMPT: &str = "You are a recipe writer for ResepiCheNom, a Malaysian home-cooking site. \
Reply with a single JSON object and nothing else.";

const AUDIT_SYSTEM_PROMPT: &str = "You estimate cooking metadata for existing recipes. \
Reply with a single JSON object and nothing else.";

const DRAFT_TEMPERATURE: f32 = 0.7;
const AUDIT_TEMPERATURE: f32 = 0.2;

/// Longest idea text passed through to the model
pub const MAX_IDEA_CHARS: usize = 500;

/// Prompt asking for one complete recipe as JSON
///
/// `category_names` lets the model pick an existing category; an empty
/// slice omits the hint.
pub fn build_draft_prompt(idea: &str, category_names: &[String]) -> CompletionRequest {
    let idea: String = idea.trim().chars().take(MAX_IDEA_CHARS).collect();

    let mut user = format!(
        "Write a recipe for: {}\n\n\
Return JSON with exactly these keys:\n\
- \"title\": string\n\
- \"summary\": one or two sentences\n\
- \"ingredients\": array of strings, one ingredient with quantity per item\n\
- \"instructions\": array of strings, one step per item\n\
- \"prep_time\": preparation time, e.g. \"15 minutes\"\n\
- \"cook_time\": cooking time, e.g. \"1 hour\"\n\
- \"servings\": number of servings\n\
- \"difficulty\": one of \"easy\", \"medium\", \"hard\"\n\
- \"tags\": array of short lowercase tags\n",
        idea
    );

    if !category_names.is_empty() {
        user.push_str(&format!(
            "- \"category\": one of: {}\n",
            category_names.join(", ")
        ));
    }

    CompletionRequest {
        system: DRAFT_SYSTEM_PROMPT.to_string(),
        user,
        temperature: DRAFT_TEMPERATURE,
    }
}

/// Prompt asking for missing time and difficulty of a stored recipe
pub fn build_audit_prompt(recipe: &Recipe) -> CompletionRequest {
    let user = format!(
        "Recipe: {}\n\nIngredients:\n{}\n\nInstructions:\n{}\n\n\
Return JSON with keys \"prep_time\" and \"cook_time\" (durations such as \"20 minutes\") \
and \"difficulty\" (one of \"easy\", \"medium\", \"hard\").",
        recipe.title,
        recipe.ingredient_lines().join("\n"),
        recipe.instruction_lines().join("\n"),
    );

    CompletionRequest {
        system: AUDIT_SYSTEM_PROMPT.to_string(),
        user,
        temperature: AUDIT_TEMPERATURE,
    }
}
