//! # ResepiCheNom Drafts
//!
//! AI-assisted recipe drafting: builds prompts, calls an
//! OpenAI-compatible completions endpoint, coerces the loosely shaped
//! answers into recipe columns and keeps drafts for editorial review.
//! Also audits stored recipes for missing time and difficulty values.

pub mod audit;
pub mod coerce;
pub mod config;
pub mod error;
pub mod generate;
pub mod llm_client;
pub mod prompt;
pub mod store;

pub use error::{DraftError, DraftResult};
pub use llm_client::{CompletionProvider, CompletionRequest, LlmClient, RateLimiter};
