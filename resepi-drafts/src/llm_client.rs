//! Chat-completions client with rate limiting
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint and asks
//! for a JSON object response.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::LlmConfig;
use crate::error::{DraftError, DraftResult};

const USER_AGENT: &str = concat!("ResepiCheNom/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// A system + user prompt pair
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Anything that can turn a prompt into raw model text
///
/// Implemented by [`LlmClient`]; tests and the web server can substitute
/// their own provider.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logs and stored drafts
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> DraftResult<String>;
}

/// Rate limiter enforcing a minimum interval between requests
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// HTTP client for the completions endpoint
pub struct LlmClient {
    http_client: reqwest::Client,
    config: LlmConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> DraftResult<Self> {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_ms));
        Self::with_rate_limiter(config, rate_limiter)
    }

    /// Build a client that shares a limiter with other clients
    pub fn with_rate_limiter(config: LlmConfig, rate_limiter: Arc<RateLimiter>) -> DraftResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| DraftError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
            rate_limiter,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &CompletionRequest) -> DraftResult<String> {
        self.rate_limiter.wait().await;

        let url = format!("{}/chat/completions", self.config.base_url);
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            response_format: ResponseFormat { kind: "json_object" },
        };

        tracing::debug!(model = %self.config.model, url = %url, "Requesting completion");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DraftError::Network(e.to_string()))?;

        let status = response.status();

        if status.as_u16() == 429 {
            return Err(DraftError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DraftError::Api(status.as_u16(), error_text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DraftError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| DraftError::InvalidResponse("Empty completion".to_string()))
    }
}
