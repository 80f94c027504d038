//! Generative-content providers.
//!
//! Supports:
//! - **Gemini**: `generateContent` REST API
//! - **OpenAI**: `chat/completions` (and any compatible endpoint)
//!
//! Each provider is a single blocking request per call with its own timeout.
//! Connection failures, rate limiting and non-success statuses surface as
//! distinct [`GenerationError`] variants.

pub mod gemini;
pub mod generator;
pub mod openai;
pub mod prompts;

pub use gemini::GeminiProvider;
pub use generator::ContentGenerator;
pub use openai::OpenAiProvider;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ConfigError, GenerationError};

/// A generative-content provider: system instruction + user prompt in, text out.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Short provider identifier used in logs.
    fn name(&self) -> &str;

    /// Run one completion.
    async fn complete(
        &self,
        system_instruction: &str,
        user_prompt: &str,
    ) -> Result<String, GenerationError>;
}

/// Supported provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
    OpenAi,
}

/// Configuration for creating a provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
    /// Override the API base URL (proxies, tests).
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub max_tokens: u32,
}

/// Create a provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn ContentProvider>, ConfigError> {
    let http = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| ConfigError::InvalidValue {
            key: "llm.http_client".to_string(),
            message: e.to_string(),
        })?;

    let api_key = config.api_key.clone();
    let provider: Arc<dyn ContentProvider> = match config.backend {
        LlmBackend::Gemini => {
            let mut provider = GeminiProvider::new(http, api_key, &config.model)
                .with_max_tokens(config.max_tokens);
            if let Some(ref base) = config.base_url {
                provider = provider.with_base_url(base);
            }
            Arc::new(provider)
        }
        LlmBackend::OpenAi => {
            let mut provider = OpenAiProvider::new(http, api_key, &config.model)
                .with_max_tokens(config.max_tokens);
            if let Some(ref base) = config.base_url {
                provider = provider.with_base_url(base);
            }
            Arc::new(provider)
        }
    };
    tracing::info!(provider = provider.name(), model = %config.model, "Content provider ready");
    Ok(provider)
}

/// Map a transport-level failure.
pub(crate) fn connection_error(provider: &str, e: reqwest::Error) -> GenerationError {
    let reason = if e.is_timeout() {
        format!("request timed out: {e}")
    } else {
        e.to_string()
    };
    GenerationError::Connection {
        provider: provider.to_string(),
        reason,
    }
}

/// Turn a non-success response into the matching error; pass success through.
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, GenerationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(GenerationError::RateLimited {
            provider: provider.to_string(),
            retry_after,
        });
    }

    let body = response.text().await.unwrap_or_default();
    Err(GenerationError::Status {
        provider: provider.to_string(),
        status: status.as_u16(),
        body: truncate(&body, 500),
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}
