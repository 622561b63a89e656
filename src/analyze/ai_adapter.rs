//! AI adapter: provider abstraction for the summarization model.
//! One request per call, no cache, no retry.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::AiConfig;
use crate::error::DigestError;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Boxed future returned by providers.
pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<String, DigestError>> + Send + 'a>>;

/// Low-level provider: does a *real* remote call (or pretends to, in tests).
pub trait LlmProvider: Send + Sync {
    /// Send one system + user message pair and return the raw completion text.
    fn complete<'a>(&'a self, system: &'a str, prompt: &'a str) -> CompletionFuture<'a>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynLlm = Arc<dyn LlmProvider>;

/// Factory: build a provider according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock provider.
/// * Else if `config.enabled==false`, returns a disabled provider.
/// * Else builds the OpenAI provider.
pub fn build_provider_from_config(
    config: &AiConfig,
    api_key: Option<String>,
    http: reqwest::Client,
) -> DynLlm {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockProvider::new(MOCK_SUMMARY));
    }

    if !config.enabled {
        return Arc::new(DisabledProvider);
    }

    Arc::new(OpenAiProvider::new(http, config, api_key))
}

// ------------------------------------------------------------
// OpenAI
// ------------------------------------------------------------

/// OpenAI-compatible Chat Completions provider. Requires `OPENAI_API_KEY`.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiProvider {
    pub fn new(http: reqwest::Client, config: &AiConfig, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            endpoint: format!(
                "{}/v1/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}
#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}
#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    choices: Vec<Choice>,
}
#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}
#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}
#[derive(Deserialize)]
struct ErrEnvelope {
    error: ErrBody,
}
#[derive(Deserialize)]
struct ErrBody {
    message: String,
}

/// Pull `error.message` out of an OpenAI error body; fall back to the raw text.
pub fn provider_error_detail(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrEnvelope>(body) {
        Ok(env) => format!("{status}: {}", env.error.message),
        Err(_) if body.trim().is_empty() => format!("{status}"),
        Err(_) => format!("{status}: {}", body.chars().take(300).collect::<String>()),
    }
}

/// First choice content, trimmed; empty output is a provider error.
pub fn parse_completion(body: &str) -> Result<String, DigestError> {
    let resp: Resp = serde_json::from_str(body)
        .map_err(|e| DigestError::Analysis(format!("malformed completion: {e}")))?;
    let content = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .unwrap_or_default();
    if content.is_empty() {
        return Err(DigestError::Analysis("model returned no content".into()));
    }
    Ok(content)
}

impl LlmProvider for OpenAiProvider {
    fn complete<'a>(&'a self, system: &'a str, prompt: &'a str) -> CompletionFuture<'a> {
        Box::pin(async move {
            let Some(key) = self.api_key.as_deref() else {
                return Err(DigestError::Analysis("missing OPENAI_API_KEY".into()));
            };

            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: system,
                    },
                    Msg {
                        role: "user",
                        content: prompt,
                    },
                ],
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };

            let resp = self
                .http
                .post(&self.endpoint)
                .bearer_auth(key)
                .json(&req)
                .send()
                .await
                .map_err(|e| DigestError::Analysis(e.without_url().to_string()))?;

            let status = resp.status();
            let body = resp
                .text()
                .await
                .map_err(|e| DigestError::Analysis(e.without_url().to_string()))?;

            if !status.is_success() {
                return Err(DigestError::Analysis(provider_error_detail(
                    status.as_u16(),
                    &body,
                )));
            }
            parse_completion(&body)
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Disabled + mock
// ------------------------------------------------------------

/// Always fails; used when AI is disabled in config.
pub struct DisabledProvider;

impl LlmProvider for DisabledProvider {
    fn complete<'a>(&'a self, _system: &'a str, _prompt: &'a str) -> CompletionFuture<'a> {
        Box::pin(async { Err(DigestError::Analysis("AI is disabled in config".into())) })
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

const MOCK_SUMMARY: &str = "## Top 5 Market Trends\n- Mock trend\n\n## Actionable Investment Recommendations\n- Mock recommendation\n\n## Key Risk Factors\n- Mock risk";

/// Deterministic provider for tests/local runs. Counts calls.
pub struct MockProvider {
    fixed: Result<String, String>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: Ok(fixed.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A mock whose every call fails with the given provider detail.
    pub fn failing(detail: impl Into<String>) -> Self {
        Self {
            fixed: Err(detail.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LlmProvider for MockProvider {
    fn complete<'a>(&'a self, _system: &'a str, _prompt: &'a str) -> CompletionFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let out = self.fixed.clone().map_err(DigestError::Analysis);
        Box::pin(async move { out })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}
