//! OpenRouter Chat Completions provider (non-streaming)

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    types::{Completion, Message, ToolCall, ToolDescriptor, Usage},
};

/// Default OpenRouter API base URL
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Referer sent with every request (OpenRouter uses it for app attribution)
pub const DEFAULT_REFERER: &str = "https://neurosift.app";

/// Settings for constructing an [`OpenRouterProvider`]
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Bearer credential. Required.
    pub api_key: Option<String>,
    /// Base URL; `/chat/completions` is appended
    pub base_url: String,
    /// Value of the `HTTP-Referer` header, if any
    pub referer: Option<String>,
    /// Per-request timeout enforced by the HTTP client
    pub timeout: Option<Duration>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            referer: Some(DEFAULT_REFERER.to_string()),
            timeout: None,
        }
    }
}

impl ProviderConfig {
    /// Default settings with the given credential
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }
}

/// OpenRouter API client
pub struct OpenRouterProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    referer: Option<String>,
}

impl std::fmt::Debug for OpenRouterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterProvider")
            .field("base_url", &self.base_url)
            .field("referer", &self.referer)
            .finish_non_exhaustive()
    }
}

impl OpenRouterProvider {
    /// Create a provider. Fails with `AuthenticationMissing` when no
    /// credential is configured.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Self::with_client(client, config)
    }

    /// Create a provider around an existing HTTP client
    pub fn with_client(client: reqwest::Client, config: ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(Error::AuthenticationMissing)?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::InvalidConfig("base_url must not be empty".into()));
        }

        Ok(Self {
            client,
            api_key,
            base_url,
            referer: config.referer,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run one request/response cycle.
    ///
    /// A non-success status fails with `TransportFailure` carrying the raw
    /// body. No retries are attempted.
    pub async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<Completion> {
        let request = build_request(model, messages, tools);
        let url = format!("{}/chat/completions", self.base_url);

        tracing::debug!(
            model,
            messages = messages.len(),
            tools = tools.len(),
            "Submitting completion request"
        );

        let mut request_builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request);
        if let Some(ref referer) = self.referer {
            request_builder = request_builder.header("HTTP-Referer", referer);
        }

        let response = request_builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Completion request failed");
            return Err(Error::transport(status.as_u16(), body));
        }

        parse_completion(&body)
    }
}

fn build_request<'a>(
    model: &'a str,
    messages: &'a [Message],
    tools: &'a [ToolDescriptor],
) -> CompletionRequest<'a> {
    CompletionRequest {
        model,
        messages,
        tools,
        tool_choice: if tools.is_empty() { None } else { Some("auto") },
    }
}

/// Parse a successful response body into a [`Completion`].
///
/// Only the first choice is read. Missing `tool_calls` and `null`
/// content are tolerated; missing usage counts as zero.
pub fn parse_completion(body: &str) -> Result<Completion> {
    let response: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| Error::UnexpectedResponse(format!("{}: {}", e, body)))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::UnexpectedResponse(body.to_string()))?;

    let usage = match response.usage {
        Some(usage) => usage,
        None => {
            tracing::warn!("Completion response carried no usage counters");
            Usage::default()
        }
    };

    Ok(Completion {
        content: choice.message.content,
        tool_calls: choice.message.tool_calls.unwrap_or_default(),
        usage,
    })
}

// Request/Response types

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "is_empty_slice")]
    tools: &'a [ToolDescriptor],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

fn is_empty_slice<T>(slice: &&[T]) -> bool {
    slice.is_empty()
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}
