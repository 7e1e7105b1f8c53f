//! Transport abstraction over the completion endpoint

use async_trait::async_trait;
use nbgen_ai::{
    Completion, Message, Result, ToolDescriptor,
    providers::openrouter::{OpenRouterProvider, ProviderConfig},
};

/// One request/response cycle against a chat-completions endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the full conversation plus tool descriptors; return the first choice.
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<Completion>;
}

/// Transport backed by the OpenRouter provider
#[derive(Debug)]
pub struct ProviderTransport {
    provider: OpenRouterProvider,
}

impl ProviderTransport {
    pub fn new(provider: OpenRouterProvider) -> Self {
        Self { provider }
    }

    /// Build a provider from config; fails when no credential is available.
    pub fn from_config(config: ProviderConfig) -> Result<Self> {
        Ok(Self::new(OpenRouterProvider::new(config)?))
    }
}

#[async_trait]
impl Transport for ProviderTransport {
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<Completion> {
        let completion = self.provider.complete(model, messages, tools).await?;
        tracing::debug!(
            model,
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            tool_calls = completion.tool_calls.len(),
            "Completion received"
        );
        Ok(completion)
    }
}
