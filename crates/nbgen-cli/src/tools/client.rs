//! HTTP client for the Neurosift archive tool service

use std::time::Duration;

use thiserror::Error;

/// Base URL of the archive tool service; each tool is `POST {base}/{name}`
pub const DEFAULT_TOOLS_URL: &str = "https://neurosift-chat-agent-tools.vercel.app/api";

/// Errors raised by archive tool calls
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The service answered with a status other than 200
    #[error("{context}: {body}")]
    Status {
        context: &'static str,
        #[allow(dead_code)]
        status: u16,
        body: String,
    },

    /// The request never produced a response
    #[error("{context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The service returned a body that is not JSON
    #[error("{context}: invalid JSON response: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Thin JSON-over-POST client shared by all archive tools
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    client: reqwest::Client,
    base_url: String,
}

impl ArchiveClient {
    pub fn new(timeout: Option<Duration>) -> reqwest::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, DEFAULT_TOOLS_URL))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// POST `payload` to `{base}/{endpoint}` and decode the JSON reply.
    ///
    /// `context` prefixes any error message.
    pub async fn post(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
        context: &'static str,
    ) -> Result<serde_json::Value, ArchiveError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!(%url, "Calling archive tool");

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|source| ArchiveError::Http { context, source })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ArchiveError::Http { context, source })?;

        if status != reqwest::StatusCode::OK {
            tracing::warn!(%url, status = status.as_u16(), "Archive tool call failed");
            return Err(ArchiveError::Status {
                context,
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| ArchiveError::Decode { context, source })
    }
}
