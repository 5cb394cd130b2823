//! Remote AI/search backend over HTTP

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::{Assistant, AssistantRequest, AssistantResponse};
use crate::conversation::Language;
use crate::{Error, Result};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Assistant reached via `POST <endpoint>` with a JSON `{command, language}` body
pub struct HttpAssistant {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl HttpAssistant {
    /// Create a client for `endpoint`
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is empty or the HTTP client cannot be built
    pub fn new(endpoint: impl Into<String>, api_key: Option<SecretString>) -> Result<Self> {
        Self::with_timeout(endpoint, api_key, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is empty or the HTTP client cannot be built
    pub fn with_timeout(
        endpoint: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(Error::Config("assistant endpoint required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    /// Configured endpoint
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Assistant for HttpAssistant {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn process_command(&self, command: &str, language: Language) -> Result<AssistantResponse> {
        let request = AssistantRequest { command, language };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(error = %e, endpoint = %self.endpoint, "assistant request failed");
            Error::Dispatch(format!("assistant unreachable: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "assistant API error");
            return Err(Error::Dispatch(format!("assistant error {status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Dispatch(format!("failed to read assistant reply: {e}")))?;

        let reply: AssistantResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "malformed assistant reply");
            Error::Dispatch(format!("malformed assistant reply: {e}"))
        })?;

        tracing::debug!(
            text_len = reply.text.len(),
            results = reply.data.as_ref().map_or(0, Vec::len),
            should_speak = reply.should_speak,
            "assistant replied"
        );

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_endpoint_is_rejected() {
        assert!(matches!(
            HttpAssistant::new("  ", None),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn endpoint_is_kept() {
        let assistant = HttpAssistant::new("http://localhost:8080/command", None).unwrap();
        assert_eq!(assistant.endpoint(), "http://localhost:8080/command");
        assert_eq!(assistant.name(), "http");
    }

    #[tokio::test]
    async fn unreachable_backend_is_dispatch_failure() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let assistant = HttpAssistant::with_timeout(
            "http://127.0.0.1:9/command",
            None,
            Duration::from_millis(500),
        )
        .unwrap();

        let result = assistant.process_command("hello", Language::EnUs).await;
        assert!(matches!(result, Err(Error::Dispatch(_))));
    }
}
