//! AI/search collaborator boundary
//!
//! The online dispatcher forwards the raw command to an [`Assistant`], which
//! performs its own classification and may attach search results.

mod builtin;
mod http;
mod search;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use builtin::{BuiltinAssistant, KNOWN_APPS};
pub use http::HttpAssistant;
pub use search::{SearchProvider, WebSearchTool};

use crate::Result;
use crate::conversation::{Language, SearchResult};

/// Request sent to an AI/search collaborator
#[derive(Debug, Clone, Serialize)]
pub struct AssistantRequest<'a> {
    /// Raw user command
    pub command: &'a str,
    /// Session language
    pub language: Language,
}

/// Reply from an AI/search collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    /// Reply text
    pub text: String,
    /// Reply language, if the collaborator chose one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    /// Search results backing the reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<SearchResult>>,
    /// Whether the reply should be spoken aloud
    #[serde(default)]
    pub should_speak: bool,
}

impl AssistantResponse {
    /// Plain text reply
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Return this reply tagged with a language
    #[must_use]
    pub const fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Return this reply with attached search results
    #[must_use]
    pub fn with_data(mut self, data: Vec<SearchResult>) -> Self {
        self.data = Some(data);
        self
    }

    /// Return this reply flagged for speech
    #[must_use]
    pub const fn spoken(mut self) -> Self {
        self.should_speak = true;
        self
    }
}

/// External AI/search backend
///
/// Transport and authentication belong to the implementation.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Process a raw command
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable or its reply is malformed
    async fn process_command(&self, command: &str, language: Language) -> Result<AssistantResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_decodes_minimal_payload() {
        let response: AssistantResponse = serde_json::from_str(r#"{"text":"ok"}"#).unwrap();
        assert_eq!(response.text, "ok");
        assert_eq!(response.language, None);
        assert_eq!(response.data, None);
        assert!(!response.should_speak);
    }

    #[test]
    fn response_decodes_full_payload() {
        let json = r#"{
            "text": "2 results found",
            "language": "en-US",
            "shouldSpeak": true,
            "data": [
                {"title": "A", "snippet": "a", "url": "https://a.example", "source": "a.example"},
                {"title": "B", "snippet": "b", "url": "https://b.example"}
            ]
        }"#;
        let response: AssistantResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.language, Some(Language::EnUs));
        assert!(response.should_speak);

        let data = response.data.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].title, "A");
        assert_eq!(data[1].source, "");
    }

    #[test]
    fn request_serializes_language_tag() {
        let request = AssistantRequest {
            command: "hello",
            language: Language::RoRo,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["command"], "hello");
        assert_eq!(json["language"], "ro-RO");
    }
}
