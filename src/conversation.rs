//! Conversation store
//!
//! Holds the append-only sequence of user and assistant messages for one
//! session. Messages are immutable once created and never persisted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Welcome message seeded into a fresh conversation, per language
const WELCOME_RO: &str = "Bună seara. Sunt JARVIS, asistentul tău personal avansat. \
Pot să recunosc comanda vocală în română și engleză, să caut pe web, să deschid aplicații \
și să îți răspund cu voce naturală. Cu ce te pot ajuta?";
const WELCOME_EN: &str =
    "Good evening. I am JARVIS, your personal assistant. How may I assist you today?";

/// Conversation language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Romanian
    #[default]
    #[serde(rename = "ro-RO")]
    RoRo,
    /// US English
    #[serde(rename = "en-US")]
    EnUs,
}

impl Language {
    /// BCP-47 tag (e.g. `ro-RO`)
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::RoRo => "ro-RO",
            Self::EnUs => "en-US",
        }
    }

    /// Two-letter language code (e.g. `ro`)
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::RoRo => "ro",
            Self::EnUs => "en",
        }
    }

    /// Human-readable name in the language itself
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::RoRo => "Română",
            Self::EnUs => "English",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ro-ro" | "ro" => Ok(Self::RoRo),
            "en-us" | "en" => Ok(Self::EnUs),
            other => Err(Error::Config(format!("unsupported language: {other}"))),
        }
    }
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed or transcribed user input
    User,
    /// JARVIS reply
    Assistant,
}

/// A web search hit attached to an assistant reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result title
    pub title: String,
    /// Result snippet/description
    #[serde(default)]
    pub snippet: String,
    /// Result URL
    pub url: String,
    /// Provider or site the result came from
    #[serde(default)]
    pub source: String,
}

/// A single conversation turn half
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Opaque unique identifier
    pub id: String,
    /// Message text
    pub content: String,
    /// Who wrote it
    pub role: Role,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Language the message is in, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    /// Search results embedded in an assistant reply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Vec<SearchResult>>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            role,
            created_at: Utc::now(),
            language: None,
            search_results: None,
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Return this message tagged with a language
    #[must_use]
    pub const fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Return this message with embedded search results
    #[must_use]
    pub fn with_search_results(mut self, results: Option<Vec<SearchResult>>) -> Self {
        self.search_results = results;
        self
    }

    /// Whether this message was written by the user
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Ordered, append-only message log for one session
#[derive(Debug, Default, Clone)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    /// Create an empty conversation
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Create a conversation seeded with the JARVIS welcome message
    #[must_use]
    pub fn with_welcome(language: Language) -> Self {
        let text = match language {
            Language::RoRo => WELCOME_RO,
            Language::EnUs => WELCOME_EN,
        };
        Self {
            messages: vec![Message::assistant(text).with_language(language)],
        }
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages in insertion order
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Most recent message
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation has no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_parses_tags_and_short_codes() {
        assert_eq!("ro-RO".parse::<Language>().unwrap(), Language::RoRo);
        assert_eq!("EN".parse::<Language>().unwrap(), Language::EnUs);
        assert_eq!(" en-us ".parse::<Language>().unwrap(), Language::EnUs);
        assert!("fr-FR".parse::<Language>().is_err());
    }

    #[test]
    fn language_serializes_as_bcp47_tag() {
        let json = serde_json::to_string(&Language::EnUs).unwrap();
        assert_eq!(json, "\"en-US\"");
        let back: Language = serde_json::from_str("\"ro-RO\"").unwrap();
        assert_eq!(back, Language::RoRo);
    }

    #[test]
    fn store_preserves_insertion_order() {
        let mut store = ConversationStore::new();
        assert!(store.is_empty());

        store.push(Message::user("first"));
        store.push(Message::assistant("second"));
        store.push(Message::user("third"));

        let contents: Vec<_> = store.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
        assert_eq!(store.last().unwrap().content, "third");
    }

    #[test]
    fn welcome_message_follows_language() {
        let store = ConversationStore::with_welcome(Language::EnUs);
        assert_eq!(store.len(), 1);
        let welcome = store.last().unwrap();
        assert_eq!(welcome.role, Role::Assistant);
        assert_eq!(welcome.language, Some(Language::EnUs));
        assert!(welcome.content.contains("JARVIS"));
    }

    #[test]
    fn message_ids_are_unique() {
        let a = Message::user("same");
        let b = Message::user("same");
        assert_ne!(a.id, b.id);
    }
}
