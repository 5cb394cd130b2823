//! Session event stream
//!
//! Everything a front-end needs to re-render is published here: appended
//! messages, state snapshots, live transcripts and user notifications.

use serde::Serialize;

use crate::Error;
use crate::conversation::{Language, Message};

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// Informational
    Info,
    /// Something failed but the session continues
    Error,
}

/// User-visible notification (toast)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Severity
    pub level: NotificationLevel,
    /// Short title
    pub title: String,
    /// Longer description
    pub description: String,
}

impl Notification {
    /// Informational notification
    #[must_use]
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            title: title.into(),
            description: description.into(),
        }
    }

    /// Error notification
    #[must_use]
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }
}

impl From<&Error> for Notification {
    fn from(error: &Error) -> Self {
        Self::error(error.title(), error.to_string())
    }
}

/// Observable session state at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Online strategy selected
    pub online: bool,
    /// Recognition session active
    pub listening: bool,
    /// Speech playback running
    pub speaking: bool,
    /// A command is being processed
    pub busy: bool,
    /// Conversation language
    pub language: Language,
    /// Cloud voice key configured
    pub has_voice_key: bool,
}

/// Event published by the session controller
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A message was appended to the conversation
    MessageAppended(Message),
    /// State changed
    StateChanged(SessionSnapshot),
    /// Live transcript from voice input
    Transcript {
        /// Recognized text
        text: String,
        /// Whether recognition has finished
        is_final: bool,
    },
    /// User-visible notification
    Notification(Notification),
}
