//! Command classification
//!
//! Maps raw input to an [`Intent`] by case-insensitive substring matching
//! against fixed keyword sets. The first matching set in [`RULES`] wins.

use std::fmt;

/// Classified category of a user command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Salutation
    Greeting,
    /// Weather conditions
    Weather,
    /// Current time of day
    Time,
    /// System status report
    Status,
    /// Web search request
    WebSearch,
    /// Request to open an application
    OpenApp,
    /// Nothing matched
    Fallback,
}

impl Intent {
    /// Stable identifier for logging
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Weather => "weather",
            Self::Time => "time",
            Self::Status => "status",
            Self::WebSearch => "web-search",
            Self::OpenApp => "open-app",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword sets in precedence order
pub const RULES: &[(Intent, &[&str])] = &[
    (Intent::Greeting, &["hello", "hi"]),
    (Intent::Weather, &["weather"]),
    (Intent::Time, &["time"]),
    (Intent::Status, &["status", "systems"]),
    (Intent::WebSearch, &["search", "look up", "caută", "cauta"]),
    (Intent::OpenApp, &["open", "launch", "pornește", "porneste"]),
];

/// Classify a raw command
#[must_use]
pub fn classify(input: &str) -> Intent {
    let lower = input.to_lowercase();

    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map_or(Intent::Fallback, |(intent, _)| *intent)
}

/// Keywords for an intent, empty for [`Intent::Fallback`]
#[must_use]
pub fn keywords(intent: Intent) -> &'static [&'static str] {
    RULES
        .iter()
        .find(|(i, _)| *i == intent)
        .map(|&(_, keywords)| keywords)
        .unwrap_or_default()
}
