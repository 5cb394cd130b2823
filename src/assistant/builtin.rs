//! In-process assistant for web search and app links
//!
//! Used when no remote AI endpoint is configured. Search and open-app
//! commands are answered here; everything else gets the canned reply.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::Local;
use regex::Regex;

use super::search::WebSearchTool;
use super::{Assistant, AssistantResponse};
use crate::Result;
use crate::classifier::{Intent, classify, keywords};
use crate::conversation::{Language, SearchResult};
use crate::dispatch::canned_reply;

/// Apps that can be opened by name: (aliases, display name, URL)
pub const KNOWN_APPS: &[(&[&str], &str, &str)] = &[
    (&["youtube"], "YouTube", "https://www.youtube.com"),
    (&["gmail", "mail"], "Gmail", "https://mail.google.com"),
    (&["maps", "hărți", "harti"], "Google Maps", "https://maps.google.com"),
    (&["google"], "Google", "https://www.google.com"),
    (&["spotify"], "Spotify", "https://open.spotify.com"),
    (&["whatsapp"], "WhatsApp", "https://web.whatsapp.com"),
    (&["github"], "GitHub", "https://github.com"),
];

/// Leading filler after a search keyword ("search for ...", "caută despre ...")
static SEARCH_FILLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:for|about|despre|pe)\s+").expect("valid regex")
});

/// Command starting with a search keyword
static LEADING_SEARCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:search|look up|caută|cauta)\b").expect("valid regex")
});

/// Command starting with an open-app keyword
static LEADING_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:open|launch|pornește|porneste)\b").expect("valid regex")
});

/// Assistant that answers search and open-app commands locally
pub struct BuiltinAssistant {
    search: Option<WebSearchTool>,
    result_limit: usize,
}

impl BuiltinAssistant {
    /// Create an assistant, optionally able to search the web
    #[must_use]
    pub const fn new(search: Option<WebSearchTool>) -> Self {
        Self {
            search,
            result_limit: 5,
        }
    }

    /// Limit the number of search results attached to a reply
    #[must_use]
    pub const fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit;
        self
    }

    async fn web_search(&self, command: &str, language: Language) -> Result<AssistantResponse> {
        let Some(query) = extract_argument(command, Intent::WebSearch) else {
            return Ok(AssistantResponse::text(match language {
                Language::EnUs => "What would you like me to search for?",
                Language::RoRo => "Ce dorești să caut?",
            })
            .with_language(language)
            .spoken());
        };

        let Some(search) = &self.search else {
            return Ok(AssistantResponse::text(match language {
                Language::EnUs => {
                    "No search provider is configured. Add a Brave or Serper API key to enable web search."
                }
                Language::RoRo => {
                    "Niciun furnizor de căutare nu este configurat. Adaugă o cheie API Brave sau Serper."
                }
            })
            .with_language(language));
        };

        let results = search
            .search(&query, language, Some(self.result_limit))
            .await?;

        tracing::info!(query = %query, count = results.len(), "search complete");

        let text = match (language, results.len()) {
            (Language::EnUs, 0) => format!("I found no results for \"{query}\"."),
            (Language::RoRo, 0) => format!("Nu am găsit rezultate pentru \"{query}\"."),
            (Language::EnUs, n) => format!("Found {n} results for \"{query}\"."),
            (Language::RoRo, n) => format!("Am găsit {n} rezultate pentru \"{query}\"."),
        };

        Ok(AssistantResponse::text(text)
            .with_language(language)
            .with_data(results)
            .spoken())
    }
}

impl Default for BuiltinAssistant {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Assistant for BuiltinAssistant {
    fn name(&self) -> &'static str {
        "builtin"
    }

    async fn process_command(&self, command: &str, language: Language) -> Result<AssistantResponse> {
        let intent = leading_intent(command).unwrap_or_else(|| classify(command));
        tracing::debug!(%intent, "builtin assistant");

        match intent {
            Intent::WebSearch => self.web_search(command, language).await,
            Intent::OpenApp => Ok(open_app(command, language)),
            other => Ok(AssistantResponse::text(canned_reply(other, language, Local::now()))
                .with_language(language)
                .spoken()),
        }
    }
}

/// Search or open-app intent from the command's first words
///
/// Checked before the keyword classifier so that "search the history" is a
/// search and not a greeting.
fn leading_intent(command: &str) -> Option<Intent> {
    if LEADING_SEARCH.is_match(command) {
        Some(Intent::WebSearch)
    } else if LEADING_OPEN.is_match(command) {
        Some(Intent::OpenApp)
    } else {
        None
    }
}

/// Text following the earliest keyword for `intent`, without leading filler
fn extract_argument(command: &str, intent: Intent) -> Option<String> {
    let lower = command.to_lowercase();
    let (pos, keyword) = keywords(intent)
        .iter()
        .filter_map(|k| lower.find(k).map(|pos| (pos, *k)))
        .min_by_key(|(pos, _)| *pos)?;

    let rest = lower.get(pos + keyword.len()..)?;
    let rest = SEARCH_FILLER.replace(rest, "");
    let rest = rest.trim().trim_end_matches(['?', '.', '!']).trim();

    (!rest.is_empty()).then(|| rest.to_string())
}

/// Resolve an open-app command to a link
fn open_app(command: &str, language: Language) -> AssistantResponse {
    let target = extract_argument(command, Intent::OpenApp).unwrap_or_default();

    let app = KNOWN_APPS
        .iter()
        .find(|(aliases, _, _)| aliases.iter().any(|a| target.contains(a)));

    match app {
        Some((_, name, url)) => {
            tracing::info!(app = name, "opening app");
            let text = match language {
                Language::EnUs => format!("Opening {name}."),
                Language::RoRo => format!("Deschid {name}."),
            };
            AssistantResponse::text(text)
                .with_language(language)
                .with_data(vec![SearchResult {
                    title: (*name).to_string(),
                    snippet: String::new(),
                    url: (*url).to_string(),
                    source: "app".to_string(),
                }])
                .spoken()
        }
        None => {
            let text = match (language, target.is_empty()) {
                (Language::EnUs, true) => "Which application should I open?".to_string(),
                (Language::RoRo, true) => "Ce aplicație să deschid?".to_string(),
                (Language::EnUs, false) => format!("I don't know how to open \"{target}\"."),
                (Language::RoRo, false) => format!("Nu știu cum să deschid \"{target}\"."),
            };
            AssistantResponse::text(text).with_language(language).spoken()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_search_query() {
        assert_eq!(
            extract_argument("Search for Rust tutorials?", Intent::WebSearch).as_deref(),
            Some("rust tutorials")
        );
        assert_eq!(
            extract_argument("caută despre vremea din Cluj", Intent::WebSearch).as_deref(),
            Some("vremea din cluj")
        );
        assert_eq!(
            extract_argument("please look up tokio", Intent::WebSearch).as_deref(),
            Some("tokio")
        );
        assert_eq!(extract_argument("search", Intent::WebSearch), None);
    }

    #[test]
    fn opens_known_app() {
        let response = open_app("open YouTube", Language::EnUs);
        assert_eq!(response.text, "Opening YouTube.");
        assert!(response.should_speak);

        let data = response.data.unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].url, "https://www.youtube.com");
        assert_eq!(data[0].source, "app");
    }

    #[test]
    fn open_app_in_romanian() {
        let response = open_app("pornește spotify", Language::RoRo);
        assert_eq!(response.text, "Deschid Spotify.");
        assert_eq!(response.language, Some(Language::RoRo));
    }

    #[test]
    fn unknown_app_is_refused() {
        let response = open_app("open the pod bay doors", Language::EnUs);
        assert!(response.text.contains("the pod bay doors"));
        assert!(response.data.is_none());
    }

    #[tokio::test]
    async fn search_without_provider_explains() {
        let assistant = BuiltinAssistant::default();
        let response = assistant
            .process_command("search rust", Language::EnUs)
            .await
            .unwrap();
        assert!(response.text.contains("No search provider"));
        assert!(response.data.is_none());
    }

    #[test]
    fn leading_keyword_decides_intent() {
        assert_eq!(leading_intent("search for machine learning"), Some(Intent::WebSearch));
        assert_eq!(leading_intent("Look up the weather in Cluj"), Some(Intent::WebSearch));
        assert_eq!(leading_intent("caută istoria Romei"), Some(Intent::WebSearch));
        assert_eq!(leading_intent("open this youtube link"), Some(Intent::OpenApp));
        assert_eq!(leading_intent("what time is it"), None);
        assert_eq!(leading_intent("researching"), None);
    }

    #[tokio::test]
    async fn leading_search_beats_other_keywords() {
        let assistant = BuiltinAssistant::default();
        for command in [
            "search for machine learning",
            "search the history of rome",
            "look up the weather in Cluj",
        ] {
            let response = assistant
                .process_command(command, Language::EnUs)
                .await
                .unwrap();
            assert!(
                response.text.contains("No search provider"),
                "{command}: {}",
                response.text
            );
        }
    }

    #[tokio::test]
    async fn leading_open_beats_greeting() {
        let assistant = BuiltinAssistant::default();
        let response = assistant
            .process_command("open this youtube link", Language::EnUs)
            .await
            .unwrap();
        assert_eq!(response.text, "Opening YouTube.");
    }

    #[tokio::test]
    async fn other_intents_use_canned_replies() {
        let assistant = BuiltinAssistant::default();
        let response = assistant
            .process_command("system status", Language::EnUs)
            .await
            .unwrap();
        assert_eq!(
            response.text,
            "All systems operational. Power levels optimal. Ready to assist."
        );
        assert!(response.should_speak);
    }
}
