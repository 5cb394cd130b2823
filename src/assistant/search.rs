//! Web search tool
//!
//! Provides web search via configurable providers (Brave, Serper)

use serde::{Deserialize, Serialize};

use crate::conversation::{Language, SearchResult};
use crate::{Error, Result};

/// Default number of results requested per search
const DEFAULT_LIMIT: usize = 5;

/// Search provider configuration
#[derive(Debug, Clone)]
pub enum SearchProvider {
    /// Brave Search API
    Brave {
        /// API key for Brave Search
        api_key: String,
    },
    /// Serper (Google) Search API
    Serper {
        /// API key for Serper
        api_key: String,
    },
}

impl SearchProvider {
    /// Provider name, used as the result source when a URL has no host
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Brave { .. } => "brave",
            Self::Serper { .. } => "google",
        }
    }
}

/// Web search tool
pub struct WebSearchTool {
    provider: SearchProvider,
    client: reqwest::Client,
}

/// Brave Search API response
#[derive(Debug, Deserialize)]
struct BraveSearchResponse {
    web: Option<BraveWebResults>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResults {
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
}

/// Serper API response
#[derive(Debug, Deserialize)]
struct SerperSearchResponse {
    organic: Option<Vec<SerperResult>>,
}

#[derive(Debug, Deserialize)]
struct SerperResult {
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Serper API request body
#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: usize,
    hl: &'a str,
}

impl WebSearchTool {
    /// Create a new web search tool with Brave Search
    #[must_use]
    pub fn new_brave(api_key: String) -> Self {
        Self::new(SearchProvider::Brave { api_key })
    }

    /// Create a new web search tool with Serper
    #[must_use]
    pub fn new_serper(api_key: String) -> Self {
        Self::new(SearchProvider::Serper { api_key })
    }

    /// Create a web search tool for a provider
    #[must_use]
    pub fn new(provider: SearchProvider) -> Self {
        Self {
            provider,
            client: reqwest::Client::new(),
        }
    }

    /// Active provider
    #[must_use]
    pub const fn provider(&self) -> &SearchProvider {
        &self.provider
    }

    /// Perform a web search
    ///
    /// # Errors
    ///
    /// Returns error if the search request fails or response parsing fails
    pub async fn search(
        &self,
        query: &str,
        language: Language,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        tracing::debug!(query, provider = self.provider.name(), limit, "web search");

        let results = match &self.provider {
            SearchProvider::Brave { api_key } => {
                self.search_brave(api_key, query, language, limit).await
            }
            SearchProvider::Serper { api_key } => {
                self.search_serper(api_key, query, language, limit).await
            }
        }
        .map_err(|e| Error::Search(e.to_string()))?;

        tracing::debug!(count = results.len(), "web search complete");
        Ok(results)
    }

    /// Search using Brave Search API
    async fn search_brave(
        &self,
        api_key: &str,
        query: &str,
        language: Language,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let count = limit.to_string();
        let response = self
            .client
            .get("https://api.search.brave.com/res/v1/web/search")
            .header("X-Subscription-Token", api_key)
            .query(&[
                ("q", query),
                ("count", count.as_str()),
                ("search_lang", language.code()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let brave_response: BraveSearchResponse = response.json().await?;
        let fallback = self.provider.name();

        let results = brave_response
            .web
            .map(|web| {
                web.results
                    .into_iter()
                    .map(|r| SearchResult {
                        source: source_from_url(&r.url).unwrap_or(fallback).to_string(),
                        title: r.title,
                        url: r.url,
                        snippet: r.description,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(results)
    }

    /// Search using Serper API
    async fn search_serper(
        &self,
        api_key: &str,
        query: &str,
        language: Language,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let request_body = SerperRequest {
            q: query,
            num: limit,
            hl: language.code(),
        };

        let response = self
            .client
            .post("https://google.serper.dev/search")
            .header("X-API-KEY", api_key)
            .json(&request_body)
            .send()
            .await?
            .error_for_status()?;

        let serper_response: SerperSearchResponse = response.json().await?;
        let fallback = self.provider.name();

        let results = serper_response
            .organic
            .map(|organic| {
                organic
                    .into_iter()
                    .map(|r| SearchResult {
                        source: source_from_url(&r.link).unwrap_or(fallback).to_string(),
                        title: r.title,
                        url: r.link,
                        snippet: r.snippet,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(results)
    }
}

/// Host part of a URL without the `www.` prefix
fn source_from_url(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = rest.split(['/', '?', '#']).next()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    (!host.is_empty()).then_some(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_brave() {
        let tool = WebSearchTool::new_brave("test-key".to_string());
        assert!(matches!(tool.provider(), SearchProvider::Brave { .. }));
        assert_eq!(tool.provider().name(), "brave");
    }

    #[test]
    fn test_new_serper() {
        let tool = WebSearchTool::new_serper("test-key".to_string());
        assert!(matches!(tool.provider(), SearchProvider::Serper { .. }));
        assert_eq!(tool.provider().name(), "google");
    }

    #[test]
    fn test_source_from_url() {
        assert_eq!(
            source_from_url("https://www.rust-lang.org/learn"),
            Some("rust-lang.org")
        );
        assert_eq!(source_from_url("http://docs.rs?q=1"), Some("docs.rs"));
        assert_eq!(source_from_url("example.com/path"), Some("example.com"));
        assert_eq!(source_from_url("https:///nohost"), None);
    }

    #[test]
    fn test_brave_response_parsing() {
        let json = r#"{"web":{"results":[{"title":"Rust","url":"https://www.rust-lang.org","description":"A language"}]}}"#;
        let parsed: BraveSearchResponse = serde_json::from_str(json).unwrap();
        let results = parsed.web.unwrap().results;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].description, "A language");
    }

    #[test]
    fn test_serper_response_without_organic() {
        let parsed: SerperSearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.organic.is_none());
    }
}
