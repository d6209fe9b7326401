//! GitHub repository search.

use async_trait::async_trait;
use serde::Deserialize;

use super::{ItemSource, SourceItem, get_json, relevance_score};
use crate::error::AgentError;

const GITHUB_SEARCH_URL: &str = "https://api.github.com/search/repositories";
const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Repository>,
}

#[derive(Debug, Deserialize)]
struct Repository {
    full_name: String,
    #[serde(default)]
    description: Option<String>,
    html_url: String,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

/// Repositories matching the topic, via the GitHub search API.
///
/// Unauthenticated requests work but are heavily rate limited. The token
/// defaults to `GITHUB_TOKEN` and can be set with [`GithubSource::with_token`].
#[derive(Debug, Clone)]
pub struct GithubSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GithubSource {
    /// Creates a source using the public API.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: GITHUB_SEARCH_URL.to_string(),
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }

    /// Sets the API token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Overrides the search URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

fn to_item(topic: &str, repo: Repository) -> SourceItem {
    let description = repo.description.unwrap_or_default();
    SourceItem {
        source: "github".to_string(),
        score: relevance_score(topic, &repo.full_name, &description),
        title: repo.full_name,
        url: repo.html_url,
        summary: (!description.is_empty()).then_some(description),
        details: serde_json::json!({
            "stars": repo.stargazers_count,
            "forks": repo.forks_count,
            "language": repo.language,
            "updated_at": repo.updated_at,
        }),
    }
}

#[async_trait]
impl ItemSource for GithubSource {
    fn name(&self) -> &'static str {
        "github"
    }

    fn page_size(&self) -> usize {
        DEFAULT_PAGE_SIZE
    }

    async fn fetch(&self, topic: &str, page: usize) -> Result<Vec<SourceItem>, AgentError> {
        let mut request = self
            .client
            .get(&self.base_url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .query(&[
                ("q", topic.to_string()),
                ("per_page", DEFAULT_PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ]);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response: SearchResponse = get_json(self.name(), request).await?;
        Ok(response
            .items
            .into_iter()
            .map(|repo| to_item(topic, repo))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_response() {
        let json = r#"{
            "total_count": 2,
            "items": [
                {"full_name": "qdrant/qdrant", "description": "Vector database", "html_url": "https://github.com/qdrant/qdrant",
                 "stargazers_count": 20000, "forks_count": 1400, "language": "Rust", "updated_at": "2024-01-01T00:00:00Z"},
                {"full_name": "x/y", "description": null, "html_url": "https://github.com/x/y"}
            ]
        }"#;
        let response: SearchResponse =
            serde_json::from_str(json).unwrap_or_else(|_| unreachable!());
        let items: Vec<SourceItem> = response
            .items
            .into_iter()
            .map(|r| to_item("vector database", r))
            .collect();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "qdrant/qdrant");
        assert_eq!(items[0].details["stars"], 20000);
        assert_eq!(items[0].details["language"], "Rust");
        assert!(items[0].score > 0.9);
        assert_eq!(items[1].summary, None);
    }
}
