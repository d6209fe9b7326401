//! Hacker News story search (Algolia API).

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use super::{ItemSource, SourceItem, get_json, relevance_score};
use crate::error::AgentError;

const HN_SEARCH_URL: &str = "https://hn.algolia.com/api/v1/search";
const HN_ITEM_URL: &str = "https://news.ycombinator.com/item?id=";
const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "objectID")]
    object_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    points: Option<i64>,
    #[serde(default)]
    num_comments: Option<i64>,
    #[serde(default)]
    created_at_i: Option<i64>,
}

/// Stories matching the topic.
#[derive(Debug, Clone)]
pub struct HackerNewsSource {
    client: reqwest::Client,
    base_url: String,
}

impl HackerNewsSource {
    /// Creates a source using the public Algolia API.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: HN_SEARCH_URL.to_string(),
        }
    }

    /// Overrides the search URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

fn to_item(topic: &str, hit: Hit) -> Option<SourceItem> {
    let title = hit.title.filter(|t| !t.trim().is_empty())?;
    let url = hit
        .url
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| format!("{HN_ITEM_URL}{}", hit.object_id));
    Some(SourceItem {
        source: "hackernews".to_string(),
        score: relevance_score(topic, &title, ""),
        title,
        url,
        summary: None,
        details: serde_json::json!({
            "points": hit.points.unwrap_or(0),
            "comments": hit.num_comments.unwrap_or(0),
            "created_at": hit
                .created_at_i
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|d| d.to_rfc3339()),
        }),
    })
}

#[async_trait]
impl ItemSource for HackerNewsSource {
    fn name(&self) -> &'static str {
        "hackernews"
    }

    fn page_size(&self) -> usize {
        DEFAULT_PAGE_SIZE
    }

    async fn fetch(&self, topic: &str, page: usize) -> Result<Vec<SourceItem>, AgentError> {
        // Algolia pages are 0-based.
        let request = self.client.get(&self.base_url).query(&[
            ("query", topic.to_string()),
            ("tags", "story".to_string()),
            ("hitsPerPage", DEFAULT_PAGE_SIZE.to_string()),
            ("page", page.saturating_sub(1).to_string()),
        ]);

        let response: SearchResponse = get_json(self.name(), request).await?;
        Ok(response
            .hits
            .into_iter()
            .filter_map(|hit| to_item(topic, hit))
            .collect())
    }
}
