//! Stack Overflow question search (Stack Exchange API).

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use super::{ItemSource, SourceItem, get_json, relevance_score};
use crate::error::AgentError;

const STACKEXCHANGE_SEARCH_URL: &str = "https://api.stackexchange.com/2.3/search/advanced";
const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct Question {
    title: String,
    link: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    view_count: u64,
    #[serde(default)]
    answer_count: u64,
    #[serde(default)]
    is_answered: bool,
    #[serde(default)]
    creation_date: Option<i64>,
}

/// Questions matching the topic, most relevant first.
#[derive(Debug, Clone)]
pub struct StackOverflowSource {
    client: reqwest::Client,
    base_url: String,
}

impl StackOverflowSource {
    /// Creates a source using the public API.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: STACKEXCHANGE_SEARCH_URL.to_string(),
        }
    }

    /// Overrides the search URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Titles come back HTML-escaped.
fn unescape_title(title: &str) -> String {
    title
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn to_item(topic: &str, question: Question) -> SourceItem {
    let title = unescape_title(&question.title);
    let tags = question.tags.join(" ");
    SourceItem {
        source: "stackoverflow".to_string(),
        score: relevance_score(topic, &title, &tags),
        title,
        url: question.link,
        summary: None,
        details: serde_json::json!({
            "tags": question.tags,
            "votes": question.score,
            "views": question.view_count,
            "answers": question.answer_count,
            "is_answered": question.is_answered,
            "created_at": question
                .creation_date
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|d| d.to_rfc3339()),
        }),
    }
}

#[async_trait]
impl ItemSource for StackOverflowSource {
    fn name(&self) -> &'static str {
        "stackoverflow"
    }

    fn page_size(&self) -> usize {
        DEFAULT_PAGE_SIZE
    }

    async fn fetch(&self, topic: &str, page: usize) -> Result<Vec<SourceItem>, AgentError> {
        let request = self.client.get(&self.base_url).query(&[
            ("order", "desc".to_string()),
            ("sort", "relevance".to_string()),
            ("q", topic.to_string()),
            ("site", "stackoverflow".to_string()),
            ("pagesize", DEFAULT_PAGE_SIZE.to_string()),
            ("page", page.to_string()),
        ]);

        let response: SearchResponse = get_json(self.name(), request).await?;
        Ok(response
            .items
            .into_iter()
            .map(|q| to_item(topic, q))
            .collect())
    }
}
