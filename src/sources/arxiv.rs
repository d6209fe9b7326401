//! arXiv paper source (Atom export API).

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;

use super::{Paper, PaperSource, relevance_score};
use crate::error::AgentError;

const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";
const DEFAULT_PAGE_SIZE: usize = 15;
/// Category prefix for computer science papers.
const CS_CATEGORY_PREFIX: &str = "cs.";

/// arXiv search, newest submissions first, limited to computer science
/// categories.
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: reqwest::Client,
    base_url: String,
}

impl ArxivSource {
    /// Creates a source using the public export API.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: ARXIV_API_URL.to_string(),
        }
    }

    /// Overrides the API URL (mirrors, tests).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl PaperSource for ArxivSource {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    fn page_size(&self) -> usize {
        DEFAULT_PAGE_SIZE
    }

    async fn fetch(
        &self,
        query: &str,
        offset: usize,
        page_size: usize,
    ) -> Result<Vec<Paper>, AgentError> {
        let source_error = |message: String| AgentError::Source {
            source_name: self.name().to_string(),
            message,
        };

        let search = format!("all:{query}");
        let start = offset.to_string();
        let max_results = page_size.to_string();
        let body = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", search.as_str()),
                ("start", start.as_str()),
                ("max_results", max_results.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| source_error(e.to_string()))?
            .text()
            .await
            .map_err(|e| source_error(e.to_string()))?;

        Ok(parse_feed(&body, query))
    }
}

struct FeedPatterns {
    entry: Regex,
    title: Regex,
    summary: Regex,
    published: Regex,
    id: Regex,
    author: Regex,
    category: Regex,
}

fn patterns() -> Option<&'static FeedPatterns> {
    static PATTERNS: OnceLock<Option<FeedPatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(FeedPatterns {
                entry: Regex::new(r"(?s)<entry>(.*?)</entry>").ok()?,
                title: Regex::new(r"(?s)<title[^>]*>(.*?)</title>").ok()?,
                summary: Regex::new(r"(?s)<summary[^>]*>(.*?)</summary>").ok()?,
                published: Regex::new(r"<published>([^<]+)</published>").ok()?,
                id: Regex::new(r"<id>([^<]+)</id>").ok()?,
                author: Regex::new(r"(?s)<author>\s*<name>(.*?)</name>").ok()?,
                category: Regex::new(r#"<category[^>]*\bterm="([^"]+)""#).ok()?,
            })
        })
        .as_ref()
}

fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Decodes the XML entities arXiv uses and collapses whitespace.
fn clean_text(raw: &str) -> String {
    let decoded = raw
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses an arXiv Atom feed, keeping computer science papers only.
#[must_use]
pub fn parse_feed(xml: &str, topic: &str) -> Vec<Paper> {
    let Some(p) = patterns() else {
        return Vec::new();
    };
    p.entry
        .captures_iter(xml)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .filter_map(|entry| {
            let categories: Vec<String> = p
                .category
                .captures_iter(entry)
                .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                .collect();
            if !categories.iter().any(|c| c.starts_with(CS_CATEGORY_PREFIX)) {
                return None;
            }

            let title = clean_text(capture(&p.title, entry)?);
            let abstract_text = capture(&p.summary, entry).map(clean_text).unwrap_or_default();
            let score = relevance_score(topic, &title, &abstract_text);
            Some(Paper {
                authors: p
                    .author
                    .captures_iter(entry)
                    .filter_map(|c| c.get(1).map(|m| clean_text(m.as_str())))
                    .collect(),
                published: capture(&p.published, entry)
                    .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
                    .map(|d| d.with_timezone(&Utc)),
                url: capture(&p.id, entry).map(str::trim).unwrap_or_default().to_string(),
                categories,
                score,
                title,
                abstract_text,
            })
        })
        .collect()
}
