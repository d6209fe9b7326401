//! Paginated data sources consulted by the research stage.
//!
//! Two kinds of supplier exist: [`PaperSource`]s page by item offset
//! (arXiv's `start` parameter), and [`ItemSource`]s page by 1-based page
//! number. The research stage keeps one offset per source name in the
//! workflow state and advances it by the number of items each fetch
//! actually returned, so repeated research passes continue where the last
//! one stopped.
//!
//! Fetch failures never abort research: they are logged and count as zero
//! items, leaving the source's offset unchanged.

pub mod arxiv;
pub mod domain;
pub mod github;
pub mod hackernews;
pub mod stackoverflow;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::SourceOffsets;
use crate::error::AgentError;

pub use arxiv::ArxivSource;
pub use domain::{DomainInsights, insights, is_cs_it_topic};
pub use github::GithubSource;
pub use hackernews::HackerNewsSource;
pub use stackoverflow::StackOverflowSource;

/// Papers included in the synthesis summary.
const SUMMARY_PAPERS: usize = 5;
/// Sample items per item source included in the synthesis summary.
const SUMMARY_SAMPLES: usize = 3;
/// Abstract characters included in the synthesis summary.
const SUMMARY_ABSTRACT_CHARS: usize = 200;

/// An academic paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Paper title.
    pub title: String,
    /// Author names.
    pub authors: Vec<String>,
    /// Abstract text.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Publication time.
    pub published: Option<DateTime<Utc>>,
    /// Subject categories (e.g. `cs.LG`).
    pub categories: Vec<String>,
    /// Relevance to the topic, 0.0 to 1.0.
    pub score: f64,
    /// Landing page URL.
    pub url: String,
}

/// One item from a real-time source (repository, question, story).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    /// Source name.
    pub source: String,
    /// Item title.
    pub title: String,
    /// Item URL.
    pub url: String,
    /// Short description, if the source has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Relevance to the topic, 0.0 to 1.0.
    pub score: f64,
    /// Source-specific fields (stars, votes, tags, ...).
    #[serde(default)]
    pub details: serde_json::Value,
}

/// A paginated academic-paper supplier.
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Source name, also the key for its pagination offset.
    fn name(&self) -> &'static str;

    /// Papers requested per fetch.
    fn page_size(&self) -> usize;

    /// Fetches up to `page_size` papers starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Source`] on transport or parse failures.
    async fn fetch(
        &self,
        query: &str,
        offset: usize,
        page_size: usize,
    ) -> Result<Vec<Paper>, AgentError>;
}

/// A paginated real-time item supplier.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Source name, also the key for its pagination offset.
    fn name(&self) -> &'static str;

    /// Items returned per page.
    fn page_size(&self) -> usize;

    /// Fetches one 1-based page of items for `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Source`] on transport or parse failures.
    async fn fetch(&self, topic: &str, page: usize) -> Result<Vec<SourceItem>, AgentError>;
}

/// Converts an item offset to a 1-based page number.
#[must_use]
pub const fn page_for_offset(offset: usize, page_size: usize) -> usize {
    offset / if page_size == 0 { 1 } else { page_size } + 1
}

/// Scores text against a topic by word overlap.
///
/// The fraction of topic words present in `title` + `body`, plus 0.3 if the
/// whole topic appears as a phrase, capped at 1.0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn relevance_score(topic: &str, title: &str, body: &str) -> f64 {
    let topic_lower = topic.to_lowercase();
    let topic_words: std::collections::HashSet<&str> = topic_lower.split_whitespace().collect();
    if topic_words.is_empty() {
        return 0.0;
    }

    let text = format!("{title} {body}").to_lowercase();
    let text_words: std::collections::HashSet<&str> = text.split_whitespace().collect();
    let overlap = topic_words.intersection(&text_words).count();

    let mut score = overlap as f64 / topic_words.len() as f64;
    if text.contains(topic_lower.trim()) {
        score += 0.3;
    }
    score.min(1.0)
}

/// Builds the HTTP client shared by the standard sources.
///
/// # Errors
///
/// Returns [`AgentError::Config`] if the TLS backend cannot be initialized.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, AgentError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("mars-rs/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AgentError::Config {
            message: format!("failed to build HTTP client: {e}"),
        })
}

/// Sends a request and decodes a JSON body, mapping failures to
/// [`AgentError::Source`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    source: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, AgentError> {
    let source_error = |message: String| AgentError::Source {
        source_name: source.to_string(),
        message,
    };
    request
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| source_error(e.to_string()))?
        .json::<T>()
        .await
        .map_err(|e| source_error(format!("invalid response body: {e}")))
}

/// Everything fetched in one research pass, keyed by source name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceBatch {
    /// Papers per paper source.
    pub papers: BTreeMap<String, Vec<Paper>>,
    /// Items per item source.
    pub items: BTreeMap<String, Vec<SourceItem>>,
}

impl SourceBatch {
    /// Items returned per source, used to advance pagination offsets.
    #[must_use]
    pub fn fetched_counts(&self) -> BTreeMap<String, usize> {
        self.papers
            .iter()
            .map(|(name, papers)| (name.clone(), papers.len()))
            .chain(
                self.items
                    .iter()
                    .map(|(name, items)| (name.clone(), items.len())),
            )
            .collect()
    }

    /// Total papers and items fetched.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.papers.values().map(Vec::len).sum::<usize>()
            + self.items.values().map(Vec::len).sum::<usize>()
    }

    /// Whether nothing was fetched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
    }

    /// Compact JSON digest of the batch for the synthesis prompt.
    ///
    /// Includes the highest-scoring papers with shortened abstracts and a
    /// few sample items per real-time source.
    #[must_use]
    pub fn summary(&self) -> serde_json::Value {
        let mut papers: Vec<&Paper> = self.papers.values().flatten().collect();
        papers.sort_by(|a, b| b.score.total_cmp(&a.score));
        let papers: Vec<serde_json::Value> = papers
            .into_iter()
            .take(SUMMARY_PAPERS)
            .map(|p| {
                serde_json::json!({
                    "title": p.title,
                    "abstract": shorten(&p.abstract_text, SUMMARY_ABSTRACT_CHARS),
                    "published": p.published.map(|d| d.to_rfc3339()),
                    "relevance_score": p.score,
                })
            })
            .collect();

        let realtime: serde_json::Map<String, serde_json::Value> = self
            .items
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(name, items)| {
                let samples: Vec<&SourceItem> = items.iter().take(SUMMARY_SAMPLES).collect();
                (
                    name.clone(),
                    serde_json::json!({ "count": items.len(), "sample_items": samples }),
                )
            })
            .collect();

        serde_json::json!({
            "papers": papers,
            "realtime_sources": realtime,
            "total_sources": self.total_items(),
        })
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars).collect();
    short.push_str("...");
    short
}

/// The set of sources consulted by the research stage.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    papers: Vec<Arc<dyn PaperSource>>,
    items: Vec<Arc<dyn ItemSource>>,
}

impl SourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// arXiv, GitHub, Stack Overflow, and Hacker News over one HTTP client.
    #[must_use]
    pub fn standard(client: &reqwest::Client) -> Self {
        Self::new()
            .with_paper_source(Arc::new(ArxivSource::new(client.clone())))
            .with_item_source(Arc::new(GithubSource::new(client.clone())))
            .with_item_source(Arc::new(StackOverflowSource::new(client.clone())))
            .with_item_source(Arc::new(HackerNewsSource::new(client.clone())))
    }

    /// Adds a paper source.
    #[must_use]
    pub fn with_paper_source(mut self, source: Arc<dyn PaperSource>) -> Self {
        self.papers.push(source);
        self
    }

    /// Adds an item source.
    #[must_use]
    pub fn with_item_source(mut self, source: Arc<dyn ItemSource>) -> Self {
        self.items.push(source);
        self
    }

    /// Whether no sources are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.papers.is_empty() && self.items.is_empty()
    }

    /// Fetches the next page from every source.
    ///
    /// Paper sources start at their stored offset; item sources fetch the
    /// page containing it. A failing source contributes zero items.
    pub async fn fetch_all(&self, topic: &str, offsets: &SourceOffsets) -> SourceBatch {
        let mut batch = SourceBatch::default();

        for source in &self.papers {
            let offset = offsets.get(source.name());
            let papers = match source.fetch(topic, offset, source.page_size()).await {
                Ok(papers) => papers,
                Err(e) => {
                    warn!(source = source.name(), error = %e, "paper source failed");
                    Vec::new()
                }
            };
            debug!(source = source.name(), offset, fetched = papers.len(), "fetched papers");
            batch.papers.insert(source.name().to_string(), papers);
        }

        for source in &self.items {
            let offset = offsets.get(source.name());
            let page = page_for_offset(offset, source.page_size());
            let items = match source.fetch(topic, page).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(source = source.name(), error = %e, "item source failed");
                    Vec::new()
                }
            };
            debug!(source = source.name(), page, fetched = items.len(), "fetched items");
            batch.items.insert(source.name().to_string(), items);
        }

        batch
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field(
                "papers",
                &self.papers.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field(
                "items",
                &self.items.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
