//! Source pagination across research passes, driven through the real
//! research stage and source registry.

#![allow(clippy::panic)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use mars_rs::agent::prompt::{EXPANDER_SYSTEM_PROMPT, RESEARCHER_SYSTEM_PROMPT};
use mars_rs::agent::{
    ChatRequest, ChatResponse, EndpointConfig, FallbackClient, FallbackSettings, LlmProvider,
    ResearcherStage, Stage, StageOutcome, TokenUsage,
};
use mars_rs::core::WorkflowState;
use mars_rs::error::AgentError;
use mars_rs::sources::{
    ItemSource, Paper, PaperSource, SourceItem, SourceRegistry, page_for_offset,
};

const FINDINGS: &str = r#"{"key_findings": ["LSM trees trade read cost for write throughput"],
    "supporting_evidence": [], "conflicting_information": [], "source_summaries": [],
    "data_quality_score": 0.7}"#;

struct Findings;

#[async_trait]
impl LlmProvider for Findings {
    fn name(&self) -> &'static str {
        "findings"
    }

    async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        Ok(ChatResponse {
            content: FINDINGS.to_string(),
            usage: TokenUsage::default(),
            finish_reason: Some("stop".to_string()),
        })
    }
}

/// Returns the queued number of papers per call and records each offset.
struct Papers {
    counts: Mutex<VecDeque<usize>>,
    offsets: Mutex<Vec<usize>>,
}

#[async_trait]
impl PaperSource for Papers {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    fn page_size(&self) -> usize {
        15
    }

    async fn fetch(
        &self,
        _query: &str,
        offset: usize,
        _page_size: usize,
    ) -> Result<Vec<Paper>, AgentError> {
        if let Ok(mut seen) = self.offsets.lock() {
            seen.push(offset);
        }
        let count = self
            .counts
            .lock()
            .ok()
            .and_then(|mut c| c.pop_front())
            .unwrap_or(0);
        Ok((0..count)
            .map(|i| Paper {
                title: format!("paper {}", offset + i),
                authors: Vec::new(),
                abstract_text: String::new(),
                published: None,
                categories: vec!["cs.DB".to_string()],
                score: 0.5,
                url: String::new(),
            })
            .collect())
    }
}

/// Returns the queued number of items per call and records each page.
/// With no queue it fails every fetch.
struct Items {
    name: &'static str,
    counts: Option<Mutex<VecDeque<usize>>>,
    pages: Mutex<Vec<usize>>,
}

#[async_trait]
impl ItemSource for Items {
    fn name(&self) -> &'static str {
        self.name
    }

    fn page_size(&self) -> usize {
        10
    }

    async fn fetch(&self, _topic: &str, page: usize) -> Result<Vec<SourceItem>, AgentError> {
        if let Ok(mut seen) = self.pages.lock() {
            seen.push(page);
        }
        let Some(counts) = &self.counts else {
            return Err(AgentError::Source {
                source_name: self.name.to_string(),
                message: "HTTP 503".to_string(),
            });
        };
        let count = counts
            .lock()
            .ok()
            .and_then(|mut c| c.pop_front())
            .unwrap_or(0);
        Ok((0..count)
            .map(|i| SourceItem {
                source: self.name.to_string(),
                title: format!("item {i} on page {page}"),
                url: String::new(),
                summary: None,
                score: 0.4,
                details: serde_json::Value::Null,
            })
            .collect())
    }
}

fn items(name: &'static str, counts: Option<Vec<usize>>) -> Arc<Items> {
    Arc::new(Items {
        name,
        counts: counts.map(|c| Mutex::new(c.into())),
        pages: Mutex::new(Vec::new()),
    })
}

fn recorded<T: Clone>(log: &Mutex<Vec<T>>) -> Vec<T> {
    log.lock().map(|v| v.clone()).unwrap_or_default()
}

#[tokio::test]
async fn test_offsets_advance_by_returned_counts() {
    let papers = Arc::new(Papers {
        counts: Mutex::new(vec![15, 7].into()),
        offsets: Mutex::new(Vec::new()),
    });
    let github = items("github", Some(vec![10, 4]));
    let broken = items("stackoverflow", None);

    let registry = SourceRegistry::new()
        .with_paper_source(Arc::clone(&papers) as Arc<dyn PaperSource>)
        .with_item_source(Arc::clone(&github) as Arc<dyn ItemSource>)
        .with_item_source(Arc::clone(&broken) as Arc<dyn ItemSource>);

    let client = FallbackClient::new(
        vec![(
            EndpointConfig::new("mock-model", 1),
            Arc::new(Findings) as Arc<dyn LlmProvider>,
        )],
        FallbackSettings {
            switch_delay: Duration::ZERO,
            ..FallbackSettings::default()
        },
    )
    .unwrap_or_else(|_| unreachable!());
    let stage = ResearcherStage::new(
        Arc::new(client),
        RESEARCHER_SYSTEM_PROMPT.to_string(),
        EXPANDER_SYSTEM_PROMPT.to_string(),
        registry,
    );

    let mut state = WorkflowState::new("LSM tree compaction in databases");
    for feedback in [None, Some("Cover tiered versus leveled compaction.")] {
        match stage.run(&state, feedback).await {
            StageOutcome::Success(update) => state.apply(update),
            other => panic!("expected success, got {other:?}"),
        }
    }

    assert_eq!(recorded(&papers.offsets), [0, 15]);
    assert_eq!(state.offsets().get("arxiv"), 22);

    assert_eq!(recorded(&github.pages), [1, 2]);
    assert_eq!(state.offsets().get("github"), 14);
    assert_eq!(
        page_for_offset(state.offsets().get("github"), 10),
        14 / 10 + 1
    );

    // A failing source is retried from the same place on every pass.
    assert_eq!(recorded(&broken.pages), [1, 1]);
    assert_eq!(state.offsets().get("stackoverflow"), 0);
}
