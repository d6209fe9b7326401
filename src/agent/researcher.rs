//! Research stage.
//!
//! Fetches the next page from every data source, then asks the model to
//! synthesize findings. When re-run after a critique, it expands the
//! existing findings against the critic's feedback instead.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::fallback::FallbackClient;
use super::prompt::{build_expansion_prompt, build_research_prompt};
use super::structured::parse_validated;
use super::traits::{Agent, PromptedAgent, Stage, StageKind, StageOutcome};
use crate::core::{StageUpdate, SynthesizedData, WorkflowState};
use crate::error::AgentError;
use crate::sources::{SourceRegistry, insights, is_cs_it_topic};

const FINDINGS_FORMAT: &str = "JSON object with synthesized research data";

/// Stage that gathers sources and synthesizes findings.
pub struct ResearcherStage {
    client: Arc<FallbackClient>,
    synthesizer: PromptedAgent,
    expander: PromptedAgent,
    sources: SourceRegistry,
    domain_only: bool,
}

impl ResearcherStage {
    /// Creates the stage.
    ///
    /// `synthesis_prompt` drives first-pass research and `expansion_prompt`
    /// drives re-research after a critique.
    #[must_use]
    pub fn new(
        client: Arc<FallbackClient>,
        synthesis_prompt: String,
        expansion_prompt: String,
        sources: SourceRegistry,
    ) -> Self {
        Self {
            client,
            synthesizer: PromptedAgent::new("researcher", synthesis_prompt, 0.3)
                .structured(FINDINGS_FORMAT),
            expander: PromptedAgent::new("expander", expansion_prompt, 0.4)
                .structured(FINDINGS_FORMAT),
            sources,
            domain_only: false,
        }
    }

    /// Rejects topics outside computer science and IT without fetching.
    #[must_use]
    pub const fn domain_only(mut self, enabled: bool) -> Self {
        self.domain_only = enabled;
        self
    }

    async fn synthesize(
        &self,
        agent: &PromptedAgent,
        prompt: &str,
    ) -> Result<SynthesizedData, AgentError> {
        let content = agent.execute(&self.client, prompt).await?;
        parse_validated(&content, SynthesizedData::validated)
    }
}

#[async_trait]
impl Stage for ResearcherStage {
    fn kind(&self) -> StageKind {
        StageKind::Research
    }

    async fn run(&self, state: &WorkflowState, feedback: Option<&str>) -> StageOutcome {
        let topic = state.topic.as_str();
        if self.domain_only && !is_cs_it_topic(topic) {
            warn!(topic, "topic outside the CS/IT domain, skipping research");
            return StageOutcome::degraded(
                StageUpdate::with_findings(SynthesizedData::domain_warning(topic), Default::default()),
                "topic outside the CS/IT domain",
            );
        }

        let batch = self.sources.fetch_all(topic, state.offsets()).await;
        let fetched = batch.fetched_counts();
        let source_data = if batch.is_empty() {
            serde_json::json!({})
        } else {
            batch.summary()
        };
        debug!(items = batch.total_items(), "sources fetched");

        let previous = state.findings.as_ref();
        let result = match (feedback, previous) {
            (Some(feedback), Some(findings)) => {
                let prompt = build_expansion_prompt(
                    topic,
                    state.plan.as_ref(),
                    findings,
                    &source_data,
                    feedback,
                );
                self.synthesize(&self.expander, &prompt).await
            }
            _ => {
                let hints = insights(topic);
                let prompt =
                    build_research_prompt(topic, state.plan.as_ref(), &source_data, &hints);
                self.synthesize(&self.synthesizer, &prompt).await
            }
        };

        match result {
            Ok(findings) => {
                info!(
                    findings = findings.key_findings.len(),
                    quality = findings.data_quality_score,
                    "research synthesized"
                );
                StageOutcome::Success(StageUpdate::with_findings(findings, fetched))
            }
            Err(e) => {
                let findings = previous
                    .cloned()
                    .unwrap_or_else(|| SynthesizedData::fallback(topic));
                StageOutcome::degraded(StageUpdate::with_findings(findings, fetched), e)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::prompt::{EXPANDER_SYSTEM_PROMPT, RESEARCHER_SYSTEM_PROMPT};
    use crate::agent::testing::{client_replying, failing_client};

    const FINDINGS: &str = r#"{"key_findings": ["B-trees dominate OLTP"], "supporting_evidence": [],
        "conflicting_information": [], "source_summaries": [], "data_quality_score": 0.8}"#;

    fn stage(client: Arc<FallbackClient>) -> ResearcherStage {
        ResearcherStage::new(
            client,
            RESEARCHER_SYSTEM_PROMPT.to_string(),
            EXPANDER_SYSTEM_PROMPT.to_string(),
            SourceRegistry::new(),
        )
    }

    #[tokio::test]
    async fn test_synthesis_success() {
        let outcome = stage(client_replying(FINDINGS))
            .run(&WorkflowState::new("database indexing"), None)
            .await;
        let StageOutcome::Success(update) = outcome else {
            panic!("expected success");
        };
        let findings = update.findings.unwrap_or_else(|| unreachable!());
        assert_eq!(findings.key_findings, ["B-trees dominate OLTP"]);
        assert!(update.fetched.is_empty());
    }

    #[tokio::test]
    async fn test_domain_gate_skips_model() {
        let outcome = stage(failing_client())
            .domain_only(true)
            .run(&WorkflowState::new("sourdough baking"), None)
            .await;
        let StageOutcome::Degraded { update, .. } = outcome else {
            panic!("expected degraded");
        };
        let findings = update.findings.unwrap_or_else(|| unreachable!());
        assert!(findings.domain_warning);
    }

    #[tokio::test]
    async fn test_failed_expansion_keeps_previous_findings() {
        let mut state = WorkflowState::new("database indexing");
        let previous = SynthesizedData::fallback("previous");
        state.apply(StageUpdate::with_findings(previous.clone(), Default::default()));

        let outcome = stage(failing_client())
            .run(&state, Some("needs more benchmarks"))
            .await;
        let StageOutcome::Degraded { update, .. } = outcome else {
            panic!("expected degraded");
        };
        assert_eq!(update.findings, Some(previous));
    }

    #[tokio::test]
    async fn test_invalid_findings_use_fallback() {
        let outcome = stage(client_replying(r#"{"key_findings": [], "data_quality_score": 0.5}"#))
            .run(&WorkflowState::new("database indexing"), None)
            .await;
        let StageOutcome::Degraded { update, .. } = outcome else {
            panic!("expected degraded");
        };
        assert_eq!(
            update.findings,
            Some(SynthesizedData::fallback("database indexing"))
        );
    }
}
