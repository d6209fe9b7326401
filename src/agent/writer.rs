//! Writing stage.
//!
//! Drafts the report from the plan and findings, or revises the current
//! draft when re-run with critic feedback.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::fallback::FallbackClient;
use super::prompt::{build_revision_prompt, build_writer_prompt};
use super::traits::{Agent, PromptedAgent, Stage, StageKind, StageOutcome};
use crate::core::{StageUpdate, WorkflowState};
use crate::error::AgentError;

/// Stage that drafts and revises the report.
pub struct WriterStage {
    client: Arc<FallbackClient>,
    writer: PromptedAgent,
    reviser: PromptedAgent,
}

impl WriterStage {
    /// Creates the stage from the drafting and revision system prompts.
    #[must_use]
    pub fn new(client: Arc<FallbackClient>, writer_prompt: String, reviser_prompt: String) -> Self {
        Self {
            client,
            writer: PromptedAgent::new("writer", writer_prompt, 0.6),
            reviser: PromptedAgent::new("reviser", reviser_prompt, 0.5),
        }
    }

    async fn compose(&self, agent: &PromptedAgent, prompt: &str) -> Result<String, AgentError> {
        let text = agent.execute(&self.client, prompt).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(AgentError::EmptyResponse {
                model: agent.name().to_string(),
            });
        }
        Ok(text.to_string())
    }
}

/// Template report used when drafting fails.
#[must_use]
pub fn fallback_report(topic: &str) -> String {
    format!(
        "# Research Report: {topic}\n\n\
         ## Executive Summary\n\n\
         This report provides an overview of {topic}, covering its current state, \
         key challenges, and future prospects.\n\n\
         ## Introduction\n\n\
         {topic} is an area of active development. This report summarizes the \
         available information and highlights the main considerations.\n\n\
         ## Key Findings\n\n\
         1. Current understanding of {topic} shows significant development in recent years\n\
         2. Main challenges include scalability and adoption issues\n\
         3. Future prospects appear promising with emerging technologies\n\n\
         ## Analysis\n\n\
         The available evidence suggests that {topic} continues to evolve. \
         Practitioners should weigh its benefits against its current limitations.\n\n\
         ## Conclusions\n\n\
         {topic} remains a relevant subject that warrants continued investigation.\n\n\
         *Note: This report was generated from a template because the writing model was unavailable.*\n"
    )
}

#[async_trait]
impl Stage for WriterStage {
    fn kind(&self) -> StageKind {
        StageKind::Write
    }

    async fn run(&self, state: &WorkflowState, feedback: Option<&str>) -> StageOutcome {
        let topic = state.topic.as_str();

        if let (Some(feedback), Some(draft)) = (feedback, state.draft.as_deref()) {
            let prompt = build_revision_prompt(topic, draft, feedback);
            return match self.compose(&self.reviser, &prompt).await {
                Ok(revised) => {
                    info!(chars = revised.len(), "report revised");
                    StageOutcome::Success(StageUpdate::with_draft(revised))
                }
                Err(e) => StageOutcome::degraded(StageUpdate::with_draft(draft), e),
            };
        }

        let prompt = build_writer_prompt(topic, state.plan.as_ref(), state.findings.as_ref());
        match self.compose(&self.writer, &prompt).await {
            Ok(report) => {
                info!(chars = report.len(), "report drafted");
                StageOutcome::Success(StageUpdate::with_draft(report))
            }
            Err(e) => StageOutcome::degraded(StageUpdate::with_draft(fallback_report(topic)), e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::prompt::{REVISER_SYSTEM_PROMPT, WRITER_SYSTEM_PROMPT};
    use crate::agent::testing::{client_replying, failing_client};

    fn stage(client: Arc<FallbackClient>) -> WriterStage {
        WriterStage::new(
            client,
            WRITER_SYSTEM_PROMPT.to_string(),
            REVISER_SYSTEM_PROMPT.to_string(),
        )
    }

    #[tokio::test]
    async fn test_draft_is_trimmed() {
        let outcome = stage(client_replying("\n# Report\n\nBody.\n\n"))
            .run(&WorkflowState::new("consensus"), None)
            .await;
        let StageOutcome::Success(update) = outcome else {
            panic!("expected success");
        };
        assert_eq!(update.draft.as_deref(), Some("# Report\n\nBody."));
    }

    #[tokio::test]
    async fn test_failed_draft_uses_template() {
        let outcome = stage(failing_client())
            .run(&WorkflowState::new("consensus"), None)
            .await;
        let StageOutcome::Degraded { update, .. } = outcome else {
            panic!("expected degraded");
        };
        let draft = update.draft.unwrap_or_default();
        assert!(draft.starts_with("# Research Report: consensus"));
        assert!(draft.contains("## Key Findings"));
    }

    #[tokio::test]
    async fn test_failed_revision_keeps_draft() {
        let mut state = WorkflowState::new("consensus");
        state.apply(StageUpdate::with_draft("# Old draft"));
        let outcome = stage(failing_client())
            .run(&state, Some("add benchmarks"))
            .await;
        let StageOutcome::Degraded { update, .. } = outcome else {
            panic!("expected degraded");
        };
        assert_eq!(update.draft.as_deref(), Some("# Old draft"));
    }

    #[tokio::test]
    async fn test_revision_replaces_draft() {
        let mut state = WorkflowState::new("consensus");
        state.apply(StageUpdate::with_draft("# Old draft"));
        let outcome = stage(client_replying("# New draft"))
            .run(&state, Some("add benchmarks"))
            .await;
        let StageOutcome::Success(update) = outcome else {
            panic!("expected success");
        };
        assert_eq!(update.draft.as_deref(), Some("# New draft"));
    }

    #[test]
    fn test_fallback_report_sections() {
        let report = fallback_report("raft");
        for heading in [
            "## Executive Summary",
            "## Introduction",
            "## Key Findings",
            "## Analysis",
            "## Conclusions",
        ] {
            assert!(report.contains(heading), "missing {heading}");
        }
    }
}
