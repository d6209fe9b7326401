//! Planning stage.
//!
//! Turns the topic into a [`ResearchPlan`]. Runs once per workflow.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::fallback::FallbackClient;
use super::prompt::build_planner_prompt;
use super::structured::parse_validated;
use super::traits::{Agent, PromptedAgent, Stage, StageKind, StageOutcome};
use crate::core::{ResearchPlan, StageUpdate, WorkflowState};
use crate::error::AgentError;

const PLAN_FORMAT: &str = "JSON object with specified keys";

/// Stage that produces the research plan.
pub struct PlannerStage {
    client: Arc<FallbackClient>,
    agent: PromptedAgent,
}

impl PlannerStage {
    /// Creates the stage with the given system prompt.
    #[must_use]
    pub fn new(client: Arc<FallbackClient>, system_prompt: String) -> Self {
        Self {
            client,
            agent: PromptedAgent::new("planner", system_prompt, 0.3).structured(PLAN_FORMAT),
        }
    }

    async fn plan(&self, topic: &str) -> Result<ResearchPlan, AgentError> {
        let content = self
            .agent
            .execute(&self.client, &build_planner_prompt(topic))
            .await?;
        parse_validated(&content, ResearchPlan::validated)
    }
}

#[async_trait]
impl Stage for PlannerStage {
    fn kind(&self) -> StageKind {
        StageKind::Plan
    }

    async fn run(&self, state: &WorkflowState, _feedback: Option<&str>) -> StageOutcome {
        debug!(agent = self.agent.name(), topic = %state.topic, "creating research plan");
        match self.plan(&state.topic).await {
            Ok(plan) => {
                info!(
                    questions = plan.main_questions.len(),
                    depth = plan.research_depth,
                    "research plan created"
                );
                StageOutcome::Success(StageUpdate::with_plan(plan))
            }
            Err(e) => StageOutcome::degraded(
                StageUpdate::with_plan(ResearchPlan::fallback(&state.topic)),
                e,
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::prompt::PLANNER_SYSTEM_PROMPT;
    use crate::agent::testing::{client_replying, failing_client};

    fn stage(client: Arc<FallbackClient>) -> PlannerStage {
        PlannerStage::new(client, PLANNER_SYSTEM_PROMPT.to_string())
    }

    #[tokio::test]
    async fn test_valid_plan() {
        let reply = r#"```json
{"main_questions": ["How do LSM trees compact?"], "sub_topics": ["compaction"],
 "search_strategies": ["papers"], "expected_sources": ["arXiv"], "research_depth": 7}
```"#;
        let outcome = stage(client_replying(reply))
            .run(&WorkflowState::new("LSM trees"), None)
            .await;
        let StageOutcome::Success(update) = outcome else {
            panic!("expected success");
        };
        let plan = update.plan.unwrap_or_else(|| unreachable!());
        assert_eq!(plan.main_questions, ["How do LSM trees compact?"]);
        assert_eq!(plan.research_depth, 5);
    }

    #[tokio::test]
    async fn test_oversized_depth_keeps_model_plan() {
        let reply = r#"{"main_questions": ["Q1?"], "sub_topics": ["s"],
 "search_strategies": ["papers"], "expected_sources": ["arXiv"], "research_depth": 300}"#;
        let outcome = stage(client_replying(reply))
            .run(&WorkflowState::new("LSM trees"), None)
            .await;
        let StageOutcome::Success(update) = outcome else {
            panic!("expected success");
        };
        let plan = update.plan.unwrap_or_else(|| unreachable!());
        assert_eq!(plan.main_questions, ["Q1?"]);
        assert_eq!(plan.research_depth, 5);
    }

    #[tokio::test]
    async fn test_truncated_plan_uses_fallback() {
        let outcome = stage(client_replying("{\"main_questions\": [\"q\""))
            .run(&WorkflowState::new("LSM trees"), None)
            .await;
        let StageOutcome::Degraded { update, .. } = outcome else {
            panic!("expected degraded");
        };
        assert_eq!(update.plan, Some(ResearchPlan::fallback("LSM trees")));
    }

    #[tokio::test]
    async fn test_model_failure_uses_fallback() {
        let outcome = stage(failing_client())
            .run(&WorkflowState::new("LSM trees"), None)
            .await;
        assert!(matches!(outcome, StageOutcome::Degraded { .. }));
    }
}
