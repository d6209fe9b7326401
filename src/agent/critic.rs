//! Critique stage.
//!
//! Reviews the current draft and classifies it as approved, needing
//! revision, or needing more research. Also builds the feedback text
//! handed to the stage that runs next.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::fallback::FallbackClient;
use super::prompt::build_critic_prompt;
use super::structured::parse_structured;
use super::traits::{Agent, PromptedAgent, Stage, StageKind, StageOutcome};
use crate::core::{Assessment, Critique, StageUpdate, WorkflowState};
use crate::error::AgentError;

const CRITIQUE_FORMAT: &str = "JSON object with critique assessment";

const DEFAULT_REVISION_FEEDBACK: &str = "The report needs revision to improve clarity, depth, \
     and overall quality. Please address the identified weaknesses and implement the \
     recommendations provided.";

/// Critique as returned by the model, before the assessment is checked.
#[derive(Debug, Deserialize)]
struct RawCritique {
    overall_assessment: String,
    #[serde(default)]
    specific_feedback: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

impl TryFrom<RawCritique> for Critique {
    type Error = String;

    fn try_from(raw: RawCritique) -> Result<Self, Self::Error> {
        let overall_assessment = Assessment::parse(&raw.overall_assessment)
            .ok_or_else(|| format!("unknown assessment {:?}", raw.overall_assessment))?;
        Ok(Self {
            overall_assessment,
            specific_feedback: raw.specific_feedback,
            strengths: raw.strengths,
            weaknesses: raw.weaknesses,
            recommendations: raw.recommendations,
        })
    }
}

/// Stage that reviews the draft.
pub struct CriticStage {
    client: Arc<FallbackClient>,
    agent: PromptedAgent,
}

impl CriticStage {
    /// Creates the stage with the given system prompt.
    #[must_use]
    pub fn new(client: Arc<FallbackClient>, system_prompt: String) -> Self {
        Self {
            client,
            agent: PromptedAgent::new("critic", system_prompt, 0.3).structured(CRITIQUE_FORMAT),
        }
    }

    async fn critique(&self, state: &WorkflowState) -> Result<Critique, AgentError> {
        let prompt = build_critic_prompt(
            &state.topic,
            state.plan.as_ref(),
            state.findings.as_ref(),
            state.draft.as_deref().unwrap_or_default(),
        );
        let content = self.agent.execute(&self.client, &prompt).await?;
        let raw: RawCritique = parse_structured(&content)?;
        Critique::try_from(raw).map_err(|message| AgentError::ResponseParse { message, content })
    }
}

#[async_trait]
impl Stage for CriticStage {
    fn kind(&self) -> StageKind {
        StageKind::Critique
    }

    async fn run(&self, state: &WorkflowState, _feedback: Option<&str>) -> StageOutcome {
        match self.critique(state).await {
            Ok(critique) => {
                info!(assessment = %critique.overall_assessment, "report evaluated");
                StageOutcome::Success(StageUpdate::with_critique(critique))
            }
            Err(e) => StageOutcome::degraded(
                StageUpdate::with_critique(Critique::fallback(state.draft.as_deref())),
                e,
            ),
        }
    }
}

/// Feedback handed to the research stage after an "insufficient" verdict.
#[must_use]
pub fn research_feedback(state: &WorkflowState) -> String {
    match state
        .critique_feedback
        .as_deref()
        .filter(|f| !f.trim().is_empty())
    {
        Some(feedback) => format!(
            "The current research is insufficient for a comprehensive report. {feedback} \
             Please gather additional information to address these gaps."
        ),
        None => "The current research is insufficient for a comprehensive report. \
                 Please gather additional information to provide more depth and coverage \
                 of the topic."
            .to_string(),
    }
}

/// Feedback handed to the writing stage after a "revision needed" verdict.
#[must_use]
pub fn revision_feedback(state: &WorkflowState) -> String {
    state
        .critique_feedback
        .as_deref()
        .filter(|f| !f.trim().is_empty())
        .unwrap_or(DEFAULT_REVISION_FEEDBACK)
        .to_string()
}
