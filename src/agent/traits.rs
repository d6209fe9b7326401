//! Agent and stage trait definitions.
//!
//! An [`Agent`] is one prompted role (planner, researcher, ...) with a
//! fixed system prompt and temperature. A [`Stage`] is one step of the
//! workflow: it reads the state, calls its agents through the
//! [`FallbackClient`], and reports a [`StageOutcome`] for the engine to
//! merge.

use async_trait::async_trait;

use super::fallback::FallbackClient;
use crate::core::{StageUpdate, WorkflowState};
use crate::error::AgentError;

/// Trait implemented by all prompted roles.
///
/// The workflow stages call [`Agent::execute`] to run the role against the
/// fallback client.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.3
    }

    /// Description of the structured output the agent must produce.
    ///
    /// `None` for free-text agents.
    fn expected_format(&self) -> Option<&str> {
        None
    }

    /// Executes the agent with the given user message.
    ///
    /// Structured agents go through
    /// [`FallbackClient::generate_structured`]; parsing is left to the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::AllModelsFailed`] when no endpoint answered.
    async fn execute(&self, client: &FallbackClient, user_msg: &str) -> Result<String, AgentError> {
        match self.expected_format() {
            Some(format) => {
                client
                    .generate_structured(
                        self.system_prompt(),
                        user_msg,
                        format,
                        Some(self.temperature()),
                    )
                    .await
            }
            None => {
                client
                    .generate(self.system_prompt(), user_msg, Some(self.temperature()))
                    .await
            }
        }
    }
}

/// A prompted role defined entirely by data.
#[derive(Debug, Clone)]
pub struct PromptedAgent {
    name: &'static str,
    system_prompt: String,
    temperature: f32,
    expected_format: Option<&'static str>,
}

impl PromptedAgent {
    /// Creates a free-text agent.
    #[must_use]
    pub const fn new(name: &'static str, system_prompt: String, temperature: f32) -> Self {
        Self {
            name,
            system_prompt,
            temperature,
            expected_format: None,
        }
    }

    /// Marks the agent as producing structured output of the given shape.
    #[must_use]
    pub const fn structured(mut self, expected_format: &'static str) -> Self {
        self.expected_format = Some(expected_format);
        self
    }
}

#[async_trait]
impl Agent for PromptedAgent {
    fn name(&self) -> &'static str {
        self.name
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn expected_format(&self) -> Option<&str> {
        self.expected_format
    }
}

/// Which workflow step a stage implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Research planning.
    Plan,
    /// Source gathering and synthesis.
    Research,
    /// Drafting or revising the report.
    Write,
    /// Reviewing the draft.
    Critique,
}

impl StageKind {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Research => "research",
            Self::Write => "write",
            Self::Critique => "critique",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one stage invocation.
#[derive(Debug)]
pub enum StageOutcome {
    /// Model output passed validation.
    Success(StageUpdate),
    /// A locally computed fallback replaced failed model output.
    Degraded {
        /// Fallback payload to merge.
        update: StageUpdate,
        /// Why the fallback was used.
        reason: String,
    },
    /// The stage could not produce anything; the engine substitutes a
    /// minimal payload.
    Fatal(AgentError),
}

impl StageOutcome {
    /// Builds a degraded outcome.
    #[must_use]
    pub fn degraded(update: StageUpdate, reason: impl std::fmt::Display) -> Self {
        Self::Degraded {
            update,
            reason: reason.to_string(),
        }
    }

    /// Whether a fallback or fatal path was taken.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        !matches!(self, Self::Success(_))
    }
}

/// One step of the research workflow.
///
/// Stages never mutate the state; they describe changes in the returned
/// [`StageOutcome`]. `feedback` is set when the stage is re-run after a
/// critique (research expansion or draft revision).
#[async_trait]
pub trait Stage: Send + Sync {
    /// The step this stage implements.
    fn kind(&self) -> StageKind;

    /// Runs the stage.
    async fn run(&self, state: &WorkflowState, feedback: Option<&str>) -> StageOutcome;
}
