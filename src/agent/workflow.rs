//! Workflow engine.
//!
//! Drives a [`WorkflowState`] through the plan → research → write →
//! critique cycle until the critique is approved or a budget forces
//! approval.
//!
//! # Architecture
//!
//! ```text
//! Planning → Researching → Writing → Critiquing ─┬─ approved ──────────────→ Terminal
//!                 ↑            ↑                  ├─ research_insufficient ─→ Researching
//!                 │            └──────────────────┴─ revision_needed ───────→ Writing
//! ```
//!
//! Stage failures never abort a run. A [`StageOutcome::Degraded`] is merged
//! like a success (and logged); a [`StageOutcome::Fatal`] is replaced by a
//! minimal payload built here. Only a broken transition table or a runaway
//! loop yields a failed [`WorkflowResult`].

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use super::config::{AgentConfig, WorkflowConfig};
use super::critic::{CriticStage, research_feedback, revision_feedback};
use super::fallback::FallbackClient;
use super::planner::PlannerStage;
use super::prompt::PromptSet;
use super::researcher::ResearcherStage;
use super::traits::{Stage, StageKind, StageOutcome};
use super::writer::{WriterStage, fallback_report};
use crate::core::{
    Assessment, Critique, ResearchPlan, StageUpdate, SynthesizedData, WorkflowResult,
    WorkflowState,
};
use crate::error::AgentError;
use crate::sources::{SourceRegistry, http_client};

/// Position of a run in the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Running the plan stage.
    Planning,
    /// Running the research stage.
    Researching,
    /// Running the write stage.
    Writing,
    /// Running the critique stage and deciding what follows.
    Critiquing,
    /// Absorbing end state.
    Terminal,
}

/// Label on a transition out of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    /// Unconditional transition after a stage completes.
    Done,
    /// The report is accepted (by the critic or a budget).
    Approved,
    /// The critic asked for more research.
    ResearchInsufficient,
    /// The critic asked for a rewrite.
    RevisionNeeded,
}

const TRANSITIONS: &[(Phase, Edge, Phase)] = &[
    (Phase::Planning, Edge::Done, Phase::Researching),
    (Phase::Researching, Edge::Done, Phase::Writing),
    (Phase::Writing, Edge::Done, Phase::Critiquing),
    (Phase::Critiquing, Edge::Approved, Phase::Terminal),
    (Phase::Critiquing, Edge::ResearchInsufficient, Phase::Researching),
    (Phase::Critiquing, Edge::RevisionNeeded, Phase::Writing),
];

impl Phase {
    /// Phase reached by following `edge`, or `None` if no such transition exists.
    #[must_use]
    pub fn next(self, edge: Edge) -> Option<Self> {
        TRANSITIONS
            .iter()
            .find(|(from, label, _)| *from == self && *label == edge)
            .map(|(_, _, to)| *to)
    }
}

impl From<Assessment> for Edge {
    fn from(assessment: Assessment) -> Self {
        match assessment {
            Assessment::Approved => Self::Approved,
            Assessment::RevisionNeeded => Self::RevisionNeeded,
            Assessment::ResearchInsufficient => Self::ResearchInsufficient,
        }
    }
}

/// Event emitted by [`Workflow::run_with_progress`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Human-readable progress line.
    Progress {
        /// Progress message.
        message: String,
    },
    /// Final result of the run. Always the last event.
    Result {
        /// The result.
        result: Box<WorkflowResult>,
    },
    /// The run failed; a `Result` event still follows.
    Error {
        /// Error description.
        message: String,
    },
}

impl ProgressEvent {
    fn progress(message: &str) -> Self {
        Self::Progress {
            message: message.to_string(),
        }
    }

    /// Event name used on the wire (`progress`, `result`, or `error`).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Result { .. } => "result",
            Self::Error { .. } => "error",
        }
    }
}

/// The four stages a workflow runs.
pub struct StageSet {
    /// Plan stage.
    pub planner: Box<dyn Stage>,
    /// Research stage.
    pub researcher: Box<dyn Stage>,
    /// Write stage.
    pub writer: Box<dyn Stage>,
    /// Critique stage.
    pub critic: Box<dyn Stage>,
}

impl StageSet {
    /// The model-backed stages sharing one client.
    #[must_use]
    pub fn standard(
        client: Arc<FallbackClient>,
        prompts: &PromptSet,
        sources: SourceRegistry,
        domain_only: bool,
    ) -> Self {
        Self {
            planner: Box::new(PlannerStage::new(
                Arc::clone(&client),
                prompts.planner.clone(),
            )),
            researcher: Box::new(
                ResearcherStage::new(
                    Arc::clone(&client),
                    prompts.researcher.clone(),
                    prompts.expander.clone(),
                    sources,
                )
                .domain_only(domain_only),
            ),
            writer: Box::new(WriterStage::new(
                Arc::clone(&client),
                prompts.writer.clone(),
                prompts.reviser.clone(),
            )),
            critic: Box::new(CriticStage::new(client, prompts.critic.clone())),
        }
    }
}

/// Runs research workflows.
pub struct Workflow {
    stages: StageSet,
    budgets: WorkflowConfig,
}

impl Workflow {
    /// Creates a workflow over explicit stages.
    #[must_use]
    pub const fn new(stages: StageSet, budgets: WorkflowConfig) -> Self {
        Self { stages, budgets }
    }

    /// Creates the standard workflow with its own model client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client or the HTTP client cannot be built.
    pub fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let client = Arc::new(FallbackClient::from_config(config)?);
        Self::with_client(config, client)
    }

    /// Creates the standard workflow over an existing model client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client for data sources cannot be built.
    pub fn with_client(
        config: &AgentConfig,
        client: Arc<FallbackClient>,
    ) -> Result<Self, AgentError> {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        let http = http_client(config.source_timeout)?;
        let stages = StageSet::standard(
            client,
            &prompts,
            SourceRegistry::standard(&http),
            config.domain_only,
        );
        Ok(Self::new(stages, config.workflow))
    }

    /// Budgets this workflow enforces.
    #[must_use]
    pub const fn budgets(&self) -> WorkflowConfig {
        self.budgets
    }

    /// Runs the workflow to completion.
    ///
    /// Always returns a result with a non-empty final report.
    pub async fn run(&self, topic: &str) -> WorkflowResult {
        self.drive(topic, None).await
    }

    /// Runs the workflow, sending progress events to `progress`.
    ///
    /// The last event is always [`ProgressEvent::Result`]. A closed
    /// receiver does not stop the run.
    pub async fn run_with_progress(
        &self,
        topic: &str,
        progress: &UnboundedSender<ProgressEvent>,
    ) -> WorkflowResult {
        self.drive(topic, Some(progress)).await
    }

    async fn drive(
        &self,
        topic: &str,
        progress: Option<&UnboundedSender<ProgressEvent>>,
    ) -> WorkflowResult {
        info!(topic, "starting research workflow");
        notify(progress, ProgressEvent::progress("Starting research workflow..."));

        let mut state = WorkflowState::new(topic);
        let result = match self.step_until_terminal(&mut state, progress).await {
            Ok(()) => {
                info!(
                    iteration = state.iteration(),
                    research_attempts = state.research_attempts(),
                    writing_attempts = state.writing_attempts(),
                    max_iterations_reached = state.max_iterations_reached(),
                    "research workflow completed"
                );
                notify(progress, ProgressEvent::progress("Research workflow completed!"));
                WorkflowResult::completed(state)
            }
            Err(e) => {
                error!(error = %e, "research workflow failed");
                notify(
                    progress,
                    ProgressEvent::Error {
                        message: format!("Error: {e}"),
                    },
                );
                WorkflowResult::failed(state, &e)
            }
        };

        notify(
            progress,
            ProgressEvent::Result {
                result: Box::new(result.clone()),
            },
        );
        result
    }

    async fn step_until_terminal(
        &self,
        state: &mut WorkflowState,
        progress: Option<&UnboundedSender<ProgressEvent>>,
    ) -> Result<(), AgentError> {
        let limit = self.budgets.step_limit();
        let mut phase = Phase::Planning;
        let mut steps = 0_usize;

        while phase != Phase::Terminal {
            steps += 1;
            if steps > limit {
                return Err(AgentError::Workflow {
                    message: format!("exceeded {limit} stage invocations without terminating"),
                });
            }

            let edge = match phase {
                Phase::Planning => {
                    notify(progress, ProgressEvent::progress("Planning research approach..."));
                    self.invoke(self.stages.planner.as_ref(), state, None).await;
                    Edge::Done
                }
                Phase::Researching => {
                    notify(
                        progress,
                        ProgressEvent::progress("Gathering and synthesizing information..."),
                    );
                    state.begin_research();
                    let feedback = state.findings.is_some().then(|| research_feedback(state));
                    self.invoke(self.stages.researcher.as_ref(), state, feedback.as_deref())
                        .await;
                    Edge::Done
                }
                Phase::Writing => {
                    notify(progress, ProgressEvent::progress("Writing comprehensive report..."));
                    state.begin_writing();
                    let feedback = state.draft.is_some().then(|| revision_feedback(state));
                    self.invoke(self.stages.writer.as_ref(), state, feedback.as_deref())
                        .await;
                    Edge::Done
                }
                Phase::Critiquing => {
                    notify(progress, ProgressEvent::progress("Evaluating report quality..."));
                    self.invoke(self.stages.critic.as_ref(), state, None).await;
                    self.decide(state)
                }
                Phase::Terminal => break,
            };

            let next = phase.next(edge).ok_or_else(|| AgentError::Workflow {
                message: format!("no transition from {phase:?} on {edge:?}"),
            })?;
            debug!(from = ?phase, to = ?next, "transition");
            phase = next;
        }

        state.finish();
        Ok(())
    }

    /// Runs one stage and merges whatever it produced.
    async fn invoke(&self, stage: &dyn Stage, state: &mut WorkflowState, feedback: Option<&str>) {
        let kind = stage.kind();
        debug!(stage = %kind, revision = feedback.is_some(), "running stage");

        match stage.run(state, feedback).await {
            StageOutcome::Success(update) => state.apply(update),
            StageOutcome::Degraded { update, reason } => {
                warn!(stage = %kind, reason = %reason, "stage used fallback output");
                state.apply(update);
            }
            StageOutcome::Fatal(e) => {
                error!(stage = %kind, error = %e, "stage failed, substituting minimal output");
                let update = minimal_update(kind, state);
                state.apply(update);
            }
        }
    }

    /// Routing decision after a critique.
    fn decide(&self, state: &mut WorkflowState) -> Edge {
        let budgets = self.budgets;
        let iteration = state.advance_iteration();

        let forced = if iteration >= budgets.max_iterations {
            state.flag_max_iterations();
            Some("max iterations reached")
        } else if state.research_attempts() >= budgets.max_research_attempts {
            Some("max research attempts reached")
        } else if state.writing_attempts() >= budgets.max_writing_attempts {
            Some("max writing attempts reached")
        } else {
            None
        };
        if let Some(reason) = forced {
            return force_approval(state, iteration, reason);
        }

        let assessment = state.approval.unwrap_or(Assessment::RevisionNeeded);
        info!(iteration, assessment = %assessment, "critique decision");

        // Re-check the attempt budgets against the verdict itself.
        match assessment {
            Assessment::RevisionNeeded
                if state.writing_attempts() >= budgets.max_writing_attempts =>
            {
                force_approval(state, iteration, "too many writing attempts")
            }
            Assessment::ResearchInsufficient
                if state.research_attempts() >= budgets.max_research_attempts =>
            {
                force_approval(state, iteration, "too many research attempts")
            }
            other => Edge::from(other),
        }
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("budgets", &self.budgets)
            .finish_non_exhaustive()
    }
}

fn force_approval(state: &mut WorkflowState, iteration: u32, reason: &str) -> Edge {
    warn!(iteration, reason, "forcing approval");
    state.approval = Some(Assessment::Approved);
    Edge::Approved
}

/// Payload substituted when a stage fails outright.
fn minimal_update(kind: StageKind, state: &WorkflowState) -> StageUpdate {
    let topic = state.topic.as_str();
    match kind {
        StageKind::Plan => StageUpdate::with_plan(ResearchPlan::fallback(topic)),
        StageKind::Research => StageUpdate::with_findings(
            state
                .findings
                .clone()
                .unwrap_or_else(|| SynthesizedData::fallback(topic)),
            Default::default(),
        ),
        StageKind::Write => StageUpdate::with_draft(
            state
                .draft
                .clone()
                .unwrap_or_else(|| fallback_report(topic)),
        ),
        StageKind::Critique => StageUpdate::with_critique(Critique::minimal_approval()),
    }
}

fn notify(progress: Option<&UnboundedSender<ProgressEvent>>, event: ProgressEvent) {
    if let Some(tx) = progress
        && tx.send(event).is_err()
    {
        debug!("progress receiver closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Phase::Planning, Edge::Done, Some(Phase::Researching) ; "plan to research")]
    #[test_case(Phase::Researching, Edge::Done, Some(Phase::Writing) ; "research to write")]
    #[test_case(Phase::Writing, Edge::Done, Some(Phase::Critiquing) ; "write to critique")]
    #[test_case(Phase::Critiquing, Edge::Approved, Some(Phase::Terminal) ; "approved")]
    #[test_case(Phase::Critiquing, Edge::RevisionNeeded, Some(Phase::Writing) ; "revise")]
    #[test_case(Phase::Critiquing, Edge::ResearchInsufficient, Some(Phase::Researching) ; "research more")]
    #[test_case(Phase::Planning, Edge::Approved, None ; "no shortcut")]
    #[test_case(Phase::Terminal, Edge::Done, None ; "terminal absorbs")]
    fn test_transitions(from: Phase, edge: Edge, expected: Option<Phase>) {
        assert_eq!(from.next(edge), expected);
    }

    #[test]
    fn test_progress_event_serialization() {
        let event = ProgressEvent::progress("Planning research approach...");
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["message"], "Planning research approach...");
        assert_eq!(event.name(), "progress");
    }

    #[test]
    fn test_minimal_update_keeps_existing_draft() {
        let mut state = WorkflowState::new("t");
        state.apply(StageUpdate::with_draft("# Existing"));
        let update = minimal_update(StageKind::Write, &state);
        assert_eq!(update.draft.as_deref(), Some("# Existing"));

        let update = minimal_update(StageKind::Critique, &state);
        assert_eq!(
            update.critique.map(|c| c.overall_assessment),
            Some(Assessment::Approved)
        );
    }
}
