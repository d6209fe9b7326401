//! Workflow state threaded through every stage.
//!
//! The engine exclusively owns and mutates a [`WorkflowState`]. Stages read
//! it by reference and return a [`StageUpdate`] that the engine merges with
//! [`WorkflowState::apply`]. Counters, pagination offsets, and the terminal
//! flag are private so only the engine can move them, and only forward.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::assessment::Assessment;
use super::research::{Critique, ResearchPlan, SynthesizedData};

/// Final report text used when no draft was ever produced.
pub const NO_REPORT_SENTINEL: &str = "No report generated";

/// Per-source pagination offsets.
///
/// Offsets only grow: each research pass advances a source by exactly the
/// number of items it returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceOffsets(BTreeMap<String, usize>);

impl SourceOffsets {
    /// Current offset for a source (0 if never fetched).
    #[must_use]
    pub fn get(&self, source: &str) -> usize {
        self.0.get(source).copied().unwrap_or(0)
    }

    /// Advances a source's offset by `fetched` items.
    pub fn advance(&mut self, source: &str, fetched: usize) {
        let offset = self.0.entry(source.to_string()).or_insert(0);
        *offset = offset.saturating_add(fetched);
    }

    /// Iterates over `(source, offset)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Partial update returned by a stage.
///
/// `None` fields leave the state untouched. Attempt counters are not part
/// of the update; the engine increments them itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageUpdate {
    /// New research plan.
    pub plan: Option<ResearchPlan>,
    /// New synthesized findings.
    pub findings: Option<SynthesizedData>,
    /// New draft report.
    pub draft: Option<String>,
    /// New critique (also sets feedback and approval).
    pub critique: Option<Critique>,
    /// Items returned per source during this stage.
    pub fetched: BTreeMap<String, usize>,
}

impl StageUpdate {
    /// Update carrying only a plan.
    #[must_use]
    pub fn with_plan(plan: ResearchPlan) -> Self {
        Self {
            plan: Some(plan),
            ..Self::default()
        }
    }

    /// Update carrying findings and the per-source fetch counts behind them.
    #[must_use]
    pub fn with_findings(findings: SynthesizedData, fetched: BTreeMap<String, usize>) -> Self {
        Self {
            findings: Some(findings),
            fetched,
            ..Self::default()
        }
    }

    /// Update carrying only a draft.
    #[must_use]
    pub fn with_draft(draft: impl Into<String>) -> Self {
        Self {
            draft: Some(draft.into()),
            ..Self::default()
        }
    }

    /// Update carrying only a critique.
    #[must_use]
    pub fn with_critique(critique: Critique) -> Self {
        Self {
            critique: Some(critique),
            ..Self::default()
        }
    }
}

/// The record threaded through one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Research topic supplied by the caller.
    pub topic: String,
    /// Research plan.
    pub plan: Option<ResearchPlan>,
    /// Synthesized findings.
    pub findings: Option<SynthesizedData>,
    /// Current draft report.
    pub draft: Option<String>,
    /// Full critique of the latest draft.
    pub critique: Option<Critique>,
    /// Feedback text from the latest critique.
    pub critique_feedback: Option<String>,
    /// Latest approval decision.
    pub approval: Option<Assessment>,
    /// Final report, set on reaching the terminal state.
    pub final_report: Option<String>,
    iteration: u32,
    research_attempts: u32,
    writing_attempts: u32,
    max_iterations_reached: bool,
    #[serde(default)]
    offsets: SourceOffsets,
    terminal: bool,
}

impl WorkflowState {
    /// Creates a fresh state holding only the topic.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            plan: None,
            findings: None,
            draft: None,
            critique: None,
            critique_feedback: None,
            approval: None,
            final_report: None,
            iteration: 0,
            research_attempts: 0,
            writing_attempts: 0,
            max_iterations_reached: false,
            offsets: SourceOffsets::default(),
            terminal: false,
        }
    }

    /// Number of critique decisions made so far.
    #[must_use]
    pub const fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Number of research stage invocations.
    #[must_use]
    pub const fn research_attempts(&self) -> u32 {
        self.research_attempts
    }

    /// Number of writing stage invocations.
    #[must_use]
    pub const fn writing_attempts(&self) -> u32 {
        self.writing_attempts
    }

    /// Whether approval was forced by the iteration budget.
    #[must_use]
    pub const fn max_iterations_reached(&self) -> bool {
        self.max_iterations_reached
    }

    /// Whether the run reached the terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Per-source pagination offsets.
    #[must_use]
    pub const fn offsets(&self) -> &SourceOffsets {
        &self.offsets
    }

    /// Merges a stage update into the state.
    pub fn apply(&mut self, update: StageUpdate) {
        if let Some(plan) = update.plan {
            self.plan = Some(plan);
        }
        if let Some(findings) = update.findings {
            self.findings = Some(findings);
        }
        if let Some(draft) = update.draft {
            self.draft = Some(draft);
        }
        if let Some(critique) = update.critique {
            self.critique_feedback = Some(critique.specific_feedback.clone());
            self.approval = Some(critique.overall_assessment);
            self.critique = Some(critique);
        }
        for (source, fetched) in &update.fetched {
            self.offsets.advance(source, *fetched);
        }
    }

    pub(crate) const fn begin_research(&mut self) {
        self.research_attempts += 1;
    }

    pub(crate) const fn begin_writing(&mut self) {
        self.writing_attempts += 1;
    }

    pub(crate) const fn advance_iteration(&mut self) -> u32 {
        self.iteration += 1;
        self.iteration
    }

    pub(crate) const fn flag_max_iterations(&mut self) {
        self.max_iterations_reached = true;
    }

    /// Enters the terminal state: the final report becomes the latest draft.
    pub(crate) fn finish(&mut self) {
        let report = self
            .draft
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(NO_REPORT_SENTINEL);
        self.final_report = Some(report.to_string());
        self.terminal = true;
    }
}

/// Outcome class of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    /// The run reached the terminal state normally.
    Completed,
    /// A fatal error escaped the engine.
    Failed,
}

/// Result returned to workflow callers.
///
/// `final_report` is always non-empty. `error` is present only for
/// fatal-class failures; degraded stage output is visible in logs only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// Final state of the run.
    #[serde(flatten)]
    pub state: WorkflowState,
    /// Completed or failed.
    pub status: WorkflowStatus,
    /// Fatal error description, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowResult {
    /// The final report text.
    #[must_use]
    pub fn final_report(&self) -> &str {
        self.state
            .final_report
            .as_deref()
            .unwrap_or(NO_REPORT_SENTINEL)
    }

    /// Builds the result for a run that reached the terminal state.
    #[must_use]
    pub fn completed(state: WorkflowState) -> Self {
        Self {
            state,
            status: WorkflowStatus::Completed,
            error: None,
        }
    }

    /// Builds the result for a run aborted by a fatal error.
    #[must_use]
    pub fn failed(mut state: WorkflowState, error: &impl std::fmt::Display) -> Self {
        state.final_report = Some(format!("Error generating research report: {error}"));
        state.terminal = true;
        Self {
            state,
            status: WorkflowStatus::Failed,
            error: Some(error.to_string()),
        }
    }
}
