//! Core domain types.
//!
//! Pure data shared by the agent layer, the CLI, and the server surfaces:
//! the workflow state record, stage payloads, and the critique verdict.

pub mod assessment;
pub mod research;
pub mod state;

pub use assessment::Assessment;
pub use research::{
    Critique, FALLBACK_APPROVAL_MIN_CHARS, ResearchPlan, SourceSummary, SynthesizedData,
};
pub use state::{
    NO_REPORT_SENTINEL, SourceOffsets, StageUpdate, WorkflowResult, WorkflowState, WorkflowStatus,
};
