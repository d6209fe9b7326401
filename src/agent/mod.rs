//! Multi-agent report generation.
//!
//! Four prompted stages share one [`FallbackClient`] that spreads calls
//! over prioritized model endpoints. The [`Workflow`] engine drives them
//! through a plan/research/write/critique cycle bounded by budgets.
//!
//! # Architecture
//!
//! ```text
//! topic → Workflow
//!   ├── PlannerStage    (research plan)
//!   ├── ResearcherStage (data sources → synthesized findings)
//!   ├── WriterStage     (draft or revision)
//!   └── CriticStage     (approve / revise / research more)
//!         │
//!         └── every model call → FallbackClient → LlmProvider per endpoint
//! ```

pub mod chat;
pub mod client;
pub mod config;
pub mod critic;
pub mod endpoint;
pub mod fallback;
pub mod message;
pub mod planner;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod researcher;
pub mod structured;
pub mod traits;
pub mod workflow;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types
pub use chat::{SessionStore, detect_research_intent};
pub use config::{AgentConfig, EndpointConfig, WorkflowConfig};
pub use critic::CriticStage;
pub use endpoint::{EndpointStatus, ModelEndpoint};
pub use fallback::{FallbackClient, FallbackSettings};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use planner::PlannerStage;
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use researcher::ResearcherStage;
pub use traits::{Agent, PromptedAgent, Stage, StageKind, StageOutcome};
pub use workflow::{Edge, Phase, ProgressEvent, StageSet, Workflow};
pub use writer::WriterStage;
