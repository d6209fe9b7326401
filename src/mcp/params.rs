//! MCP tool parameter types.
//!
//! Defines the input schemas for MCP tools using `schemars` for automatic
//! JSON Schema generation required by the MCP protocol.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Parameters for the `research` MCP tool.
///
/// Runs the full workflow: plan → research → write → critique.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResearchParams {
    /// The research topic.
    pub topic: String,
}

/// Body of `POST /research`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    /// The research topic.
    pub topic: String,

    /// Stream progress as server-sent events instead of returning one JSON result.
    #[serde(default)]
    pub stream: bool,
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatBody {
    /// Session to continue; a new session is opened when absent or unknown.
    #[serde(default)]
    pub session_id: Option<Uuid>,

    /// The user's message.
    pub message: String,

    /// Sampling temperature for a direct reply.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Stream workflow progress when the message is a research request.
    #[serde(default)]
    pub stream: bool,
}
