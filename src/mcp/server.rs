//! MCP server implementation for mars-rs.
//!
//! Exposes the research workflow and model endpoint health as MCP tools.
//! The workflow and the fallback client are built once and shared by every
//! session.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use serde::Serialize;
use tracing::info;

use crate::agent::config::AgentConfig;
use crate::agent::{FallbackClient, Workflow};
use crate::error::AgentError;

use super::params::ResearchParams;

fn json_content<T: Serialize + ?Sized>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// mars-rs MCP server.
///
/// Provides tools for running research workflows and inspecting or
/// resetting model endpoints.
#[derive(Clone)]
pub struct MarsMcpServer {
    tool_router: ToolRouter<Self>,
    workflow: Arc<Workflow>,
    client: Arc<FallbackClient>,
}

impl MarsMcpServer {
    /// Creates a server with one model client shared by the workflow and
    /// the status tools.
    ///
    /// # Errors
    ///
    /// Returns an error if the model client or the workflow cannot be built.
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let client = Arc::new(FallbackClient::from_config(config)?);
        let workflow = Workflow::with_client(config, Arc::clone(&client))?;
        Ok(Self::from_parts(Arc::new(workflow), client))
    }

    /// Creates a server over an existing workflow and client.
    #[must_use]
    pub fn from_parts(workflow: Arc<Workflow>, client: Arc<FallbackClient>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            workflow,
            client,
        }
    }

    /// The shared workflow.
    #[must_use]
    pub fn workflow(&self) -> Arc<Workflow> {
        Arc::clone(&self.workflow)
    }

    /// The shared model client.
    #[must_use]
    pub fn client(&self) -> Arc<FallbackClient> {
        Arc::clone(&self.client)
    }
}

#[tool_router]
impl MarsMcpServer {
    /// Run the full research workflow on a topic.
    #[tool(
        name = "research",
        description = "Research a computer science or IT topic and write a report. Plans the research, gathers data from arXiv, GitHub, Stack Overflow and Hacker News, drafts a report, and revises it until a critic approves or a budget is reached. Returns JSON with the final report, the intermediate plan, findings and critique, and the workflow counters."
    )]
    async fn research(
        &self,
        Parameters(params): Parameters<ResearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let topic = params.topic.trim();
        if topic.is_empty() {
            return Err(McpError::invalid_params("topic must not be empty", None));
        }
        info!(topic, "mcp research request");
        let result = self.workflow.run(topic).await;
        json_content(&result)
    }

    /// Report the health of every model endpoint.
    #[tool(
        name = "model_status",
        description = "List configured model endpoints in priority order with availability, rate-limit state and consecutive error counts."
    )]
    async fn model_status(&self) -> Result<CallToolResult, McpError> {
        json_content(&self.client.status())
    }

    /// Clear error counts and rate limits.
    #[tool(
        name = "reset_models",
        description = "Clear error counts and rate-limit cooldowns on every model endpoint, making all of them selectable again. Returns the refreshed endpoint status."
    )]
    async fn reset_models(&self) -> Result<CallToolResult, McpError> {
        self.client.reset_all();
        json_content(&self.client.status())
    }
}

#[tool_handler]
impl ServerHandler for MarsMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mars-rs".to_string(),
                title: Some("MARS-RS MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "MARS-RS: multi-agent research reports. Use the `research` tool to produce a \
                 technical report on a topic. `model_status` and `reset_models` inspect and \
                 reset the model endpoints the workflow falls back across."
                    .to_string(),
            ),
        }
    }
}
