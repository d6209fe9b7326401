//! Output formatting for CLI commands.

#![allow(clippy::format_push_string)]

use serde::Serialize;

use crate::agent::EndpointStatus;
use crate::agent::config::AgentConfig;
use crate::core::WorkflowResult;
use crate::export::SavedReport;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; anything other than `json` is text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }

    /// Serializes a value as pretty JSON with a trailing newline.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        let mut json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
        json.push('\n');
        json
    }
}

/// Text summary of a finished run.
#[must_use]
pub fn format_result(result: &WorkflowResult, saved: Option<&SavedReport>) -> String {
    let state = &result.state;
    let mut out = String::new();
    out.push_str(result.final_report().trim_end());
    out.push_str("\n\n---\n");
    out.push_str(&format!(
        "Topic: {} | Status: {:?} | Iterations: {} | Research passes: {} | Drafts: {}",
        state.topic,
        result.status,
        state.iteration(),
        state.research_attempts(),
        state.writing_attempts(),
    ));
    if state.max_iterations_reached() {
        out.push_str(" | max iterations reached");
    }
    out.push('\n');
    if let Some(ref error) = result.error {
        out.push_str(&format!("Error: {error}\n"));
    }
    if let Some(saved) = saved {
        out.push_str(&format!(
            "Saved: {}\n       {}\n       {}\n",
            saved.json_path.display(),
            saved.markdown_path.display(),
            saved.docx_path.display()
        ));
    }
    out
}

/// Text listing of endpoint health and workflow budgets.
#[must_use]
pub fn format_status(config: &AgentConfig, endpoints: &[EndpointStatus]) -> String {
    let mut out = String::from("Model endpoints (priority order):\n");
    for ep in endpoints {
        let state = if ep.rate_limited {
            "rate limited"
        } else if ep.available {
            "available"
        } else {
            "unavailable"
        };
        out.push_str(&format!(
            "  [{}] {:<24} {:<12} errors: {}\n",
            ep.priority, ep.name, state, ep.error_count
        ));
    }
    let budgets = config.workflow;
    out.push_str(&format!(
        "\nBudgets: {} iterations, {} research passes, {} drafts\n",
        budgets.max_iterations, budgets.max_research_attempts, budgets.max_writing_attempts
    ));
    out.push_str(&format!(
        "Domain gate: {}\nOutput directory: {}\n",
        if config.domain_only { "CS/IT only" } else { "off" },
        config.output_dir.display()
    ));
    out
}
