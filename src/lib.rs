//! # mars-rs
//!
//! Multi-agent research reports.
//!
//! A topic goes through four model-backed stages: a planner drafts research
//! questions, a researcher synthesizes data pulled from arXiv, GitHub,
//! Stack Overflow and Hacker News, a writer drafts the report, and a critic
//! approves it or sends it back for revision or more research. Budgets on
//! iterations and attempts guarantee the cycle ends, and every stage has a
//! fallback payload so a run always produces a report.
//!
//! Model calls go through a [`FallbackClient`] that spreads requests over
//! prioritized endpoints, cooling down rate-limited ones and retiring
//! endpoints that keep failing.
//!
//! ## Example
//!
//! ```no_run
//! use mars_rs::{AgentConfig, Workflow};
//!
//! # async fn run() -> mars_rs::Result<()> {
//! let config = AgentConfig::builder().from_env().build()?;
//! let workflow = Workflow::from_config(&config)?;
//! let result = workflow.run("vector databases").await;
//! assert!(!result.final_report().is_empty());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
pub mod export;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod sources;

use tracing_subscriber::EnvFilter;

// Re-export commonly used types
pub use agent::{AgentConfig, FallbackClient, ProgressEvent, Workflow};
pub use crate::core::{Assessment, WorkflowResult, WorkflowState, WorkflowStatus};
pub use error::{AgentError, CommandError, Error, Result};
pub use export::{ReportDocument, save_report};

/// Installs the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` overrides the default filter (`mars_rs=info`, or
/// `mars_rs=debug` when `verbose`). `LOG_FORMAT=json` switches to JSON
/// lines. Calling this more than once is harmless.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "mars_rs=debug" } else { "mars_rs=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let _ = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
    };
}
