//! CLI layer for mars-rs.
//!
//! Provides the command-line interface using clap, with commands for
//! running research, inspecting endpoints, managing prompt templates,
//! exporting reports, and serving MCP.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
#[cfg(feature = "mcp")]
pub use parser::McpCommands;
pub use parser::{Cli, Commands};
