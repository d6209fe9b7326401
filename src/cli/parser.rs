//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// mars-rs: multi-agent research reports.
///
/// Plans, researches, writes and critiques a technical report on a topic,
/// spreading model calls over prioritized endpoints.
#[derive(Parser, Debug)]
#[command(name = "mars-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// JSON file listing model endpoints.
    #[arg(long, env = "MARS_MODELS_FILE", global = true)]
    pub models_file: Option<PathBuf>,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a topic and write a report.
    ///
    /// Runs plan → research → write → critique until the critic approves
    /// or a budget forces approval. The report is saved as JSON and
    /// markdown unless `--no-save` is given.
    #[command(after_help = r#"Examples:
  mars-rs research "vector databases"                  # Research and save
  mars-rs research "raft consensus" --progress         # Show stage progress
  mars-rs research "CRDTs" --no-save --format json     # Print the full result
  mars-rs research "wasm runtimes" --max-iterations 3 --output-dir reports
  OPENAI_API_KEY=sk-... mars-rs research "edge caching"
"#)]
    Research {
        /// The research topic.
        topic: String,

        /// Print progress messages to stderr.
        #[arg(short, long)]
        progress: bool,

        /// Do not save the report files.
        #[arg(long)]
        no_save: bool,

        /// Directory for saved reports.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Directory containing prompt template files.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,

        /// Maximum critique cycles.
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Accept topics outside computer science and IT.
        #[arg(long)]
        any_domain: bool,
    },

    /// Show configured model endpoints and budgets.
    #[command(after_help = r#"Examples:
  mars-rs status
  mars-rs --models-file models.json status
  mars-rs --format json status | jq '.endpoints[].name'
"#)]
    Status,

    /// Write the default prompt templates for customization.
    ///
    /// Existing files are never overwritten.
    #[command(after_help = r#"Examples:
  mars-rs init-prompts                       # ~/.config/mars-rs/prompts
  mars-rs init-prompts --dir ./prompts       # Custom directory
"#)]
    InitPrompts {
        /// Target directory.
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Render a saved JSON result as a markdown (and optionally Word) report.
    #[command(after_help = r#"Examples:
  mars-rs export outputs/report_raft_20250101_120000.json
  mars-rs export result.json --output raft.md
  mars-rs export result.json --docx              # Also write result.docx
"#)]
    Export {
        /// Saved result JSON file.
        input: PathBuf,

        /// Markdown output path (defaults to the input path with `.md`).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write a Word document next to the markdown file.
        #[arg(long)]
        docx: bool,
    },

    /// Start MCP (Model Context Protocol) server.
    #[cfg(feature = "mcp")]
    #[command(subcommand)]
    Mcp(McpCommands),
}

/// MCP server subcommands.
#[cfg(feature = "mcp")]
#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Start MCP server with stdio transport.
    ///
    /// Reads JSON-RPC messages from stdin, writes responses to stdout.
    #[command(after_help = r#"Examples:
  mars-rs mcp stdio                         # Start stdio MCP server
  OPENAI_API_KEY=sk-... mars-rs mcp stdio   # With API key
"#)]
    Stdio,

    /// Start the HTTP server.
    ///
    /// Serves streamable MCP at `/mcp`, plus `POST /research` (JSON or SSE)
    /// and `GET /status`.
    #[command(after_help = r#"Examples:
  mars-rs mcp http                            # Listen on 127.0.0.1:3000
  mars-rs mcp http --host 0.0.0.0 --port 8080
  curl -N -X POST localhost:3000/research -H 'content-type: application/json' \
       -d '{"topic": "vector databases", "stream": true}'
"#)]
    Http {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to.
        #[arg(long, default_value = "3000")]
        port: u16,
    },
}
