//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. Async work runs on a
//! runtime created per command.

use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::agent::config::AgentConfig;
use crate::agent::{FallbackClient, ProgressEvent, PromptSet, Workflow};
use crate::cli::output::{OutputFormat, format_result, format_status};
#[cfg(feature = "mcp")]
use crate::cli::parser::McpCommands;
use crate::cli::parser::{Cli, Commands};
use crate::core::WorkflowResult;
use crate::error::{CommandError, Result};
use crate::export::{ReportDocument, load_report, save_report, write_docx, write_markdown};

/// Parameters for the research command.
#[derive(Debug, Clone, Default)]
pub struct ResearchParams<'a> {
    /// The research topic.
    pub topic: &'a str,
    /// Print progress messages to stderr.
    pub progress: bool,
    /// Skip saving report files.
    pub no_save: bool,
    /// Directory for saved reports.
    pub output_dir: Option<&'a Path>,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<&'a Path>,
    /// Maximum critique cycles.
    pub max_iterations: Option<u32>,
    /// Accept topics outside computer science and IT.
    pub any_domain: bool,
}

/// Executes the CLI command.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let models_file = cli.models_file.as_deref();

    match &cli.command {
        Commands::Research {
            topic,
            progress,
            no_save,
            output_dir,
            prompt_dir,
            max_iterations,
            any_domain,
        } => {
            let params = ResearchParams {
                topic,
                progress: *progress,
                no_save: *no_save,
                output_dir: output_dir.as_deref(),
                prompt_dir: prompt_dir.as_deref(),
                max_iterations: *max_iterations,
                any_domain: *any_domain,
            };
            cmd_research(&params, models_file, format)
        }
        Commands::Status => cmd_status(models_file, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
        Commands::Export {
            input,
            output,
            docx,
        } => cmd_export(input, output.as_deref(), *docx, format),
        #[cfg(feature = "mcp")]
        Commands::Mcp(sub) => cmd_mcp(sub, models_file),
    }
}

fn load_config(
    models_file: Option<&Path>,
    params: Option<&ResearchParams<'_>>,
) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder().from_env();
    if let Some(path) = models_file {
        builder = builder.models_file(path);
    }
    if let Some(params) = params {
        if let Some(dir) = params.output_dir {
            builder = builder.output_dir(dir);
        }
        if let Some(dir) = params.prompt_dir {
            builder = builder.prompt_dir(dir);
        }
        if let Some(n) = params.max_iterations {
            builder = builder.max_iterations(n);
        }
        if params.any_domain {
            builder = builder.domain_only(false);
        }
    }

    builder.build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Agent configuration error: {e}")).into()
    })
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

/// Runs a research workflow and optionally saves the report.
fn cmd_research(
    params: &ResearchParams<'_>,
    models_file: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    if params.topic.trim().is_empty() {
        return Err(CommandError::InvalidArgument("topic must not be empty".to_string()).into());
    }

    let config = load_config(models_file, Some(params))?;
    let workflow = Workflow::from_config(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create workflow: {e}"))
    })?;

    let rt = runtime()?;
    let result = rt.block_on(run_workflow(&workflow, params.topic, params.progress));

    let saved = if params.no_save {
        None
    } else {
        Some(save_report(&config.output_dir, &result).map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to save report: {e}"))
        })?)
    };

    match format {
        OutputFormat::Text => Ok(format_result(&result, saved.as_ref())),
        OutputFormat::Json => Ok(format.to_json(&result)),
    }
}

async fn run_workflow(workflow: &Workflow, topic: &str, progress: bool) -> WorkflowResult {
    if !progress {
        return workflow.run(topic).await;
    }

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let line = match event {
                ProgressEvent::Progress { message } | ProgressEvent::Error { message } => message,
                ProgressEvent::Result { .. } => continue,
            };
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "[{}] {line}", Local::now().format("%H:%M:%S"));
        }
    });

    let result = workflow.run_with_progress(topic, &tx).await;
    drop(tx);
    let _ = printer.await;
    result
}

/// Shows endpoint health and budgets.
fn cmd_status(models_file: Option<&Path>, format: OutputFormat) -> Result<String> {
    let config = load_config(models_file, None)?;
    let client = FallbackClient::from_config(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create model client: {e}"))
    })?;
    let endpoints = client.status();

    match format {
        OutputFormat::Text => Ok(format_status(&config, &endpoints)),
        OutputFormat::Json => {
            let json = serde_json::json!({
                "endpoints": endpoints,
                "budgets": {
                    "max_iterations": config.workflow.max_iterations,
                    "max_research_attempts": config.workflow.max_research_attempts,
                    "max_writing_attempts": config.workflow.max_writing_attempts,
                },
                "domain_only": config.domain_only,
                "output_dir": config.output_dir.to_string_lossy(),
            });
            Ok(format.to_json(&json))
        }
    }
}

/// Writes the default prompt templates.
fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown");
                output.push_str("  ");
                output.push_str(name);
                output.push('\n');
            }
            output.push_str("\nEdit these files to customize stage system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}

/// Renders a saved result as markdown, plus a Word document when asked.
fn cmd_export(
    input: &Path,
    output: Option<&Path>,
    docx: bool,
    format: OutputFormat,
) -> Result<String> {
    let result = load_report(input).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to load {}: {e}", input.display()))
    })?;
    let target = output.map_or_else(|| input.with_extension("md"), Path::to_path_buf);
    write_markdown(&target, &result).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write {}: {e}", target.display()))
    })?;

    let docx_target = if docx {
        let path = target.with_extension("docx");
        write_docx(&path, &ReportDocument::from_result(&result)).map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to write {}: {e}", path.display()))
        })?;
        Some(path)
    } else {
        None
    };

    match format {
        OutputFormat::Text => {
            let mut out = format!("Exported report to: {}\n", target.display());
            if let Some(ref path) = docx_target {
                out.push_str(&format!("Word document: {}\n", path.display()));
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "topic": result.state.topic,
            "markdown_path": target.to_string_lossy(),
            "docx_path": docx_target.as_ref().map(|p| p.to_string_lossy()),
        }))),
    }
}

/// Starts the MCP server with the specified transport.
///
/// Runs until the client disconnects (stdio) or the server is stopped
/// (HTTP).
#[cfg(feature = "mcp")]
fn cmd_mcp(cmd: &McpCommands, models_file: Option<&Path>) -> Result<String> {
    use crate::mcp::{MarsMcpServer, serve_http, serve_stdio};

    let config = load_config(models_file, None)?;
    let server = MarsMcpServer::new(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create MCP server: {e}"))
    })?;

    let rt = runtime()?;
    rt.block_on(async {
        match cmd {
            McpCommands::Stdio => serve_stdio(server).await,
            McpCommands::Http { host, port } => serve_http(server, host, *port).await,
        }
    })
    .map_err(|e| CommandError::ExecutionFailed(format!("MCP server error: {e}")))?;

    Ok(String::new())
}
