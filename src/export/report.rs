//! Report persistence.
//!
//! A finished run is saved three times: the full [`WorkflowResult`] as
//! JSON, and the final report rendered as markdown and as a Word document.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::info;

use super::docx::write_docx;
use super::markdown::{Block, parse_blocks, render_markdown};
use crate::core::WorkflowResult;
use crate::error::Result;

/// Stem used when a topic has no usable characters.
const FALLBACK_STEM: &str = "report";

/// Title plus parsed body of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    /// Document title (the research topic).
    pub title: String,
    /// Body blocks.
    pub blocks: Vec<Block>,
}

impl ReportDocument {
    /// Parses a markdown body under the given title.
    #[must_use]
    pub fn new(title: impl Into<String>, body: &str) -> Self {
        Self {
            title: title.into(),
            blocks: parse_blocks(body),
        }
    }

    /// Document for a workflow result's final report.
    #[must_use]
    pub fn from_result(result: &WorkflowResult) -> Self {
        Self::new(result.state.topic.clone(), result.final_report())
    }

    /// Renders the document as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        render_markdown(&self.title, &self.blocks)
    }
}

/// Paths written by [`save_report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedReport {
    /// Full result as JSON.
    pub json_path: PathBuf,
    /// Rendered markdown report.
    pub markdown_path: PathBuf,
    /// Rendered Word report.
    pub docx_path: PathBuf,
}

/// File-name-safe form of a topic.
///
/// Keeps alphanumerics, spaces, `-` and `_`; spaces become underscores.
#[must_use]
pub fn safe_file_stem(topic: &str) -> String {
    let stem: String = topic
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .replace(' ', "_");
    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem
    }
}

/// Saves the result JSON and the markdown and Word reports into `dir`.
///
/// The directory is created if needed. The JSON file name carries a local
/// timestamp so repeated runs on one topic do not collide.
///
/// # Errors
///
/// Returns an error if the directory or any file cannot be written.
pub fn save_report(dir: &Path, result: &WorkflowResult) -> Result<SavedReport> {
    fs::create_dir_all(dir)?;
    let stem = safe_file_stem(&result.state.topic);
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    let json_path = dir.join(format!("report_{stem}_{timestamp}.json"));
    fs::write(&json_path, serde_json::to_string_pretty(result)?)?;

    let markdown_path = dir.join(format!("{stem}_report.md"));
    write_markdown(&markdown_path, result)?;

    let docx_path = dir.join(format!("{stem}_report.docx"));
    write_docx(&docx_path, &ReportDocument::from_result(result))?;

    info!(
        json = %json_path.display(),
        markdown = %markdown_path.display(),
        docx = %docx_path.display(),
        "report saved"
    );
    Ok(SavedReport {
        json_path,
        markdown_path,
        docx_path,
    })
}

/// Writes a result's report as markdown to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_markdown(path: &Path, result: &WorkflowResult) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, ReportDocument::from_result(result).to_markdown())?;
    Ok(())
}

/// Loads a result saved by [`save_report`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a saved result.
pub fn load_report(path: &Path) -> Result<WorkflowResult> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{StageUpdate, WorkflowState};
    use tempfile::TempDir;
    use test_case::test_case;

    fn finished(topic: &str, draft: &str) -> WorkflowResult {
        let mut state = WorkflowState::new(topic);
        state.apply(StageUpdate::with_draft(draft));
        state.final_report = Some(draft.to_string());
        WorkflowResult::completed(state)
    }

    #[test_case("vector databases", "vector_databases" ; "spaces")]
    #[test_case("C++/Rust: FFI?", "CRust_FFI" ; "punctuation")]
    #[test_case("  edge-case_topic ", "edge-case_topic" ; "trimmed")]
    #[test_case("???", "report" ; "nothing left")]
    fn test_safe_file_stem(topic: &str, expected: &str) {
        assert_eq!(safe_file_stem(topic), expected);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let result = finished("raft consensus", "# raft consensus\n\n## Summary\n\nLeader election.");

        let saved = save_report(dir.path(), &result).unwrap_or_else(|_| unreachable!());
        let name = saved
            .json_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        assert!(name.starts_with("report_raft_consensus_"));
        assert!(name.ends_with(".json"));
        assert!(saved.markdown_path.ends_with("raft_consensus_report.md"));
        assert!(saved.docx_path.ends_with("raft_consensus_report.docx"));
        assert!(saved.docx_path.exists());

        let loaded = load_report(&saved.json_path).unwrap_or_else(|_| unreachable!());
        assert_eq!(loaded, result);

        let markdown = fs::read_to_string(&saved.markdown_path).unwrap_or_default();
        assert_eq!(markdown, "# raft consensus\n\n## Summary\n\nLeader election.\n");
    }

    #[test]
    fn test_load_rejects_non_result() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let path = dir.path().join("x.json");
        fs::write(&path, "{\"hello\": 1}").unwrap_or_else(|_| unreachable!());
        assert!(load_report(&path).is_err());
    }
}
