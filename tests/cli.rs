//! Command-line surface tests.

use std::path::Path;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn mars() -> Command {
    let mut cmd = Command::cargo_bin("mars-rs").unwrap_or_else(|_| unreachable!());
    cmd.env_remove("MARS_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("MARS_MODELS_FILE")
        .env_remove("MARS_PROMPT_DIR")
        .env_remove("MARS_DOMAIN_ONLY")
        .env_remove("RUST_LOG");
    cmd
}

/// Two endpoints pointing at a closed local port.
fn write_models_file(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("models.json");
    let models = serde_json::json!([
        {"name": "primary-model", "api_key": "sk-test", "base_url": "http://127.0.0.1:9/v1", "priority": 1},
        {"name": "backup-model", "api_key": "sk-test", "base_url": "http://127.0.0.1:9/v1", "priority": 2}
    ]);
    std::fs::write(&path, models.to_string()).unwrap_or_else(|_| unreachable!());
    path
}

#[test]
fn test_help_lists_commands() {
    mars()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("research"))
        .stdout(predicate::str::contains("init-prompts"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_research_help_shows_examples() {
    mars()
        .args(["research", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-save"))
        .stdout(predicate::str::contains("Examples:"));
}

#[test]
fn test_research_requires_topic() {
    mars().arg("research").assert().failure();
}

#[test]
fn test_missing_api_key_fails() {
    mars()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("API key"));
}

#[test]
fn test_status_json_from_models_file() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    let models = write_models_file(dir.path());

    let output = mars()
        .arg("--models-file")
        .arg(&models)
        .args(["--format", "json", "status"])
        .output()
        .unwrap_or_else(|_| unreachable!());
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap_or_default();
    assert_eq!(json["endpoints"][0]["name"], "primary-model");
    assert_eq!(json["endpoints"][1]["name"], "backup-model");
    assert_eq!(json["endpoints"][0]["available"], true);
    assert_eq!(json["budgets"]["max_iterations"], 5);
}

#[test]
fn test_init_prompts_writes_templates() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    let prompts = dir.path().join("prompts");

    mars()
        .args(["init-prompts", "--dir"])
        .arg(&prompts)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 6 prompt template(s)"));

    for name in ["planner", "researcher", "expander", "writer", "reviser", "critic"] {
        assert!(prompts.join(format!("{name}.md")).exists(), "missing {name}.md");
    }

    mars()
        .args(["init-prompts", "--dir"])
        .arg(&prompts)
        .assert()
        .success()
        .stdout(predicate::str::contains("already exist"));
}

#[test]
fn test_export_renders_markdown() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    let input = dir.path().join("result.json");
    let output = dir.path().join("out.md");
    let result = serde_json::json!({
        "topic": "gossip protocols",
        "draft": "# gossip protocols\n\n## Spread\n\n- epidemic\n- anti-entropy",
        "final_report": "# gossip protocols\n\n## Spread\n\n- epidemic\n- anti-entropy",
        "iteration": 1,
        "research_attempts": 1,
        "writing_attempts": 1,
        "max_iterations_reached": false,
        "terminal": true,
        "status": "completed"
    });
    std::fs::write(&input, result.to_string()).unwrap_or_else(|_| unreachable!());

    mars()
        .arg("export")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("out.md"));

    let markdown = std::fs::read_to_string(&output).unwrap_or_default();
    assert!(markdown.starts_with("# gossip protocols\n\n## Spread"));
    assert_eq!(markdown.matches("# gossip protocols").count(), 1);
    assert!(markdown.contains("- epidemic\n- anti-entropy"));
}

#[test]
fn test_export_docx_writes_word_document() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    let input = dir.path().join("result.json");
    let result = serde_json::json!({
        "topic": "gossip protocols",
        "draft": "# gossip protocols\n\n## Spread\n\n1. push\n2. pull",
        "final_report": "# gossip protocols\n\n## Spread\n\n1. push\n2. pull",
        "iteration": 1,
        "research_attempts": 1,
        "writing_attempts": 1,
        "max_iterations_reached": false,
        "terminal": true,
        "status": "completed"
    });
    std::fs::write(&input, result.to_string()).unwrap_or_else(|_| unreachable!());

    let output = mars()
        .args(["--format", "json", "export"])
        .arg(&input)
        .arg("--docx")
        .output()
        .unwrap_or_else(|_| unreachable!());
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap_or_default();
    let docx = dir.path().join("result.docx");
    assert_eq!(json["docx_path"], docx.to_string_lossy().as_ref());
    let bytes = std::fs::read(&docx).unwrap_or_default();
    assert!(bytes.starts_with(b"PK"));
}

#[test]
fn test_export_missing_input_fails() {
    mars()
        .args(["export", "/nonexistent/result.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load"));
}

#[test]
fn test_research_with_unreachable_models_still_reports() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    let models = write_models_file(dir.path());

    // Off-domain topics skip the data sources, so nothing leaves the machine.
    mars()
        .arg("--models-file")
        .arg(&models)
        .args(["research", "sourdough baking", "--no-save"])
        .env("MARS_SWITCH_DELAY_SECS", "0")
        .timeout(Duration::from_secs(120))
        .assert()
        .success()
        .stdout(predicate::str::contains("# Research Report: sourdough baking"))
        .stdout(predicate::str::contains("Status: Completed"));
}
