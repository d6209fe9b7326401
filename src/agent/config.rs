//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! Model endpoints come from a JSON file (`MARS_MODELS_FILE`) when one is
//! given, otherwise from a primary and a fallback model sharing one API key.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Default primary model.
const DEFAULT_PRIMARY_MODEL: &str = "gpt-4o";
/// Default fallback model.
const DEFAULT_FALLBACK_MODEL: &str = "gpt-4o-mini";
/// Default provider for endpoints that do not name one.
const DEFAULT_PROVIDER: &str = "openai";
/// Default sampling temperature for an endpoint.
const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default maximum output tokens for an endpoint.
const DEFAULT_MAX_TOKENS: u32 = 8192;
/// Consecutive generic failures before an endpoint is marked unavailable.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default rate-limit cooldown in seconds.
const DEFAULT_RATE_LIMIT_COOLDOWN_SECS: u64 = 60;
/// Default delay between endpoint attempts in seconds.
const DEFAULT_SWITCH_DELAY_SECS: u64 = 5;
/// Default HTTP timeout for data-source requests in seconds.
const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 10;
/// Default critique-cycle budget.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;
/// Default research-attempt budget.
pub const DEFAULT_MAX_RESEARCH_ATTEMPTS: u32 = 2;
/// Default writing-attempt budget.
pub const DEFAULT_MAX_WRITING_ATTEMPTS: u32 = 2;
/// Default report output directory.
const DEFAULT_OUTPUT_DIR: &str = "outputs";

const fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

const fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

const fn default_priority() -> u32 {
    1
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

/// One configured model endpoint.
///
/// Deserializes from entries of the models file:
///
/// ```json
/// [{"name": "gpt-4o", "api_key_env": "OPENAI_API_KEY", "priority": 1},
///  {"name": "gemini-1.5-flash", "base_url": "https://generativelanguage.googleapis.com/v1beta/openai/",
///   "api_key_env": "GOOGLE_API_KEY", "priority": 2}]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Model identifier sent to the provider.
    pub name: String,
    /// Provider backend (only `"openai"`-compatible today).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Literal API key.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Base URL override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Default sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum output tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Selection priority; lower is preferred.
    #[serde(default = "default_priority")]
    pub priority: u32,
}

impl EndpointConfig {
    /// Creates an endpoint with default generation parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            provider: default_provider(),
            api_key: None,
            api_key_env: None,
            base_url: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            priority,
        }
    }

    /// Sets a literal API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets a base URL override.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Fills in the API key from `api_key_env`, then from `fallback_key`.
    fn resolve_api_key(&mut self, fallback_key: Option<&str>) -> Result<(), AgentError> {
        if self.api_key.is_none() {
            self.api_key = self
                .api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
                .or_else(|| fallback_key.map(String::from));
        }
        if self.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(AgentError::ApiKeyMissing {
                endpoint: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// Loads endpoint definitions from a JSON file.
///
/// # Errors
///
/// Returns [`AgentError::Config`] if the file cannot be read or parsed.
pub fn load_endpoints(path: &Path) -> Result<Vec<EndpointConfig>, AgentError> {
    let raw = std::fs::read_to_string(path).map_err(|e| AgentError::Config {
        message: format!("cannot read models file {}: {e}", path.display()),
    })?;
    serde_json::from_str(&raw).map_err(|e| AgentError::Config {
        message: format!("invalid models file {}: {e}", path.display()),
    })
}

/// Budgets that bound a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Maximum critique cycles.
    pub max_iterations: u32,
    /// Research invocations after which approval is forced.
    pub max_research_attempts: u32,
    /// Writing invocations after which approval is forced.
    pub max_writing_attempts: u32,
}

impl WorkflowConfig {
    /// Hard cap on stage invocations in one run.
    ///
    /// Planning runs once and every critique cycle runs at most three
    /// stages, so exceeding this means the transition table is broken.
    #[must_use]
    pub const fn step_limit(&self) -> usize {
        (self.max_iterations as usize + 1) * 4
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_research_attempts: DEFAULT_MAX_RESEARCH_ATTEMPTS,
            max_writing_attempts: DEFAULT_MAX_WRITING_ATTEMPTS,
        }
    }
}

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model endpoints, sorted by priority.
    pub endpoints: Vec<EndpointConfig>,
    /// Consecutive generic failures before an endpoint is disabled.
    pub max_retries: u32,
    /// How long a rate-limited endpoint is skipped.
    pub rate_limit_cooldown: Duration,
    /// Delay before trying the next endpoint after a failure.
    pub switch_delay: Duration,
    /// HTTP timeout for data-source requests.
    pub source_timeout: Duration,
    /// Workflow budgets.
    pub workflow: WorkflowConfig,
    /// Reject topics outside computer science and IT.
    pub domain_only: bool,
    /// Directory containing prompt template files.
    ///
    /// When set, stage system prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for any missing files.
    pub prompt_dir: Option<PathBuf>,
    /// Directory where reports are saved.
    pub output_dir: PathBuf,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if an endpoint has no API key,
    /// or [`AgentError::Config`] if the models file is invalid.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|v| v.trim().parse().ok())
}

fn env_bool(var: &str) -> Option<bool> {
    std::env::var(var)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    endpoints: Vec<EndpointConfig>,
    models_file: Option<PathBuf>,
    api_key: Option<String>,
    base_url: Option<String>,
    primary_model: Option<String>,
    fallback_model: Option<String>,
    max_retries: Option<u32>,
    rate_limit_cooldown: Option<Duration>,
    switch_delay: Option<Duration>,
    source_timeout: Option<Duration>,
    max_iterations: Option<u32>,
    max_research_attempts: Option<u32>,
    max_writing_attempts: Option<u32>,
    domain_only: Option<bool>,
    prompt_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.models_file.is_none() {
            self.models_file = std::env::var("MARS_MODELS_FILE").ok().map(PathBuf::from);
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("MARS_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("MARS_BASE_URL")
                .or_else(|_| std::env::var("OPENAI_BASE_URL"))
                .ok();
        }
        if self.primary_model.is_none() {
            self.primary_model = std::env::var("MARS_MODEL").ok();
        }
        if self.fallback_model.is_none() {
            self.fallback_model = std::env::var("MARS_FALLBACK_MODEL").ok();
        }
        if self.max_retries.is_none() {
            self.max_retries = env_parse("MARS_MAX_RETRIES");
        }
        if self.rate_limit_cooldown.is_none() {
            self.rate_limit_cooldown =
                env_parse("MARS_RATE_LIMIT_COOLDOWN_SECS").map(Duration::from_secs);
        }
        if self.switch_delay.is_none() {
            self.switch_delay = env_parse("MARS_SWITCH_DELAY_SECS").map(Duration::from_secs);
        }
        if self.max_iterations.is_none() {
            self.max_iterations = env_parse("MARS_MAX_ITERATIONS");
        }
        if self.max_research_attempts.is_none() {
            self.max_research_attempts = env_parse("MARS_MAX_RESEARCH_ATTEMPTS");
        }
        if self.max_writing_attempts.is_none() {
            self.max_writing_attempts = env_parse("MARS_MAX_WRITING_ATTEMPTS");
        }
        if self.domain_only.is_none() {
            self.domain_only = env_bool("MARS_DOMAIN_ONLY");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("MARS_PROMPT_DIR").ok().map(PathBuf::from);
        }
        if self.output_dir.is_none() {
            self.output_dir = std::env::var("MARS_OUTPUT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Adds an explicit endpoint. Explicit endpoints replace the default pair.
    #[must_use]
    pub fn endpoint(mut self, endpoint: EndpointConfig) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Sets the models file to load endpoints from.
    #[must_use]
    pub fn models_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.models_file = Some(path.into());
        self
    }

    /// Sets the shared API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override for the default endpoints.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the primary model.
    #[must_use]
    pub fn primary_model(mut self, model: impl Into<String>) -> Self {
        self.primary_model = Some(model.into());
        self
    }

    /// Sets the fallback model.
    #[must_use]
    pub fn fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = Some(model.into());
        self
    }

    /// Sets the per-endpoint failure budget.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the rate-limit cooldown.
    #[must_use]
    pub const fn rate_limit_cooldown(mut self, duration: Duration) -> Self {
        self.rate_limit_cooldown = Some(duration);
        self
    }

    /// Sets the delay between endpoint attempts.
    #[must_use]
    pub const fn switch_delay(mut self, delay: Duration) -> Self {
        self.switch_delay = Some(delay);
        self
    }

    /// Sets the data-source HTTP timeout.
    #[must_use]
    pub const fn source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = Some(timeout);
        self
    }

    /// Sets the critique-cycle budget.
    #[must_use]
    pub const fn max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Sets the research-attempt budget.
    #[must_use]
    pub const fn max_research_attempts(mut self, n: u32) -> Self {
        self.max_research_attempts = Some(n);
        self
    }

    /// Sets the writing-attempt budget.
    #[must_use]
    pub const fn max_writing_attempts(mut self, n: u32) -> Self {
        self.max_writing_attempts = Some(n);
        self
    }

    /// Enables or disables the CS/IT domain gate.
    #[must_use]
    pub const fn domain_only(mut self, enabled: bool) -> Self {
        self.domain_only = Some(enabled);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Sets the report output directory.
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if an endpoint has no resolvable
    /// API key, or [`AgentError::Config`] if the endpoint list is empty or
    /// the models file is invalid.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let mut endpoints = if let Some(ref path) = self.models_file {
            load_endpoints(path)?
        } else if self.endpoints.is_empty() {
            let mut primary = EndpointConfig::new(
                self.primary_model
                    .as_deref()
                    .unwrap_or(DEFAULT_PRIMARY_MODEL),
                1,
            );
            let mut fallback = EndpointConfig::new(
                self.fallback_model
                    .as_deref()
                    .unwrap_or(DEFAULT_FALLBACK_MODEL),
                2,
            );
            if let Some(ref url) = self.base_url {
                primary = primary.with_base_url(url);
                fallback = fallback.with_base_url(url);
            }
            vec![primary, fallback]
        } else {
            self.endpoints
        };

        if endpoints.is_empty() {
            return Err(AgentError::Config {
                message: "at least one model endpoint is required".to_string(),
            });
        }

        for endpoint in &mut endpoints {
            endpoint.resolve_api_key(self.api_key.as_deref())?;
        }
        endpoints.sort_by_key(|e| e.priority);

        Ok(AgentConfig {
            endpoints,
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            rate_limit_cooldown: self
                .rate_limit_cooldown
                .unwrap_or(Duration::from_secs(DEFAULT_RATE_LIMIT_COOLDOWN_SECS)),
            switch_delay: self
                .switch_delay
                .unwrap_or(Duration::from_secs(DEFAULT_SWITCH_DELAY_SECS)),
            source_timeout: self
                .source_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_SOURCE_TIMEOUT_SECS)),
            workflow: WorkflowConfig {
                max_iterations: self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
                max_research_attempts: self
                    .max_research_attempts
                    .unwrap_or(DEFAULT_MAX_RESEARCH_ATTEMPTS),
                max_writing_attempts: self
                    .max_writing_attempts
                    .unwrap_or(DEFAULT_MAX_WRITING_ATTEMPTS),
            },
            domain_only: self.domain_only.unwrap_or(true),
            prompt_dir: self.prompt_dir,
            output_dir: self
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .api_key("test-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[0].name, DEFAULT_PRIMARY_MODEL);
        assert_eq!(config.endpoints[1].name, DEFAULT_FALLBACK_MODEL);
        assert_eq!(config.endpoints[0].api_key.as_deref(), Some("test-key"));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.rate_limit_cooldown, Duration::from_secs(60));
        assert_eq!(config.switch_delay, Duration::from_secs(5));
        assert_eq!(config.workflow, WorkflowConfig::default());
        assert!(config.domain_only);
    }

    #[test]
    fn test_builder_missing_api_key() {
        let result = AgentConfig::builder().build();
        assert!(matches!(result, Err(AgentError::ApiKeyMissing { .. })));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .api_key("key")
            .primary_model("gemini-1.5-pro")
            .fallback_model("gemini-1.5-flash")
            .base_url("http://localhost:8080/v1")
            .max_iterations(7)
            .switch_delay(Duration::ZERO)
            .domain_only(false)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.endpoints[0].name, "gemini-1.5-pro");
        assert_eq!(
            config.endpoints[1].base_url.as_deref(),
            Some("http://localhost:8080/v1")
        );
        assert_eq!(config.workflow.max_iterations, 7);
        assert_eq!(config.switch_delay, Duration::ZERO);
        assert!(!config.domain_only);
    }

    #[test]
    fn test_explicit_endpoints_sorted_by_priority() {
        let config = AgentConfig::builder()
            .endpoint(EndpointConfig::new("slow", 3).with_api_key("a"))
            .endpoint(EndpointConfig::new("fast", 1).with_api_key("b"))
            .endpoint(EndpointConfig::new("mid", 2).with_api_key("c"))
            .build()
            .unwrap_or_else(|_| unreachable!());
        let names: Vec<_> = config.endpoints.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["fast", "mid", "slow"]);
    }

    #[test]
    fn test_models_file_applies_field_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap_or_else(|_| unreachable!());
        let json = r#"[
            {"name": "backup", "api_key": "k2", "priority": 2},
            {"name": "main", "api_key": "k1", "priority": 1, "temperature": 0.2}
        ]"#;
        file.write_all(json.as_bytes())
            .unwrap_or_else(|_| unreachable!());

        let config = AgentConfig::builder()
            .models_file(file.path())
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.endpoints[0].name, "main");
        assert!((config.endpoints[0].temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.endpoints[1].max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.endpoints[1].provider, "openai");
    }

    #[test]
    fn test_invalid_models_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap_or_else(|_| unreachable!());
        file.write_all(b"not json").unwrap_or_else(|_| unreachable!());
        let result = AgentConfig::builder().models_file(file.path()).build();
        assert!(matches!(result, Err(AgentError::Config { .. })));
    }

    #[test]
    fn test_empty_models_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap_or_else(|_| unreachable!());
        file.write_all(b"[]").unwrap_or_else(|_| unreachable!());
        let result = AgentConfig::builder().models_file(file.path()).build();
        assert!(matches!(result, Err(AgentError::Config { .. })));
    }

    #[test]
    fn test_step_limit_covers_every_cycle() {
        let budgets = WorkflowConfig::default();
        assert!(budgets.step_limit() >= 1 + 3 * budgets.max_iterations as usize);
    }
}
