//! Error types for mars-rs.
//!
//! Library code returns typed errors built with `thiserror`. The agent
//! layer has its own [`AgentError`] so stages can classify provider
//! failures without string matching at every call site.

use thiserror::Error;

/// Convenience result alias for top-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Phrases that identify a provider rate-limit or quota failure.
const RATE_LIMIT_INDICATORS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "quota",
    "429",
    "too many requests",
    "resource exhausted",
    "limit exceeded",
];

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent, provider, or workflow failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Word document could not be packaged.
    #[error("Word export failed: {0}")]
    Docx(String),
}

/// Errors raised by the model client, the stages, and the workflow engine.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key could be resolved for an endpoint.
    #[error("no API key configured for endpoint '{endpoint}' (set MARS_API_KEY or OPENAI_API_KEY)")]
    ApiKeyMissing {
        /// Endpoint (model) name.
        endpoint: String,
    },

    /// The provider rejected or failed a request.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error text.
        message: String,
        /// HTTP status when the provider reported one.
        status: Option<u16>,
    },

    /// The provider answered with no usable text.
    #[error("model '{model}' returned an empty response")]
    EmptyResponse {
        /// Model that produced the empty response.
        model: String,
    },

    /// Every endpoint was tried (or none was selectable) in one call.
    #[error("All models failed after {attempts} attempt(s). Last error: {last_error}")]
    AllModelsFailed {
        /// Number of endpoint attempts made in the call.
        attempts: usize,
        /// Text of the last underlying error.
        last_error: String,
    },

    /// The client was constructed without endpoints.
    #[error("no model endpoints configured")]
    NoEndpoints,

    /// Model output did not match the expected structure.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
        /// The raw model output.
        content: String,
    },

    /// Unknown provider name in an endpoint definition.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Provider name as configured.
        name: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// A data source request failed.
    #[error("source '{source_name}' failed: {message}")]
    Source {
        /// Source name (e.g. `"arxiv"`).
        source_name: String,
        /// Failure description.
        message: String,
    },

    /// The workflow engine reached an impossible state.
    #[error("workflow error: {message}")]
    Workflow {
        /// Description of the violated rule.
        message: String,
    },
}

impl AgentError {
    /// Returns `true` if this error is a provider rate-limit or quota failure.
    ///
    /// Matches HTTP 429 or rate-limit phrasing in the error text.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::ApiRequest { message, status } => {
                *status == Some(429) || mentions_rate_limit(message)
            }
            _ => false,
        }
    }
}

/// Returns `true` if the text contains any rate-limit indicator (case-insensitive).
#[must_use]
pub fn mentions_rate_limit(text: &str) -> bool {
    let lower = text.to_lowercase();
    RATE_LIMIT_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not complete.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be formatted.
    #[error("output format error: {0}")]
    OutputFormat(String),

    /// An argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Rate limit exceeded for model", true ; "rate limit phrase")]
    #[test_case("429 Too Many Requests", true ; "status in text")]
    #[test_case("RESOURCE EXHAUSTED: try later", true ; "resource exhausted")]
    #[test_case("You exceeded your current quota", true ; "quota")]
    #[test_case("rate_limit_exceeded: slow down", true ; "error code")]
    #[test_case("connection reset by peer", false ; "network failure")]
    #[test_case("invalid api key", false ; "auth failure")]
    fn test_rate_limit_classification(message: &str, expected: bool) {
        let err = AgentError::ApiRequest {
            message: message.to_string(),
            status: None,
        };
        assert_eq!(err.is_rate_limit(), expected);
    }

    #[test]
    fn test_status_429_is_rate_limit() {
        let err = AgentError::ApiRequest {
            message: "server said no".to_string(),
            status: Some(429),
        };
        assert!(err.is_rate_limit());
    }

    #[test]
    fn test_other_variants_are_not_rate_limits() {
        let err = AgentError::EmptyResponse {
            model: "quota-model".to_string(),
        };
        assert!(!err.is_rate_limit());
    }

    #[test]
    fn test_all_models_failed_display_carries_last_error() {
        let err = AgentError::AllModelsFailed {
            attempts: 2,
            last_error: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "All models failed after 2 attempt(s). Last error: boom"
        );
    }
}
