//! Provider registry and factory.
//!
//! Maps an endpoint's provider name to a concrete [`LlmProvider`].

use std::sync::Arc;

use crate::agent::config::EndpointConfig;
use crate::agent::provider::LlmProvider;
use crate::agent::providers::OpenAiProvider;
use crate::error::AgentError;

/// Creates an [`LlmProvider`] for one endpoint.
///
/// # Supported Providers
///
/// - `"openai"` (default): OpenAI-compatible APIs via `async-openai`
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names,
/// or [`AgentError::ApiKeyMissing`] if the key was never resolved.
pub fn create_provider(endpoint: &EndpointConfig) -> Result<Arc<dyn LlmProvider>, AgentError> {
    let api_key = endpoint
        .api_key
        .as_deref()
        .ok_or_else(|| AgentError::ApiKeyMissing {
            endpoint: endpoint.name.clone(),
        })?;

    match endpoint.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(
            api_key,
            endpoint.base_url.as_deref(),
        ))),
        other => Err(AgentError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}
