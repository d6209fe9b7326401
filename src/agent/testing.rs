//! Scripted providers shared by the stage unit tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::config::EndpointConfig;
use super::fallback::{FallbackClient, FallbackSettings};
use super::message::{ChatRequest, ChatResponse, TokenUsage};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Returns the same reply to every request, or fails every request when
/// the reply is `None`.
pub struct Fixed(pub Option<String>);

#[async_trait]
impl LlmProvider for Fixed {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        match self.0 {
            Some(ref content) => Ok(ChatResponse {
                content: content.clone(),
                usage: TokenUsage::default(),
                finish_reason: Some("stop".to_string()),
            }),
            None => Err(AgentError::ApiRequest {
                message: "connection refused".to_string(),
                status: None,
            }),
        }
    }
}

/// Single-endpoint client answering every call with `reply`.
pub fn client_replying(reply: &str) -> Arc<FallbackClient> {
    client_with(Fixed(Some(reply.to_string())))
}

/// Single-endpoint client whose every call fails.
pub fn failing_client() -> Arc<FallbackClient> {
    client_with(Fixed(None))
}

fn client_with(provider: Fixed) -> Arc<FallbackClient> {
    let settings = FallbackSettings {
        switch_delay: Duration::ZERO,
        ..FallbackSettings::default()
    };
    let client = FallbackClient::new(
        vec![(
            EndpointConfig::new("mock-model", 1),
            Arc::new(provider) as Arc<dyn LlmProvider>,
        )],
        settings,
    )
    .unwrap_or_else(|_| unreachable!());
    Arc::new(client)
}
