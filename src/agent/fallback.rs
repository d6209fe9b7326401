//! Multi-endpoint client with rate-limit aware fallback.
//!
//! Every stage talks to models through [`FallbackClient`]. A call walks the
//! endpoints in priority order, skipping ones that are cooling down after a
//! rate limit or have spent their error budget, and returns the first
//! non-empty completion.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::client::create_provider;
use super::config::{AgentConfig, DEFAULT_MAX_RETRIES, EndpointConfig};
use super::endpoint::{EndpointStatus, ModelEndpoint};
use super::message::{ChatRequest, system_message, user_message};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Retry and switching knobs for [`FallbackClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackSettings {
    /// Consecutive generic failures before an endpoint is disabled.
    pub max_retries: u32,
    /// How long a rate-limited endpoint is skipped.
    pub rate_limit_cooldown: Duration,
    /// Pause before the next endpoint after a failure.
    pub switch_delay: Duration,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            rate_limit_cooldown: Duration::from_secs(60),
            switch_delay: Duration::from_secs(5),
        }
    }
}

impl From<&AgentConfig> for FallbackSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            rate_limit_cooldown: config.rate_limit_cooldown,
            switch_delay: config.switch_delay,
        }
    }
}

struct Slot {
    endpoint: ModelEndpoint,
    provider: Arc<dyn LlmProvider>,
}

/// What one attempt will use, copied out so no lock is held across the call.
struct Selection {
    index: usize,
    name: String,
    temperature: f32,
    max_tokens: u32,
    provider: Arc<dyn LlmProvider>,
}

/// Prioritized model endpoints behind a single `generate` call.
pub struct FallbackClient {
    slots: Mutex<Vec<Slot>>,
    settings: FallbackSettings,
}

impl FallbackClient {
    /// Creates a client over explicit endpoint/provider pairs.
    ///
    /// Endpoints are stable-sorted by priority.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::NoEndpoints`] if `endpoints` is empty.
    pub fn new(
        endpoints: Vec<(EndpointConfig, Arc<dyn LlmProvider>)>,
        settings: FallbackSettings,
    ) -> Result<Self, AgentError> {
        if endpoints.is_empty() {
            return Err(AgentError::NoEndpoints);
        }
        let mut slots: Vec<Slot> = endpoints
            .into_iter()
            .map(|(config, provider)| Slot {
                endpoint: ModelEndpoint::new(config, settings.max_retries),
                provider,
            })
            .collect();
        slots.sort_by_key(|slot| slot.endpoint.priority());

        Ok(Self {
            slots: Mutex::new(slots),
            settings,
        })
    }

    /// Creates a client with one provider per configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::NoEndpoints`] or
    /// [`AgentError::UnsupportedProvider`].
    pub fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let endpoints = config
            .endpoints
            .iter()
            .map(|ep| Ok((ep.clone(), create_provider(ep)?)))
            .collect::<Result<Vec<_>, AgentError>>()?;
        Self::new(endpoints, FallbackSettings::from(config))
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of configured endpoints.
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.lock().len()
    }

    /// Best selectable endpoint not yet tried in this call.
    fn select(&self, tried: &[usize]) -> Option<Selection> {
        let slots = self.lock();
        slots
            .iter()
            .enumerate()
            .filter(|(i, slot)| !tried.contains(i) && slot.endpoint.is_selectable())
            .min_by_key(|(i, slot)| (slot.endpoint.priority(), *i))
            .map(|(index, slot)| Selection {
                index,
                name: slot.endpoint.name().to_string(),
                temperature: slot.endpoint.config().temperature,
                max_tokens: slot.endpoint.config().max_tokens,
                provider: Arc::clone(&slot.provider),
            })
    }

    fn record_success(&self, index: usize) {
        if let Some(slot) = self.lock().get_mut(index) {
            slot.endpoint.record_success();
        }
    }

    /// Updates health after a failed attempt.
    fn record_failure(&self, index: usize, error: &AgentError) {
        let mut slots = self.lock();
        let Some(slot) = slots.get_mut(index) else {
            return;
        };
        if error.is_rate_limit() {
            slot.endpoint
                .mark_rate_limited(self.settings.rate_limit_cooldown);
            warn!(
                model = slot.endpoint.name(),
                cooldown_secs = self.settings.rate_limit_cooldown.as_secs(),
                "rate limited, cooling down"
            );
            return;
        }

        slot.endpoint.record_error();
        warn!(
            model = slot.endpoint.name(),
            error_count = slot.endpoint.error_count(),
            error = %error,
            "model call failed"
        );

        if slots.iter().all(|s| !s.endpoint.is_available()) {
            info!("all models exhausted their error budget, resetting error counts");
            for s in slots.iter_mut() {
                s.endpoint.reset_errors();
            }
        }
    }

    /// Generates a completion, falling back across endpoints.
    ///
    /// `temperature` overrides the endpoint default when given. Each
    /// endpoint is attempted at most once per call; an empty completion
    /// counts as a failure.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::AllModelsFailed`] when no endpoint produced
    /// text, carrying the last underlying error.
    pub async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: Option<f32>,
    ) -> Result<String, AgentError> {
        let max_attempts = self.endpoint_count();
        let mut tried = Vec::with_capacity(max_attempts);
        let mut last_error: Option<String> = None;

        while tried.len() < max_attempts {
            let Some(selection) = self.select(&tried) else {
                break;
            };
            tried.push(selection.index);
            debug!(model = %selection.name, attempt = tried.len(), "calling model");

            let request = ChatRequest {
                model: selection.name.clone(),
                messages: vec![system_message(system_prompt), user_message(user_prompt)],
                temperature: Some(temperature.unwrap_or(selection.temperature)),
                max_tokens: Some(selection.max_tokens),
            };

            let outcome = match selection.provider.chat(&request).await {
                Ok(response) if !response.content.trim().is_empty() => Ok(response.content),
                Ok(_) => Err(AgentError::EmptyResponse {
                    model: selection.name.clone(),
                }),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(content) => {
                    self.record_success(selection.index);
                    debug!(model = %selection.name, chars = content.len(), "model call succeeded");
                    return Ok(content);
                }
                Err(e) => {
                    self.record_failure(selection.index, &e);
                    last_error = Some(e.to_string());
                }
            }

            if tried.len() < max_attempts && !self.settings.switch_delay.is_zero() {
                tokio::time::sleep(self.settings.switch_delay).await;
            }
        }

        Err(AgentError::AllModelsFailed {
            attempts: tried.len(),
            last_error: last_error.unwrap_or_else(|| "no endpoint available".to_string()),
        })
    }

    /// Generates a completion with an output-format reminder appended to
    /// the system instructions. The output is not parsed here.
    ///
    /// # Errors
    ///
    /// Same as [`FallbackClient::generate`].
    pub async fn generate_structured(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        expected_format: &str,
        temperature: Option<f32>,
    ) -> Result<String, AgentError> {
        let system = with_format_hint(system_prompt, expected_format);
        self.generate(&system, user_prompt, temperature).await
    }

    /// Health snapshot of every endpoint in priority order.
    #[must_use]
    pub fn status(&self) -> Vec<EndpointStatus> {
        self.lock().iter().map(|s| s.endpoint.status()).collect()
    }

    /// Clears error counts and rate limits on every endpoint.
    pub fn reset_all(&self) {
        for slot in self.lock().iter_mut() {
            slot.endpoint.reset_errors();
            slot.endpoint.clear_rate_limit();
        }
        info!("reset all model endpoints");
    }
}

impl std::fmt::Debug for FallbackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackClient")
            .field("endpoints", &self.status())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Appends the output-format reminder used by structured generation.
#[must_use]
pub fn with_format_hint(instructions: &str, expected_format: &str) -> String {
    format!(
        "{instructions}\n\nExpected Output Format:\n{expected_format}\n\n\
         Please ensure your response follows this format exactly."
    )
}
