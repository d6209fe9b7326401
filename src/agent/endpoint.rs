//! Per-endpoint health tracking.
//!
//! [`ModelEndpoint`] is a plain record with no I/O: the fallback client
//! owns the list and mutates it under a lock between provider calls.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use super::config::EndpointConfig;

/// Runtime health of one configured model endpoint.
#[derive(Debug, Clone)]
pub struct ModelEndpoint {
    config: EndpointConfig,
    max_retries: u32,
    available: bool,
    rate_limited_until: Option<Instant>,
    error_count: u32,
    last_used: Option<Instant>,
}

impl ModelEndpoint {
    /// Creates a healthy endpoint.
    #[must_use]
    pub const fn new(config: EndpointConfig, max_retries: u32) -> Self {
        Self {
            config,
            max_retries,
            available: true,
            rate_limited_until: None,
            error_count: 0,
            last_used: None,
        }
    }

    /// Endpoint configuration.
    #[must_use]
    pub const fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Selection priority; lower is preferred.
    #[must_use]
    pub const fn priority(&self) -> u32 {
        self.config.priority
    }

    /// Whether the endpoint has not exhausted its error budget.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.available
    }

    /// Consecutive generic failures since the last success or reset.
    #[must_use]
    pub const fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Whether the endpoint is inside a rate-limit cooldown.
    ///
    /// An expired cooldown reads as not limited even before it is cleared.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.rate_limited_until
            .is_some_and(|until| Instant::now() < until)
    }

    /// Whether the endpoint can be picked for the next attempt.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        self.available && !self.is_rate_limited()
    }

    /// Starts a cooldown of `cooldown` from now.
    pub fn mark_rate_limited(&mut self, cooldown: Duration) {
        self.rate_limited_until = Some(Instant::now() + cooldown);
    }

    /// Drops any cooldown.
    pub const fn clear_rate_limit(&mut self) {
        self.rate_limited_until = None;
    }

    /// Counts a generic failure, disabling the endpoint once the budget is spent.
    pub const fn record_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
        if self.error_count >= self.max_retries {
            self.available = false;
        }
    }

    /// Resets the error budget after a successful call.
    pub fn record_success(&mut self) {
        self.error_count = 0;
        self.available = true;
        self.last_used = Some(Instant::now());
    }

    /// Makes the endpoint available again with a fresh error budget.
    pub const fn reset_errors(&mut self) {
        self.error_count = 0;
        self.available = true;
    }

    /// Snapshot for status reporting.
    #[must_use]
    pub fn status(&self) -> EndpointStatus {
        EndpointStatus {
            name: self.config.name.clone(),
            priority: self.config.priority,
            available: self.available,
            rate_limited: self.is_rate_limited(),
            error_count: self.error_count,
            last_used_secs_ago: self.last_used.map(|t| t.elapsed().as_secs_f64()),
        }
    }
}

/// Serializable view of one endpoint's health.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointStatus {
    /// Model name.
    pub name: String,
    /// Selection priority.
    pub priority: u32,
    /// Error budget not exhausted.
    pub available: bool,
    /// Inside a rate-limit cooldown.
    pub rate_limited: bool,
    /// Consecutive generic failures.
    pub error_count: u32,
    /// Seconds since the last successful call, if any.
    pub last_used_secs_ago: Option<f64>,
}
