//! Configuration types for the Tessera SDK.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Value sent in `X-Contentful-User-Agent-Tool`.
pub const USER_AGENT_TOOL: &str = concat!("tessera-mcp/", env!("CARGO_PKG_VERSION"));

/// Configuration for the content client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the management API (`https://{host}`).
    pub base_url: Url,
    /// Bearer token for authentication.
    pub access_token: Option<String>,
    /// Space every request is scoped to.
    pub space_id: String,
    /// Environment inside the space.
    pub environment_id: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Retry policy applied to every call.
    pub retry_policy: RetryPolicy,
}

impl ClientConfig {
    /// Create a new configuration with the given base URL.
    pub fn new(base_url: Url, space_id: impl Into<String>) -> Self {
        Self {
            base_url,
            access_token: None,
            space_id: space_id.into(),
            environment_id: "master".to_string(),
            timeout: Duration::from_secs(30),
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// Exponential backoff with multiplicative jitter.
///
/// `max_attempts` counts every attempt including the first one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 100,
            max_delay_ms: 1600,
            jitter_ratio: 0.2,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes a single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Attempts actually made; zero is treated as one.
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    fn clamped_jitter(&self) -> f64 {
        if self.jitter_ratio.is_finite() {
            self.jitter_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Un-jittered delay before retry number `retry` (1-based):
    /// `base * 2^(retry-1)`, capped at `max_delay_ms`.
    pub fn backoff_for_attempt(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Inclusive range the jittered delay for retry `retry` falls into.
    pub fn delay_bounds(&self, retry: u32) -> (Duration, Duration) {
        let base = self.backoff_for_attempt(retry).as_secs_f64();
        let jitter = self.clamped_jitter();
        let cap = Duration::from_millis(self.max_delay_ms);

        let low = Duration::from_secs_f64((base * (1.0 - jitter)).max(0.0));
        let high = Duration::from_secs_f64(base * (1.0 + jitter)).min(cap);
        (low.min(high), high)
    }

    /// Delay before retry `retry` with jitter drawn from `rng`.
    pub fn jittered_delay<R: Rng + ?Sized>(&self, retry: u32, rng: &mut R) -> Duration {
        let base = self.backoff_for_attempt(retry).as_secs_f64();
        let jitter = self.clamped_jitter();
        let factor = if jitter > 0.0 {
            rng.gen_range((1.0 - jitter)..=(1.0 + jitter))
        } else {
            1.0
        };

        let cap = Duration::from_millis(self.max_delay_ms);
        Duration::from_secs_f64((base * factor).max(0.0)).min(cap)
    }
}
