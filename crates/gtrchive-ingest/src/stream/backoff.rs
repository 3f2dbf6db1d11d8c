//! Reconnect back-off for the streaming connection.
//!
//! Three independent schedules, as the provider's connection guidelines ask:
//!
//! | Failure                      | Schedule                          |
//! |------------------------------|-----------------------------------|
//! | network error / stall        | linear, +250 ms, capped at 16 s   |
//! | HTTP 5xx                     | exponential from 5 s, cap 320 s   |
//! | HTTP 420 / 429 (rate limit)  | exponential from 60 s, cap 960 s  |
//!
//! A successful connection resets all of them.

use std::time::Duration;

/// Why the producer is about to reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectReason {
    /// Connect/read failure or a stalled connection.
    Network,
    /// The server answered with a 5xx status.
    Http,
    /// The server rate limited us.
    RateLimited,
}

impl ReconnectReason {
    /// Label used in metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Http => "http",
            Self::RateLimited => "rate_limited",
        }
    }
}

const NETWORK_STEP: Duration = Duration::from_millis(250);
const NETWORK_MAX: Duration = Duration::from_secs(16);
const HTTP_INITIAL: Duration = Duration::from_secs(5);
const HTTP_MAX: Duration = Duration::from_secs(320);
const RATE_LIMIT_INITIAL: Duration = Duration::from_secs(60);
const RATE_LIMIT_MAX: Duration = Duration::from_secs(960);

/// Base delays and caps of the three schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub network_step: Duration,
    pub network_max: Duration,
    pub http_initial: Duration,
    pub http_max: Duration,
    pub rate_limit_initial: Duration,
    pub rate_limit_max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            network_step: NETWORK_STEP,
            network_max: NETWORK_MAX,
            http_initial: HTTP_INITIAL,
            http_max: HTTP_MAX,
            rate_limit_initial: RATE_LIMIT_INITIAL,
            rate_limit_max: RATE_LIMIT_MAX,
        }
    }
}

/// Delay schedule state for the three reconnect reasons.
#[derive(Debug, Clone, Default)]
pub struct Backoff {
    policy: BackoffPolicy,
    network_attempts: u32,
    http_attempts: u32,
    rate_limit_attempts: u32,
}

impl Backoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Record a failure and return how long to wait before reconnecting.
    pub fn next_delay(&mut self, reason: ReconnectReason) -> Duration {
        let policy = self.policy;
        match reason {
            ReconnectReason::Network => {
                self.network_attempts = self.network_attempts.saturating_add(1);
                policy
                    .network_step
                    .saturating_mul(self.network_attempts)
                    .min(policy.network_max)
            }
            ReconnectReason::Http => {
                let delay = exponential(policy.http_initial, self.http_attempts, policy.http_max);
                self.http_attempts = self.http_attempts.saturating_add(1);
                delay
            }
            ReconnectReason::RateLimited => {
                let delay = exponential(
                    policy.rate_limit_initial,
                    self.rate_limit_attempts,
                    policy.rate_limit_max,
                );
                self.rate_limit_attempts = self.rate_limit_attempts.saturating_add(1);
                delay
            }
        }
    }

    /// Forget all failures; called after a successful connection.
    pub fn reset(&mut self) {
        *self = Self::with_policy(self.policy);
    }
}

fn exponential(initial: Duration, attempts: u32, max: Duration) -> Duration {
    let factor = 1u32 << attempts.min(16);
    initial.saturating_mul(factor).min(max)
}
