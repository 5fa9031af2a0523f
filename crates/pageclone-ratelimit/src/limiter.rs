use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use pageclone_config::RateLimitConfig;

/// Pacing parameters for one limiter.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitPolicy {
    /// Baseline spacing between consecutive requests.
    pub min_interval: Duration,
    /// Factor applied to the current delay on each blocking signal.
    pub backoff_multiplier: f64,
    /// Ceiling on the backed-off delay.
    pub max_delay: Duration,
    /// Consecutive clean requests after which the delay returns to baseline.
    pub reset_after_clean: u32,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

impl From<&RateLimitConfig> for RateLimitPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            min_interval: config.min_interval(),
            backoff_multiplier: config.backoff_multiplier,
            max_delay: config.max_delay(),
            reset_after_clean: config.reset_after_clean,
        }
    }
}

/// Evidence that the last request was throttled or blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingSignal {
    RateLimited,
    Blocked,
    Captcha,
    /// Raw HTTP status from the fetch layer.
    Status(u16),
}

impl BlockingSignal {
    /// Map an HTTP status to a signal; only 403, 429 and 503 count.
    #[must_use]
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            429 => Some(Self::RateLimited),
            403 | 503 => Some(Self::Status(status)),
            _ => None,
        }
    }
}

impl fmt::Display for BlockingSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => f.write_str("rate_limited"),
            Self::Blocked => f.write_str("blocked"),
            Self::Captcha => f.write_str("captcha"),
            Self::Status(code) => write!(f, "http_{code}"),
        }
    }
}

#[derive(Debug)]
struct LimiterState {
    last_request: Option<Instant>,
    current_delay: Duration,
    clean_streak: u32,
    blocked_since_last: bool,
}

/// Lock-guarded request pacer.
///
/// `wait_before_request` holds the lock for the whole wait, so concurrent
/// callers are released one at a time, each at least the current delay
/// after the previous one.
#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(policy: RateLimitPolicy) -> Self {
        let current_delay = policy.min_interval;
        Self {
            policy,
            state: Mutex::new(LimiterState {
                last_request: None,
                current_delay,
                clean_streak: 0,
                blocked_since_last: false,
            }),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Suspend until the current delay has elapsed since the last request,
    /// then stamp this request. The first request never waits.
    pub async fn wait_before_request(&self) {
        let mut state = self.state.lock().await;

        if state.last_request.is_some() && !state.blocked_since_last {
            state.clean_streak = state.clean_streak.saturating_add(1);
            if state.clean_streak >= self.policy.reset_after_clean
                && state.current_delay != self.policy.min_interval
            {
                info!(
                    delay_ms = duration_ms(self.policy.min_interval),
                    clean_requests = state.clean_streak,
                    "Rate limit delay reset to baseline"
                );
                state.current_delay = self.policy.min_interval;
            }
        }

        if let Some(last) = state.last_request {
            let ready_at = last + state.current_delay;
            if ready_at > Instant::now() {
                debug!(
                    delay_ms = duration_ms(ready_at - Instant::now()),
                    "Waiting before next request"
                );
                sleep_until(ready_at).await;
            }
        }

        state.blocked_since_last = false;
        state.last_request = Some(Instant::now());
    }

    /// Widen the delay after the last request was throttled or blocked.
    pub async fn record_blocking_signal(&self, signal: BlockingSignal) {
        let mut state = self.state.lock().await;
        let next = self.backed_off(state.current_delay);
        state.current_delay = next;
        state.clean_streak = 0;
        state.blocked_since_last = true;
        warn!(
            signal = %signal,
            delay_ms = duration_ms(next),
            "Blocking signal received, backing off"
        );
    }

    /// Delay the next request will observe.
    pub async fn current_delay(&self) -> Duration {
        self.state.lock().await.current_delay
    }

    fn backed_off(&self, current: Duration) -> Duration {
        let multiplier = if self.policy.backoff_multiplier.is_finite() {
            self.policy.backoff_multiplier.max(1.0)
        } else {
            1.0
        };
        let base = current.max(Duration::from_millis(1));
        let scaled_nanos = base.as_nanos() as f64 * multiplier;
        let next = if scaled_nanos >= self.policy.max_delay.as_nanos() as f64 {
            self.policy.max_delay
        } else {
            Duration::from_nanos(scaled_nanos.round() as u64)
        };
        next.max(self.policy.min_interval)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
