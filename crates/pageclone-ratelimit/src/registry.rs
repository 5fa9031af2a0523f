use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::limiter::{RateLimitPolicy, RateLimiter};

/// Normalize a URL to the key its limiter is shared under.
///
/// The scheme, user info, path, query and fragment are dropped; host and
/// port are kept and lowercased. `https://Example.com:8443/a?b` becomes
/// `example.com:8443`.
#[must_use]
pub fn host_key(url: &str) -> String {
    let trimmed = url.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map_or(trimmed, |(_, rest)| rest);
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);
    host.to_ascii_lowercase()
}

/// Process-wide set of limiters, one per source host.
///
/// Every orchestration that targets the same host receives the same
/// [`RateLimiter`], so backoff state is shared between them.
#[derive(Debug)]
pub struct RateLimiterRegistry {
    policy: RateLimitPolicy,
    limiters: Mutex<HashMap<String, Arc<RateLimiter>>>,
}

impl RateLimiterRegistry {
    #[must_use]
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            limiters: Mutex::new(HashMap::new()),
        }
    }

    /// Limiter for the host of `url`, created on first use.
    pub fn for_url(&self, url: &str) -> Arc<RateLimiter> {
        let key = host_key(url);
        let mut limiters = self
            .limiters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(limiters.entry(key).or_insert_with_key(|host| {
            debug!(host = %host, "Creating rate limiter");
            Arc::new(RateLimiter::new(self.policy.clone()))
        }))
    }

    /// Number of hosts with a limiter.
    pub fn len(&self) -> usize {
        self.limiters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RateLimiterRegistry {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_key_normalization() {
        assert_eq!(host_key("https://Example.com/pricing"), "example.com");
        assert_eq!(host_key("http://example.com:8080/a?b#c"), "example.com:8080");
        assert_eq!(host_key("https://user:pw@example.com/x"), "example.com");
        assert_eq!(host_key("example.com/about"), "example.com");
        assert_eq!(host_key("https://example.com?q=1"), "example.com");
    }

    #[test]
    fn test_same_host_shares_limiter() {
        let registry = RateLimiterRegistry::default();
        let a = registry.for_url("https://example.com/pricing");
        let b = registry.for_url("http://EXAMPLE.com/about");
        let c = registry.for_url("https://other.example/");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
    }
}
