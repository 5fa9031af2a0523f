//! Request pacing for fetches against a source site
//!
//! A [`RateLimiter`] enforces a minimum spacing between consecutive requests
//! and widens that spacing exponentially after throttling or blocking
//! signals. Limiters are shared per host through a [`RateLimiterRegistry`];
//! one limiter may serve several orchestrations at once.

mod limiter;
mod registry;

pub use limiter::{BlockingSignal, RateLimitPolicy, RateLimiter};
pub use registry::{RateLimiterRegistry, host_key};
