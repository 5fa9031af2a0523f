//! Tracing setup and structured log helpers for clone runs.
//!
//! Library crates only emit events; the binary installs the subscriber via
//! [`init_tracing`]. Structured fields used throughout: `slug`, `phase`,
//! `attempt`, `action`, `delay_ms`.

use std::time::Duration;
use tracing::{Level, error, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::types::PhaseKind;

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the filter is `pageclone=debug` when
/// `verbose`, `pageclone=info` when not. Verbose output also reports span
/// close events so each phase's duration is visible.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("pageclone=debug,warn")
            } else {
                EnvFilter::try_new("pageclone=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one phase execution.
#[must_use]
pub fn phase_span(slug: &str, phase: PhaseKind) -> tracing::Span {
    span!(
        Level::INFO,
        "phase_execution",
        slug = %slug,
        phase = %phase,
    )
}

pub fn log_phase_start(slug: &str, phase: PhaseKind, attempt: u32) {
    info!(
        slug = %slug,
        phase = %phase,
        attempt,
        "Starting phase execution"
    );
}

pub fn log_phase_complete(slug: &str, phase: PhaseKind, elapsed: Duration) {
    info!(
        slug = %slug,
        phase = %phase,
        duration_ms = elapsed.as_millis() as u64,
        "Phase execution completed"
    );
}

/// Log a classified phase failure together with the recovery action chosen for it.
pub fn log_phase_error(slug: &str, phase: PhaseKind, action: &str, error: &str) {
    error!(
        slug = %slug,
        phase = %phase,
        action = %action,
        error = %error,
        "Phase execution failed"
    );
}
