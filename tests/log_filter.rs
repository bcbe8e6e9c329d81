// tests/log_filter.rs
// The default filter must let progress events through on every subsystem target.

use outreach_voice::DEFAULT_LOG_FILTER;
use tracing::Level;
use tracing_subscriber::{prelude::*, EnvFilter};

fn enabled_under_default(check: impl FnOnce() -> bool) -> bool {
    let subscriber = tracing_subscriber::registry().with(EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing::subscriber::with_default(subscriber, check)
}

#[test]
fn subsystem_targets_log_info_by_default() {
    assert!(enabled_under_default(|| tracing::enabled!(target: "acquire", Level::INFO)));
    assert!(enabled_under_default(|| tracing::enabled!(target: "poller", Level::INFO)));
    assert!(enabled_under_default(|| tracing::enabled!(target: "pipeline", Level::INFO)));
    assert!(enabled_under_default(|| tracing::enabled!(target: "generate", Level::INFO)));
    assert!(enabled_under_default(|| tracing::enabled!(target: "voice", Level::INFO)));
    assert!(enabled_under_default(
        || tracing::enabled!(target: "outreach_voice::bootstrap", Level::INFO)
    ));
}

#[test]
fn noise_stays_filtered() {
    assert!(!enabled_under_default(|| tracing::enabled!(target: "acquire", Level::DEBUG)));
    assert!(!enabled_under_default(|| tracing::enabled!(target: "hyper::proto", Level::INFO)));
    assert!(enabled_under_default(|| tracing::enabled!(target: "hyper::proto", Level::WARN)));
}
