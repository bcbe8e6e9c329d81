//! Outreach service entrypoint.
//! Boots the Axum HTTP server with the pipeline, `/metrics`, and `/audio`.

use outreach_voice::api::{create_router, AppState};
use outreach_voice::bootstrap::{build_pipeline, log_credential_summary};
use outreach_voice::config::OutreachConfig;
use outreach_voice::metrics::Metrics;
use outreach_voice::DEFAULT_LOG_FILTER;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` overrides the default filter; `LOG_FORMAT=json` switches formatter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    // Shuttle may have installed a subscriber already.
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = OutreachConfig::load()?;
    log_credential_summary(&cfg);

    let pipeline = build_pipeline(&cfg)?;
    let metrics = Metrics::init()?;

    let router = create_router(AppState::new(pipeline)).merge(metrics.router());
    Ok(router.into())
}
