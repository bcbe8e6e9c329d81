// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod acquire;
pub mod api;
pub mod bootstrap;
pub mod config;
pub mod generate;
pub mod metrics;
pub mod pipeline;
pub mod voice;

pub use crate::acquire::Orchestrator;
pub use crate::api::create_router;
pub use crate::pipeline::{OutreachPipeline, PipelineError, PipelineResult};

/// Default `EnvFilter` when `RUST_LOG` is unset. Progress events use short
/// per-subsystem targets, so each one is listed next to the crate path.
pub const DEFAULT_LOG_FILTER: &str =
    "outreach_voice=info,acquire=info,poller=info,pipeline=info,generate=info,voice=info,warn";

/// Build the full HTTP app from on-disk config (no metrics recorder).
pub async fn app() -> anyhow::Result<axum::Router> {
    let cfg = config::OutreachConfig::load()?;
    let pipeline = bootstrap::build_pipeline(&cfg)?;
    Ok(create_router(api::AppState::new(pipeline)))
}
