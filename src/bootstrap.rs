// src/bootstrap.rs
use std::time::Duration;

use tracing::info;

use crate::acquire::providers::apify::ApifyClient;
use crate::acquire::providers::phantombuster::PhantomBusterClient;
use crate::acquire::render::HttpRenderBackend;
use crate::acquire::sources::{DirectSource, JobSource, LiveSessionSource, MultiInputSource};
use crate::acquire::types::ProfileSource;
use crate::acquire::Orchestrator;
use crate::config::{OutreachConfig, SourceKind};
use crate::generate::build_generator;
use crate::pipeline::OutreachPipeline;
use crate::voice::{build_synthesizer, AudioStore};

/// One adapter per configured source, in priority order.
pub fn build_sources(cfg: &OutreachConfig) -> anyhow::Result<Vec<Box<dyn ProfileSource>>> {
    let acq = &cfg.acquisition;
    let timeout = acq.request_timeout();
    let mut out: Vec<Box<dyn ProfileSource>> = Vec::with_capacity(acq.sources.len());
    for kind in &acq.sources {
        let source: Box<dyn ProfileSource> = match kind {
            SourceKind::ApifySync => Box::new(MultiInputSource::new(
                kind.name(),
                ApifyClient::new(&acq.apify, timeout)?,
                ApifyClient::input_shapes,
            )),
            SourceKind::ApifyRun => Box::new(JobSource::new(
                kind.name(),
                ApifyClient::new(&acq.apify, timeout)?,
                acq.apify.poll_policy(),
            )),
            SourceKind::PhantomBusterDirect => Box::new(DirectSource::new(
                kind.name(),
                PhantomBusterClient::new(&acq.phantombuster, timeout)?,
            )),
            SourceKind::PhantomBuster => Box::new(JobSource::new(
                kind.name(),
                PhantomBusterClient::new(&acq.phantombuster, timeout)?,
                acq.phantombuster.poll_policy(),
            )),
            SourceKind::LiveSession => Box::new(LiveSessionSource::new(
                kind.name(),
                HttpRenderBackend::new(
                    acq.live.user_agent.clone(),
                    Duration::from_secs(acq.live.timeout_secs),
                ),
                Duration::from_secs(acq.live.timeout_secs),
                Duration::from_millis(acq.live.settle_ms),
            )),
        };
        out.push(source);
    }
    Ok(out)
}

pub fn build_pipeline(cfg: &OutreachConfig) -> anyhow::Result<OutreachPipeline> {
    let orchestrator = Orchestrator::new(build_sources(cfg)?);
    let generator = build_generator(&cfg.generation)?;
    let synthesizer = build_synthesizer(&cfg.speech)?;
    let audio = AudioStore::new(cfg.server.audio_dir.clone(), &cfg.server.public_base_url);
    info!(
        sources = ?orchestrator.source_names(),
        generator = generator.provider_name(),
        synthesizer = synthesizer.provider_name(),
        "outreach pipeline assembled"
    );
    Ok(OutreachPipeline::new(
        orchestrator,
        generator,
        synthesizer,
        audio,
        cfg.generation.default_product.clone(),
    ))
}

/// Logs which credentials are present. Values are never printed, only lengths.
pub fn log_credential_summary(cfg: &OutreachConfig) {
    fn len(v: &Option<String>) -> usize {
        v.as_deref().map(str::len).unwrap_or(0)
    }
    info!(
        apify_token_len = len(&cfg.acquisition.apify.token),
        phantombuster_key_len = len(&cfg.acquisition.phantombuster.api_key),
        phantombuster_phantom = cfg.acquisition.phantombuster.phantom_id.is_some(),
        mistral_key_len = len(&cfg.generation.api_key),
        elevenlabs_key_len = len(&cfg.speech.api_key),
        "credentials resolved"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_follow_configured_order() {
        let mut cfg = OutreachConfig::default();
        cfg.acquisition.sources = vec![SourceKind::LiveSession, SourceKind::ApifyRun];
        let names: Vec<_> = build_sources(&cfg)
            .unwrap()
            .iter()
            .map(|s| s.name())
            .collect();
        assert_eq!(names, vec!["live-session", "apify-run"]);
    }

    #[test]
    fn default_order() {
        let names: Vec<_> = build_sources(&OutreachConfig::default())
            .unwrap()
            .iter()
            .map(|s| s.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "apify-sync",
                "apify-run",
                "phantombuster-direct",
                "phantombuster",
                "live-session"
            ]
        );
    }
}
