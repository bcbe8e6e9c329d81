// src/acquire/mod.rs
pub mod normalize;
pub mod poller;
pub mod providers;
pub mod render;
pub mod sources;
pub mod types;

use std::sync::Arc;

use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::acquire::types::{
    AcquisitionRequest, FailureKind, ProfileRecord, ProfileSource, SourceFailure,
};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "acquire_attempts_total",
            "Acquisition attempts per source and outcome."
        );
        describe_counter!("acquire_polls_total", "Provider job status checks.");
        describe_counter!(
            "acquire_fallback_total",
            "Requests where every source failed."
        );
        describe_counter!(
            "pipeline_degraded_total",
            "Pipeline runs that substituted a fallback value, by stage."
        );
        describe_histogram!("pipeline_run_ms", "End-to-end pipeline time in milliseconds.");
    });
}

/// Successful acquisition plus which source produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acquired {
    pub source: &'static str,
    pub record: ProfileRecord,
}

/// Every source failed. Carries the most informative reason and the full trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("all sources failed; last: {reason}")]
pub struct AcquisitionFailure {
    pub reason: SourceFailure,
    pub attempts: Vec<SourceFailure>,
}

#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error(transparent)]
    Exhausted(#[from] AcquisitionFailure),
    /// A source reported a broken internal invariant.
    #[error("internal defect in source {source_name} for {reference}: {message}")]
    Defect {
        source_name: &'static str,
        reference: String,
        message: String,
    },
}

/// Tries sources strictly in priority order; the first record wins.
#[derive(Clone)]
pub struct Orchestrator {
    sources: Arc<Vec<Box<dyn ProfileSource>>>,
}

impl Orchestrator {
    pub fn new(sources: Vec<Box<dyn ProfileSource>>) -> Self {
        Self {
            sources: Arc::new(sources),
        }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn acquire(&self, request: &AcquisitionRequest) -> Result<Acquired, AcquireError> {
        ensure_metrics_described();

        let mut failures: Vec<SourceFailure> = Vec::new();
        for source in self.sources.iter() {
            let name = source.name();
            if !request.allows(name) {
                continue;
            }

            tracing::info!(target: "acquire", source = name, reference = request.reference(), "attempting source");
            let attempt = source.attempt_acquire(request);
            let outcome = match request.budget() {
                Some(budget) => tokio::time::timeout(budget, attempt).await.unwrap_or_else(|_| {
                    Err(SourceFailure::new(
                        name,
                        FailureKind::TimedOut,
                        format!("attempt exceeded request budget of {}s", budget.as_secs()),
                    ))
                }),
                None => attempt.await,
            };
            match outcome {
                Ok(record) => {
                    counter!("acquire_attempts_total", "source" => name, "outcome" => "ok")
                        .increment(1);
                    tracing::info!(target: "acquire", source = name, full_name = record.full_name(), "profile acquired");
                    return Ok(Acquired {
                        source: name,
                        record,
                    });
                }
                Err(f) if f.kind == FailureKind::Internal => {
                    tracing::error!(
                        target: "acquire",
                        source = name,
                        reference = request.reference(),
                        error = %f,
                        "source reported an internal defect"
                    );
                    return Err(AcquireError::Defect {
                        source_name: name,
                        reference: request.reference().to_string(),
                        message: f.message,
                    });
                }
                Err(f) => {
                    counter!("acquire_attempts_total", "source" => name, "outcome" => outcome_label(f.kind))
                        .increment(1);
                    if f.kind.is_skip() {
                        tracing::debug!(target: "acquire", source = name, reason = %f, "source skipped");
                    } else {
                        tracing::warn!(target: "acquire", source = name, reason = %f, "source failed");
                    }
                    failures.push(f);
                }
            }
        }

        counter!("acquire_fallback_total").increment(1);
        let reason = most_informative(&failures).unwrap_or_else(|| {
            SourceFailure::new(
                "orchestrator",
                FailureKind::NotConfigured,
                "no acquisition source enabled for this request",
            )
        });
        Err(AcquireError::Exhausted(AcquisitionFailure {
            reason,
            attempts: failures,
        }))
    }
}

/// Last real failure; skips only when nothing else happened.
fn most_informative(failures: &[SourceFailure]) -> Option<SourceFailure> {
    failures
        .iter()
        .rev()
        .find(|f| !f.kind.is_skip())
        .or_else(|| failures.last())
        .cloned()
}

fn outcome_label(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::NotConfigured => "not_configured",
        FailureKind::InvalidReference => "invalid_reference",
        FailureKind::Transport => "transport",
        FailureKind::NoData => "no_data",
        FailureKind::JobFailed => "job_failed",
        FailureKind::TimedOut => "timed_out",
        FailureKind::AccessBarrier => "access_barrier",
        FailureKind::Internal => "internal",
    }
}
