// src/acquire/sources/job.rs
use async_trait::async_trait;
use tracing::{info, warn};

use super::precheck;
use crate::acquire::normalize::normalize;
use crate::acquire::poller::{
    poll, JobDefect, JobFailureKind, PollPolicy, ProviderJob, TerminalJob,
};
use crate::acquire::providers::JobApi;
use crate::acquire::types::{
    AcquisitionOutcome, AcquisitionRequest, FailureKind, ProfileSource, SourceFailure,
};

/// Submit a provider job, poll it to completion, normalize the first result.
pub struct JobSource<A> {
    name: &'static str,
    api: A,
    policy: PollPolicy,
}

impl<A: JobApi> JobSource<A> {
    pub fn new(name: &'static str, api: A, policy: PollPolicy) -> Self {
        Self { name, api, policy }
    }
}

#[async_trait]
impl<A: JobApi> ProfileSource for JobSource<A> {
    async fn attempt_acquire(&self, request: &AcquisitionRequest) -> AcquisitionOutcome {
        precheck(self.name, self.api.missing_credential(), request)?;

        let job_id = self
            .api
            .submit(request.reference())
            .await
            .map_err(|e| SourceFailure::transport(self.name, &e))?;
        info!(
            target: "acquire",
            source = self.name,
            job_id = %job_id,
            interval_secs = self.policy.interval.as_secs(),
            max_attempts = self.policy.max_attempts,
            "job submitted, waiting for completion"
        );

        let terminal = poll(ProviderJob::submitted(job_id, self.policy), &self.api)
            .await
            .map_err(|e| {
                if e.downcast_ref::<JobDefect>().is_some() {
                    return SourceFailure::new(self.name, FailureKind::Internal, e.to_string());
                }
                warn!(target: "acquire", source = self.name, error = %e, "polling aborted");
                SourceFailure::transport(self.name, &e)
            })?;

        match terminal {
            TerminalJob::Succeeded { attempts, results } => {
                info!(target: "acquire", source = self.name, attempts, "job succeeded");
                let first = results.into_iter().next().ok_or_else(|| {
                    SourceFailure::new(self.name, FailureKind::Internal, "succeeded job without results")
                })?;
                Ok(normalize(&self.api.wrap(first)))
            }
            TerminalJob::Failed { failure, .. } => {
                let kind = match failure.kind {
                    JobFailureKind::NoData => FailureKind::NoData,
                    JobFailureKind::Exhausted => FailureKind::TimedOut,
                    JobFailureKind::Provider => FailureKind::JobFailed,
                };
                Err(SourceFailure::new(self.name, kind, failure.reason))
            }
            TerminalJob::TimedOut { reason, .. } => {
                Err(SourceFailure::new(self.name, FailureKind::TimedOut, reason))
            }
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
