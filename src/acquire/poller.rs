// src/acquire/poller.rs
//! Job poller: drives one provider-side job from submission to a terminal state.
//!
//! `Submitted -> Polling -> {Succeeded, Failed, TimedOut}`. The poller waits one
//! interval before every status check, so `max_attempts * interval` bounds the
//! wall-clock time spent waiting. Provider-reported failures end up in the
//! terminal state; only transport faults are returned as `Err`.

use std::time::Duration;

use anyhow::Result;
use metrics::counter;
use serde_json::Value;

/// Status reported by a provider for an in-flight job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Queued/running; carries the raw provider label for logging.
    Pending(String),
    Succeeded(ResultSet),
    /// Failed/aborted/timed-out on the provider side, with a human-readable reason.
    Failed(String),
}

/// Where the results of a succeeded job live.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSet {
    Inline(Vec<Value>),
    /// Provider-side location (dataset id, output URL) to fetch from.
    Remote(String),
}

/// Status/fetch half of a job-based provider.
#[async_trait::async_trait]
pub trait JobBackend: Send + Sync {
    async fn status(&self, job_id: &str) -> Result<JobStatus>;
    async fn fetch(&self, location: &str) -> Result<Vec<Value>>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Worst-case time spent waiting between checks.
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobState {
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed | JobState::TimedOut)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFailureKind {
    /// Provider reported failed/aborted/timed-out.
    Provider,
    /// Success status but an empty result set.
    NoData,
    /// Attempt budget exhausted while still polling.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub kind: JobFailureKind,
    pub reason: String,
}

/// Broken state-machine invariant. Distinct from provider or transport faults.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("job {job_id}: {detail}")]
pub struct JobDefect {
    pub job_id: String,
    pub detail: String,
}

/// One in-flight provider job. Mutated only by `poll`.
#[derive(Debug, Clone)]
pub struct ProviderJob {
    id: String,
    state: JobState,
    attempts: u32,
    policy: PollPolicy,
    error: Option<JobFailure>,
    result: Option<Vec<Value>>,
}

impl ProviderJob {
    pub fn submitted(id: impl Into<String>, policy: PollPolicy) -> Self {
        Self {
            id: id.into(),
            state: JobState::Submitted,
            attempts: 0,
            policy,
            error: None,
            result: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn state(&self) -> JobState {
        self.state
    }
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// States only move forward; a terminal job is never touched again.
    fn advance(&mut self, next: JobState) -> Result<()> {
        if next <= self.state || self.state.is_terminal() {
            return Err(JobDefect {
                job_id: self.id.clone(),
                detail: format!("illegal transition {:?} -> {:?}", self.state, next),
            }
            .into());
        }
        self.state = next;
        Ok(())
    }

    fn finish_failed(&mut self, next: JobState, kind: JobFailureKind, reason: String) -> Result<()> {
        self.advance(next)?;
        self.error = Some(JobFailure { kind, reason });
        Ok(())
    }
}

/// A job in a terminal state, with its result or failure consumed out of it.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalJob {
    Succeeded { attempts: u32, results: Vec<Value> },
    Failed { attempts: u32, failure: JobFailure },
    TimedOut { attempts: u32, reason: String },
}

impl TerminalJob {
    pub fn attempts(&self) -> u32 {
        match self {
            TerminalJob::Succeeded { attempts, .. }
            | TerminalJob::Failed { attempts, .. }
            | TerminalJob::TimedOut { attempts, .. } => *attempts,
        }
    }

    fn from_job(job: ProviderJob) -> Result<Self> {
        let attempts = job.attempts;
        match (job.state, job.result, job.error) {
            (JobState::Succeeded, Some(results), _) => Ok(TerminalJob::Succeeded { attempts, results }),
            (JobState::Failed, _, Some(failure)) => Ok(TerminalJob::Failed { attempts, failure }),
            (JobState::TimedOut, _, Some(f)) => Ok(TerminalJob::TimedOut {
                attempts,
                reason: f.reason,
            }),
            (state, _, _) => Err(JobDefect {
                job_id: job.id,
                detail: format!("left poller in non-terminal state {state:?}"),
            }
            .into()),
        }
    }
}

/// Drive `job` to a terminal state. Status checks run strictly one after another.
pub async fn poll<B>(mut job: ProviderJob, backend: &B) -> Result<TerminalJob>
where
    B: JobBackend + ?Sized,
{
    job.advance(JobState::Polling)?;
    let policy = job.policy;

    while job.attempts < policy.max_attempts {
        tokio::time::sleep(policy.interval).await;
        job.attempts += 1;
        counter!("acquire_polls_total", "source" => backend.name()).increment(1);

        let status = backend.status(&job.id).await?;
        tracing::debug!(
            target: "poller",
            source = backend.name(),
            job_id = %job.id,
            attempt = job.attempts,
            max_attempts = policy.max_attempts,
            status = ?status,
            "job status"
        );

        match status {
            JobStatus::Pending(_) => continue,
            JobStatus::Failed(reason) => {
                job.finish_failed(JobState::Failed, JobFailureKind::Provider, reason)?;
                return TerminalJob::from_job(job);
            }
            JobStatus::Succeeded(set) => {
                let results = match set {
                    ResultSet::Inline(items) => items,
                    ResultSet::Remote(location) => backend.fetch(&location).await?,
                };
                if results.is_empty() {
                    job.finish_failed(
                        JobState::Failed,
                        JobFailureKind::NoData,
                        format!("No profile data returned from {}", backend.name()),
                    )?;
                } else {
                    job.advance(JobState::Succeeded)?;
                    job.result = Some(results);
                }
                return TerminalJob::from_job(job);
            }
        }
    }

    let reason = format!(
        "{} job timed out after {} polls ({}s)",
        backend.name(),
        job.attempts,
        policy.budget().as_secs()
    );
    job.finish_failed(JobState::TimedOut, JobFailureKind::Exhausted, reason)?;
    TerminalJob::from_job(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    struct Scripted {
        statuses: Mutex<VecDeque<Result<JobStatus>>>,
        fetched: Vec<Value>,
        checks: Mutex<u32>,
    }

    impl Scripted {
        fn new(statuses: Vec<Result<JobStatus>>, fetched: Vec<Value>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                fetched,
                checks: Mutex::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl JobBackend for Scripted {
        async fn status(&self, _job_id: &str) -> Result<JobStatus> {
            *self.checks.lock() += 1;
            self.statuses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(JobStatus::Pending("RUNNING".into())))
        }
        async fn fetch(&self, _location: &str) -> Result<Vec<Value>> {
            Ok(self.fetched.clone())
        }
        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn policy(secs: u64, n: u32) -> PollPolicy {
        PollPolicy::new(Duration::from_secs(secs), n)
    }

    #[tokio::test(start_paused = true)]
    async fn never_terminal_times_out_within_budget() {
        let backend = Scripted::new(vec![], vec![]);
        let started = Instant::now();
        let out = poll(ProviderJob::submitted("j1", policy(10, 6)), &backend)
            .await
            .unwrap();
        assert!(matches!(out, TerminalJob::TimedOut { attempts: 6, .. }));
        assert_eq!(*backend.checks.lock(), 6);
        assert!(started.elapsed() <= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_poll_and_fetches_remote_set() {
        let backend = Scripted::new(
            vec![
                Ok(JobStatus::Pending("READY".into())),
                Ok(JobStatus::Pending("RUNNING".into())),
                Ok(JobStatus::Succeeded(ResultSet::Remote("ds-1".into()))),
            ],
            vec![json!({"fullName": "x"})],
        );
        let out = poll(ProviderJob::submitted("j2", policy(1, 10)), &backend)
            .await
            .unwrap();
        match out {
            TerminalJob::Succeeded { attempts, results } => {
                assert_eq!(attempts, 3);
                assert_eq!(results.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(*backend.checks.lock(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_failure_is_terminal_not_error() {
        let backend = Scripted::new(
            vec![Ok(JobStatus::Failed("run aborted: user cancelled".into()))],
            vec![],
        );
        let out = poll(ProviderJob::submitted("j3", policy(1, 5)), &backend)
            .await
            .unwrap();
        match out {
            TerminalJob::Failed { attempts, failure } => {
                assert_eq!(attempts, 1);
                assert_eq!(failure.kind, JobFailureKind::Provider);
                assert!(failure.reason.contains("aborted"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(*backend.checks.lock(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_result_set_is_no_data() {
        let backend = Scripted::new(
            vec![Ok(JobStatus::Succeeded(ResultSet::Inline(vec![])))],
            vec![],
        );
        let out = poll(ProviderJob::submitted("j4", policy(1, 5)), &backend)
            .await
            .unwrap();
        assert!(matches!(
            out,
            TerminalJob::Failed { failure: JobFailure { kind: JobFailureKind::NoData, .. }, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_fault_surfaces_as_error() {
        let backend = Scripted::new(vec![Err(anyhow::anyhow!("connection reset"))], vec![]);
        let err = poll(ProviderJob::submitted("j5", policy(1, 5)), &backend)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn states_never_move_backwards() {
        let mut job = ProviderJob::submitted("j6", policy(1, 1));
        job.advance(JobState::Polling).unwrap();
        let err = job.advance(JobState::Submitted).unwrap_err();
        assert!(err.downcast_ref::<JobDefect>().is_some());
        job.advance(JobState::TimedOut).unwrap();
        assert!(job.advance(JobState::Succeeded).is_err());
        assert_eq!(job.state(), JobState::TimedOut);
    }

    #[test]
    fn budget_is_interval_times_attempts() {
        assert_eq!(policy(10, 60).budget(), Duration::from_secs(600));
    }
}
