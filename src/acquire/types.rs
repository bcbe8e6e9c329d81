// src/acquire/types.rs
use std::fmt;
use std::time::Duration;

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;

pub const PLACEHOLDER_NAME: &str = "Unknown Name";
pub const PLACEHOLDER_HEADLINE: &str = "No headline available";
pub const PLACEHOLDER_ABOUT: &str = "No about section available";
pub const PLACEHOLDER_POST: &str = "No recent posts available";

/// Canonical, provider-independent profile. Every field is non-empty: absent
/// source data is replaced by the field's placeholder at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    full_name: String,
    headline: String,
    about_text: String,
    recent_post_text: String,
}

impl ProfileRecord {
    pub fn new(
        full_name: Option<String>,
        headline: Option<String>,
        about_text: Option<String>,
        recent_post_text: Option<String>,
    ) -> Self {
        fn or_placeholder(v: Option<String>, placeholder: &str) -> String {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| placeholder.to_string())
        }
        Self {
            full_name: or_placeholder(full_name, PLACEHOLDER_NAME),
            headline: or_placeholder(headline, PLACEHOLDER_HEADLINE),
            about_text: or_placeholder(about_text, PLACEHOLDER_ABOUT),
            recent_post_text: or_placeholder(recent_post_text, PLACEHOLDER_POST),
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }
    pub fn headline(&self) -> &str {
        &self.headline
    }
    pub fn about_text(&self) -> &str {
        &self.about_text
    }
    pub fn recent_post_text(&self) -> &str {
        &self.recent_post_text
    }
}

fn profile_pattern() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"linkedin\.com/in/([^/?#\s]+)").unwrap_or_else(|e| panic!("profile pattern: {e}"))
    })
}

/// Profile slug of `reference`, if it points at `linkedin.com/in/<slug>`.
pub fn profile_slug(reference: &str) -> Option<&str> {
    profile_pattern()
        .captures(reference)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Returns true when `reference` points at a public profile.
pub fn is_profile_reference(reference: &str) -> bool {
    profile_slug(reference).is_some()
}

/// One acquisition request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionRequest {
    reference: String,
    /// Source names allowed for this request; empty means every configured source.
    only: Vec<String>,
    /// Cap on each adapter attempt, on top of the adapter's own budget.
    budget: Option<Duration>,
}

impl AcquisitionRequest {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into().trim().to_string(),
            only: Vec::new(),
            budget: None,
        }
    }

    pub fn restricted_to<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn allows(&self, source: &str) -> bool {
        self.only.is_empty() || self.only.iter().any(|s| s.eq_ignore_ascii_case(source))
    }
}

/// Why a single source did not produce a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    NotConfigured,
    InvalidReference,
    Transport,
    NoData,
    /// Provider reported the job as failed or aborted.
    JobFailed,
    TimedOut,
    AccessBarrier,
    /// Broken internal invariant; the orchestrator escalates this instead of falling back.
    Internal,
}

impl FailureKind {
    /// Skips are not counted as real attempts when picking the aggregate reason.
    pub fn is_skip(self) -> bool {
        matches!(self, FailureKind::NotConfigured | FailureKind::InvalidReference)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::NotConfigured => "not-configured",
            FailureKind::InvalidReference => "invalid-reference",
            FailureKind::Transport => "transport-error",
            FailureKind::NoData => "no-data",
            FailureKind::JobFailed => "job-failed",
            FailureKind::TimedOut => "timed-out",
            FailureKind::AccessBarrier => "access-barrier",
            FailureKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{source_name}: {kind}: {message}")]
pub struct SourceFailure {
    pub source_name: &'static str,
    pub kind: FailureKind,
    pub message: String,
}

impl SourceFailure {
    pub fn new(source_name: &'static str, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            source_name,
            kind,
            message: message.into(),
        }
    }

    pub fn not_configured(source_name: &'static str, credential: &str) -> Self {
        Self::new(
            source_name,
            FailureKind::NotConfigured,
            format!("{credential} not configured"),
        )
    }

    pub fn invalid_reference(source_name: &'static str) -> Self {
        Self::new(
            source_name,
            FailureKind::InvalidReference,
            "Invalid profile URL format (expected linkedin.com/in/<slug>)",
        )
    }

    pub fn transport(source_name: &'static str, err: &anyhow::Error) -> Self {
        Self::new(source_name, FailureKind::Transport, format!("{err:#}"))
    }
}

pub type AcquisitionOutcome = Result<ProfileRecord, SourceFailure>;

/// A single acquisition strategy. New providers are added by implementing this
/// trait and inserting the source into the orchestrator's priority list.
#[async_trait::async_trait]
pub trait ProfileSource: Send + Sync {
    /// Never returns an unhandled fault: every error is mapped into a `SourceFailure`.
    async fn attempt_acquire(&self, request: &AcquisitionRequest) -> AcquisitionOutcome;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_get_placeholders() {
        let r = ProfileRecord::new(Some("  Ada ".into()), Some("   ".into()), None, None);
        assert_eq!(r.full_name(), "Ada");
        assert_eq!(r.headline(), PLACEHOLDER_HEADLINE);
        assert_eq!(r.about_text(), PLACEHOLDER_ABOUT);
        assert_eq!(r.recent_post_text(), PLACEHOLDER_POST);
    }

    #[test]
    fn profile_reference_needs_slug() {
        assert!(is_profile_reference("https://www.linkedin.com/in/ada-lovelace/"));
        assert!(is_profile_reference("linkedin.com/in/x?trk=1"));
        assert!(!is_profile_reference("https://www.linkedin.com/in/"));
        assert!(!is_profile_reference("https://www.linkedin.com/company/acme"));
        assert!(!is_profile_reference(""));
        assert_eq!(
            profile_slug("https://www.linkedin.com/in/ada-lovelace/?trk=x"),
            Some("ada-lovelace")
        );
    }

    #[test]
    fn request_filter_is_case_insensitive() {
        let req = AcquisitionRequest::new(" linkedin.com/in/a ").restricted_to(["Live-Session"]);
        assert_eq!(req.reference(), "linkedin.com/in/a");
        assert!(req.allows("live-session"));
        assert!(!req.allows("apify-sync"));
        assert!(AcquisitionRequest::new("x").allows("anything"));
    }
}
