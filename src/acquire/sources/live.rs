// src/acquire/sources/live.rs
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::acquire::render::{RenderSession, RenderingBackend};
use crate::acquire::types::{
    is_profile_reference, AcquisitionOutcome, AcquisitionRequest, FailureKind, ProfileRecord,
    ProfileSource, SourceFailure,
};

/// Final-location fragments that mean the profile sits behind a login wall.
pub const BARRIER_MARKERS: &[&str] = &["/authwall", "/login", "/checkpoint"];

/// Structural locators per field, highest priority first.
#[derive(Debug, Clone, Copy)]
pub struct Locators {
    pub full_name: &'static [&'static str],
    pub headline: &'static [&'static str],
    pub about: &'static [&'static str],
    pub recent_post: &'static [&'static str],
}

pub const PROFILE_LOCATORS: Locators = Locators {
    full_name: &[
        "h1.text-heading-xlarge",
        ".pv-text-details__left-panel h1",
        ".ph5 h1",
        "[data-generated-suggestion-target] h1",
    ],
    headline: &[
        ".text-body-medium.break-words",
        ".pv-text-details__left-panel .text-body-medium",
        ".ph5 .text-body-medium",
        ".pv-top-card--list-bullet .text-body-medium",
    ],
    about: &[
        "#about ~ * .pv-shared-text-with-see-more .inline-show-more-text",
        ".pv-about-section .pv-shared-text-with-see-more .inline-show-more-text",
        "[data-generated-suggestion-target=\"about\"] .inline-show-more-text",
        ".about .pv-shared-text-with-see-more .inline-show-more-text",
    ],
    recent_post: &[
        ".feed-shared-update-v2 .feed-shared-text .inline-show-more-text",
        ".occludable-update .feed-shared-text .inline-show-more-text",
        ".feed-shared-update-v2__description .inline-show-more-text",
    ],
};

/// Reads the profile straight from a live rendering session.
pub struct LiveSessionSource<R> {
    name: &'static str,
    backend: R,
    timeout: Duration,
    settle: Duration,
    locators: Locators,
}

impl<R: RenderingBackend> LiveSessionSource<R> {
    pub fn new(name: &'static str, backend: R, timeout: Duration, settle: Duration) -> Self {
        Self {
            name,
            backend,
            timeout,
            settle,
            locators: PROFILE_LOCATORS,
        }
    }

    pub fn with_locators(mut self, locators: Locators) -> Self {
        self.locators = locators;
        self
    }

    async fn drive(&self, session: &mut dyn RenderSession, reference: &str) -> AcquisitionOutcome {
        let transport = |e: anyhow::Error| SourceFailure::transport(self.name, &e);

        debug!(target: "acquire", source = self.name, reference, "navigating");
        session.navigate(reference).await.map_err(transport)?;
        tokio::time::sleep(self.settle).await;

        let location = session.current_url().await.map_err(transport)?;
        if let Some(loc) = location.as_deref() {
            if BARRIER_MARKERS.iter().any(|m| loc.contains(m)) {
                return Err(SourceFailure::new(
                    self.name,
                    FailureKind::AccessBarrier,
                    format!("Profile requires authentication or is private ({loc})"),
                ));
            }
        }

        let full_name = first_located(session, self.locators.full_name)
            .await
            .map_err(transport)?;
        let Some(full_name) = full_name else {
            return Err(SourceFailure::new(
                self.name,
                FailureKind::NoData,
                "Could not extract profile name. Profile may be private or page structure changed.",
            ));
        };
        let headline = first_located(session, self.locators.headline)
            .await
            .map_err(transport)?;
        let about = first_located(session, self.locators.about)
            .await
            .map_err(transport)?;
        let recent = first_located(session, self.locators.recent_post)
            .await
            .map_err(transport)?;

        Ok(ProfileRecord::new(Some(full_name), headline, about, recent))
    }
}

/// First locator that yields non-empty text wins; later locators are not queried.
async fn first_located(
    session: &dyn RenderSession,
    locators: &[&str],
) -> anyhow::Result<Option<String>> {
    for locator in locators {
        if let Some(text) = session.extract(locator).await? {
            let text = text.trim();
            if !text.is_empty() {
                return Ok(Some(text.to_string()));
            }
        }
    }
    Ok(None)
}

#[async_trait]
impl<R: RenderingBackend> ProfileSource for LiveSessionSource<R> {
    async fn attempt_acquire(&self, request: &AcquisitionRequest) -> AcquisitionOutcome {
        if !is_profile_reference(request.reference()) {
            return Err(SourceFailure::invalid_reference(self.name));
        }

        let mut session = self
            .backend
            .open()
            .await
            .map_err(|e| SourceFailure::transport(self.name, &e))?;

        let outcome = match tokio::time::timeout(
            self.timeout,
            self.drive(session.as_mut(), request.reference()),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(SourceFailure::new(
                self.name,
                FailureKind::TimedOut,
                format!(
                    "Page load timeout after {}s. Profile may be slow to load or inaccessible.",
                    self.timeout.as_secs()
                ),
            )),
        };

        if let Err(e) = session.close().await {
            warn!(target: "acquire", source = self.name, error = %e, "closing render session failed");
        }

        if let Ok(rec) = &outcome {
            info!(target: "acquire", source = self.name, name = rec.full_name(), "live extraction succeeded");
        }
        outcome
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
