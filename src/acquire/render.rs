// src/acquire/render.rs
//! Rendering boundary used by the live-session strategy.
//!
//! A session is opened per attempt, navigated to the profile, asked for its
//! final location (to spot login walls) and then queried with structural
//! locators. `HttpRenderBackend` is a static renderer: an isolated HTTP client
//! per session (no shared cookies), redirects followed, CSS locators evaluated
//! with `scraper`. A headless-browser backend plugs in behind the same traits.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};

#[async_trait]
pub trait RenderingBackend: Send + Sync {
    async fn open(&self) -> Result<Box<dyn RenderSession>>;
}

/// One isolated rendering session. `close` must be called on every exit path;
/// implementations also release what they hold on drop.
#[async_trait]
pub trait RenderSession: Send + Sync {
    async fn navigate(&mut self, url: &str) -> Result<()>;
    /// Location after redirects, `None` before the first navigation.
    async fn current_url(&self) -> Result<Option<String>>;
    /// Text of the first node matching `locator`, whitespace-collapsed.
    async fn extract(&self, locator: &str) -> Result<Option<String>>;
    async fn close(&mut self) -> Result<()>;
}

pub struct HttpRenderBackend {
    user_agent: String,
    timeout: Duration,
}

impl HttpRenderBackend {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            timeout,
        }
    }
}

#[async_trait]
impl RenderingBackend for HttpRenderBackend {
    async fn open(&self) -> Result<Box<dyn RenderSession>> {
        let client = reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("building render session client")?;
        Ok(Box::new(HttpRenderSession {
            client: Some(client),
            location: None,
            document: None,
        }))
    }
}

struct HttpRenderSession {
    client: Option<reqwest::Client>,
    location: Option<String>,
    document: Option<String>,
}

#[async_trait]
impl RenderSession for HttpRenderSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| anyhow!("render session already closed"))?;
        let resp = client.get(url).send().await.context("navigate")?;
        self.location = Some(resp.url().to_string());
        self.document = Some(resp.text().await.context("reading document")?);
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>> {
        Ok(self.location.clone())
    }

    async fn extract(&self, locator: &str) -> Result<Option<String>> {
        match &self.document {
            Some(doc) => select_text(doc, locator),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.client = None;
        self.document = None;
        Ok(())
    }
}

/// Text of the first element matching `locator` in `document`.
pub fn select_text(document: &str, locator: &str) -> Result<Option<String>> {
    let selector =
        Selector::parse(locator).map_err(|e| anyhow!("invalid locator {locator:?}: {e}"))?;
    let html = Html::parse_document(document);
    let text = html.select(&selector).next().map(|el| {
        el.text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ")
    });
    Ok(text.filter(|t| !t.is_empty()))
}
