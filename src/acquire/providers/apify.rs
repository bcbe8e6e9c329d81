// src/acquire/providers/apify.rs
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{http_client, into_items, CallReply, JobApi, SingleCallApi};
use crate::acquire::normalize::RawProviderPayload;
use crate::acquire::poller::{JobBackend, JobStatus, ResultSet};
use crate::config::ApifyConfig;

const CREDENTIAL: &str = "APIFY_API_TOKEN";

/// Client for the Apify profile-detail actor (sync endpoint + run/dataset API).
pub struct ApifyClient {
    http: reqwest::Client,
    base_url: String,
    actor_id: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct RunStarted {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunState {
    status: String,
    #[serde(default)]
    status_message: Option<String>,
    #[serde(default)]
    default_dataset_id: Option<String>,
}

impl ApifyClient {
    pub fn new(cfg: &ApifyConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            actor_id: cfg.actor_id.clone(),
            token: cfg.token.clone(),
        })
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| anyhow!("{CREDENTIAL} not configured"))
    }

    /// Bodies tried in order by the synchronous endpoint; the actor's accepted
    /// input field is not documented, so several shapes are offered.
    pub fn input_shapes(reference: &str) -> Vec<Value> {
        vec![
            json!({ "username": reference }),
            json!({ "profileUrl": reference }),
            json!({ "linkedinUrl": reference }),
            json!({ "url": reference }),
            json!({ "profileUrls": [reference] }),
        ]
    }
}

/// Maps an actor-run status onto the poller vocabulary.
fn map_run_state(run: RunState) -> JobStatus {
    match run.status.as_str() {
        "SUCCEEDED" => match run.default_dataset_id {
            Some(ds) if !ds.is_empty() => JobStatus::Succeeded(ResultSet::Remote(ds)),
            _ => JobStatus::Succeeded(ResultSet::Inline(Vec::new())),
        },
        "FAILED" | "ABORTED" | "TIMED-OUT" => JobStatus::Failed(format!(
            "Apify run {}: {}",
            run.status.to_lowercase(),
            run.status_message.as_deref().unwrap_or("Unknown error")
        )),
        _ => JobStatus::Pending(run.status),
    }
}

#[async_trait]
impl SingleCallApi for ApifyClient {
    async fn call(&self, body: Value) -> Result<CallReply> {
        let url = format!(
            "{}/acts/{}/run-sync-get-dataset-items",
            self.base_url, self.actor_id
        );
        let resp = self
            .http
            .post(url)
            .query(&[("token", self.token()?)])
            .json(&body)
            .send()
            .await
            .context("apify sync post")?;
        if !resp.status().is_success() {
            return Ok(CallReply::Rejected(resp.status().as_u16()));
        }
        let data: Value = resp.json().await.context("apify sync body")?;
        Ok(CallReply::Data(data))
    }

    fn missing_credential(&self) -> Option<&'static str> {
        self.token.is_none().then_some(CREDENTIAL)
    }

    fn wrap(&self, item: Value) -> RawProviderPayload {
        RawProviderPayload::Apify(item)
    }
}

#[async_trait]
impl JobBackend for ApifyClient {
    async fn status(&self, job_id: &str) -> Result<JobStatus> {
        let resp = self
            .http
            .get(format!("{}/actor-runs/{}", self.base_url, job_id))
            .query(&[("token", self.token()?)])
            .send()
            .await
            .context("apify run status")?;
        if !resp.status().is_success() {
            // Transient gateway/rate-limit replies are retried by the poller.
            return Ok(JobStatus::Pending(format!("http {}", resp.status().as_u16())));
        }
        let run: Envelope<RunState> = resp.json().await.context("apify run status body")?;
        Ok(map_run_state(run.data))
    }

    async fn fetch(&self, location: &str) -> Result<Vec<Value>> {
        let resp = self
            .http
            .get(format!("{}/datasets/{}/items", self.base_url, location))
            .query(&[("token", self.token()?)])
            .send()
            .await
            .context("apify dataset items")?
            .error_for_status()
            .context("apify dataset items non-2xx")?;
        let body: Value = resp.json().await.context("apify dataset body")?;
        Ok(into_items(body))
    }

    fn name(&self) -> &'static str {
        "apify"
    }
}

#[async_trait]
impl JobApi for ApifyClient {
    async fn submit(&self, reference: &str) -> Result<String> {
        // The run input carries every field name the actor is known to read.
        let input = json!({
            "username": reference,
            "profileUrl": reference,
            "linkedinUrl": reference,
            "url": reference,
        });
        let resp = self
            .http
            .post(format!("{}/acts/{}/runs", self.base_url, self.actor_id))
            .query(&[("token", self.token()?)])
            .json(&input)
            .send()
            .await
            .context("apify run start")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Apify run start failed ({status}): {text}"));
        }
        let started: Envelope<RunStarted> = resp.json().await.context("apify run start body")?;
        Ok(started.data.id)
    }

    fn missing_credential(&self) -> Option<&'static str> {
        self.token.is_none().then_some(CREDENTIAL)
    }

    fn wrap(&self, item: Value) -> RawProviderPayload {
        RawProviderPayload::Apify(item)
    }
}
