// src/acquire/providers/phantombuster.rs
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{http_client, CallReply, JobApi, SingleCallApi};
use crate::acquire::normalize::RawProviderPayload;
use crate::acquire::poller::{JobBackend, JobStatus, ResultSet};
use crate::config::PhantomBusterConfig;

const KEY_HEADER: &str = "X-Phantombuster-Key";
const CREDENTIAL_KEY: &str = "PHANTOMBUSTER_API_KEY";
const CREDENTIAL_PHANTOM: &str = "PHANTOMBUSTER_PHANTOM_ID";

/// PhantomBuster container jobs (launch + fetch-output) and the direct profile endpoint.
pub struct PhantomBusterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    phantom_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Launched {
    container_id: Value,
}

#[derive(Debug, Default, Deserialize)]
struct ContainerOutput {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<Vec<Value>>,
}

impl PhantomBusterClient {
    pub fn new(cfg: &PhantomBusterConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            phantom_id: cfg.phantom_id.clone(),
        })
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("{CREDENTIAL_KEY} not configured"))
    }
}

/// Container output counts as finished as soon as it carries any data rows.
fn map_output(out: ContainerOutput) -> JobStatus {
    match out.data {
        Some(rows) if !rows.is_empty() => JobStatus::Succeeded(ResultSet::Inline(rows)),
        _ => JobStatus::Pending(out.status.unwrap_or_else(|| "waiting".to_string())),
    }
}

/// Container ids come back as numbers or strings depending on the endpoint version.
fn container_id(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl JobBackend for PhantomBusterClient {
    async fn status(&self, job_id: &str) -> Result<JobStatus> {
        let resp = self
            .http
            .get(format!("{}/containers/fetch-output", self.base_url))
            .query(&[("id", job_id)])
            .header(KEY_HEADER, self.key()?)
            .send()
            .await
            .context("phantombuster fetch-output")?;
        if !resp.status().is_success() {
            // Output not ready yet is reported as non-2xx by some deployments.
            return Ok(JobStatus::Pending(format!("http {}", resp.status().as_u16())));
        }
        let out: ContainerOutput = resp.json().await.context("phantombuster output body")?;
        Ok(map_output(out))
    }

    async fn fetch(&self, location: &str) -> Result<Vec<Value>> {
        // Results are always inline in fetch-output.
        Err(anyhow!("phantombuster has no remote result sets ({location})"))
    }

    fn name(&self) -> &'static str {
        "phantombuster"
    }
}

#[async_trait]
impl JobApi for PhantomBusterClient {
    async fn submit(&self, reference: &str) -> Result<String> {
        let phantom_id = self
            .phantom_id
            .as_deref()
            .ok_or_else(|| anyhow!("{CREDENTIAL_PHANTOM} not configured"))?;
        let body = json!({
            "id": phantom_id,
            "argument": { "profileUrl": reference },
        });
        let resp = self
            .http
            .post(format!("{}/phantoms/launch", self.base_url))
            .header(KEY_HEADER, self.key()?)
            .json(&body)
            .send()
            .await
            .context("phantombuster launch")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("PhantomBuster launch failed ({status}): {text}"));
        }
        let launched: Launched = resp.json().await.context("phantombuster launch body")?;
        container_id(&launched.container_id)
            .ok_or_else(|| anyhow!("PhantomBuster launch returned no containerId"))
    }

    fn missing_credential(&self) -> Option<&'static str> {
        if self.api_key.is_none() {
            Some(CREDENTIAL_KEY)
        } else if self.phantom_id.is_none() {
            Some(CREDENTIAL_PHANTOM)
        } else {
            None
        }
    }

    fn wrap(&self, item: Value) -> RawProviderPayload {
        RawProviderPayload::PhantomBuster(item)
    }
}

#[async_trait]
impl SingleCallApi for PhantomBusterClient {
    async fn call(&self, body: Value) -> Result<CallReply> {
        let resp = self
            .http
            .post(format!("{}/linkedin/profile", self.base_url))
            .header(KEY_HEADER, self.key()?)
            .json(&body)
            .send()
            .await
            .context("phantombuster direct post")?;
        if !resp.status().is_success() {
            return Ok(CallReply::Rejected(resp.status().as_u16()));
        }
        let data: Value = resp.json().await.context("phantombuster direct body")?;
        Ok(CallReply::Data(data))
    }

    fn missing_credential(&self) -> Option<&'static str> {
        self.api_key.is_none().then_some(CREDENTIAL_KEY)
    }

    fn wrap(&self, item: Value) -> RawProviderPayload {
        RawProviderPayload::PhantomDirect(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_with_rows_is_inline_success() {
        let out: ContainerOutput =
            serde_json::from_str(r#"{"status":"finished","data":[{"fullName":"x"}]}"#).unwrap();
        assert!(matches!(
            map_output(out),
            JobStatus::Succeeded(ResultSet::Inline(rows)) if rows.len() == 1
        ));
    }

    #[test]
    fn output_without_rows_keeps_polling() {
        let out: ContainerOutput = serde_json::from_str(r#"{"status":"running"}"#).unwrap();
        assert_eq!(map_output(out), JobStatus::Pending("running".into()));
        assert_eq!(
            map_output(ContainerOutput::default()),
            JobStatus::Pending("waiting".into())
        );
    }

    #[test]
    fn container_id_accepts_number_or_string() {
        assert_eq!(container_id(&json!(42)), Some("42".into()));
        assert_eq!(container_id(&json!("c-7")), Some("c-7".into()));
        assert_eq!(container_id(&json!("")), None);
    }
}
