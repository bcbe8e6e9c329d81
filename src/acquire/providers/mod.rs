// src/acquire/providers/mod.rs
//! HTTP clients for the external profile providers. Each client implements the
//! boundary traits below; the acquisition strategies in `sources` only ever see
//! these traits.

pub mod apify;
pub mod phantombuster;

use std::time::Duration;

use anyhow::Result;
use serde_json::Value;

use super::normalize::RawProviderPayload;
use super::poller::JobBackend;

/// Outcome of a single synchronous call that reached the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum CallReply {
    /// 2xx with a JSON body.
    Data(Value),
    /// Non-2xx HTTP status.
    Rejected(u16),
}

/// Single request/response provider endpoint.
#[async_trait::async_trait]
pub trait SingleCallApi: Send + Sync {
    /// `Err` only for transport faults or an unreadable body.
    async fn call(&self, body: Value) -> Result<CallReply>;
    /// Name of the credential this client lacks, if any.
    fn missing_credential(&self) -> Option<&'static str>;
    fn wrap(&self, item: Value) -> RawProviderPayload;
}

/// Asynchronous job provider: submit, then status/fetch through `JobBackend`.
#[async_trait::async_trait]
pub trait JobApi: JobBackend {
    /// Starts a job for `reference` and returns the provider's job id.
    async fn submit(&self, reference: &str) -> Result<String>;
    fn missing_credential(&self) -> Option<&'static str>;
    fn wrap(&self, item: Value) -> RawProviderPayload;
}

const USER_AGENT: &str = "outreach-voice/0.1";

/// Shared reqwest client builder for provider calls.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// A dataset response is either a JSON array of items or a single object.
pub(crate) fn into_items(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        Value::Object(ref m) if m.is_empty() => Vec::new(),
        other => vec![other],
    }
}

/// Rows of a synchronous result: only a JSON array counts. Error envelopes
/// and other objects yield nothing, so the caller moves on.
pub(crate) fn result_rows(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}
