// src/voice/mod.rs
//! Speech-synthesis stage: text in, audio bytes out, persisted under a fresh
//! uuid so the HTTP layer can serve it from `/audio`.

pub mod store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::SpeechConfig;

pub use store::{AudioReference, AudioStore};

const CREDENTIAL: &str = "ELEVENLABS_API_KEY";
const XI_API_KEY_HEADER: &str = "xi-api-key";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("speech credential {0} not configured")]
    NotConfigured(&'static str),
    #[error("speech provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("speech provider returned no audio")]
    Empty,
    #[error("persisting audio failed: {0}")]
    Persist(String),
}

/// Speech-synthesis boundary.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError>;
    fn provider_name(&self) -> &'static str;
}

pub type DynSynthesizer = Arc<dyn SpeechSynthesizer>;

/// ElevenLabs text-to-speech.
pub struct ElevenLabsSynthesizer {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    stability: f32,
    similarity_boost: f32,
}

impl ElevenLabsSynthesizer {
    pub fn new(cfg: &SpeechConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("outreach-voice/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building speech http client")?;
        Ok(Self {
            http,
            endpoint: format!(
                "{}/text-to-speech/{}",
                cfg.base_url.trim_end_matches('/'),
                cfg.voice_id
            ),
            api_key: cfg.api_key.clone(),
            stability: cfg.stability,
            similarity_boost: cfg.similarity_boost,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SynthesisError::NotConfigured(CREDENTIAL))?;

        debug!(target: "voice", text_len = text.len(), key_len = api_key.len(), "requesting speech");
        let resp = self
            .http
            .post(&self.endpoint)
            .header(XI_API_KEY_HEADER, api_key)
            .json(&json!({
                "text": text,
                "voice_settings": {
                    "stability": self.stability,
                    "similarity_boost": self.similarity_boost,
                }
            }))
            .send()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(target: "voice", status = status.as_u16(), "speech provider rejected request");
            return Err(SynthesisError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;
        if bytes.is_empty() {
            return Err(SynthesisError::Empty);
        }
        Ok(bytes.to_vec())
    }

    fn provider_name(&self) -> &'static str {
        "elevenlabs"
    }
}

/// Fixed bytes; used when `OUTREACH_TEST_MODE=mock`.
#[derive(Debug, Clone, Default)]
pub struct MockSynthesizer;

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, SynthesisError> {
        Ok(b"ID3mock-audio".to_vec())
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

pub fn build_synthesizer(cfg: &SpeechConfig) -> anyhow::Result<DynSynthesizer> {
    if std::env::var(crate::generate::TEST_MODE_ENV)
        .map(|v| v.trim().eq_ignore_ascii_case("mock"))
        .unwrap_or(false)
    {
        return Ok(Arc::new(MockSynthesizer));
    }
    Ok(Arc::new(ElevenLabsSynthesizer::new(cfg)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let cfg = SpeechConfig {
            base_url: "http://127.0.0.1:9".into(),
            api_key: None,
            ..SpeechConfig::default()
        };
        let s = ElevenLabsSynthesizer::new(&cfg).unwrap();
        assert_eq!(
            s.synthesize("hello").await.unwrap_err(),
            SynthesisError::NotConfigured("ELEVENLABS_API_KEY")
        );
    }

    #[test]
    fn endpoint_includes_voice_id() {
        let s = ElevenLabsSynthesizer::new(&SpeechConfig::default()).unwrap();
        assert_eq!(
            s.endpoint,
            "https://api.elevenlabs.io/v1/text-to-speech/UgBBYS2sOqTuMpoF3BR0"
        );
        assert_eq!(s.stability, 0.5);
        assert_eq!(s.similarity_boost, 0.75);
    }
}
