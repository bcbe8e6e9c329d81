// src/config/mod.rs
//! Process configuration. Loaded once at startup (TOML file + environment),
//! then shared read-only; nothing mutates it after `load`.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::acquire::poller::PollPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "config/outreach.toml";
pub const ENV_CONFIG_PATH: &str = "OUTREACH_CONFIG_PATH";

/// Marker meaning "read this credential from its environment variable".
const ENV_MARKER: &str = "ENV";

pub const DEFAULT_PRODUCT_DESCRIPTION: &str = "AI-powered business solutions that help companies streamline operations and increase efficiency";

/// Acquisition strategies that can appear in the priority list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    ApifySync,
    ApifyRun,
    #[serde(rename = "phantombuster-direct")]
    PhantomBusterDirect,
    #[serde(rename = "phantombuster")]
    PhantomBuster,
    LiveSession,
}

impl SourceKind {
    pub fn name(self) -> &'static str {
        match self {
            SourceKind::ApifySync => "apify-sync",
            SourceKind::ApifyRun => "apify-run",
            SourceKind::PhantomBusterDirect => "phantombuster-direct",
            SourceKind::PhantomBuster => "phantombuster",
            SourceKind::LiveSession => "live-session",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutreachConfig {
    pub server: ServerConfig,
    pub acquisition: AcquisitionConfig,
    pub generation: GenerationConfig,
    pub speech: SpeechConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL clients use to reach `/audio/*`.
    pub public_base_url: String,
    pub audio_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:3000".to_string(),
            audio_dir: PathBuf::from("public/audio"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Priority order; first entry is tried first.
    pub sources: Vec<SourceKind>,
    /// Fixed per-request budget for single-call providers.
    pub request_timeout_secs: u64,
    pub apify: ApifyConfig,
    pub phantombuster: PhantomBusterConfig,
    pub live: LiveConfig,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                SourceKind::ApifySync,
                SourceKind::ApifyRun,
                SourceKind::PhantomBusterDirect,
                SourceKind::PhantomBuster,
                SourceKind::LiveSession,
            ],
            request_timeout_secs: 60,
            apify: ApifyConfig::default(),
            phantombuster: PhantomBusterConfig::default(),
            live: LiveConfig::default(),
        }
    }
}

impl AcquisitionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApifyConfig {
    pub base_url: String,
    pub actor_id: String,
    /// Literal token, or "ENV"/absent to read `APIFY_API_TOKEN`.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub poll_interval_secs: u64,
    pub max_polls: u32,
}

impl Default for ApifyConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.apify.com/v2".to_string(),
            actor_id: "apimaestro~linkedin-profile-detail".to_string(),
            token: None,
            poll_interval_secs: 10,
            max_polls: 60,
        }
    }
}

impl ApifyConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(Duration::from_secs(self.poll_interval_secs), self.max_polls)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhantomBusterConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub phantom_id: Option<String>,
    pub poll_interval_secs: u64,
    pub max_polls: u32,
}

impl Default for PhantomBusterConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.phantombuster.com/api/v2".to_string(),
            api_key: None,
            phantom_id: None,
            poll_interval_secs: 10,
            max_polls: 30,
        }
    }
}

impl PhantomBusterConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(Duration::from_secs(self.poll_interval_secs), self.max_polls)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub timeout_secs: u64,
    /// Pause after navigation so late content can settle.
    pub settle_ms: u64,
    pub user_agent: String,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            settle_ms: 2000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Real provider calls allowed per day; cache hits are free.
    pub daily_limit: u32,
    pub cache_dir: PathBuf,
    pub default_product: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mistral.ai/v1".to_string(),
            model: "mistral-large-latest".to_string(),
            api_key: None,
            timeout_secs: 60,
            daily_limit: 200,
            cache_dir: PathBuf::from("cache/generation"),
            default_product: DEFAULT_PRODUCT_DESCRIPTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub base_url: String,
    pub voice_id: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub stability: f32,
    pub similarity_boost: f32,
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io/v1".to_string(),
            voice_id: "UgBBYS2sOqTuMpoF3BR0".to_string(),
            api_key: None,
            stability: 0.5,
            similarity_boost: 0.75,
            timeout_secs: 60,
        }
    }
}

impl OutreachConfig {
    /// Load using env var + fallback:
    /// 1) $OUTREACH_CONFIG_PATH (must exist)
    /// 2) config/outreach.toml (optional)
    /// 3) built-in defaults
    ///
    /// Credentials are resolved from the environment afterwards.
    pub fn load() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            return Self::load_from_file(p);
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from_file(default_path);
        }
        let mut cfg = Self::default();
        cfg.finish();
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.finish();
        Ok(cfg)
    }

    /// Parse without touching the environment.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: OutreachConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn finish(&mut self) {
        self.sanitize();
        self.resolve_credentials();
    }

    /// Zero budgets and an empty priority list fall back to defaults.
    fn sanitize(&mut self) {
        let acq_defaults = AcquisitionConfig::default();
        if self.acquisition.sources.is_empty() {
            self.acquisition.sources = acq_defaults.sources;
        }
        let mut seen = Vec::with_capacity(self.acquisition.sources.len());
        self.acquisition.sources.retain(|k| {
            if seen.contains(k) {
                false
            } else {
                seen.push(*k);
                true
            }
        });
        if self.acquisition.request_timeout_secs == 0 {
            self.acquisition.request_timeout_secs = acq_defaults.request_timeout_secs;
        }

        let apify = ApifyConfig::default();
        if self.acquisition.apify.poll_interval_secs == 0 {
            self.acquisition.apify.poll_interval_secs = apify.poll_interval_secs;
        }
        if self.acquisition.apify.max_polls == 0 {
            self.acquisition.apify.max_polls = apify.max_polls;
        }

        let pb = PhantomBusterConfig::default();
        if self.acquisition.phantombuster.poll_interval_secs == 0 {
            self.acquisition.phantombuster.poll_interval_secs = pb.poll_interval_secs;
        }
        if self.acquisition.phantombuster.max_polls == 0 {
            self.acquisition.phantombuster.max_polls = pb.max_polls;
        }

        if self.acquisition.live.timeout_secs == 0 {
            self.acquisition.live.timeout_secs = LiveConfig::default().timeout_secs;
        }
        if self.generation.timeout_secs == 0 {
            self.generation.timeout_secs = GenerationConfig::default().timeout_secs;
        }
        if self.speech.timeout_secs == 0 {
            self.speech.timeout_secs = SpeechConfig::default().timeout_secs;
        }
        if !(0.0..=1.0).contains(&self.speech.stability) {
            self.speech.stability = SpeechConfig::default().stability;
        }
        if !(0.0..=1.0).contains(&self.speech.similarity_boost) {
            self.speech.similarity_boost = SpeechConfig::default().similarity_boost;
        }
        if self.generation.default_product.trim().is_empty() {
            self.generation.default_product = DEFAULT_PRODUCT_DESCRIPTION.to_string();
        }
    }

    fn resolve_credentials(&mut self) {
        resolve(&mut self.acquisition.apify.token, "APIFY_API_TOKEN");
        resolve(&mut self.acquisition.phantombuster.api_key, "PHANTOMBUSTER_API_KEY");
        resolve(
            &mut self.acquisition.phantombuster.phantom_id,
            "PHANTOMBUSTER_PHANTOM_ID",
        );
        resolve(&mut self.generation.api_key, "MISTRAL_API_KEY");
        resolve(&mut self.speech.api_key, "ELEVENLABS_API_KEY");
    }
}

/// Absent or "ENV" reads `var`; a missing/empty variable leaves the credential unset.
fn resolve(slot: &mut Option<String>, var: &str) {
    let wants_env = match slot.as_deref() {
        None => true,
        Some(v) => v.trim().is_empty() || v.trim().eq_ignore_ascii_case(ENV_MARKER),
    };
    if wants_env {
        *slot = env::var(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_sections_missing() {
        let cfg = OutreachConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.acquisition.sources.len(), 5);
        assert_eq!(cfg.acquisition.sources[0], SourceKind::ApifySync);
        assert_eq!(cfg.acquisition.apify.max_polls, 60);
        assert_eq!(cfg.acquisition.phantombuster.max_polls, 30);
        assert_eq!(cfg.generation.model, "mistral-large-latest");
    }

    #[test]
    fn priority_list_and_sanitizing() {
        let toml = r#"
            [acquisition]
            sources = ["live-session", "phantombuster", "live-session"]
            request_timeout_secs = 0

            [acquisition.apify]
            poll_interval_secs = 0
            max_polls = 3

            [speech]
            stability = 4.2
        "#;
        let cfg = OutreachConfig::from_toml_str(toml).unwrap();
        assert_eq!(
            cfg.acquisition.sources,
            vec![SourceKind::LiveSession, SourceKind::PhantomBuster]
        );
        assert_eq!(cfg.acquisition.request_timeout_secs, 60);
        assert_eq!(cfg.acquisition.apify.poll_interval_secs, 10);
        assert_eq!(cfg.acquisition.apify.max_polls, 3);
        assert_eq!(cfg.speech.stability, 0.5);
    }

    #[test]
    fn unknown_source_name_is_rejected() {
        let toml = r#"
            [acquisition]
            sources = ["carrier-pigeon"]
        "#;
        assert!(OutreachConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn poll_policy_from_config() {
        let cfg = OutreachConfig::default();
        let p = cfg.acquisition.apify.poll_policy();
        assert_eq!(p.interval, Duration::from_secs(10));
        assert_eq!(p.budget(), Duration::from_secs(600));
    }

    #[serial_test::serial]
    #[test]
    fn env_marker_reads_variable_and_literal_wins() {
        env::set_var("APIFY_API_TOKEN", " apify-secret ");
        env::remove_var("MISTRAL_API_KEY");

        let mut token = Some("ENV".to_string());
        resolve(&mut token, "APIFY_API_TOKEN");
        assert_eq!(token.as_deref(), Some("apify-secret"));

        let mut literal = Some("inline".to_string());
        resolve(&mut literal, "APIFY_API_TOKEN");
        assert_eq!(literal.as_deref(), Some("inline"));

        let mut missing = None;
        resolve(&mut missing, "MISTRAL_API_KEY");
        assert_eq!(missing, None);

        env::remove_var("APIFY_API_TOKEN");
    }
}
