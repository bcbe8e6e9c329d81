// src/voice/store.rs
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

pub const PLACEHOLDER_AUDIO_FILE: &str = "mock-audio.mp3";

/// Where the audio for one run can be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AudioReference {
    Synthesized { file: String, url: String },
    /// Synthesis degraded; the url points at a fixed placeholder file.
    Placeholder { url: String },
}

impl AudioReference {
    pub fn url(&self) -> &str {
        match self {
            AudioReference::Synthesized { url, .. } | AudioReference::Placeholder { url } => url,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, AudioReference::Placeholder { .. })
    }
}

/// Writes synthesized audio to disk and builds its public url.
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
    public_base_url: String,
}

impl AudioStore {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            dir: dir.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn persist(&self, bytes: &[u8]) -> Result<AudioReference> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating audio dir {}", self.dir.display()))?;
        let file = format!("{}.mp3", Uuid::new_v4());
        let path = self.dir.join(&file);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        let url = self.url_for(&file);
        Ok(AudioReference::Synthesized { file, url })
    }

    pub fn placeholder(&self) -> AudioReference {
        AudioReference::Placeholder {
            url: self.url_for(PLACEHOLDER_AUDIO_FILE),
        }
    }

    fn url_for(&self, file: &str) -> String {
        format!("{}/audio/{}", self.public_base_url, file)
    }
}
