// src/generate/cache.rs
//! File cache keyed by prompt hash, plus a persisted per-day call counter.
//! Only real provider calls count against the limit; cache hits are free.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::{GenerationError, GenerationFuture, TextGenerator};

pub struct CachingGenerator<G: TextGenerator> {
    inner: G,
    cache_dir: PathBuf,
    daily_limit: u32,
    counter: Arc<Mutex<DailyCounter>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedCompletion {
    text: String,
}

impl<G: TextGenerator> CachingGenerator<G> {
    pub fn new(inner: G, cache_dir: PathBuf, daily_limit: u32) -> Self {
        if let Err(e) = fs::create_dir_all(&cache_dir) {
            warn!(target: "generate", dir = %cache_dir.display(), error = %e, "cannot create cache dir");
        }
        let counter = load_daily_counter(&cache_dir).unwrap_or_default();
        Self {
            inner,
            cache_dir,
            daily_limit,
            counter: Arc::new(Mutex::new(counter)),
        }
    }

    /// Calls made today against the real provider.
    pub fn calls_today(&self) -> u32 {
        let mut g = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        g.roll_over();
        g.count
    }

    async fn generate_impl(&self, prompt: &str) -> Result<String, GenerationError> {
        let key = cache_key(prompt);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            debug!(target: "generate", key = %key, "cache hit");
            return Ok(hit.text);
        }

        {
            let mut g = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
            if g.roll_over() {
                let _ = save_daily_counter(&self.cache_dir, &g);
            }
            if g.count >= self.daily_limit {
                return Err(GenerationError::DailyLimit(self.daily_limit));
            }
        }

        let text = self.inner.generate(prompt).await?;

        if let Err(e) = write_cache_file(&self.cache_dir, &key, &CachedCompletion { text: text.clone() }) {
            warn!(target: "generate", error = %e, "cache write failed");
        }
        let mut g = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        g.count = g.count.saturating_add(1);
        let _ = save_daily_counter(&self.cache_dir, &g);
        Ok(text)
    }
}

impl<G: TextGenerator> TextGenerator for CachingGenerator<G> {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerationFuture<'a> {
        Box::pin(self.generate_impl(prompt))
    }
    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}

fn cache_key(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<CachedCompletion> {
    let s = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&s).ok()
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let json = serde_json::to_vec(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(&json)?;
    fs::rename(tmp, path)
}

fn write_cache_file(dir: &Path, key: &str, value: &CachedCompletion) -> io::Result<()> {
    write_json_atomic(&cache_path(dir, key), value)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    /// Resets on a new UTC day. Returns true if it did.
    fn roll_over(&mut self) -> bool {
        let now = today();
        if self.date != now {
            self.date = now;
            self.count = 0;
            true
        } else {
            false
        }
    }
}

fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    write_json_atomic(&counter_path(dir), dc)
}
