//! Text-generation stage: provider abstraction, prompt builder, templated
//! fallback email, and the file cache + daily quota wrapper.

pub mod cache;
pub mod mistral;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;

use crate::acquire::types::ProfileRecord;
use crate::config::GenerationConfig;

pub use cache::CachingGenerator;
pub use mistral::MistralGenerator;

pub const TEST_MODE_ENV: &str = "OUTREACH_TEST_MODE";

/// Why a generation call produced no text. Every variant is recoverable: the
/// pipeline answers with `fallback_email` instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("generation credential {0} not configured")]
    NotConfigured(&'static str),
    #[error("rate limited by provider (HTTP 429)")]
    RateLimited,
    #[error("provider returned HTTP {0}")]
    Http(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned an empty completion")]
    Empty,
    #[error("daily generation limit of {0} calls reached")]
    DailyLimit(u32),
}

pub type GenerationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>>;

/// Text-generation boundary: structured prompt in, generated text out.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerationFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynGenerator = Arc<dyn TextGenerator>;

/// One profile paired with the product being pitched. Built once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutreachContext {
    pub record: ProfileRecord,
    pub product_description: String,
}

impl OutreachContext {
    pub fn new(record: ProfileRecord, product_description: impl Into<String>) -> Self {
        Self {
            record,
            product_description: product_description.into(),
        }
    }
}

/// Prompt sent to the generation provider. Deterministic in its input.
pub fn build_prompt(ctx: &OutreachContext) -> String {
    let r = &ctx.record;
    format!(
        "You are an experienced B2B sales development representative. Write one short, \
personalized outreach email for the lead below.

LEAD PROFILE
Full Name: {name}
Professional Headline: {headline}
About Section: {about}
Most Recent Post: {post}

PRODUCT
{product}

Pick the strongest hook in this order: the recent post, then the about section, then the headline.
Reference that hook in the first sentence and connect the product to the lead's own goals.
Stay under 120 words, sound like a colleague, end with a low-pressure question.
Never invent facts that are not in the profile.

Reply with the email only, in this format:

Subject: <subject line>

Hi {name},

<body>

Best regards,
[Your Name]
[Your Company]",
        name = r.full_name(),
        headline = r.headline(),
        about = r.about_text(),
        post = r.recent_post_text(),
        product = ctx.product_description,
    )
}

/// Templated email used when generation fails. Addresses the lead by name and
/// cites the headline.
pub fn fallback_email(record: &ProfileRecord) -> String {
    format!(
        "Subject: Quick question about your background

Hi {name},

Your background as {headline} stood out to me, and I'd love to discuss how our \
solutions might align with your current projects.

Would you be open to a brief 15-minute chat this week?

Best regards,
[Your Name]
[Your Company]",
        name = record.full_name(),
        headline = record.headline(),
    )
}

/// Deterministic generator used when `OUTREACH_TEST_MODE=mock`.
#[derive(Debug, Clone, Default)]
pub struct MockGenerator;

impl TextGenerator for MockGenerator {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerationFuture<'a> {
        let name = prompt
            .lines()
            .find_map(|l| l.strip_prefix("Full Name: "))
            .unwrap_or("there")
            .to_string();
        Box::pin(async move {
            Ok(format!(
                "Subject: Hello from the mock generator\n\nHi {name},\n\nThis is a mock outreach email.\n\nBest regards,\n[Your Name]\n[Your Company]"
            ))
        })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

fn test_mode_is_mock() -> bool {
    std::env::var(TEST_MODE_ENV)
        .map(|v| v.trim().eq_ignore_ascii_case("mock"))
        .unwrap_or(false)
}

/// Factory:
/// * `OUTREACH_TEST_MODE=mock` gives the deterministic mock (no disk, no network).
/// * Otherwise Mistral wrapped with the file cache and daily limit. A missing key
///   is reported per call as `NotConfigured`.
pub fn build_generator(cfg: &GenerationConfig) -> anyhow::Result<DynGenerator> {
    if test_mode_is_mock() {
        tracing::info!(target: "generate", "test mode: using mock generator");
        return Ok(Arc::new(MockGenerator));
    }
    let provider = MistralGenerator::new(cfg)?;
    Ok(Arc::new(CachingGenerator::new(
        provider,
        cfg.cache_dir.clone(),
        cfg.daily_limit,
    )))
}
