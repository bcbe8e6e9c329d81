// src/pipeline.rs
//! Acquisition → generation → synthesis, with degrade rules at every stage.
//! Only an acquisition defect aborts a run; every external failure is
//! replaced by a substitute value and recorded in the diagnostics.

use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::acquire::types::{AcquisitionRequest, ProfileRecord};
use crate::acquire::{ensure_metrics_described, AcquireError, Orchestrator};
use crate::generate::{build_prompt, fallback_email, DynGenerator, OutreachContext};
use crate::voice::{AudioReference, AudioStore, DynSynthesizer, SynthesisError};

pub const FALLBACK_STRATEGY: &str = "fallback";
const PREVIEW_CHARS: usize = 100;

/// Built-in lead used whenever acquisition fails.
pub fn fallback_profile() -> ProfileRecord {
    ProfileRecord::new(
        Some("Jane Doe".to_string()),
        Some("Professional at Acme Corp".to_string()),
        Some(
            "Jane Doe is the Head of Engineering at Acme Corp. She recently posted about \
scaling engineering teams and adopting AI tools, and gave a talk last week on AI ethics \
at TechConf 2025."
                .to_string(),
        ),
        Some("Acme Corp announced a new AI-powered hiring platform last month.".to_string()),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPreviews {
    pub full_name: String,
    pub headline: String,
    pub about_text: String,
    pub recent_post_text: String,
}

impl FieldPreviews {
    fn of(record: &ProfileRecord) -> Self {
        Self {
            full_name: preview(record.full_name()),
            headline: preview(record.headline()),
            about_text: preview(record.about_text()),
            recent_post_text: preview(record.recent_post_text()),
        }
    }
}

/// First 100 characters, with "..." appended when cut.
pub fn preview(s: &str) -> String {
    match s.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Name of the source that produced the record, or "fallback".
    pub strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_error: Option<String>,
    pub previews: FieldPreviews,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub text: String,
    pub audio: AudioReference,
    pub record: ProfileRecord,
    pub product_description: String,
    pub diagnostics: Diagnostics,
}

impl PipelineResult {
    pub fn used_fallback_profile(&self) -> bool {
        self.diagnostics.strategy == FALLBACK_STRATEGY
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("pipeline defect in stage {stage} for {reference:?}: {message}")]
    Defect {
        stage: &'static str,
        reference: String,
        message: String,
    },
}

#[derive(Clone)]
pub struct OutreachPipeline {
    orchestrator: Orchestrator,
    generator: DynGenerator,
    synthesizer: DynSynthesizer,
    audio: AudioStore,
    default_product: String,
}

impl OutreachPipeline {
    pub fn new(
        orchestrator: Orchestrator,
        generator: DynGenerator,
        synthesizer: DynSynthesizer,
        audio: AudioStore,
        default_product: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator,
            generator,
            synthesizer,
            audio,
            default_product: default_product.into(),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn audio_store(&self) -> &AudioStore {
        &self.audio
    }

    pub async fn run(
        &self,
        reference: &str,
        product_description: Option<&str>,
    ) -> Result<PipelineResult, PipelineError> {
        self.run_request(&AcquisitionRequest::new(reference), product_description)
            .await
    }

    pub async fn run_request(
        &self,
        request: &AcquisitionRequest,
        product_description: Option<&str>,
    ) -> Result<PipelineResult, PipelineError> {
        ensure_metrics_described();
        let started = Instant::now();
        let mut notes = Vec::new();

        // 1) acquisition; exhaustion degrades to the built-in lead
        let (record, strategy, acquisition_error) = match self.orchestrator.acquire(request).await {
            Ok(acquired) => (acquired.record, acquired.source.to_string(), None),
            Err(AcquireError::Exhausted(failure)) => {
                counter!("pipeline_degraded_total", "stage" => "acquire").increment(1);
                warn!(
                    target: "pipeline",
                    reference = request.reference(),
                    reason = %failure.reason,
                    "acquisition failed, using fallback lead"
                );
                notes.push("Profile acquisition failed; using fallback lead".to_string());
                (
                    fallback_profile(),
                    FALLBACK_STRATEGY.to_string(),
                    Some(failure.to_string()),
                )
            }
            Err(AcquireError::Defect {
                source_name,
                reference,
                message,
            }) => {
                error!(
                    target: "pipeline",
                    stage = "acquire",
                    source = source_name,
                    reference = %reference,
                    detail = %message,
                    "defect during acquisition"
                );
                return Err(PipelineError::Defect {
                    stage: "acquire",
                    reference,
                    message: format!("{source_name}: {message}"),
                });
            }
        };

        // 2) generation; any error degrades to the templated email
        let product = product_description
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(self.default_product.as_str())
            .to_string();
        let ctx = OutreachContext::new(record, product);
        let prompt = build_prompt(&ctx);
        let text = match self.generator.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                counter!("pipeline_degraded_total", "stage" => "generate").increment(1);
                warn!(
                    target: "pipeline",
                    provider = self.generator.provider_name(),
                    error = %e,
                    "generation failed, using templated email"
                );
                notes.push(format!("Email generation failed ({e}); using templated email"));
                fallback_email(&ctx.record)
            }
        };

        // 3) synthesis; failure keeps the text and points at the placeholder
        let audio = match self.synthesize(&text).await {
            Ok(reference) => reference,
            Err(e) => {
                counter!("pipeline_degraded_total", "stage" => "synthesize").increment(1);
                warn!(
                    target: "pipeline",
                    provider = self.synthesizer.provider_name(),
                    error = %e,
                    "voice generation failed, returning placeholder audio"
                );
                notes.push(format!("Voice generation failed ({e}); placeholder audio returned"));
                self.audio.placeholder()
            }
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("pipeline_run_ms").record(elapsed_ms);
        info!(
            target: "pipeline",
            strategy = %strategy,
            degraded = notes.len(),
            elapsed_ms,
            "outreach run finished"
        );

        let OutreachContext {
            record,
            product_description,
        } = ctx;
        let diagnostics = Diagnostics {
            strategy,
            acquisition_error,
            previews: FieldPreviews::of(&record),
            notes,
        };
        Ok(PipelineResult {
            text,
            audio,
            record,
            product_description,
            diagnostics,
        })
    }

    async fn synthesize(&self, text: &str) -> Result<AudioReference, SynthesisError> {
        let bytes = self.synthesizer.synthesize(text).await?;
        self.audio
            .persist(&bytes)
            .await
            .map_err(|e| SynthesisError::Persist(format!("{e:#}")))
    }
}
