//! Analysis Orchestrator
//!
//! Runs one image through the model ladder and the response pipeline.
//! `analyze` never fails: every failure is folded into an `AnalysisResult`
//! whose `error` field explains what went wrong.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::ai::{
    GeminiProvider, ImageInput, ModelLadder, ResponsePipeline, SharedProvider, inspection_prompt,
};
use crate::config::LlmConfig;
use crate::constants::model::RAW_PREVIEW_CHARS;
use crate::types::{AnalysisResult, ErrorClassifier, QcError, Result, preview};

/// Inspection analysis service
#[derive(Clone)]
pub struct AnalysisService {
    ladder: ModelLadder,
    pipeline: ResponsePipeline,
    prompt: String,
}

impl AnalysisService {
    /// Build with an explicit provider and model ladder
    pub fn new(provider: SharedProvider, models: Vec<String>) -> Result<Self> {
        if models.is_empty() {
            return Err(QcError::Config(
                "Analysis requires at least one model".to_string(),
            ));
        }

        Ok(Self {
            ladder: ModelLadder::new(provider, models),
            pipeline: ResponsePipeline::new()?,
            prompt: inspection_prompt(),
        })
    }

    /// Build a Gemini-backed service from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let provider = GeminiProvider::new(config)?;
        info!(
            models = config.models.len(),
            first = config.models.first().map(String::as_str).unwrap_or("-"),
            "Analysis service ready"
        );
        Self::new(Arc::new(provider), config.models.clone())
    }

    pub fn models(&self) -> &[String] {
        self.ladder.models()
    }

    /// Analyze the image stored at `path`
    pub async fn analyze(&self, path: &Path) -> AnalysisResult {
        info!(path = %path.display(), "Analyzing image");

        match tokio::fs::read(path).await {
            Ok(bytes) => self.analyze_image(&ImageInput::for_path(bytes, path)).await,
            Err(err) => Self::fold_error(QcError::Io(err)),
        }
    }

    /// Analyze in-memory image bytes
    pub async fn analyze_bytes(&self, bytes: Vec<u8>, mime_type: &str) -> AnalysisResult {
        self.analyze_image(&ImageInput::new(bytes, mime_type)).await
    }

    #[instrument(skip(self, image), fields(mime = %image.mime_type, bytes = image.bytes.len()))]
    async fn analyze_image(&self, image: &ImageInput) -> AnalysisResult {
        match self.run(image).await {
            Ok(result) => result,
            Err(err) => Self::fold_error(err),
        }
    }

    async fn run(&self, image: &ImageInput) -> Result<AnalysisResult> {
        let (content, stats) = self.ladder.execute(&self.prompt, image).await?;

        debug!(
            model = stats.successful_model.as_deref().unwrap_or("-"),
            attempts = stats.attempts.len(),
            duration_ms = stats.total_duration_ms,
            raw = %preview(&content, RAW_PREVIEW_CHARS),
            "Model raw response"
        );

        self.pipeline.process(&content)
    }

    fn fold_error(err: QcError) -> AnalysisResult {
        match err {
            QcError::UnparsableResponse { content } => {
                warn!(
                    content = %preview(&content, RAW_PREVIEW_CHARS),
                    "Parsing error, storing raw content"
                );
                AnalysisResult::parse_failure(content)
            }
            other => {
                let message = other.to_string();
                let category = ErrorClassifier::classify(&message);
                error!(error = %message, %category, "Analysis failed");
                AnalysisResult::failure(category.user_message(&message))
            }
        }
    }
}
