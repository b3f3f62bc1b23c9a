//! Model Fallback Ladder
//!
//! Tries an ordered list of model identifiers against one provider until a
//! model returns non-empty text.
//!
//! ## Strategy
//!
//! 1. Invoke models strictly in declared order
//! 2. Non-empty text ends the ladder immediately
//! 3. An error is recorded as the last error; move on without delay or retry
//! 4. Empty text moves on without being recorded as an error
//! 5. Exhaustion reports the last recorded error

use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use super::{ImageInput, SharedProvider};
use crate::types::{ErrorCategory, QcError, Result};

const EXHAUSTED_MESSAGE: &str = "All models failed to generate content";

/// Result of one model attempt
#[derive(Debug, Clone)]
pub struct ModelAttempt {
    pub model: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Execution statistics for the ladder; logged, never persisted
#[derive(Debug, Default)]
pub struct LadderStats {
    pub attempts: Vec<ModelAttempt>,
    pub successful_model: Option<String>,
    pub total_duration_ms: u64,
}

/// Ordered model ladder bound to one provider
#[derive(Clone)]
pub struct ModelLadder {
    provider: SharedProvider,
    models: Vec<String>,
}

impl ModelLadder {
    pub fn new(provider: SharedProvider, models: Vec<String>) -> Self {
        Self { provider, models }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Run the ladder and return the first non-empty text with attempt stats
    #[instrument(skip(self, prompt, image), fields(provider = self.provider.name(), models = self.models.len()))]
    pub async fn execute(&self, prompt: &str, image: &ImageInput) -> Result<(String, LadderStats)> {
        let mut stats = LadderStats::default();
        let start_time = Instant::now();
        let mut last_error: Option<QcError> = None;

        for model in &self.models {
            let attempt_start = Instant::now();
            debug!(model = %model, "Ladder attempt");

            match self.provider.invoke(model, prompt, image).await {
                Ok(text) if !text.is_empty() => {
                    stats.attempts.push(ModelAttempt {
                        model: model.clone(),
                        success: true,
                        error: None,
                        duration_ms: attempt_start.elapsed().as_millis() as u64,
                    });
                    stats.successful_model = Some(model.clone());
                    stats.total_duration_ms = start_time.elapsed().as_millis() as u64;

                    info!(
                        model = %model,
                        attempts = stats.attempts.len(),
                        "Ladder succeeded"
                    );

                    return Ok((text, stats));
                }
                Ok(_) => {
                    warn!(model = %model, "Model returned empty content, trying next");
                    stats.attempts.push(ModelAttempt {
                        model: model.clone(),
                        success: false,
                        error: None,
                        duration_ms: attempt_start.elapsed().as_millis() as u64,
                    });
                }
                Err(err) => {
                    let message = err.to_string();
                    warn!(
                        model = %model,
                        error = %message,
                        category = %err.model_category().unwrap_or(ErrorCategory::Unknown),
                        "Model failed, trying next"
                    );
                    stats.attempts.push(ModelAttempt {
                        model: model.clone(),
                        success: false,
                        error: Some(message),
                        duration_ms: attempt_start.elapsed().as_millis() as u64,
                    });
                    last_error = Some(err);
                }
            }
        }

        stats.total_duration_ms = start_time.elapsed().as_millis() as u64;
        warn!(
            attempts = stats.attempts.len(),
            duration_ms = stats.total_duration_ms,
            "All models exhausted"
        );

        Err(QcError::AllModelsExhausted(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| EXHAUSTED_MESSAGE.to_string()),
        ))
    }
}

/// Try `models` in order against `provider` until one returns non-empty text
pub async fn analyze_with_fallback(
    provider: SharedProvider,
    models: &[String],
    prompt: &str,
    image: &ImageInput,
) -> Result<String> {
    let ladder = ModelLadder::new(provider, models.to_vec());
    let (text, _stats) = ladder.execute(prompt, image).await?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::VisionProvider;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Scripted provider: each model id maps to a fixed reply
    struct MockProvider {
        replies: HashMap<String, std::result::Result<String, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockProvider {
        fn new(replies: &[(&str, std::result::Result<&str, &str>)]) -> Arc<Self> {
            Arc::new(Self {
                replies: replies
                    .iter()
                    .map(|(model, reply)| {
                        (
                            model.to_string(),
                            reply.map(str::to_string).map_err(str::to_string),
                        )
                    })
                    .collect(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VisionProvider for MockProvider {
        async fn invoke(&self, model_id: &str, _prompt: &str, _image: &ImageInput) -> Result<String> {
            self.calls.lock().unwrap().push(model_id.to_string());
            match self.replies.get(model_id) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(message)) => Err(QcError::model(model_id, message.clone())),
                None => Err(QcError::model(model_id, "404 NOT_FOUND")),
            }
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn image() -> ImageInput {
        ImageInput::new(vec![0u8; 4], "image/jpeg")
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_first_model_wins() {
        let mock = MockProvider::new(&[("m1", Ok("{\"a\":1}")), ("m2", Ok("{}"))]);
        let ladder = ModelLadder::new(mock.clone(), ids(&["m1", "m2"]));

        let (text, stats) = ladder.execute("p", &image()).await.unwrap();
        assert_eq!(text, "{\"a\":1}");
        assert_eq!(stats.successful_model.as_deref(), Some("m1"));
        assert_eq!(mock.calls(), vec!["m1"]);
    }

    #[tokio::test]
    async fn test_fallback_preserves_order() {
        let mock = MockProvider::new(&[
            ("m1", Err("500 internal")),
            ("m2", Err("503 unavailable")),
            ("m3", Ok("{}")),
        ]);

        let text = analyze_with_fallback(mock.clone(), &ids(&["m1", "m2", "m3"]), "p", &image())
            .await
            .unwrap();

        assert_eq!(text, "{}");
        assert_eq!(mock.calls(), vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_empty_text_is_skipped_not_recorded() {
        let mock = MockProvider::new(&[("m1", Err("429 RESOURCE_EXHAUSTED")), ("m2", Ok(""))]);
        let ladder = ModelLadder::new(mock.clone(), ids(&["m1", "m2"]));

        let err = ladder.execute("p", &image()).await.unwrap_err();
        match err {
            QcError::AllModelsExhausted(message) => assert_eq!(message, "429 RESOURCE_EXHAUSTED"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(mock.calls(), vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn test_all_empty_reports_generic_message() {
        let mock = MockProvider::new(&[("m1", Ok("")), ("m2", Ok(""))]);
        let ladder = ModelLadder::new(mock, ids(&["m1", "m2"]));

        let err = ladder.execute("p", &image()).await.unwrap_err();
        assert_eq!(err.to_string(), EXHAUSTED_MESSAGE);
    }

    #[tokio::test]
    async fn test_last_error_wins() {
        let mock = MockProvider::new(&[("m1", Err("first")), ("m2", Err("second"))]);
        let ladder = ModelLadder::new(mock, ids(&["m1", "m2"]));

        let err = ladder.execute("p", &image()).await.unwrap_err();
        assert_eq!(err.to_string(), "second");
    }

    #[tokio::test]
    async fn test_stats_record_every_attempt() {
        let mock = MockProvider::new(&[("m1", Err("x")), ("m2", Ok("")), ("m3", Ok("ok"))]);
        let ladder = ModelLadder::new(mock, ids(&["m1", "m2", "m3"]));

        let (_, stats) = ladder.execute("p", &image()).await.unwrap();
        assert_eq!(stats.attempts.len(), 3);
        assert_eq!(stats.attempts[0].error.as_deref(), Some("x"));
        assert!(stats.attempts[1].error.is_none());
        assert!(!stats.attempts[1].success);
        assert!(stats.attempts[2].success);
    }
}
