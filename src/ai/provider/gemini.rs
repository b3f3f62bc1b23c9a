//! Google Gemini Provider
//!
//! Vision provider using the Gemini `generateContent` REST API.
//! The image travels as an inline base64 part next to the prompt text.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{ImageInput, VisionProvider};
use crate::config::LlmConfig;
use crate::constants::network::API_KEY_HEADER;
use crate::types::{QcError, Result};

/// Gemini API provider with secure API key handling
pub struct GeminiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    temperature: f32,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                QcError::Config(
                    "Google API key not found. Set GOOGLE_API_KEY env var or llm.api_key in config"
                        .to_string(),
                )
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| QcError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            client,
        })
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_request(&self, prompt: &str, image: &ImageInput) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    {
                        "inlineData": {
                            "mimeType": image.mime_type,
                            "data": BASE64.encode(&image.bytes),
                        }
                    }
                ]
            }],
            "generationConfig": {
                "temperature": self.temperature,
            }
        })
    }

    /// List models that support `generateContent`, without the `models/` prefix
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/models", self.api_base);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .query(&[("pageSize", "1000")])
            .send()
            .await
            .map_err(|e| QcError::model("models", transport_error(e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(QcError::model(
                "models",
                format!("Gemini API error ({}): {}", status, body),
            ));
        }

        let listing: ModelListing = response.json().await.map_err(|e| {
            QcError::model(
                "models",
                format!("Failed to decode Gemini response: {}", e.without_url()),
            )
        })?;

        Ok(listing
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent")
            })
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }
}

#[async_trait]
impl VisionProvider for GeminiProvider {
    async fn invoke(&self, model_id: &str, prompt: &str, image: &ImageInput) -> Result<String> {
        info!(
            "Generating with Gemini (model: {}, temperature: {})",
            model_id, self.temperature
        );

        let start_time = Instant::now();
        let body = self.build_request(prompt, image);
        let url = self.endpoint_for_model(model_id);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| QcError::model(model_id, transport_error(e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(QcError::model(
                model_id,
                format!("Gemini API error ({}): {}", status, body),
            ));
        }

        let payload: Value = response.json().await.map_err(|e| {
            QcError::model(
                model_id,
                format!("Failed to decode Gemini response: {}", e.without_url()),
            )
        })?;

        debug!(
            model = model_id,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Received response from Gemini"
        );

        extract_text(&payload).map_err(|message| QcError::model(model_id, message))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn transport_error(err: reqwest::Error) -> String {
    format!("Gemini request failed: {}", err.without_url())
}

/// Pull the model's text out of a `generateContent` payload.
///
/// Tolerates the shapes seen in practice: a list of responses (first one
/// wins), a response without `candidates[0].content` (stringified whole),
/// content as a list of parts or as an object holding `parts` (each part's
/// `text` concatenated without separator), and an object-shaped content
/// without parts (stringified).
pub fn extract_text(payload: &Value) -> std::result::Result<String, String> {
    let response = match payload {
        Value::Array(responses) => responses
            .first()
            .ok_or_else(|| "Empty response list from model".to_string())?,
        other => other,
    };

    let content = response
        .get("candidates")
        .and_then(|candidates| candidates.get(0))
        .and_then(|candidate| candidate.get("content"));

    let text = match content {
        None => stringify(response),
        Some(Value::Array(parts)) => join_parts(parts),
        Some(Value::Object(obj)) => match obj.get("parts") {
            Some(Value::Array(parts)) => join_parts(parts),
            _ => stringify(content.unwrap_or(&Value::Null)),
        },
        Some(other) => stringify(other),
    };

    Ok(text)
}

fn join_parts(parts: &[Value]) -> String {
    parts
        .iter()
        .map(|part| match part.get("text") {
            Some(Value::String(text)) => text.clone(),
            _ => stringify(part),
        })
        .collect()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// Response types

#[derive(Debug, Deserialize)]
struct ModelListing {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}
