//! Model Response Validation
//!
//! Turns raw model text into a guaranteed-shape [`AnalysisResult`]:
//! - Sanitize: strip markdown fences, extract the `{...}` span
//! - Parse: strict JSON first, relaxed Python literal second
//! - Normalize: coerce into the fixed schema with safe defaults
//!
//! Only parsing can fail. Sanitizing and normalizing are total.

mod literal;
mod normalize;
mod sanitize;

pub use literal::{LiteralError, parse_literal};
pub use normalize::normalize;
pub use sanitize::Sanitizer;

use serde_json::Value;
use tracing::debug;

use crate::types::{AnalysisResult, QcError, Result};

/// Parse sanitized text, falling back to the literal parser.
///
/// Fails with [`QcError::UnparsableResponse`] carrying `candidate` when
/// neither parser accepts it.
pub fn parse(candidate: &str) -> Result<Value> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => Ok(value),
        Err(json_err) => {
            debug!(error = %json_err, "Strict JSON parse failed, trying literal parse");
            parse_literal(candidate).map_err(|literal_err| {
                debug!(error = %literal_err, "Literal parse failed");
                QcError::UnparsableResponse {
                    content: candidate.to_string(),
                }
            })
        }
    }
}

/// Sanitize → parse → normalize
#[derive(Debug, Clone)]
pub struct ResponsePipeline {
    sanitizer: Sanitizer,
}

impl ResponsePipeline {
    pub fn new() -> Result<Self> {
        Ok(Self {
            sanitizer: Sanitizer::new()?,
        })
    }

    pub fn sanitize(&self, raw: &str) -> String {
        self.sanitizer.sanitize(raw)
    }

    /// Process raw model text into a normalized result
    pub fn process(&self, raw: &str) -> Result<AnalysisResult> {
        let candidate = self.sanitize(raw);
        let value = parse(&candidate)?;
        Ok(normalize(value))
    }
}
