//! Response Sanitizer
//!
//! Strips markdown fences from raw model text and extracts the candidate
//! JSON object.
//!
//! Extraction is greedy: it spans from the first `{` to the last `}`. Text
//! holding two separate objects yields a span covering both, which then fails
//! strict parsing. Balanced-brace scanning is not attempted.

use regex::Regex;

use crate::types::{QcError, Result};

const OBJECT_SPAN: &str = r"\{[\s\S]*\}";

/// Fence stripper and object-span extractor
#[derive(Debug, Clone)]
pub struct Sanitizer {
    object_span: Regex,
}

impl Sanitizer {
    pub fn new() -> Result<Self> {
        let object_span = Regex::new(OBJECT_SPAN)
            .map_err(|e| QcError::Validation(format!("Invalid object pattern: {}", e)))?;
        Ok(Self { object_span })
    }

    /// Clean raw model output down to the most plausible JSON object text.
    ///
    /// Returns the fence-stripped text unchanged when no `{...}` span exists.
    pub fn sanitize(&self, raw: &str) -> String {
        let trimmed = raw.trim();

        let unfenced = if trimmed.contains("```json") {
            trimmed.replace("```json", "").replace("```", "")
        } else if trimmed.contains("```") {
            trimmed.replace("```", "")
        } else {
            trimmed.to_string()
        };

        match self.object_span.find(&unfenced) {
            Some(span) => span.as_str().to_string(),
            None => unfenced,
        }
    }
}
