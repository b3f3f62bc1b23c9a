//! Inspection analysis result types.
//!
//! `AnalysisResult` is the guaranteed-shape record produced by the analysis
//! pipeline. Nested defect/issue/recommendation records are kept as raw JSON
//! values since the model does not follow a strict schema for them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message stored when the parsers could not make sense of model output
pub const PARSING_ERROR_MESSAGE: &str = "Failed to analyze image (Parsing Error)";

/// Severity keys always present in a breakdown
pub const SEVERITY_KEYS: [&str; 4] = ["critical", "high", "medium", "low"];

/// Overall severity label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl Severity {
    /// Parse a free-form label case-insensitively.
    ///
    /// Returns `None` for anything outside the closed set, including labels
    /// like "Critical/High" that the model sometimes copies from the prompt.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-severity defect counts.
///
/// The four standard keys are always present. Any additional keys the model
/// emitted are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityBreakdown {
    #[serde(default)]
    pub critical: u64,
    #[serde(default)]
    pub high: u64,
    #[serde(default)]
    pub medium: u64,
    #[serde(default)]
    pub low: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Normalized analysis output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Present when the pipeline could not produce a trustworthy result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Unparsable model output, only set on the parsing-error path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
    pub defects: Vec<Value>,
    pub severity_breakdown: SeverityBreakdown,
    pub overall_severity: String,
    pub quality_issues: Vec<Value>,
    pub recommendations: Vec<Value>,
    /// Top-level keys outside the fixed schema (e.g. `summary`)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self::default_filled()
    }
}

impl AnalysisResult {
    /// Result used when model output has to be discarded wholesale.
    pub fn default_filled() -> Self {
        Self {
            error: None,
            raw_content: None,
            defects: Vec::new(),
            severity_breakdown: SeverityBreakdown::default(),
            overall_severity: Severity::Low.to_string(),
            quality_issues: Vec::new(),
            recommendations: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Result for model output that neither parser accepted
    pub fn parse_failure(content: impl Into<String>) -> Self {
        Self {
            error: Some(PARSING_ERROR_MESSAGE.to_string()),
            raw_content: Some(content.into()),
            overall_severity: Severity::Unknown.to_string(),
            quality_issues: vec![Value::String("Analysis parsing failed".to_string())],
            ..Self::default_filled()
        }
    }

    /// Result for invocation, exhaustion or I/O failures
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            overall_severity: Severity::Unknown.to_string(),
            quality_issues: vec![Value::String("Analysis error".to_string())],
            ..Self::default_filled()
        }
    }

    /// An empty `error` string does not mark the result as failed
    pub fn is_failed(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// Overall severity as an enum, if it matches the closed set
    pub fn severity(&self) -> Option<Severity> {
        Severity::from_label(&self.overall_severity)
    }

    /// Serialize into the opaque blob stored alongside an inspection
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_filled_shape() {
        let value = AnalysisResult::default_filled().to_value();
        assert_eq!(
            value,
            json!({
                "defects": [],
                "severity_breakdown": {"critical": 0, "high": 0, "medium": 0, "low": 0},
                "overall_severity": "Low",
                "quality_issues": [],
                "recommendations": []
            })
        );
    }

    #[test]
    fn test_parse_failure_carries_content() {
        let result = AnalysisResult::parse_failure("nope");
        let value = result.to_value();
        assert_eq!(value["error"], PARSING_ERROR_MESSAGE);
        assert_eq!(value["raw_content"], "nope");
        assert_eq!(value["overall_severity"], "Unknown");
        assert!(result.is_failed());
    }

    #[test]
    fn test_empty_error_is_not_failure() {
        let mut result = AnalysisResult::default_filled();
        result.error = Some(String::new());
        assert!(!result.is_failed());
        result.error = Some("blurry".to_string());
        assert!(result.is_failed());
    }

    #[test]
    fn test_failure_has_no_raw_content() {
        let value = AnalysisResult::failure("Daily Quota Exceeded.").to_value();
        assert!(value.get("raw_content").is_none());
        assert_eq!(value["quality_issues"], json!(["Analysis error"]));
    }

    #[test]
    fn test_extra_keys_flatten() {
        let mut result = AnalysisResult::default_filled();
        result
            .extra
            .insert("summary".to_string(), json!("looks fine"));
        result
            .severity_breakdown
            .extra
            .insert("cosmetic".to_string(), json!(3));

        let value = result.to_value();
        assert_eq!(value["summary"], "looks fine");
        assert_eq!(value["severity_breakdown"]["cosmetic"], 3);

        let back: AnalysisResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_severity_labels() {
        assert_eq!(Severity::from_label(" HIGH "), Some(Severity::High));
        assert_eq!(Severity::from_label("Critical/High"), None);
        assert_eq!(Severity::Medium.to_string(), "Medium");
    }
}
