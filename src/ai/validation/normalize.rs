//! Schema Normalizer
//!
//! Coerces whatever the parser produced into an [`AnalysisResult`]. Total:
//! every input maps to a well-formed result.

use serde_json::{Map, Value};
use tracing::warn;

use crate::types::{AnalysisResult, SEVERITY_KEYS, Severity, SeverityBreakdown};

/// Normalize parsed model output into the fixed result schema.
///
/// A list whose first element is a mapping is unwrapped to that element.
/// Any other list, and any non-mapping value, yields the default-filled
/// result (`overall_severity = "Low"`). A mapping keeps its keys while:
///
/// - a missing or non-mapping `severity_breakdown` becomes all zeros, and a
///   mapping gets `0` for each absent standard key
/// - non-array `defects`, `quality_issues` and `recommendations` become `[]`
/// - a non-string `overall_severity` becomes `"Unknown"`
pub fn normalize(value: Value) -> AnalysisResult {
    let value = match value {
        Value::Array(items) => match items.into_iter().next() {
            Some(first @ Value::Object(_)) => first,
            _ => {
                warn!("Model returned a list without a leading object, using default structure");
                return AnalysisResult::default_filled();
            }
        },
        other => other,
    };

    let Value::Object(mut map) = value else {
        warn!("Model returned a non-object value, using default structure");
        return AnalysisResult::default_filled();
    };

    let severity_breakdown = match map.remove("severity_breakdown") {
        Some(Value::Object(counts)) => breakdown_from_map(counts),
        _ => SeverityBreakdown::default(),
    };

    let overall_severity = match map.remove("overall_severity") {
        Some(Value::String(label)) => label,
        _ => Severity::Unknown.to_string(),
    };

    AnalysisResult {
        error: take_string(&mut map, "error"),
        raw_content: take_string(&mut map, "raw_content"),
        defects: take_list(&mut map, "defects"),
        severity_breakdown,
        overall_severity,
        quality_issues: take_list(&mut map, "quality_issues"),
        recommendations: take_list(&mut map, "recommendations"),
        extra: map,
    }
}

fn take_list(map: &mut Map<String, Value>, key: &str) -> Vec<Value> {
    match map.remove(key) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn breakdown_from_map(mut counts: Map<String, Value>) -> SeverityBreakdown {
    let mut take = |key: &str| counts.remove(key).map(coerce_count).unwrap_or(0);
    let critical = take(SEVERITY_KEYS[0]);
    let high = take(SEVERITY_KEYS[1]);
    let medium = take(SEVERITY_KEYS[2]);
    let low = take(SEVERITY_KEYS[3]);

    SeverityBreakdown {
        critical,
        high,
        medium,
        low,
        extra: counts,
    }
}

/// Non-negative integral counts survive; anything else counts as zero.
fn coerce_count(value: Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(integral)).unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn integral(f: f64) -> Option<u64> {
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}
