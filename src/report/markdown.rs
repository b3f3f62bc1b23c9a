use serde_json::{Map, Value};

use crate::types::{Inspection, capitalize, json_display};

const SEVERITY_ROWS: [(&str, &str); 4] = [
    ("Critical", "🔴"),
    ("High", "🟠"),
    ("Medium", "🟡"),
    ("Low", "🟢"),
];

/// Render an inspection as a downloadable Markdown report.
///
/// The stored analysis blob is read loosely: it may be an object or a JSON
/// string encoding one, and any missing key falls back to a placeholder.
pub fn render_markdown(inspection: &Inspection) -> String {
    let analysis = analysis_object(inspection.analysis_result.as_ref());
    let defects = list_field(&analysis, "defects");

    let mut md = String::new();
    push_overview(&mut md, inspection, &analysis);
    push_severity_breakdown(&mut md, defects);
    push_defects(&mut md, defects);
    push_quality_issues(&mut md, list_field(&analysis, "quality_issues"));
    push_recommendations(&mut md, list_field(&analysis, "recommendations"));
    md
}

fn analysis_object(blob: Option<&Value>) -> Value {
    match blob {
        Some(Value::Object(map)) => Value::Object(map.clone()),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(value @ Value::Object(_)) => value,
            _ => Value::Object(Map::new()),
        },
        _ => Value::Object(Map::new()),
    }
}

fn list_field<'a>(analysis: &'a Value, key: &str) -> &'a [Value] {
    analysis
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn push_overview(md: &mut String, inspection: &Inspection, analysis: &Value) {
    let error_line = match analysis.get("error") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
        Some(Value::String(s)) if s.is_empty() => String::new(),
        Some(_) => format!("**⚠️ ERROR:** {}", json_display(analysis, "error", "")),
    };

    md.push_str("# Quality Control Inspection Report\n");
    md.push_str(&format!("**Inspection ID:** {}\n", inspection.id));
    md.push_str(&format!(
        "**Date:** {}\n",
        inspection.created_at.format("%Y-%m-%d %H:%M:%S")
    ));
    md.push_str(&format!("**Image:** {}\n\n---\n\n", inspection.image_path));

    md.push_str("## 1. Inspection Overview\n");
    md.push_str(&format!("**Overall Status:** {}\n", inspection.status));
    md.push_str(&format!(
        "**Overall Severity:** {}\n",
        json_display(analysis, "overall_severity", "N/A")
    ));
    md.push_str("**Summary:**\n");
    md.push_str(&format!(
        "{}\n",
        json_display(analysis, "summary", "No summary provided.")
    ));
    md.push_str(&format!("{error_line}\n\n---\n"));
}

/// Counts are recomputed from the defect list, not taken from the stored
/// breakdown, so the table always matches the defects shown below it.
fn push_severity_breakdown(md: &mut String, defects: &[Value]) {
    let mut counts = [0u64; SEVERITY_ROWS.len()];

    for defect in defects {
        let label = match defect.get("severity") {
            None | Some(Value::Null) => "Low".to_string(),
            Some(Value::String(s)) if s.is_empty() => "Low".to_string(),
            Some(Value::String(s)) => capitalize(s),
            Some(_) => continue,
        };
        if let Some(idx) = SEVERITY_ROWS.iter().position(|(name, _)| *name == label) {
            counts[idx] += 1;
        }
    }

    md.push_str("## 2. Severity Breakdown\n\n");
    md.push_str("| Severity Level | Count |\n");
    md.push_str("| :--- | :--- |\n");
    for ((name, icon), count) in SEVERITY_ROWS.iter().zip(counts) {
        md.push_str(&format!("| {icon} {name} | {count} |\n"));
    }
    md.push_str("\n---\n");
}

fn push_defects(md: &mut String, defects: &[Value]) {
    md.push_str("## 3. Detected Defects\n\n");

    if defects.is_empty() {
        md.push_str("No defects detected.\n");
    } else {
        md.push_str("| Name | Description | Severity | Confidence |\n");
        md.push_str("| :--- | :--- | :--- | :--- |\n");
        for defect in defects {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                escape_cell(&json_display(defect, "name", "Unknown")),
                escape_cell(&json_display(defect, "description", "No description")),
                json_display(defect, "severity", "Low"),
                json_display(defect, "confidence", "N/A"),
            ));
        }
    }

    md.push_str("\n---\n");
}

fn push_quality_issues(md: &mut String, issues: &[Value]) {
    md.push_str("## 4. Quality Issues\n\n");

    if issues.is_empty() {
        md.push_str("No specific quality issues noted.\n");
    } else {
        for issue in issues {
            let text = match issue {
                Value::Object(_) => format!(
                    "**{}**: {}",
                    json_display(issue, "issue", "Issue"),
                    json_display(issue, "description", "")
                ),
                other => display_value(other),
            };
            md.push_str(&format!("- {text}\n"));
        }
    }

    md.push_str("\n---\n");
}

fn push_recommendations(md: &mut String, recommendations: &[Value]) {
    md.push_str("## 5. Recommendations\n\n");

    if recommendations.is_empty() {
        md.push_str("No recommendations provided.\n");
        return;
    }

    for (i, rec) in recommendations.iter().enumerate() {
        let text = match rec {
            Value::Object(_) => format!(
                "**{}**: {}",
                json_display(rec, "title", ""),
                json_display(rec, "action", "")
            ),
            other => display_value(other),
        };
        md.push_str(&format!("{}. {text}\n", i + 1));
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InspectionStatus;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn inspection(analysis: Option<Value>) -> Inspection {
        Inspection {
            id: 42,
            image_path: "part.png".to_string(),
            status: InspectionStatus::Completed,
            user_id: Some("uid-1".to_string()),
            analysis_result: analysis,
            created_at: Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap(),
            updated_at: None,
            image_url: None,
        }
    }

    #[test]
    fn test_full_report() {
        let md = render_markdown(&inspection(Some(json!({
            "overall_severity": "High",
            "summary": "Two defects found.",
            "defects": [
                {"name": "Scratch | deep", "description": "Along edge", "severity": "high", "confidence": 0.9},
                {"name": "Stain", "description": "Near logo", "severity": "LOW"}
            ],
            "quality_issues": [{"issue": "Finish", "description": "Uneven coat"}, "Loose label"],
            "recommendations": [{"title": "Rework", "action": "Polish edge"}, "Re-inspect"]
        }))));

        assert!(md.starts_with("# Quality Control Inspection Report\n**Inspection ID:** 42\n"));
        assert!(md.contains("**Date:** 2025-03-04 05:06:07\n"));
        assert!(md.contains("**Overall Status:** completed\n"));
        assert!(md.contains("**Overall Severity:** High\n"));
        assert!(md.contains("**Summary:**\nTwo defects found.\n"));
        assert!(!md.contains("ERROR"));
        assert!(md.contains("| 🟠 High | 1 |"));
        assert!(md.contains("| 🟢 Low | 1 |"));
        assert!(md.contains("| 🔴 Critical | 0 |"));
        assert!(md.contains("| Scratch \\| deep | Along edge | high | 0.9 |"));
        assert!(md.contains("| Stain | Near logo | LOW | N/A |"));
        assert!(md.contains("- **Finish**: Uneven coat\n- Loose label\n"));
        assert!(md.contains("1. **Rework**: Polish edge\n2. Re-inspect\n"));
    }

    #[test]
    fn test_empty_analysis_placeholders() {
        let md = render_markdown(&inspection(None));

        assert!(md.contains("**Overall Severity:** N/A"));
        assert!(md.contains("No summary provided."));
        assert!(md.contains("No defects detected."));
        assert!(md.contains("No specific quality issues noted."));
        assert!(md.contains("No recommendations provided."));
    }

    #[test]
    fn test_error_shown() {
        let md = render_markdown(&inspection(Some(json!({
            "error": "Daily Quota Exceeded for all models. Please try again tomorrow."
        }))));
        assert!(md.contains("**⚠️ ERROR:** Daily Quota Exceeded"));
    }

    #[test]
    fn test_string_blob_accepted() {
        let blob = json!({"overall_severity": "Medium"}).to_string();
        let md = render_markdown(&inspection(Some(Value::String(blob))));
        assert!(md.contains("**Overall Severity:** Medium"));

        let md = render_markdown(&inspection(Some(Value::String("not json".into()))));
        assert!(md.contains("**Overall Severity:** N/A"));
    }

    #[test]
    fn test_unknown_and_missing_severities() {
        let md = render_markdown(&inspection(Some(json!({
            "defects": [
                {"name": "A", "severity": "Critical/High"},
                {"name": "B"},
                {"name": "C", "severity": 3}
            ]
        }))));
        assert!(md.contains("| 🔴 Critical | 0 |"));
        assert!(md.contains("| 🟢 Low | 1 |"));
    }
}
