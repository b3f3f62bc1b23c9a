//! Inspection Prompt
//!
//! The fixed quality-control prompt sent with every image. It assigns the
//! inspector role, lists the defect categories to look for, and pins the
//! JSON shape the normalizer expects.

/// Defect families the inspector is told to look for, in prompt order
pub const DEFECT_CATEGORIES: &[&str] = &[
    "Surface scratches, dents, chips, or cracks",
    "Discoloration, stains, or rust",
    "Misalignment, deformation, or structural irregularities",
    "Foreign particles, dust, or contamination",
    "Poor finish, rough edges, or coating issues",
];

const ROLE: &str = "You are an expert Quality Control Inspector for manufacturing.\n\
Analyze this image of a manufactured product with extreme scrutiny.\n\
Look for ANY and ALL potential defects, including but not limited to:";

const THOROUGHNESS: &str = "Even if the defect is minor, list it. \
Do NOT default to \"No Defects\" unless the product is truly perfect.";

const OUTPUT_SCHEMA: &str = r#"Provide a detailed analysis in the following JSON format:
{
    "defects": [
        {"name": "Defect Name", "description": "Detailed description of the defect", "location": "Specific location on object"}
    ],
    "severity_breakdown": {
        "critical": 0,
        "high": 0,
        "medium": 0,
        "low": 0
    },
    "overall_severity": "Critical/High/Medium/Low",
    "quality_issues": ["List of general quality issues found"],
    "recommendations": ["List of actionable recommendations"]
}"#;

const OUTPUT_RULE: &str = "IMPORTANT: Return ONLY the JSON string. No markdown formatting.";

/// Build the inspection prompt
pub fn inspection_prompt() -> String {
    let categories = DEFECT_CATEGORIES
        .iter()
        .map(|c| format!("- {c}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{ROLE}\n{categories}\n\n{THOROUGHNESS}\n\n{OUTPUT_SCHEMA}\n\n{OUTPUT_RULE}")
}
