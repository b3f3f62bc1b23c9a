//! Persisted inspection records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::utils::ParseWithDefault;

/// Lifecycle status of an inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InspectionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl InspectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for InspectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ParseWithDefault for InspectionStatus {
    fn type_name() -> &'static str {
        "InspectionStatus"
    }

    fn default_value() -> Self {
        InspectionStatus::Pending
    }

    fn try_parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Insert payload for a new inspection
#[derive(Debug, Clone)]
pub struct NewInspection {
    /// Stored file name inside the upload directory
    pub image_path: String,
    pub analysis_result: Option<Value>,
    pub status: InspectionStatus,
    pub user_id: Option<String>,
}

/// Inspection profile as stored and served
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub id: i64,
    pub image_path: String,
    pub status: InspectionStatus,
    pub user_id: Option<String>,
    pub analysis_result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Computed public URL, never persisted
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Inspection {
    /// Attach the public image URL under `{base_url}/uploads/`
    pub fn with_image_url(mut self, base_url: &str) -> Self {
        self.image_url = Some(format!(
            "{}/uploads/{}",
            base_url.trim_end_matches('/'),
            self.image_path
        ));
        self
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Inspection {
        Inspection {
            id: 7,
            image_path: "abc.png".to_string(),
            status: InspectionStatus::Completed,
            user_id: Some("uid-1".to_string()),
            analysis_result: None,
            created_at: Utc::now(),
            updated_at: None,
            image_url: None,
        }
    }

    #[test]
    fn test_image_url() {
        let inspection = sample().with_image_url("http://localhost:8000/");
        assert_eq!(
            inspection.image_url.as_deref(),
            Some("http://localhost:8000/uploads/abc.png")
        );
    }

    #[test]
    fn test_ownership() {
        let inspection = sample();
        assert!(inspection.is_owned_by("uid-1"));
        assert!(!inspection.is_owned_by("uid-2"));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            InspectionStatus::parse_or_default("failed"),
            InspectionStatus::Failed
        );
        assert_eq!(
            InspectionStatus::parse_or_default("bogus"),
            InspectionStatus::Pending
        );
        assert_eq!(
            serde_json::to_value(InspectionStatus::Completed).unwrap(),
            "completed"
        );
    }
}
