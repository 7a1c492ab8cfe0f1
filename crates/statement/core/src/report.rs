use std::fmt;

use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

/// A report record as stored by the platform.
///
/// The service treats this as an immutable snapshot per request: it is
/// fetched by identifier and never mutated. Field names serialize in
/// camelCase to match the records the web frontend produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub title: String,
    pub status: ReportStatus,
    /// 0-100 estimate of how likely the content is manipulated.
    pub confidence_score: f64,
    pub description: String,
    pub content_type: ContentType,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
}

/// Lifecycle state of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Reviewing,
    Confirmed,
    Rejected,
}

impl ReportStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Reviewing => "Under review",
            Self::Confirmed => "Confirmed",
            Self::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of media a report is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Image,
    Video,
    Audio,
}

impl ContentType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Video => "Video",
            Self::Audio => "Audio",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Qualitative bucket for a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    /// Bucket a 0-100 score: `>= 80` High, `>= 60` Medium, else Low.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::High
        } else if score >= 60.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Display color for the tier. High gets the warm alert color.
    pub fn rgb(self) -> (f32, f32, f32) {
        match self {
            Self::Low => (0.13, 0.55, 0.27),
            Self::Medium => (0.85, 0.56, 0.09),
            Self::High => (0.80, 0.16, 0.16),
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_thresholds() {
        assert_eq!(ConfidenceTier::from_score(0.0), ConfidenceTier::Low);
        assert_eq!(ConfidenceTier::from_score(59.9), ConfidenceTier::Low);
        assert_eq!(ConfidenceTier::from_score(60.0), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_score(79.9), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_score(80.0), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_score(100.0), ConfidenceTier::High);
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = Report {
            id: "r-123".to_string(),
            title: "Test".to_string(),
            status: ReportStatus::Pending,
            confidence_score: 72.0,
            description: "Suspected lip-sync manipulation".to_string(),
            content_type: ContentType::Video,
            created_at: Utc::now(),
            user_id: "u-1".to_string(),
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["confidenceScore"], 72.0);
        assert_eq!(value["contentType"], "video");
        assert_eq!(value["status"], "pending");
        assert!(value["createdAt"].is_string());
    }

    #[test]
    fn report_round_trips() {
        let report = Report {
            id: "r-9".to_string(),
            title: "Clip".to_string(),
            status: ReportStatus::Confirmed,
            confidence_score: 91.5,
            description: String::new(),
            content_type: ContentType::Audio,
            created_at: Utc::now(),
            user_id: "u-2".to_string(),
        };

        let json = serde_json::to_string(&report).unwrap();
        let back: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
