use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::report::{
    ContentType,
    Report,
    ReportStatus,
};

/// Body of `POST /statement`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementRequest {
    pub report_id: String,
}

/// Body of `POST /verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub report_id: String,
    pub verification_code: String,
}

/// Verdict returned by `POST /verify`.
///
/// A rejected code is a normal outcome, not an error: `verified` is false,
/// `report` is null and `message` explains the expected format. The HTTP
/// status is 200 either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub verified: bool,
    pub report: Option<Report>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    pub message: String,
}

/// Uniform error envelope for failed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Body of `POST /reports`. The identifier is optional; the server assigns
/// one when absent. `created_at` is always set server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSubmission {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default = "default_status")]
    pub status: ReportStatus,
    pub confidence_score: f64,
    pub description: String,
    pub content_type: ContentType,
    pub user_id: String,
}

fn default_status() -> ReportStatus {
    ReportStatus::Pending
}

/// Response to `POST /reports`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSubmissionResponse {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_use_camel_case_fields() {
        let req: VerifyRequest = serde_json::from_str(
            r#"{"reportId":"r-123","verificationCode":"AAAA-AAAA-AAAA-AAAA"}"#,
        )
        .unwrap();
        assert_eq!(req.report_id, "r-123");
        assert_eq!(req.verification_code, "AAAA-AAAA-AAAA-AAAA");
    }

    #[test]
    fn submission_defaults() {
        let sub: ReportSubmission = serde_json::from_str(
            r#"{
                "title": "Test",
                "confidenceScore": 72,
                "description": "d",
                "contentType": "image",
                "userId": "u-1"
            }"#,
        )
        .unwrap();
        assert!(sub.id.is_none());
        assert_eq!(sub.status, ReportStatus::Pending);
    }

    #[test]
    fn rejected_verdict_omits_timestamp() {
        let verdict = VerifyResponse {
            success: true,
            verified: false,
            report: None,
            verified_at: None,
            message: "Invalid verification code format".to_string(),
        };
        let value = serde_json::to_value(&verdict).unwrap();
        assert_eq!(value["verified"], false);
        assert!(value["report"].is_null());
        assert!(value.get("verifiedAt").is_none());
    }
}
