use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::submissions::repo::{Submission, SubmissionStatus, SubmissionType, SubmitterYear};

/// Create payload, matching the public submission form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubmissionRequest {
    pub title: String,
    pub content: String,
    #[serde(default = "default_submission_type")]
    pub submission_type: SubmissionType,
    pub submitter_name: String,
    pub submitter_email: String,
    pub submitter_year: SubmitterYear,
    #[serde(default)]
    pub law_school: Option<String>,
    #[serde(default)]
    pub graduation_year: Option<i32>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub attachments: Option<serde_json::Value>,
    #[serde(default)]
    pub agreed_to_terms: bool,
    #[serde(default)]
    pub publishing_consent: bool,
}

fn default_submission_type() -> SubmissionType {
    SubmissionType::Essay
}

/// Sanitized submission: client address, user agent and reviewer identity
/// never leave the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub submission_type: SubmissionType,
    pub submitter_name: String,
    pub submitter_email: String,
    pub submitter_year: SubmitterYear,
    pub law_school: Option<String>,
    pub graduation_year: Option<i32>,
    pub subject: Option<String>,
    pub attachments: Option<serde_json::Value>,
    pub status: SubmissionStatus,
    pub moderation_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub rejection_details: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub reviewed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub view_count: i64,
}

impl From<Submission> for SubmissionResponse {
    fn from(s: Submission) -> Self {
        Self {
            id: s.id,
            title: s.title,
            content: s.content,
            submission_type: s.submission_type,
            submitter_name: s.submitter_name,
            submitter_email: s.submitter_email,
            submitter_year: s.submitter_year,
            law_school: s.law_school,
            graduation_year: s.graduation_year,
            subject: s.subject,
            attachments: s.attachments,
            status: s.status,
            moderation_notes: s.moderation_notes,
            rejection_reason: s.rejection_reason,
            rejection_details: s.rejection_details,
            submitted_at: s.submitted_at,
            reviewed_at: s.reviewed_at,
            published_at: s.published_at,
            view_count: s.view_count,
        }
    }
}

/// Page selector shared by the list endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub subject: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub page_count: u32,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Admin decision payload for the general-purpose status update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: SubmissionStatus,
    #[serde(default)]
    pub moderation_notes: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub rejection_details: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    pub rejection_reason: String,
    #[serde(default)]
    pub rejection_details: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCountsResponse {
    pub pending: i64,
    pub under_review: i64,
    pub approved: i64,
    pub rejected: i64,
    pub needs_revision: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsResponse {
    pub total_submissions: i64,
    pub status_counts: StatusCountsResponse,
    pub recent_submissions: Vec<SubmissionResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewCountResponse {
    pub id: Uuid,
    pub view_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submissions::repo::test_fixtures::submission_fixture;

    #[test]
    fn response_strips_client_metadata() {
        let submission = submission_fixture();
        let response: SubmissionResponse = submission.into();
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("203.0.113.9"));
        assert!(!json.contains("test-agent"));
        assert!(!json.contains("ipAddress"));
        assert!(!json.contains("userAgent"));
        assert!(!json.contains("reviewedBy"));
    }

    #[test]
    fn create_request_accepts_camel_case() {
        let raw = r#"{
            "title": "T",
            "content": "C",
            "submitterName": "N",
            "submitterEmail": "n@example.com",
            "submitterYear": "first-year",
            "agreedToTerms": true,
            "publishingConsent": true
        }"#;
        let req: CreateSubmissionRequest = serde_json::from_str(raw).unwrap();
        assert!(req.agreed_to_terms);
        assert!(req.publishing_consent);
        assert_eq!(req.submission_type, SubmissionType::Essay);
        assert_eq!(req.submitter_year, SubmitterYear::FirstYear);
    }

    #[test]
    fn missing_consent_flags_default_to_false() {
        let raw = r#"{
            "title": "T",
            "content": "C",
            "submitterName": "N",
            "submitterEmail": "n@example.com",
            "submitterYear": "other"
        }"#;
        let req: CreateSubmissionRequest = serde_json::from_str(raw).unwrap();
        assert!(!req.agreed_to_terms);
        assert!(!req.publishing_consent);
    }
}
