use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::extractors::Identity;
use crate::auth::repo::Account;
use crate::auth::services::is_valid_email;
use crate::error::ApiError;
use crate::outbox::Notification;
use crate::state::AppState;
use crate::submissions::dto::{
    CreateSubmissionRequest, ListQuery, Paginated, PaginationMeta, StatisticsResponse,
    StatusCountsResponse, SubmissionResponse, ViewCountResponse,
};
use crate::submissions::repo::{
    ModerationUpdate, NewSubmission, StatusCounts, Submission, SubmissionStatus,
};

const MIN_TITLE_CHARS: usize = 5;
const MIN_CONTENT_CHARS: usize = 50;
const MIN_NAME_CHARS: usize = 2;

pub const DEFAULT_PUBLIC_PAGE_SIZE: u32 = 10;
pub const DEFAULT_ADMIN_PAGE_SIZE: u32 = 25;
const MAX_PAGE_SIZE: u32 = 100;
const RECENT_SUBMISSIONS: i64 = 10;

/// All violations at once, so the submitter fixes the form in one pass.
pub(crate) fn validate_submission(req: &CreateSubmissionRequest) -> Vec<String> {
    let mut violations = Vec::new();
    if req.title.trim().chars().count() < MIN_TITLE_CHARS {
        violations.push(format!(
            "Title must be at least {MIN_TITLE_CHARS} characters long"
        ));
    }
    if req.content.trim().chars().count() < MIN_CONTENT_CHARS {
        violations.push(format!(
            "Content must be at least {MIN_CONTENT_CHARS} characters long"
        ));
    }
    if req.submitter_name.trim().chars().count() < MIN_NAME_CHARS {
        violations.push(format!(
            "Submitter name must be at least {MIN_NAME_CHARS} characters long"
        ));
    }
    if !is_valid_email(req.submitter_email.trim()) {
        violations.push("A valid email address is required".to_string());
    }
    if !req.agreed_to_terms {
        violations.push("You must agree to the terms and conditions".to_string());
    }
    if !req.publishing_consent {
        violations.push("Publishing consent is required".to_string());
    }
    violations
}

/// Compute the column values a decision writes. Approval is the only path
/// to a publish timestamp, and it wipes any earlier rejection; every other
/// status clears the timestamp and keeps existing fields unless the admin
/// supplies replacements.
pub(crate) fn plan_moderation(
    current: &Submission,
    status: SubmissionStatus,
    notes: Option<String>,
    reason: Option<String>,
    details: Option<String>,
    now: OffsetDateTime,
) -> ModerationUpdate {
    let published_at = matches!(status, SubmissionStatus::Approved).then_some(now);
    let (rejection_reason, rejection_details) = if status == SubmissionStatus::Approved {
        (None, None)
    } else {
        (
            reason.or_else(|| current.rejection_reason.clone()),
            details.or_else(|| current.rejection_details.clone()),
        )
    };
    ModerationUpdate {
        status,
        moderation_notes: notes.or_else(|| current.moderation_notes.clone()),
        rejection_reason,
        rejection_details,
        published_at,
    }
}

pub async fn create(
    state: &AppState,
    req: CreateSubmissionRequest,
    ip_address: Option<String>,
    user_agent: Option<String>,
) -> Result<SubmissionResponse, ApiError> {
    let violations = validate_submission(&req);
    if !violations.is_empty() {
        return Err(ApiError::Validation(violations));
    }

    let submission = Submission::insert(
        &state.db,
        NewSubmission {
            title: req.title.trim().to_string(),
            content: req.content,
            submission_type: req.submission_type,
            submitter_name: req.submitter_name.trim().to_string(),
            submitter_email: req.submitter_email.trim().to_string(),
            submitter_year: req.submitter_year,
            law_school: req.law_school,
            graduation_year: req.graduation_year,
            subject: req.subject,
            attachments: req.attachments,
            agreed_to_terms: req.agreed_to_terms,
            publishing_consent: req.publishing_consent,
            ip_address,
            user_agent,
        },
    )
    .await?;
    info!(submission_id = %submission.id, "submission received");

    // Best-effort: a notification hiccup never fails the create.
    match Account::admin_emails(&state.db).await {
        Ok(admin_emails) => state.outbox.enqueue(Notification::AdminNewSubmission {
            submission: submission.clone(),
            admin_emails,
        }),
        Err(err) => warn!(error = %err, "could not load admin recipients for notification"),
    }

    Ok(submission.into())
}

pub async fn find_own(
    state: &AppState,
    identity: &Identity,
) -> Result<Vec<SubmissionResponse>, ApiError> {
    let rows = Submission::list_by_submitter_email(&state.db, &identity.email).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn find_approved(
    state: &AppState,
    query: ListQuery,
) -> Result<Paginated<SubmissionResponse>, ApiError> {
    let (page, page_size, limit, offset) = page_params(&query, DEFAULT_PUBLIC_PAGE_SIZE);
    let subject = query.subject.as_deref();
    let rows = Submission::list_approved(&state.db, subject, limit, offset).await?;
    let total = Submission::count_approved(&state.db, subject).await?;
    Ok(paginate(rows, page, page_size, total))
}

pub async fn find_by_status(
    state: &AppState,
    status: SubmissionStatus,
    query: ListQuery,
) -> Result<Paginated<SubmissionResponse>, ApiError> {
    let (page, page_size, limit, offset) = page_params(&query, DEFAULT_ADMIN_PAGE_SIZE);
    let rows = Submission::list_by_status(&state.db, status, limit, offset).await?;
    let total = Submission::count_by_status(&state.db, status).await?;
    Ok(paginate(rows, page, page_size, total))
}

/// Shared by approve, reject and the general-purpose status update.
pub async fn moderate(
    state: &AppState,
    id: Uuid,
    reviewer: &Identity,
    status: SubmissionStatus,
    notes: Option<String>,
    reason: Option<String>,
    details: Option<String>,
) -> Result<SubmissionResponse, ApiError> {
    let current = Submission::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".into()))?;

    let now = OffsetDateTime::now_utc();
    let update = plan_moderation(&current, status, notes, reason, details, now);
    let updated = Submission::apply_moderation(&state.db, id, reviewer.id, now, &update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".into()))?;
    info!(
        submission_id = %id,
        reviewer = %reviewer.id,
        status = ?updated.status,
        "moderation decision applied"
    );

    state.outbox.enqueue(Notification::SubmitterStatusChange {
        submission: updated.clone(),
    });

    Ok(updated.into())
}

pub async fn statistics(state: &AppState) -> Result<StatisticsResponse, ApiError> {
    let counts = StatusCounts::collect(&state.db).await?;
    let recent = Submission::recent(&state.db, RECENT_SUBMISSIONS).await?;
    Ok(StatisticsResponse {
        total_submissions: counts.total,
        status_counts: StatusCountsResponse {
            pending: counts.pending,
            under_review: counts.under_review,
            approved: counts.approved,
            rejected: counts.rejected,
            needs_revision: counts.needs_revision,
        },
        recent_submissions: recent.into_iter().map(Into::into).collect(),
    })
}

pub async fn increment_view(state: &AppState, id: Uuid) -> Result<ViewCountResponse, ApiError> {
    let view_count = Submission::increment_views(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".into()))?;
    Ok(ViewCountResponse { id, view_count })
}

fn page_params(query: &ListQuery, default_size: u32) -> (u32, u32, i64, i64) {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(default_size).clamp(1, MAX_PAGE_SIZE);
    let limit = page_size as i64;
    let offset = (page as i64 - 1) * limit;
    (page, page_size, limit, offset)
}

fn paginate(
    rows: Vec<Submission>,
    page: u32,
    page_size: u32,
    total: i64,
) -> Paginated<SubmissionResponse> {
    let page_count = ((total + page_size as i64 - 1) / page_size as i64).max(0) as u32;
    Paginated {
        data: rows.into_iter().map(Into::into).collect(),
        pagination: PaginationMeta {
            page,
            page_size,
            page_count,
            total,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submissions::repo::test_fixtures::submission_fixture;
    use crate::submissions::repo::{SubmissionType, SubmitterYear};

    fn valid_request() -> CreateSubmissionRequest {
        CreateSubmissionRequest {
            title: "A Defense of the Rule Against Perpetuities".into(),
            content: "x".repeat(80),
            submission_type: SubmissionType::Essay,
            submitter_name: "Alice Author".into(),
            submitter_email: "alice@example.com".into(),
            submitter_year: SubmitterYear::ThirdYear,
            law_school: None,
            graduation_year: None,
            subject: None,
            attachments: None,
            agreed_to_terms: true,
            publishing_consent: true,
        }
    }

    #[test]
    fn valid_payload_passes() {
        assert!(validate_submission(&valid_request()).is_empty());
    }

    #[test]
    fn missing_consent_is_a_violation() {
        let mut req = valid_request();
        req.agreed_to_terms = false;
        let violations = validate_submission(&req);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("terms"));

        req.publishing_consent = false;
        assert_eq!(validate_submission(&req).len(), 2);
    }

    #[test]
    fn all_violations_are_enumerated() {
        let req = CreateSubmissionRequest {
            title: "Hi".into(),
            content: "too short".into(),
            submitter_name: "A".into(),
            submitter_email: "not-an-email".into(),
            agreed_to_terms: false,
            publishing_consent: false,
            ..valid_request()
        };
        assert_eq!(validate_submission(&req).len(), 6);
    }

    #[test]
    fn approval_sets_publish_timestamp_and_clears_rejection() {
        let mut current = submission_fixture();
        current.rejection_reason = Some("off-topic".into());
        current.rejection_details = Some("see notes".into());
        let now = OffsetDateTime::now_utc();

        let update = plan_moderation(&current, SubmissionStatus::Approved, None, None, None, now);
        assert_eq!(update.published_at, Some(now));
        assert_eq!(update.rejection_reason, None);
        assert_eq!(update.rejection_details, None);
    }

    #[test]
    fn non_approved_statuses_clear_publish_timestamp() {
        let mut current = submission_fixture();
        current.published_at = Some(OffsetDateTime::now_utc());
        for status in SubmissionStatus::ALL {
            if status == SubmissionStatus::Approved {
                continue;
            }
            let update = plan_moderation(
                &current,
                status,
                None,
                None,
                None,
                OffsetDateTime::now_utc(),
            );
            assert_eq!(update.published_at, None, "{status:?} must clear published_at");
        }
    }

    #[test]
    fn rejection_stores_reason_and_details() {
        let current = submission_fixture();
        let update = plan_moderation(
            &current,
            SubmissionStatus::Rejected,
            None,
            Some("off-topic".into()),
            Some("Not about law".into()),
            OffsetDateTime::now_utc(),
        );
        assert_eq!(update.rejection_reason.as_deref(), Some("off-topic"));
        assert_eq!(update.rejection_details.as_deref(), Some("Not about law"));
        assert_eq!(update.published_at, None);
    }

    #[test]
    fn moderation_notes_persist_when_not_replaced() {
        let mut current = submission_fixture();
        current.moderation_notes = Some("first pass done".into());
        let update = plan_moderation(
            &current,
            SubmissionStatus::UnderReview,
            None,
            None,
            None,
            OffsetDateTime::now_utc(),
        );
        assert_eq!(update.moderation_notes.as_deref(), Some("first pass done"));
    }

    #[test]
    fn page_params_defaults_and_clamps() {
        let query = ListQuery {
            page: None,
            page_size: None,
            subject: None,
        };
        assert_eq!(page_params(&query, 10), (1, 10, 10, 0));

        let query = ListQuery {
            page: Some(3),
            page_size: Some(500),
            subject: None,
        };
        let (page, page_size, limit, offset) = page_params(&query, 10);
        assert_eq!((page, page_size), (3, MAX_PAGE_SIZE));
        assert_eq!((limit, offset), (100, 200));
    }

    #[test]
    fn page_count_rounds_up() {
        let paged = paginate(vec![], 1, 10, 101);
        assert_eq!(paged.pagination.page_count, 11);
        let empty = paginate(vec![], 1, 10, 0);
        assert_eq!(empty.pagination.page_count, 0);
    }
}
