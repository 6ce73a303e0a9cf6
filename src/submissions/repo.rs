use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Review lifecycle of a submission. `Approved` is the only status that
/// carries a publish timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "submission_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
    NeedsRevision,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 5] = [
        SubmissionStatus::Pending,
        SubmissionStatus::UnderReview,
        SubmissionStatus::Approved,
        SubmissionStatus::Rejected,
        SubmissionStatus::NeedsRevision,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "submission_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionType {
    Essay,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "submitter_year", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SubmitterYear {
    FirstYear,
    SecondYear,
    ThirdYear,
    Graduate,
    Attorney,
    Other,
}

impl SubmitterYear {
    /// Short form used in notification emails.
    pub fn display_label(self) -> &'static str {
        match self {
            SubmitterYear::FirstYear => "1L",
            SubmitterYear::SecondYear => "2L",
            SubmitterYear::ThirdYear => "3L",
            SubmitterYear::Graduate => "Graduate",
            SubmitterYear::Attorney => "Attorney",
            SubmitterYear::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Submission {
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
    pub agreed_to_terms: bool,
    pub publishing_consent: bool,
    pub status: SubmissionStatus,
    pub moderation_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub rejection_details: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<OffsetDateTime>,
    pub submitted_at: OffsetDateTime,
    pub published_at: Option<OffsetDateTime>,
    pub view_count: i64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Column values for a new pending submission.
#[derive(Debug)]
pub struct NewSubmission {
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
    pub agreed_to_terms: bool,
    pub publishing_consent: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Final column values of a moderation decision, computed up front so the
/// write is a single statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationUpdate {
    pub status: SubmissionStatus,
    pub moderation_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub rejection_details: Option<String>,
    pub published_at: Option<OffsetDateTime>,
}

const SUBMISSION_COLUMNS: &str = "id, title, content, submission_type, submitter_name, \
     submitter_email, submitter_year, law_school, graduation_year, subject, attachments, \
     agreed_to_terms, publishing_consent, status, moderation_notes, rejection_reason, \
     rejection_details, reviewed_by, reviewed_at, submitted_at, published_at, view_count, \
     ip_address, user_agent";

impl Submission {
    pub async fn insert(db: &PgPool, new: NewSubmission) -> anyhow::Result<Submission> {
        let submission = sqlx::query_as::<_, Submission>(&format!(
            r#"
            INSERT INTO submissions
                (title, content, submission_type, submitter_name, submitter_email,
                 submitter_year, law_school, graduation_year, subject, attachments,
                 agreed_to_terms, publishing_consent, status, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'pending', $13, $14)
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(new.title)
        .bind(new.content)
        .bind(new.submission_type)
        .bind(new.submitter_name)
        .bind(new.submitter_email)
        .bind(new.submitter_year)
        .bind(new.law_school)
        .bind(new.graduation_year)
        .bind(new.subject)
        .bind(new.attachments)
        .bind(new.agreed_to_terms)
        .bind(new.publishing_consent)
        .bind(new.ip_address)
        .bind(new.user_agent)
        .fetch_one(db)
        .await?;
        Ok(submission)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Submission>> {
        let submission = sqlx::query_as::<_, Submission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(submission)
    }

    /// Everything a submitter has sent in, drafts included, newest first.
    pub async fn list_by_submitter_email(
        db: &PgPool,
        email: &str,
    ) -> anyhow::Result<Vec<Submission>> {
        let rows = sqlx::query_as::<_, Submission>(&format!(
            r#"
            SELECT {SUBMISSION_COLUMNS} FROM submissions
             WHERE submitter_email = $1
             ORDER BY submitted_at DESC
            "#
        ))
        .bind(email)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Public listing: approved and published only, newest publication
    /// first, optionally narrowed to one subject.
    pub async fn list_approved(
        db: &PgPool,
        subject: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Submission>> {
        let rows = sqlx::query_as::<_, Submission>(&format!(
            r#"
            SELECT {SUBMISSION_COLUMNS} FROM submissions
             WHERE status = 'approved'
               AND published_at IS NOT NULL
               AND ($1::text IS NULL OR subject = $1)
             ORDER BY published_at DESC
             LIMIT $2 OFFSET $3
            "#
        ))
        .bind(subject)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count_approved(db: &PgPool, subject: Option<&str>) -> anyhow::Result<i64> {
        let (count,) = sqlx::query_as::<_, (i64,)>(
            r#"
            SELECT COUNT(*) FROM submissions
             WHERE status = 'approved'
               AND published_at IS NOT NULL
               AND ($1::text IS NULL OR subject = $1)
            "#,
        )
        .bind(subject)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    pub async fn list_by_status(
        db: &PgPool,
        status: SubmissionStatus,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Submission>> {
        let rows = sqlx::query_as::<_, Submission>(&format!(
            r#"
            SELECT {SUBMISSION_COLUMNS} FROM submissions
             WHERE status = $1
             ORDER BY submitted_at DESC
             LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count_by_status(db: &PgPool, status: SubmissionStatus) -> anyhow::Result<i64> {
        let (count,) =
            sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM submissions WHERE status = $1")
                .bind(status)
                .fetch_one(db)
                .await?;
        Ok(count)
    }

    pub async fn count_all(db: &PgPool) -> anyhow::Result<i64> {
        let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM submissions")
            .fetch_one(db)
            .await?;
        Ok(count)
    }

    pub async fn recent(db: &PgPool, limit: i64) -> anyhow::Result<Vec<Submission>> {
        let rows = sqlx::query_as::<_, Submission>(&format!(
            r#"
            SELECT {SUBMISSION_COLUMNS} FROM submissions
             ORDER BY submitted_at DESC
             LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Apply a moderation decision, stamping the reviewer. Returns the
    /// updated row, or None when the id does not exist.
    pub async fn apply_moderation(
        db: &PgPool,
        id: Uuid,
        reviewed_by: Uuid,
        reviewed_at: OffsetDateTime,
        update: &ModerationUpdate,
    ) -> anyhow::Result<Option<Submission>> {
        let submission = sqlx::query_as::<_, Submission>(&format!(
            r#"
            UPDATE submissions
               SET status = $2,
                   moderation_notes = $3,
                   rejection_reason = $4,
                   rejection_details = $5,
                   published_at = $6,
                   reviewed_by = $7,
                   reviewed_at = $8
             WHERE id = $1
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.status)
        .bind(update.moderation_notes.clone())
        .bind(update.rejection_reason.clone())
        .bind(update.rejection_details.clone())
        .bind(update.published_at)
        .bind(reviewed_by)
        .bind(reviewed_at)
        .fetch_optional(db)
        .await?;
        Ok(submission)
    }

    /// Atomic increment at the storage layer, so concurrent views never
    /// lose an update. Returns the new count, or None when absent.
    pub async fn increment_views(db: &PgPool, id: Uuid) -> anyhow::Result<Option<i64>> {
        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            UPDATE submissions
               SET view_count = view_count + 1
             WHERE id = $1
            RETURNING view_count
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row.map(|(count,)| count))
    }
}

/// Per-status counters for the statistics dashboard.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub under_review: i64,
    pub approved: i64,
    pub rejected: i64,
    pub needs_revision: i64,
}

impl StatusCounts {
    pub async fn collect(db: &PgPool) -> anyhow::Result<Self> {
        let counts = sqlx::query_as::<_, StatusCounts>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'under-review') AS under_review,
                COUNT(*) FILTER (WHERE status = 'approved') AS approved,
                COUNT(*) FILTER (WHERE status = 'rejected') AS rejected,
                COUNT(*) FILTER (WHERE status = 'needs-revision') AS needs_revision
            FROM submissions
            "#,
        )
        .fetch_one(db)
        .await?;
        Ok(counts)
    }
}

#[cfg(test)]
pub mod test_fixtures {
    use super::*;

    pub fn submission_fixture() -> Submission {
        let now = OffsetDateTime::now_utc();
        Submission {
            id: Uuid::new_v4(),
            title: "Adverse Possession in Modern Property Law".into(),
            content: "An essay arguing that the doctrine still serves a purpose.".into(),
            submission_type: SubmissionType::Essay,
            submitter_name: "Alice Author".into(),
            submitter_email: "alice@example.com".into(),
            submitter_year: SubmitterYear::SecondYear,
            law_school: Some("Example Law".into()),
            graduation_year: Some(2027),
            subject: Some("property".into()),
            attachments: None,
            agreed_to_terms: true,
            publishing_consent: true,
            status: SubmissionStatus::Pending,
            moderation_notes: None,
            rejection_reason: None,
            rejection_details: None,
            reviewed_by: None,
            reviewed_at: None,
            submitted_at: now,
            published_at: None,
            view_count: 0,
            ip_address: Some("203.0.113.9".into()),
            user_agent: Some("test-agent".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_kebab_case() {
        let json = serde_json::to_string(&SubmissionStatus::UnderReview).unwrap();
        assert_eq!(json, r#""under-review""#);
        let back: SubmissionStatus = serde_json::from_str(r#""needs-revision""#).unwrap();
        assert_eq!(back, SubmissionStatus::NeedsRevision);
    }

    #[test]
    fn all_statuses_roundtrip_through_serde() {
        for status in SubmissionStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            let back: SubmissionStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn submitter_year_labels() {
        assert_eq!(SubmitterYear::FirstYear.display_label(), "1L");
        assert_eq!(SubmitterYear::Attorney.display_label(), "Attorney");
    }
}
