//! HTML bodies for outbound email, sharing one layout so every message the
//! platform sends looks the same.

use crate::submissions::repo::{Submission, SubmissionStatus};

pub struct Layout<'a> {
    pub title: &'a str,
    pub heading: &'a str,
    pub content: String,
    pub button: Option<(&'a str, String)>,
}

pub fn render_layout(layout: Layout<'_>) -> String {
    let button = layout
        .button
        .map(|(text, url)| {
            format!(
                r#"<p style="text-align:center;margin:30px 0;">
  <a href="{url}" style="background:#3498db;color:#fff;padding:12px 30px;border-radius:5px;text-decoration:none;">{text}</a>
</p>"#
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>{title} - Moot</title>
</head>
<body style="font-family:'Segoe UI',Tahoma,Geneva,Verdana,sans-serif;line-height:1.6;color:#333;max-width:600px;margin:0 auto;padding:20px;background-color:#f4f4f4;">
  <div style="background:#fff;padding:30px;border-radius:10px;">
    <div style="text-align:center;margin-bottom:30px;">
      <div style="font-size:28px;font-weight:bold;color:#2c3e50;">Moot</div>
    </div>
    <h2 style="color:#2c3e50;">{heading}</h2>
    {content}
    {button}
    <div style="margin-top:30px;padding-top:20px;border-top:1px solid #eee;color:#888;font-size:12px;text-align:center;">
      This is an automated message from the Moot legal education platform.
    </div>
  </div>
</body>
</html>"#,
        title = layout.title,
        heading = layout.heading,
        content = layout.content,
        button = button,
    )
}

pub fn confirmation_url(client_url: &str, token: &str) -> String {
    format!("{client_url}/email-confirmation-redirection?confirmation={token}")
}

pub fn confirmation_email(client_url: &str, token: &str) -> String {
    let url = confirmation_url(client_url, token);
    render_layout(Layout {
        title: "Confirm your email",
        heading: "Please confirm your email address",
        content: "<p>Thanks for signing up. Click the button below to confirm \
                  your email address and activate your account. The link is \
                  valid for 24 hours.</p>"
            .to_string(),
        button: Some(("Confirm Email", url)),
    })
}

pub fn admin_new_submission_email(submission: &Submission, admin_url: &str) -> String {
    let mut preview: String = submission.content.chars().take(500).collect();
    if submission.content.chars().count() > 500 {
        preview.push_str("...");
    }
    let content = format!(
        "<p>A new essay submission has been received and is ready for review.</p>\
         <p><strong>Title:</strong> {title}</p>\
         <p><strong>Submitter:</strong> {name} ({email}, {year})</p>\
         <p><strong>Law school:</strong> {school}</p>\
         <div style=\"background:#fff;border:1px solid #dee2e6;padding:15px;border-radius:3px;\">{preview}</div>",
        title = submission.title,
        name = submission.submitter_name,
        email = submission.submitter_email,
        year = submission.submitter_year.display_label(),
        school = submission.law_school.as_deref().unwrap_or("Not specified"),
        preview = preview,
    );
    render_layout(Layout {
        title: "New Essay Submission",
        heading: "New Essay Submission Received",
        content,
        button: Some(("Review Submission", admin_url.to_string())),
    })
}

fn status_message(status: SubmissionStatus) -> &'static str {
    match status {
        SubmissionStatus::Pending => {
            "Your submission has been received and is waiting for review."
        }
        SubmissionStatus::UnderReview => {
            "Your submission is currently under review by our editorial team. \
             We will notify you once the review is complete."
        }
        SubmissionStatus::Approved => {
            "Congratulations! Your submission has been approved and will be \
             published on our platform."
        }
        SubmissionStatus::Rejected => {
            "Unfortunately, your submission was not approved for publication \
             at this time."
        }
        SubmissionStatus::NeedsRevision => {
            "Your submission requires some revisions before it can be \
             approved. Please review the feedback below and submit a revised \
             version."
        }
    }
}

pub fn submitter_status_email(submission: &Submission, client_url: &str) -> String {
    let mut content = format!(
        "<p><strong>{title}</strong></p><p>{message}</p>",
        title = submission.title,
        message = status_message(submission.status),
    );
    if let Some(notes) = &submission.moderation_notes {
        content.push_str(&format!(
            "<div style=\"background:#e3f2fd;padding:15px;border-radius:3px;\"><strong>Review notes:</strong> {notes}</div>"
        ));
    }
    if let Some(details) = &submission.rejection_details {
        content.push_str(&format!(
            "<div style=\"background:#ffebee;padding:15px;border-radius:3px;\"><strong>Feedback:</strong> {details}</div>"
        ));
    }

    let button = matches!(submission.status, SubmissionStatus::NeedsRevision)
        .then(|| ("Submit Revision", format!("{client_url}/submit-essay")));

    render_layout(Layout {
        title: "Submission Status Update",
        heading: "Essay Submission Status Update",
        content,
        button,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submissions::repo::test_fixtures::submission_fixture;

    #[test]
    fn confirmation_email_embeds_token_url() {
        let html = confirmation_email("https://app.example.com", "tok123");
        assert!(html.contains(
            "https://app.example.com/email-confirmation-redirection?confirmation=tok123"
        ));
        assert!(html.contains("Confirm Email"));
    }

    #[test]
    fn admin_email_truncates_long_content() {
        let mut submission = submission_fixture();
        submission.content = "x".repeat(600);
        let html = admin_new_submission_email(&submission, "https://admin.example.com");
        assert!(html.contains(&format!("{}...", "x".repeat(500))));
        assert!(!html.contains(&"x".repeat(501)));
    }

    #[test]
    fn needs_revision_email_links_to_resubmission() {
        let mut submission = submission_fixture();
        submission.status = SubmissionStatus::NeedsRevision;
        let html = submitter_status_email(&submission, "https://app.example.com");
        assert!(html.contains("https://app.example.com/submit-essay"));
    }

    #[test]
    fn rejection_feedback_is_included_when_present() {
        let mut submission = submission_fixture();
        submission.status = SubmissionStatus::Rejected;
        submission.rejection_details = Some("Cites no authority".into());
        let html = submitter_status_email(&submission, "https://app.example.com");
        assert!(html.contains("Cites no authority"));
        assert!(!html.contains("Submit Revision"));
    }
}
