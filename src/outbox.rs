//! Notification outbox. Engines append an intent and move on; a worker task
//! owns delivery, so a slow or failing mail provider never fails the request
//! that produced the notification.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::mailer::{Email, Mailer};
use crate::submissions::repo::Submission;
use crate::templates;

#[derive(Debug)]
pub enum Notification {
    /// A new submission landed in the review queue.
    AdminNewSubmission {
        submission: Submission,
        admin_emails: Vec<String>,
    },
    /// A moderation decision changed a submission's status.
    SubmitterStatusChange { submission: Submission },
}

#[derive(Clone)]
pub struct Outbox {
    tx: UnboundedSender<Notification>,
}

impl Outbox {
    pub fn channel() -> (Self, UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Best-effort append. A missing worker is logged, never surfaced.
    pub fn enqueue(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            warn!("notification dropped: outbox worker is not running");
        }
    }
}

pub async fn run_worker(
    mut rx: UnboundedReceiver<Notification>,
    mailer: Arc<dyn Mailer>,
    config: Arc<AppConfig>,
) {
    info!("notification worker started");
    while let Some(notification) = rx.recv().await {
        let email = compose(&notification, &config);
        match email {
            Some(email) => {
                if let Err(err) = mailer.send(&email).await {
                    error!(error = %err, subject = %email.subject, "notification delivery failed");
                }
            }
            None => warn!("notification skipped: no recipients"),
        }
    }
    info!("notification worker stopped");
}

fn compose(notification: &Notification, config: &AppConfig) -> Option<Email> {
    match notification {
        Notification::AdminNewSubmission {
            submission,
            admin_emails,
        } => {
            if admin_emails.is_empty() {
                return None;
            }
            let review_url = format!("{}/admin/submissions", config.email.client_url);
            Some(Email {
                to: admin_emails.clone(),
                subject: format!("New Essay Submission: {}", submission.title),
                html: templates::admin_new_submission_email(submission, &review_url),
            })
        }
        Notification::SubmitterStatusChange { submission } => Some(Email {
            to: vec![submission.submitter_email.clone()],
            subject: format!("Submission Status Update: {}", submission.title),
            html: templates::submitter_status_email(submission, &config.email.client_url),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use crate::submissions::repo::test_fixtures::submission_fixture;

    #[tokio::test]
    async fn admin_notice_without_recipients_is_skipped() {
        let state = AppState::fake();
        let notification = Notification::AdminNewSubmission {
            submission: submission_fixture(),
            admin_emails: vec![],
        };
        assert!(compose(&notification, &state.config).is_none());
    }

    #[tokio::test]
    async fn status_change_targets_the_submitter() {
        let state = AppState::fake();
        let submission = submission_fixture();
        let notification = Notification::SubmitterStatusChange {
            submission: submission.clone(),
        };
        let email = compose(&notification, &state.config).expect("composes");
        assert_eq!(email.to, vec![submission.submitter_email]);
        assert!(email.subject.contains(&submission.title));
    }

    #[tokio::test]
    async fn enqueue_after_worker_shutdown_does_not_panic() {
        let (outbox, rx) = Outbox::channel();
        drop(rx);
        outbox.enqueue(Notification::SubmitterStatusChange {
            submission: submission_fixture(),
        });
    }
}
