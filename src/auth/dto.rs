use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::Account;

/// Request body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Query string for the confirmation link (`?confirmation=<token>`).
#[derive(Debug, Deserialize)]
pub struct ConfirmationQuery {
    pub confirmation: String,
}

/// Request body for resending the confirmation email.
#[derive(Debug, Deserialize)]
pub struct ResendRequest {
    pub email: String,
}

/// Public part of an account, with credentials and token stripped.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PublicAccount {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub confirmed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub email_verified_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Account> for PublicAccount {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            username: account.username,
            confirmed: account.confirmed,
            email_verified_at: account.email_verified_at,
            created_at: account.created_at,
        }
    }
}

/// Returned by confirmation and login: a session credential plus the
/// sanitized account.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub jwt: String,
    pub user: PublicAccount,
    pub message: String,
}

/// Development-bypass payload: surfaced only when no mail provider is
/// configured, mirroring what the confirmation email would carry.
#[derive(Debug, Serialize)]
pub struct DevBypass {
    pub confirmation_url: String,
    pub confirmation_token: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: PublicAccount,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub development_only: Option<DevBypass>,
}

#[derive(Debug, Serialize)]
pub struct ResendResponse {
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub token_expires_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub development_only: Option<DevBypass>,
}

/// Per-account verification diagnostics.
#[derive(Debug, Serialize)]
pub struct VerificationStatus {
    pub email: String,
    pub username: String,
    pub confirmed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub email_verified_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub has_pending_token: bool,
    pub token_expired: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub token_expires_at: Option<OffsetDateTime>,
}

/// Aggregate verification diagnostics.
#[derive(Debug, Serialize)]
pub struct VerificationStats {
    pub total_users: i64,
    pub confirmed_users: i64,
    pub unconfirmed_users: i64,
    pub pending_tokens: i64,
    pub expired_tokens: i64,
    pub recent_registrations: i64,
    /// Percentage of accounts that completed confirmation, 0 when empty.
    pub confirmation_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub message: String,
    pub cleaned_emails: Vec<String>,
}
