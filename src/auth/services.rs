use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::auth::dto::{
    AuthResponse, CleanupResponse, DevBypass, LoginRequest, RegisterRequest, RegisterResponse,
    ResendRequest, ResendResponse, VerificationStats, VerificationStatus,
};
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::{Account, VerificationCounts};
use crate::error::ApiError;
use crate::mailer::Email;
use crate::state::AppState;
use crate::templates;

/// 64 alphanumeric characters drawn from the OS RNG, comfortably past the
/// 256-bit entropy floor for a single-use credential.
const CONFIRMATION_TOKEN_LEN: usize = 64;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn generate_confirmation_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(CONFIRMATION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn token_expiry(now: OffsetDateTime, ttl_hours: i64) -> OffsetDateTime {
    now + Duration::hours(ttl_hours)
}

pub(crate) fn validate_registration(req: &RegisterRequest) -> Vec<String> {
    let mut violations = Vec::new();
    if !is_valid_email(req.email.trim()) {
        violations.push("A valid email address is required".to_string());
    }
    if req.username.trim().chars().count() < 3 {
        violations.push("Username must be at least 3 characters long".to_string());
    }
    if req.password.chars().count() < 8 {
        violations.push("Password must be at least 8 characters long".to_string());
    }
    violations
}

/// What a confirmation attempt should do, given the account the token
/// resolved to.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ConfirmOutcome {
    /// Short-circuit: issue a fresh session and report success.
    AlreadyConfirmed,
    /// Consume the token without confirming, then fail.
    Expired,
    /// Confirm, clear the token, stamp the verification time.
    Confirm,
}

pub(crate) fn assess_confirmation(account: &Account, now: OffsetDateTime) -> ConfirmOutcome {
    if account.confirmed {
        return ConfirmOutcome::AlreadyConfirmed;
    }
    match account.confirmation_token_expires_at {
        Some(expires_at) if now > expires_at => ConfirmOutcome::Expired,
        _ => ConfirmOutcome::Confirm,
    }
}

fn dev_bypass(state: &AppState, token: &str) -> Option<DevBypass> {
    state.config.email.sendgrid_api_key.is_none().then(|| DevBypass {
        confirmation_url: templates::confirmation_url(&state.config.email.client_url, token),
        confirmation_token: token.to_string(),
    })
}

async fn send_confirmation_email(state: &AppState, to: &str, token: &str) -> anyhow::Result<()> {
    let email = Email {
        to: vec![to.to_string()],
        subject: "Please confirm your email address - Moot".into(),
        html: templates::confirmation_email(&state.config.email.client_url, token),
    };
    state.mailer.send(&email).await
}

/// Create an unconfirmed account and dispatch its confirmation email.
/// If the dispatch fails the account is deleted again: a confirmable
/// account exists only if the email went out.
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<RegisterResponse, ApiError> {
    let violations = validate_registration(&req);
    if !violations.is_empty() {
        return Err(ApiError::Validation(violations));
    }

    let email = req.email.trim();
    let username = req.username.trim();

    if Account::find_by_email(&state.db, email).await?.is_some() {
        return Err(ApiError::Conflict("Email is already taken".into()));
    }
    if Account::find_by_username(&state.db, username).await?.is_some() {
        return Err(ApiError::Conflict("Username is already taken".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let token = generate_confirmation_token();
    let now = OffsetDateTime::now_utc();
    let expires_at = token_expiry(now, state.config.verification.token_ttl_hours);

    let account =
        Account::create(&state.db, email, username, &password_hash, &token, expires_at).await?;
    info!(user_id = %account.id, "account created, confirmation pending");

    if let Err(err) = send_confirmation_email(state, email, &token).await {
        warn!(error = %err, user_id = %account.id, "confirmation email failed, rolling back account");
        Account::delete(&state.db, account.id).await?;
        return Err(ApiError::Internal(
            err.context("registration aborted: confirmation email could not be dispatched"),
        ));
    }

    let development_only = dev_bypass(state, &token);
    Ok(RegisterResponse {
        user: account.into(),
        message: "Registration successful. Please check your email to confirm your account."
            .into(),
        development_only,
    })
}

/// Consume a confirmation token. Exactly-once: success and expiry both
/// clear the token, so a repeat call can only fail as invalid.
pub async fn confirm_email(state: &AppState, token: &str) -> Result<AuthResponse, ApiError> {
    let account = Account::find_by_confirmation_token(&state.db, token)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid confirmation token".into()))?;

    let keys = JwtKeys::from_config(&state.config.jwt);
    let now = OffsetDateTime::now_utc();

    match assess_confirmation(&account, now) {
        ConfirmOutcome::AlreadyConfirmed => {
            let jwt = keys.sign(account.id, &account.email, account.role)?;
            info!(user_id = %account.id, "already confirmed, issued fresh session");
            Ok(AuthResponse {
                jwt,
                user: account.into(),
                message: "Email is already confirmed. You are now logged in.".into(),
            })
        }
        ConfirmOutcome::Expired => {
            Account::clear_confirmation_token(&state.db, account.id).await?;
            warn!(user_id = %account.id, "confirmation token expired and was invalidated");
            Err(ApiError::Validation(vec![
                "Confirmation token has expired. Please request a new confirmation email.".into(),
            ]))
        }
        ConfirmOutcome::Confirm => {
            let confirmed = Account::confirm(&state.db, account.id, now).await?;
            let jwt = keys.sign(confirmed.id, &confirmed.email, confirmed.role)?;
            info!(user_id = %confirmed.id, "email confirmed");
            Ok(AuthResponse {
                jwt,
                user: confirmed.into(),
                message: "Email confirmed successfully. You are now logged in.".into(),
            })
        }
    }
}

/// Rotate the pending token and send a fresh confirmation email. The
/// previous token stops working even if it had time left.
pub async fn resend_confirmation(
    state: &AppState,
    req: ResendRequest,
) -> Result<ResendResponse, ApiError> {
    let email = req.email.trim();
    if !is_valid_email(email) {
        return Err(ApiError::Validation(vec![
            "A valid email address is required".into(),
        ]));
    }

    let account = Account::find_by_email(&state.db, email)
        .await?
        .ok_or_else(|| ApiError::NotFound("No account found with this email address".into()))?;

    if account.confirmed {
        return Err(ApiError::Conflict("This email is already verified".into()));
    }

    let token = generate_confirmation_token();
    let now = OffsetDateTime::now_utc();
    let expires_at = token_expiry(now, state.config.verification.token_ttl_hours);
    Account::set_confirmation_token(&state.db, account.id, &token, expires_at).await?;
    info!(user_id = %account.id, "confirmation token rotated");

    send_confirmation_email(state, email, &token)
        .await
        .map_err(|err| {
            ApiError::Internal(err.context("resend aborted: confirmation email failed"))
        })?;

    let development_only = dev_bypass(state, &token);
    Ok(ResendResponse {
        message: "Confirmation email sent. Please check your inbox and spam folder.".into(),
        token_expires_at: expires_at,
        development_only,
    })
}

/// Password login for confirmed accounts. Unknown email and wrong password
/// are indistinguishable to the caller.
pub async fn login(state: &AppState, req: LoginRequest) -> Result<AuthResponse, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".into());

    let account = Account::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &account.password_hash)? {
        warn!(user_id = %account.id, "login with invalid password");
        return Err(invalid());
    }

    if !account.confirmed {
        return Err(ApiError::Forbidden(
            "Your email address is not confirmed".into(),
        ));
    }

    let keys = JwtKeys::from_config(&state.config.jwt);
    let jwt = keys.sign(account.id, &account.email, account.role)?;
    info!(user_id = %account.id, "logged in");
    Ok(AuthResponse {
        jwt,
        user: account.into(),
        message: "Logged in.".into(),
    })
}

/// Sweep every lapsed, unconsumed token. Affected accounts stay
/// unconfirmed; they need a resend to proceed.
pub async fn cleanup_expired_tokens(state: &AppState) -> Result<CleanupResponse, ApiError> {
    let now = OffsetDateTime::now_utc();
    let cleaned = Account::clear_expired_tokens(&state.db, now).await?;
    let cleaned_emails: Vec<String> = cleaned.into_iter().map(|(_, email)| email).collect();
    info!(count = cleaned_emails.len(), "expired confirmation tokens cleared");
    Ok(CleanupResponse {
        message: format!("Cleaned up {} expired tokens", cleaned_emails.len()),
        cleaned_emails,
    })
}

pub async fn verification_status(
    state: &AppState,
    email: &str,
) -> Result<VerificationStatus, ApiError> {
    let account = Account::find_by_email(&state.db, email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let now = OffsetDateTime::now_utc();
    let token_expired = account
        .confirmation_token_expires_at
        .map(|expires_at| now > expires_at)
        .unwrap_or(false);

    Ok(VerificationStatus {
        email: account.email,
        username: account.username,
        confirmed: account.confirmed,
        email_verified_at: account.email_verified_at,
        created_at: account.created_at,
        has_pending_token: !account.confirmed && account.confirmation_token.is_some(),
        token_expired,
        token_expires_at: account.confirmation_token_expires_at,
    })
}

pub async fn verification_stats(state: &AppState) -> Result<VerificationStats, ApiError> {
    let counts = VerificationCounts::collect(&state.db, OffsetDateTime::now_utc()).await?;
    let confirmation_rate = if counts.total > 0 {
        ((counts.confirmed as f64 / counts.total as f64) * 10_000.0).round() / 100.0
    } else {
        0.0
    };
    Ok(VerificationStats {
        total_users: counts.total,
        confirmed_users: counts.confirmed,
        unconfirmed_users: counts.unconfirmed,
        pending_tokens: counts.pending_tokens,
        expired_tokens: counts.expired_tokens,
        recent_registrations: counts.recent_registrations,
        confirmation_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::Role;
    use uuid::Uuid;

    fn account(confirmed: bool, expires_in: Option<Duration>) -> Account {
        let now = OffsetDateTime::now_utc();
        Account {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            username: "alice".into(),
            password_hash: "hash".into(),
            role: Role::Authenticated,
            confirmed,
            confirmation_token: expires_in.map(|_| "tok".to_string()),
            confirmation_token_expires_at: expires_in.map(|d| now + d),
            email_verified_at: confirmed.then_some(now),
            created_at: now,
        }
    }

    #[test]
    fn token_is_long_and_alphanumeric() {
        let token = generate_confirmation_token();
        assert_eq!(token.len(), CONFIRMATION_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(generate_confirmation_token(), generate_confirmation_token());
    }

    #[test]
    fn expiry_is_ttl_hours_out() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(token_expiry(now, 24), now + Duration::hours(24));
    }

    #[test]
    fn validation_collects_every_violation() {
        let req = RegisterRequest {
            email: "not-an-email".into(),
            username: "ab".into(),
            password: "short".into(),
        };
        let violations = validate_registration(&req);
        assert_eq!(violations.len(), 3);
    }

    #[test]
    fn valid_registration_has_no_violations() {
        let req = RegisterRequest {
            email: "a@x.com".into(),
            username: "alice".into(),
            password: "pw123456".into(),
        };
        assert!(validate_registration(&req).is_empty());
    }

    #[test]
    fn confirmed_account_short_circuits() {
        let account = account(true, None);
        assert_eq!(
            assess_confirmation(&account, OffsetDateTime::now_utc()),
            ConfirmOutcome::AlreadyConfirmed
        );
    }

    #[test]
    fn live_token_confirms() {
        let account = account(false, Some(Duration::hours(1)));
        assert_eq!(
            assess_confirmation(&account, OffsetDateTime::now_utc()),
            ConfirmOutcome::Confirm
        );
    }

    #[test]
    fn lapsed_token_expires() {
        let account = account(false, Some(-Duration::hours(1)));
        assert_eq!(
            assess_confirmation(&account, OffsetDateTime::now_utc()),
            ConfirmOutcome::Expired
        );
    }

    #[test]
    fn email_regex_accepts_and_rejects() {
        assert!(is_valid_email("user@example.com"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("user example.com"));
        assert!(!is_valid_email("user@example"));
    }
}
