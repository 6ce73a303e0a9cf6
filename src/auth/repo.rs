use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Authenticated,
    Admin,
}

/// Account record. The confirmation token columns are only populated while
/// an email verification is pending.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub confirmed: bool,
    #[serde(skip_serializing)]
    pub confirmation_token: Option<String>,
    pub confirmation_token_expires_at: Option<OffsetDateTime>,
    pub email_verified_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

const ACCOUNT_COLUMNS: &str = "id, email, username, password_hash, role, confirmed, \
     confirmation_token, confirmation_token_expires_at, email_verified_at, created_at";

impl Account {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(account)
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(account)
    }

    pub async fn find_by_confirmation_token(
        db: &PgPool,
        token: &str,
    ) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE confirmation_token = $1"
        ))
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(account)
    }

    pub async fn create(
        db: &PgPool,
        email: &str,
        username: &str,
        password_hash: &str,
        confirmation_token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<Account> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO users
                (email, username, password_hash, role, confirmed,
                 confirmation_token, confirmation_token_expires_at)
            VALUES ($1, $2, $3, 'authenticated', FALSE, $4, $5)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .bind(confirmation_token)
        .bind(expires_at)
        .fetch_one(db)
        .await?;
        Ok(account)
    }

    /// Registration rollback after a failed confirmation-email dispatch.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Consume the pending token: confirm the account, clear the token
    /// columns and stamp the verification time.
    pub async fn confirm(db: &PgPool, id: Uuid, now: OffsetDateTime) -> anyhow::Result<Account> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE users
               SET confirmed = TRUE,
                   confirmation_token = NULL,
                   confirmation_token_expires_at = NULL,
                   email_verified_at = $2
             WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(now)
        .fetch_one(db)
        .await?;
        Ok(account)
    }

    /// Rotate the pending token; any previously issued token stops working.
    pub async fn set_confirmation_token(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET confirmation_token = $2,
                   confirmation_token_expires_at = $3
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Invalidate a pending token without confirming the account.
    pub async fn clear_confirmation_token(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET confirmation_token = NULL,
                   confirmation_token_expires_at = NULL
             WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Clear every lapsed token in one statement; returns the affected
    /// accounts for audit logging.
    pub async fn clear_expired_tokens(
        db: &PgPool,
        now: OffsetDateTime,
    ) -> anyhow::Result<Vec<(Uuid, String)>> {
        let cleaned = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            UPDATE users
               SET confirmation_token = NULL,
                   confirmation_token_expires_at = NULL
             WHERE confirmed = FALSE
               AND confirmation_token IS NOT NULL
               AND confirmation_token_expires_at < $1
            RETURNING id, email
            "#,
        )
        .bind(now)
        .fetch_all(db)
        .await?;
        Ok(cleaned)
    }

    pub async fn admin_emails(db: &PgPool) -> anyhow::Result<Vec<String>> {
        let rows = sqlx::query_as::<_, (String,)>("SELECT email FROM users WHERE role = 'admin'")
            .fetch_all(db)
            .await?;
        Ok(rows.into_iter().map(|(email,)| email).collect())
    }
}

/// Aggregate counters backing the verification-stats diagnostics.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct VerificationCounts {
    pub total: i64,
    pub confirmed: i64,
    pub unconfirmed: i64,
    pub pending_tokens: i64,
    pub expired_tokens: i64,
    pub recent_registrations: i64,
}

impl VerificationCounts {
    pub async fn collect(db: &PgPool, now: OffsetDateTime) -> anyhow::Result<Self> {
        let counts = sqlx::query_as::<_, VerificationCounts>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE confirmed) AS confirmed,
                COUNT(*) FILTER (WHERE NOT confirmed) AS unconfirmed,
                COUNT(*) FILTER (WHERE NOT confirmed
                                   AND confirmation_token IS NOT NULL) AS pending_tokens,
                COUNT(*) FILTER (WHERE NOT confirmed
                                   AND confirmation_token IS NOT NULL
                                   AND confirmation_token_expires_at < $1) AS expired_tokens,
                COUNT(*) FILTER (WHERE created_at >= $2) AS recent_registrations
            FROM users
            "#,
        )
        .bind(now)
        .bind(now - time::Duration::hours(24))
        .fetch_one(db)
        .await?;
        Ok(counts)
    }
}
