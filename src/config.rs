use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// When absent the log-only mailer is installed and confirmation URLs
    /// are surfaced inline (development bypass).
    pub sendgrid_api_key: Option<String>,
    pub from_address: String,
    pub client_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    pub token_ttl_hours: i64,
    pub cleanup_interval_hours: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub registration_per_hour: u32,
    pub confirmation_per_hour: u32,
    pub resend_per_hour: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub verification: VerificationConfig,
    pub rate_limits: RateLimitConfig,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "moot".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "moot-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60 * 24 * 7),
        };
        let email = EmailConfig {
            sendgrid_api_key: std::env::var("SENDGRID_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            from_address: std::env::var("SENDGRID_FROM_EMAIL")
                .unwrap_or_else(|_| "no-reply@moot.local".into()),
            client_url: std::env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
        };
        let verification = VerificationConfig {
            token_ttl_hours: env_or("CONFIRMATION_TOKEN_TTL_HOURS", 24),
            cleanup_interval_hours: env_or("TOKEN_CLEANUP_INTERVAL_HOURS", 6),
        };
        let rate_limits = RateLimitConfig {
            registration_per_hour: env_or("RATE_LIMIT_REGISTRATION_PER_HOUR", 5),
            confirmation_per_hour: env_or("RATE_LIMIT_CONFIRMATION_PER_HOUR", 10),
            resend_per_hour: env_or("RATE_LIMIT_RESEND_PER_HOUR", 3),
        };
        Ok(Self {
            database_url,
            jwt,
            email,
            verification,
            rate_limits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_to_default() {
        assert_eq!(env_or("MOOT_TEST_UNSET_VAR", 42i64), 42);
    }
}
