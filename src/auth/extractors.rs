use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use std::net::SocketAddr;
use tracing::warn;
use uuid::Uuid;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::Role;
use crate::error::ApiError;
use crate::state::AppState;

/// Identity context attached to a request by its session credential.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Single authorization policy for role-gated operations. Every admin-only
/// handler goes through this one function via the `AdminUser` extractor.
pub fn require_role(identity: &Identity, role: Role) -> Result<(), ApiError> {
    if identity.role == role || identity.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Admin access required".into()))
    }
}

/// Extracts and validates the bearer JWT, producing the caller's identity.
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Unauthorized("Invalid auth scheme".into()))?;

        let keys = JwtKeys::from_config(&state.config.jwt);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired session token");
            ApiError::Unauthorized("Invalid or expired token".into())
        })?;

        Ok(AuthUser(Identity {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }))
    }
}

/// `AuthUser` plus the admin policy check. Rejections are uniform, so a
/// non-admin caller learns nothing about the entity it targeted.
pub struct AdminUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
        require_role(&identity, Role::Admin)?;
        Ok(AdminUser(identity))
    }
}

/// Client address for rate-limit keying: proxy headers first, socket
/// address as the fallback.
pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_headers = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .or_else(|| {
                parts
                    .headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.trim().to_string())
            });

        let ip = from_headers.unwrap_or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string())
        });

        Ok(ClientIp(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "who@example.com".into(),
            role,
        }
    }

    #[test]
    fn admin_passes_the_admin_policy() {
        assert!(require_role(&identity(Role::Admin), Role::Admin).is_ok());
    }

    #[test]
    fn authenticated_fails_the_admin_policy_with_forbidden() {
        let err = require_role(&identity(Role::Authenticated), Role::Admin).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn admin_satisfies_the_authenticated_policy() {
        assert!(require_role(&identity(Role::Admin), Role::Authenticated).is_ok());
    }
}
