use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::auth::dto::{
    AuthResponse, CleanupResponse, ConfirmationQuery, LoginRequest, RegisterRequest,
    RegisterResponse, ResendRequest, ResendResponse, VerificationStats, VerificationStatus,
};
use crate::auth::extractors::{AdminUser, ClientIp};
use crate::auth::services;
use crate::error::ApiError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/local/register", post(register))
        .route("/auth/local", post(login))
        .route("/auth/email-confirmation", get(confirm_email))
        .route("/auth/send-email-confirmation", post(resend_confirmation))
}

pub fn verification_routes() -> Router<AppState> {
    Router::new()
        .route("/verification/status/:email", get(verification_status))
        .route("/verification/stats", get(verification_stats))
        .route(
            "/verification/cleanup-expired-tokens",
            post(cleanup_expired_tokens),
        )
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    state.limits.registration.check(&ip)?;
    let response = services::register(&state, payload).await?;
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let response = services::login(&state, payload).await?;
    Ok(Json(response))
}

#[instrument(skip(state, query))]
async fn confirm_email(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Query(query): Query<ConfirmationQuery>,
) -> Result<Json<AuthResponse>, ApiError> {
    state.limits.confirmation.check(&ip)?;
    let response = services::confirm_email(&state, &query.confirmation).await?;
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
async fn resend_confirmation(
    State(state): State<AppState>,
    Json(payload): Json<ResendRequest>,
) -> Result<Json<ResendResponse>, ApiError> {
    // Keyed by target email rather than caller address: the resource being
    // protected is the mailbox we keep mailing.
    state.limits.resend.check(payload.email.trim())?;
    let response = services::resend_confirmation(&state, payload).await?;
    Ok(Json(response))
}

#[instrument(skip(state, _admin))]
async fn verification_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(email): Path<String>,
) -> Result<Json<VerificationStatus>, ApiError> {
    let status = services::verification_status(&state, &email).await?;
    Ok(Json(status))
}

#[instrument(skip(state, _admin))]
async fn verification_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<VerificationStats>, ApiError> {
    let stats = services::verification_stats(&state).await?;
    Ok(Json(stats))
}

#[instrument(skip(state, _admin))]
async fn cleanup_expired_tokens(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<CleanupResponse>, ApiError> {
    let response = services::cleanup_expired_tokens(&state).await?;
    Ok(Json(response))
}
