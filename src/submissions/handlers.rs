use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::extractors::{AdminUser, AuthUser, ClientIp};
use crate::error::ApiError;
use crate::state::AppState;
use crate::submissions::dto::{
    CreateSubmissionRequest, ListQuery, Paginated, RejectRequest, StatisticsResponse,
    SubmissionResponse, UpdateStatusRequest, ViewCountResponse,
};
use crate::submissions::repo::SubmissionStatus;
use crate::submissions::services;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/submissions", post(create))
        .route("/submissions/approved", get(find_approved))
        .route("/submissions/:id/views", post(increment_view))
}

pub fn submitter_routes() -> Router<AppState> {
    Router::new().route("/submissions/mine", get(find_own))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/submissions/:id/approve", put(approve))
        .route("/submissions/:id/reject", put(reject))
        .route("/submissions/:id/status", put(update_status))
        .route("/submissions/pending", get(find_pending))
        .route("/submissions/status/:status", get(find_by_status))
        .route("/submissions/statistics", get(statistics))
}

#[instrument(skip(state, headers, payload))]
async fn create(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    Json(payload): Json<CreateSubmissionRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let response = services::create(&state, payload, Some(ip), user_agent).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, user))]
async fn find_own(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let rows = services::find_own(&state, &user.0).await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
async fn find_approved(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Paginated<SubmissionResponse>>, ApiError> {
    let page = services::find_approved(&state, query).await?;
    Ok(Json(page))
}

#[instrument(skip(state, admin))]
async fn approve(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let response = services::moderate(
        &state,
        id,
        &admin.0,
        SubmissionStatus::Approved,
        None,
        None,
        None,
    )
    .await?;
    Ok(Json(response))
}

#[instrument(skip(state, admin, payload))]
async fn reject(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let response = services::moderate(
        &state,
        id,
        &admin.0,
        SubmissionStatus::Rejected,
        None,
        Some(payload.rejection_reason),
        payload.rejection_details,
    )
    .await?;
    Ok(Json(response))
}

#[instrument(skip(state, admin, payload))]
async fn update_status(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let response = services::moderate(
        &state,
        id,
        &admin.0,
        payload.status,
        payload.moderation_notes,
        payload.rejection_reason,
        payload.rejection_details,
    )
    .await?;
    Ok(Json(response))
}

#[instrument(skip(state, _admin))]
async fn find_pending(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Paginated<SubmissionResponse>>, ApiError> {
    let page = services::find_by_status(&state, SubmissionStatus::Pending, query).await?;
    Ok(Json(page))
}

#[instrument(skip(state, _admin))]
async fn find_by_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(status): Path<SubmissionStatus>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Paginated<SubmissionResponse>>, ApiError> {
    let page = services::find_by_status(&state, status, query).await?;
    Ok(Json(page))
}

#[instrument(skip(state, _admin))]
async fn statistics(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let response = services::statistics(&state).await?;
    Ok(Json(response))
}

#[instrument(skip(state))]
async fn increment_view(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ViewCountResponse>, ApiError> {
    let response = services::increment_view(&state, id).await?;
    Ok(Json(response))
}
