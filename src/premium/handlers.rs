use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{ApproveRequest, PremiumRequestView, RejectRequest, SubmitPremiumRequest},
    repo,
    repo_types::PremiumRequest,
    services::{decide, Decision},
};
use crate::{
    auth::{extractors::AdminCaller, repo_types::User, services::AuthUser},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/premium/requests", post(request_premium))
        .route("/premium/requests/me", get(get_own_request))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/premium-requests", get(list_requests))
        .route("/admin/premium-requests/:id/approve", post(approve_request))
        .route("/admin/premium-requests/:id/reject", post(reject_request))
}

#[instrument(skip(state, body))]
pub async fn request_premium(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<SubmitPremiumRequest>,
) -> AppResult<(StatusCode, Json<PremiumRequest>)> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let reference = body
        .payment_reference
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let request =
        repo::insert_pending(&state.db, user_id, &user.email, body.payment_method, reference).await?;
    info!(%user_id, request_id = %request.id, method = ?request.payment_method, "premium requested");
    Ok((StatusCode::CREATED, Json(request)))
}

#[instrument(skip(state))]
pub async fn get_own_request(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
) -> AppResult<Json<Option<PremiumRequest>>> {
    let Some(AuthUser(user_id)) = caller else {
        return Ok(Json(None));
    };
    Ok(Json(repo::latest_for_user(&state.db, user_id).await?))
}

#[instrument(skip(state))]
pub async fn list_requests(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> AppResult<Json<Vec<PremiumRequestView>>> {
    let rows = repo::list_with_requesters(&state.db).await?;
    Ok(Json(rows.into_iter().map(PremiumRequestView::from).collect()))
}

#[instrument(skip(state, body))]
pub async fn approve_request(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(request_id): Path<Uuid>,
    body: Option<Json<ApproveRequest>>,
) -> AppResult<Json<PremiumRequest>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let decision = Decision::Approve {
        expires_at: body.expires_at,
    };
    Ok(Json(decide(&state.db, &admin, request_id, decision, body.notes).await?))
}

#[instrument(skip(state, body))]
pub async fn reject_request(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(request_id): Path<Uuid>,
    body: Option<Json<RejectRequest>>,
) -> AppResult<Json<PremiumRequest>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    Ok(Json(decide(&state.db, &admin, request_id, Decision::Reject, body.notes).await?))
}
