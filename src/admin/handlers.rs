use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{Analytics, SetAdminRequest, UserOverview},
    repo,
    services::check_admin_change,
};
use crate::{
    auth::extractors::AdminCaller,
    error::{AppError, AppResult},
    profiles::repo as profiles_repo,
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id/admin", put(set_admin))
        .route("/admin/users/:id/premium", delete(revoke_premium))
        .route("/admin/analytics", get(get_analytics))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> AppResult<Json<Vec<UserOverview>>> {
    let rows = repo::list_users(&state.db).await?;
    Ok(Json(rows.into_iter().map(UserOverview::from).collect()))
}

#[instrument(skip(state, body))]
pub async fn set_admin(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetAdminRequest>,
) -> AppResult<StatusCode> {
    check_admin_change(&admin, user_id, body.is_admin)?;
    if !profiles_repo::set_admin(&state.db, user_id, body.is_admin).await? {
        return Err(AppError::NotFound("User profile"));
    }
    info!(admin_id = %admin.user_id(), %user_id, is_admin = body.is_admin, "admin flag changed");
    Ok(StatusCode::NO_CONTENT)
}

/// Clears premium directly; premium requests are left as they are.
#[instrument(skip(state))]
pub async fn revoke_premium(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if !profiles_repo::revoke_premium(&state.db, user_id).await? {
        return Err(AppError::NotFound("User profile"));
    }
    info!(admin_id = %admin.user_id(), %user_id, "premium revoked");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_analytics(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> AppResult<Json<Analytics>> {
    Ok(Json(repo::counts(&state.db).await?.into()))
}
