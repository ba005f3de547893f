use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::{
    dto::{PremiumStatus, UpdateProfileRequest},
    repo,
    repo_types::Profile,
    services::derive_display_name,
};
use crate::{
    auth::{repo_types::User, services::AuthUser},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(get_profile).post(create_profile).patch(update_profile),
        )
        .route("/profile/premium-status", post(check_premium_status))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
) -> AppResult<Json<Option<Profile>>> {
    let Some(AuthUser(user_id)) = caller else {
        return Ok(Json(None));
    };
    Ok(Json(repo::find_by_user(&state.db, user_id).await?))
}

/// Idempotent: returns the existing profile when there is one.
#[instrument(skip(state))]
pub async fn create_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Profile>> {
    if let Some(existing) = repo::find_by_user(&state.db, user_id).await? {
        return Ok(Json(existing));
    }

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let display_name = derive_display_name(user.name.as_deref(), &user.email);
    let is_admin = state.config.is_bootstrap_admin(&user.email);

    let profile = repo::create_if_absent(&state.db, user_id, &display_name, is_admin).await?;
    info!(%user_id, is_admin = profile.is_admin, "profile created");
    Ok(Json(profile))
}

#[instrument(skip(state, body))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<Profile>> {
    let display_name = body.display_name.as_deref().map(str::trim);
    if display_name == Some("") {
        warn!(%user_id, "empty display name rejected");
        return Err(AppError::BadRequest("Display name cannot be empty".into()));
    }

    let profile = repo::update_self(&state.db, user_id, display_name, body.avatar.as_deref())
        .await?
        .ok_or(AppError::NotFound("Profile"))?;
    Ok(Json(profile))
}

/// Reports the caller's premium state, clearing a premium flag whose expiry has passed.
#[instrument(skip(state))]
pub async fn check_premium_status(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
) -> AppResult<Json<PremiumStatus>> {
    let Some(AuthUser(user_id)) = caller else {
        return Ok(Json(PremiumStatus::inactive()));
    };
    let Some(profile) = repo::find_by_user(&state.db, user_id).await? else {
        return Ok(Json(PremiumStatus::inactive()));
    };

    let now = OffsetDateTime::now_utc();
    if profile.is_premium && profile.premium_expired(now) {
        repo::expire_premium(&state.db, user_id).await?;
        info!(%user_id, "premium expired");
        return Ok(Json(PremiumStatus {
            is_premium: false,
            expired: true,
            expires_at: None,
        }));
    }

    Ok(Json(PremiumStatus {
        is_premium: profile.is_premium,
        expired: false,
        expires_at: profile.premium_expires_at,
    }))
}
