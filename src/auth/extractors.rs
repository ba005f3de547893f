use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;
use uuid::Uuid;

use super::services::AuthUser;
use crate::{
    error::{AppError, AppResult},
    profiles::{repo as profiles_repo, repo_types::Profile},
    state::AppState,
};

/// Proof that the caller held the admin flag when the request started.
///
/// Only this extractor can build one, and it re-reads the caller's profile on
/// every request, so a demoted admin loses access on the next call. Admin
/// services take `&AdminCaller` instead of repeating the lookup.
#[derive(Debug, Clone, Copy)]
pub struct AdminCaller {
    user_id: Uuid,
}

impl AdminCaller {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    #[cfg(test)]
    pub(crate) fn for_tests(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

pub(crate) fn admin_capability(user_id: Uuid, profile: Option<&Profile>) -> AppResult<AdminCaller> {
    match profile {
        Some(p) if p.is_admin => Ok(AdminCaller { user_id }),
        _ => {
            warn!(%user_id, "admin access denied");
            Err(AppError::Forbidden)
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        let profile = profiles_repo::find_by_user(&state.db, user_id).await?;
        admin_capability(user_id, profile.as_ref())
    }
}
