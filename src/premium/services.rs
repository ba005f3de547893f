//! Premium request review: `pending -> approved | rejected`, nothing else.

use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    repo,
    repo_types::{PremiumRequest, RequestStatus},
};
use crate::{
    auth::extractors::AdminCaller,
    error::{AppError, AppResult},
    profiles::repo as profiles_repo,
};

pub const ALREADY_PROCESSED: &str = "Request has already been processed";
pub const DUPLICATE_PENDING: &str = "You already have a pending premium request";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// `None` expiry grants permanent premium.
    Approve { expires_at: Option<OffsetDateTime> },
    Reject,
}

/// Fields written on a request when it is reviewed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    pub status: RequestStatus,
    pub reviewed_at: OffsetDateTime,
    pub reviewed_by: Uuid,
    pub notes: Option<String>,
}

/// Validates a review against the request's current state without touching storage.
pub fn review(
    request: &PremiumRequest,
    decision: Decision,
    reviewer: Uuid,
    notes: Option<String>,
    now: OffsetDateTime,
) -> AppResult<ReviewRecord> {
    let next = match decision {
        Decision::Approve { .. } => RequestStatus::Approved,
        Decision::Reject => RequestStatus::Rejected,
    };
    if !request.status.can_become(next) {
        return Err(AppError::Rule(ALREADY_PROCESSED.into()));
    }
    if let Decision::Approve { expires_at: Some(at) } = decision {
        if at <= now {
            return Err(AppError::BadRequest("Premium expiry must be in the future".into()));
        }
    }

    Ok(ReviewRecord {
        status: next,
        reviewed_at: now,
        reviewed_by: reviewer,
        notes: notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
    })
}

/// Applies a decision. Approval upgrades the owner's profile in the same transaction.
pub async fn decide(
    db: &PgPool,
    admin: &AdminCaller,
    request_id: Uuid,
    decision: Decision,
    notes: Option<String>,
) -> AppResult<PremiumRequest> {
    let request = repo::find(db, request_id)
        .await?
        .ok_or(AppError::NotFound("Request"))?;
    let record = review(&request, decision, admin.user_id(), notes, OffsetDateTime::now_utc())?;

    let mut tx = db.begin().await?;
    // Guarded on status, so a concurrent review that won the race leaves nothing to update.
    let Some(updated) = repo::record_review_tx(&mut tx, request_id, &record).await? else {
        warn!(%request_id, "request reviewed concurrently");
        return Err(AppError::Rule(ALREADY_PROCESSED.into()));
    };
    if let Decision::Approve { expires_at } = decision {
        let upgraded = profiles_repo::grant_premium_tx(&mut tx, updated.user_id, expires_at).await?;
        if upgraded == 0 {
            warn!(user_id = %updated.user_id, "approved request owner has no profile");
        }
    }
    tx.commit().await?;

    info!(
        %request_id,
        admin_id = %admin.user_id(),
        status = ?updated.status,
        "premium request reviewed"
    );
    Ok(updated)
}
