use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    repo_types::{PaymentMethod, PremiumRequest, PremiumRequestRow},
    services::{ReviewRecord, DUPLICATE_PENDING},
};
use crate::error::{is_unique_violation, AppError, AppResult};

const REQUEST_COLUMNS: &str = "id, user_id, email, payment_method, payment_reference, status, \
                               requested_at, reviewed_at, reviewed_by, notes";

/// Inserts a pending request. The partial unique index on pending rows turns a
/// second outstanding request into a rule violation, even under concurrent submits.
pub async fn insert_pending(
    db: &PgPool,
    user_id: Uuid,
    email: &str,
    payment_method: PaymentMethod,
    payment_reference: Option<&str>,
) -> AppResult<PremiumRequest> {
    sqlx::query_as::<_, PremiumRequest>(&format!(
        r#"
        INSERT INTO premium_requests (user_id, email, payment_method, payment_reference, status)
        VALUES ($1, $2, $3, $4, 'pending')
        RETURNING {REQUEST_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(email)
    .bind(payment_method)
    .bind(payment_reference)
    .fetch_one(db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Rule(DUPLICATE_PENDING.into())
        } else {
            AppError::Database(e)
        }
    })
}

pub async fn find(db: &PgPool, id: Uuid) -> sqlx::Result<Option<PremiumRequest>> {
    sqlx::query_as::<_, PremiumRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM premium_requests WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// The user's most recent request, whatever its status.
pub async fn latest_for_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<Option<PremiumRequest>> {
    sqlx::query_as::<_, PremiumRequest>(&format!(
        r#"
        SELECT {REQUEST_COLUMNS}
          FROM premium_requests
         WHERE user_id = $1
         ORDER BY requested_at DESC
         LIMIT 1
        "#
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn list_with_requesters(db: &PgPool) -> sqlx::Result<Vec<PremiumRequestRow>> {
    sqlx::query_as::<_, PremiumRequestRow>(
        r#"
        SELECT r.id, r.user_id, r.email, r.payment_method, r.payment_reference, r.status,
               r.requested_at, r.reviewed_at, r.reviewed_by, r.notes,
               COALESCE(u.name, p.display_name, 'Unknown') AS requester_name,
               COALESCE(u.email, '') AS requester_email
          FROM premium_requests r
          LEFT JOIN users u ON u.id = r.user_id
          LEFT JOIN profiles p ON p.user_id = r.user_id
         ORDER BY r.requested_at DESC
        "#,
    )
    .fetch_all(db)
    .await
}

/// Writes the review only if the request is still pending.
pub async fn record_review_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    record: &ReviewRecord,
) -> sqlx::Result<Option<PremiumRequest>> {
    sqlx::query_as::<_, PremiumRequest>(&format!(
        r#"
        UPDATE premium_requests
           SET status = $2, reviewed_at = $3, reviewed_by = $4, notes = $5
         WHERE id = $1 AND status = 'pending'
        RETURNING {REQUEST_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(record.status)
    .bind(record.reviewed_at)
    .bind(record.reviewed_by)
    .bind(record.notes.as_deref())
    .fetch_optional(&mut **tx)
    .await
}
