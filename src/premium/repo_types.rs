use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Stripe,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    /// Only `pending` moves, and only to a terminal state.
    pub fn can_become(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Rejected)
        )
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PremiumRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String, // snapshot at submission
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    pub status: RequestStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub requested_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub reviewed_at: Option<OffsetDateTime>,
    pub reviewed_by: Option<Uuid>,
    pub notes: Option<String>,
}

/// Request row joined with the requester's current name and email.
#[derive(Debug, Clone, FromRow)]
pub struct PremiumRequestRow {
    #[sqlx(flatten)]
    pub request: PremiumRequest,
    pub requester_name: String,
    pub requester_email: String,
}
