use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{PaymentMethod, PremiumRequest, PremiumRequestRow};

#[derive(Debug, Deserialize)]
pub struct SubmitPremiumRequest {
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_reference: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequest {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserSummary {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct PremiumRequestView {
    #[serde(flatten)]
    pub request: PremiumRequest,
    pub user: UserSummary,
}

impl From<PremiumRequestRow> for PremiumRequestView {
    fn from(row: PremiumRequestRow) -> Self {
        Self {
            request: row.request,
            user: UserSummary {
                name: row.requester_name,
                email: row.requester_email,
            },
        }
    }
}
