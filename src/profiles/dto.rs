use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PremiumStatus {
    pub is_premium: bool,
    pub expired: bool,
    #[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<OffsetDateTime>,
}

impl PremiumStatus {
    pub fn inactive() -> Self {
        Self {
            is_premium: false,
            expired: false,
            expires_at: None,
        }
    }
}
