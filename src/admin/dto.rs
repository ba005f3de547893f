use serde::{Deserialize, Serialize};

use super::repo_types::{CountsRow, UserOverviewRow};
use crate::{premium::dto::UserSummary, profiles::repo_types::Profile};

#[derive(Debug, Deserialize)]
pub struct SetAdminRequest {
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct UserOverview {
    #[serde(flatten)]
    pub profile: Profile,
    pub user: UserSummary,
    pub message_count: i64,
}

impl From<UserOverviewRow> for UserOverview {
    fn from(row: UserOverviewRow) -> Self {
        Self {
            profile: row.profile,
            user: UserSummary {
                name: row.user_name,
                email: row.user_email,
            },
            message_count: row.message_count,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Analytics {
    pub total_users: i64,
    pub premium_users: i64,
    pub free_users: i64,
    pub total_chats: i64,
    pub total_messages: i64,
    pub pending_requests: i64,
}

impl From<CountsRow> for Analytics {
    fn from(c: CountsRow) -> Self {
        Self {
            total_users: c.total_users,
            premium_users: c.premium_users,
            free_users: c.total_users - c.premium_users,
            total_chats: c.total_chats,
            total_messages: c.total_messages,
            pending_requests: c.pending_requests,
        }
    }
}
