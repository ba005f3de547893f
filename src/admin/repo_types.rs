use sqlx::FromRow;

use crate::profiles::repo_types::Profile;

#[derive(Debug, Clone, FromRow)]
pub struct UserOverviewRow {
    #[sqlx(flatten)]
    pub profile: Profile,
    pub user_name: String,
    pub user_email: String,
    pub message_count: i64,
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct CountsRow {
    pub total_users: i64,
    pub premium_users: i64,
    pub total_chats: i64,
    pub total_messages: i64,
    pub pending_requests: i64,
}
