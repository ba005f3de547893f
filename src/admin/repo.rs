use sqlx::PgPool;

use super::repo_types::{CountsRow, UserOverviewRow};

/// Every profile with its account details and how many messages it has stored.
pub async fn list_users(db: &PgPool) -> sqlx::Result<Vec<UserOverviewRow>> {
    sqlx::query_as::<_, UserOverviewRow>(
        r#"
        SELECT p.id, p.user_id, p.display_name, p.avatar, p.is_premium, p.premium_expires_at,
               p.is_admin, p.created_at,
               COALESCE(u.name, p.display_name, 'Unknown') AS user_name,
               COALESCE(u.email, '') AS user_email,
               (SELECT COUNT(*) FROM messages m WHERE m.user_id = p.user_id) AS message_count
          FROM profiles p
          LEFT JOIN users u ON u.id = p.user_id
         ORDER BY p.created_at ASC
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn counts(db: &PgPool) -> sqlx::Result<CountsRow> {
    sqlx::query_as::<_, CountsRow>(
        r#"
        SELECT (SELECT COUNT(*) FROM profiles) AS total_users,
               (SELECT COUNT(*) FROM profiles WHERE is_premium) AS premium_users,
               (SELECT COUNT(*) FROM chats) AS total_chats,
               (SELECT COUNT(*) FROM messages) AS total_messages,
               (SELECT COUNT(*) FROM premium_requests WHERE status = 'pending') AS pending_requests
        "#,
    )
    .fetch_one(db)
    .await
}
