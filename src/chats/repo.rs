use anyhow::Context;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Chat, Message, MessageRole};

const MESSAGE_COLUMNS: &str = "id, chat_id, user_id, content, role, reply_to, created_at";

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Chat>> {
    sqlx::query_as::<_, Chat>(
        r#"
        SELECT id, user_id, title, last_message_at, created_at
          FROM chats
         WHERE user_id = $1
         ORDER BY last_message_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find(db: &PgPool, chat_id: Uuid) -> sqlx::Result<Option<Chat>> {
    sqlx::query_as::<_, Chat>(
        "SELECT id, user_id, title, last_message_at, created_at FROM chats WHERE id = $1",
    )
    .bind(chat_id)
    .fetch_optional(db)
    .await
}

/// The chat, only when `user_id` owns it.
pub async fn find_owned(db: &PgPool, chat_id: Uuid, user_id: Uuid) -> sqlx::Result<Option<Chat>> {
    Ok(find(db, chat_id).await?.filter(|c| c.user_id == user_id))
}

pub async fn create(db: &PgPool, user_id: Uuid, title: &str, now: OffsetDateTime) -> sqlx::Result<Chat> {
    sqlx::query_as::<_, Chat>(
        r#"
        INSERT INTO chats (user_id, title, last_message_at, created_at)
        VALUES ($1, $2, $3, $3)
        RETURNING id, user_id, title, last_message_at, created_at
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(now)
    .fetch_one(db)
    .await
}

/// Removes the chat and every message in it.
pub async fn delete_with_messages(db: &PgPool, chat_id: Uuid) -> anyhow::Result<()> {
    let mut tx = db.begin().await.context("begin tx")?;
    sqlx::query("DELETE FROM messages WHERE chat_id = $1")
        .bind(chat_id)
        .execute(&mut *tx)
        .await
        .context("delete messages")?;
    sqlx::query("DELETE FROM chats WHERE id = $1")
        .bind(chat_id)
        .execute(&mut *tx)
        .await
        .context("delete chat")?;
    tx.commit().await.context("commit tx")?;
    Ok(())
}

/// All messages of a chat, oldest first.
pub async fn list_messages(db: &PgPool, chat_id: Uuid) -> sqlx::Result<Vec<Message>> {
    sqlx::query_as::<_, Message>(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id = $1 ORDER BY created_at ASC, id ASC"
    ))
    .bind(chat_id)
    .fetch_all(db)
    .await
}

/// Appends a user message and bumps the chat's activity time in one transaction.
pub async fn append_user_message(
    db: &PgPool,
    chat: &Chat,
    content: &str,
    now: OffsetDateTime,
) -> anyhow::Result<Message> {
    let mut tx = db.begin().await.context("begin tx")?;
    let message = sqlx::query_as::<_, Message>(&format!(
        r#"
        INSERT INTO messages (chat_id, user_id, content, role, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {MESSAGE_COLUMNS}
        "#
    ))
    .bind(chat.id)
    .bind(chat.user_id)
    .bind(content)
    .bind(MessageRole::User)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .context("insert user message")?;

    touch_chat(&mut tx, chat.id, now).await?;
    tx.commit().await.context("commit tx")?;
    Ok(message)
}

/// Stores the assistant reply to `reply_to`.
///
/// Returns `None` without writing when the chat is gone or the trigger message
/// already has a reply.
pub async fn append_assistant_reply(
    db: &PgPool,
    chat_id: Uuid,
    reply_to: Uuid,
    content: &str,
    now: OffsetDateTime,
) -> anyhow::Result<Option<Message>> {
    let mut tx = db.begin().await.context("begin tx")?;
    let inserted = sqlx::query_as::<_, Message>(&format!(
        r#"
        INSERT INTO messages (chat_id, user_id, content, role, reply_to, created_at)
        SELECT c.id, c.user_id, $3, $4, $2, $5
          FROM chats c
         WHERE c.id = $1
        ON CONFLICT (reply_to) DO NOTHING
        RETURNING {MESSAGE_COLUMNS}
        "#
    ))
    .bind(chat_id)
    .bind(reply_to)
    .bind(content)
    .bind(MessageRole::Assistant)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await
    .context("insert assistant reply")?;

    if inserted.is_some() {
        touch_chat(&mut tx, chat_id, now).await?;
    }
    tx.commit().await.context("commit tx")?;
    Ok(inserted)
}

pub async fn has_reply(db: &PgPool, message_id: Uuid) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM messages WHERE reply_to = $1)")
        .bind(message_id)
        .fetch_one(db)
        .await
}

/// `(chat_id, message_id)` of user messages created in `(since, until]` that never got a reply.
pub async fn unanswered_between(
    db: &PgPool,
    since: OffsetDateTime,
    until: OffsetDateTime,
) -> sqlx::Result<Vec<(Uuid, Uuid)>> {
    sqlx::query_as::<_, (Uuid, Uuid)>(
        r#"
        SELECT m.chat_id, m.id
          FROM messages m
         WHERE m.role = 'user'
           AND m.created_at > $1
           AND m.created_at <= $2
           AND NOT EXISTS (SELECT 1 FROM messages r WHERE r.reply_to = m.id)
         ORDER BY m.created_at ASC
        "#,
    )
    .bind(since)
    .bind(until)
    .fetch_all(db)
    .await
}

async fn touch_chat(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    chat_id: Uuid,
    now: OffsetDateTime,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE chats SET last_message_at = $2 WHERE id = $1")
        .bind(chat_id)
        .bind(now)
        .execute(&mut **tx)
        .await
        .context("update chat last_message_at")?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::repo_types::User;
    use time::Duration;

    pub(crate) async fn seed_user(db: &PgPool, email: &str) -> Uuid {
        User::create(db, email, None, "not-a-real-hash").await.unwrap().id
    }

    pub(crate) async fn seed_chat(db: &PgPool, user_id: Uuid) -> Chat {
        create(db, user_id, "Chat", OffsetDateTime::now_utc() - Duration::hours(1))
            .await
            .unwrap()
    }

    async fn message_count(db: &PgPool, chat_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn delete_leaves_no_orphan_messages(db: PgPool) {
        let user = seed_user(&db, "tidy@buddy.chat").await;
        let chat = seed_chat(&db, user).await;
        let kept = seed_chat(&db, user).await;
        let now = OffsetDateTime::now_utc();
        let asked = append_user_message(&db, &chat, "hello", now).await.unwrap();
        append_assistant_reply(&db, chat.id, asked.id, "hey!", now).await.unwrap();
        append_user_message(&db, &kept, "other chat", now).await.unwrap();

        delete_with_messages(&db, chat.id).await.unwrap();

        assert!(find(&db, chat.id).await.unwrap().is_none());
        assert_eq!(message_count(&db, chat.id).await, 0);
        assert_eq!(message_count(&db, kept.id).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn user_message_bumps_last_activity(db: PgPool) {
        let user = seed_user(&db, "busy@buddy.chat").await;
        let chat = seed_chat(&db, user).await;
        let now = OffsetDateTime::now_utc();

        append_user_message(&db, &chat, "hi", now).await.unwrap();

        let stored = find(&db, chat.id).await.unwrap().unwrap();
        assert!(stored.last_message_at > chat.last_message_at);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn second_reply_to_same_message_is_dropped(db: PgPool) {
        let user = seed_user(&db, "twice@buddy.chat").await;
        let chat = seed_chat(&db, user).await;
        let now = OffsetDateTime::now_utc();
        let asked = append_user_message(&db, &chat, "hello?", now).await.unwrap();

        let first = append_assistant_reply(&db, chat.id, asked.id, "hey!", now).await.unwrap();
        let second = append_assistant_reply(&db, chat.id, asked.id, "hey again!", now).await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert!(has_reply(&db, asked.id).await.unwrap());
        let replies: Vec<_> = list_messages(&db, chat.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .collect();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].content, "hey!");
        assert_eq!(replies[0].reply_to, Some(asked.id));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reply_to_deleted_chat_writes_nothing(db: PgPool) {
        let user = seed_user(&db, "gone@buddy.chat").await;
        let chat = seed_chat(&db, user).await;
        let now = OffsetDateTime::now_utc();
        let asked = append_user_message(&db, &chat, "bye", now).await.unwrap();
        delete_with_messages(&db, chat.id).await.unwrap();

        let stored = append_assistant_reply(&db, chat.id, asked.id, "wait!", now).await.unwrap();

        assert!(stored.is_none());
        assert_eq!(message_count(&db, chat.id).await, 0);
    }
}
