use crate::auth::repo_types::User;
use crate::error::{is_unique_violation, AppError, AppResult};
use sqlx::PgPool;
use uuid::Uuid;

pub const EMAIL_TAKEN: &str = "Email already registered";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password. A taken email is a rule
    /// violation, including when a concurrent registration wins the insert.
    pub async fn create(
        db: &PgPool,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Rule(EMAIL_TAKEN.into())
            } else {
                AppError::Database(e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "./migrations")]
    async fn second_insert_of_same_email_is_a_rule_violation(db: PgPool) {
        User::create(&db, "pal@buddy.chat", Some("Pal"), "hash").await.unwrap();

        let err = User::create(&db, "pal@buddy.chat", None, "other-hash")
            .await
            .unwrap_err();
        match err {
            AppError::Rule(msg) => assert_eq!(msg, EMAIL_TAKEN),
            other => panic!("unexpected error: {other:?}"),
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
