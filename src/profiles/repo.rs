use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::Profile;

const PROFILE_COLUMNS: &str =
    "id, user_id, display_name, avatar, is_premium, premium_expires_at, is_admin, created_at";

pub async fn find_by_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<Option<Profile>> {
    sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Insert unless a profile already exists, then return whichever row is stored.
pub async fn create_if_absent(
    db: &PgPool,
    user_id: Uuid,
    display_name: &str,
    is_admin: bool,
) -> sqlx::Result<Profile> {
    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, display_name, is_premium, is_admin)
        VALUES ($1, $2, FALSE, $3)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(display_name)
    .bind(is_admin)
    .execute(db)
    .await?;

    sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_one(db)
    .await
}

/// Patch the self-editable fields; `None` leaves a field untouched.
pub async fn update_self(
    db: &PgPool,
    user_id: Uuid,
    display_name: Option<&str>,
    avatar: Option<&str>,
) -> sqlx::Result<Option<Profile>> {
    sqlx::query_as::<_, Profile>(&format!(
        r#"
        UPDATE profiles
           SET display_name = COALESCE($2, display_name),
               avatar = COALESCE($3, avatar)
         WHERE user_id = $1
        RETURNING {PROFILE_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(display_name)
    .bind(avatar)
    .fetch_optional(db)
    .await
}

pub async fn grant_premium_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    expires_at: Option<OffsetDateTime>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(
        "UPDATE profiles SET is_premium = TRUE, premium_expires_at = $2 WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(expires_at)
    .execute(&mut **tx)
    .await?;
    Ok(res.rows_affected())
}

/// Clears the flag and the expiry. Returns false when the user has no profile.
pub async fn revoke_premium(db: &PgPool, user_id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query(
        "UPDATE profiles SET is_premium = FALSE, premium_expires_at = NULL WHERE user_id = $1",
    )
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected() > 0)
}

/// Drops a lapsed premium flag, keeping the recorded expiry.
pub async fn expire_premium(db: &PgPool, user_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("UPDATE profiles SET is_premium = FALSE WHERE user_id = $1")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn set_admin(db: &PgPool, user_id: Uuid, is_admin: bool) -> sqlx::Result<bool> {
    let res = sqlx::query("UPDATE profiles SET is_admin = $2 WHERE user_id = $1")
        .bind(user_id)
        .bind(is_admin)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
