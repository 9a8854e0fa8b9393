use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::user::User;

const USER_COLUMNS: &str = "id, email, password_hash, google_id, display_name, phone, address, \
     avatar_url, tokens_valid_after, created_at, updated_at";

/// Optional profile fields applied by `update_profile`. `None` leaves the
/// stored value untouched.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub avatar_url: Option<String>,
}

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE email = $1",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn find_user_by_id(pool: &PgPool, user_id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_user(pool: &PgPool, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, google_id, display_name, phone, address, \
         avatar_url, tokens_valid_after, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.google_id)
    .bind(&user.display_name)
    .bind(&user.phone)
    .bind(&user.address)
    .bind(&user.avatar_url)
    .bind(user.tokens_valid_after)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await
    .map(|_| ())
}

pub async fn update_password_hash(
    pool: &PgPool,
    user_id: &str,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
            .bind(password_hash)
            .bind(now)
            .bind(user_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn link_google_id(
    pool: &PgPool,
    user_id: &str,
    google_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET google_id = $1, updated_at = $2 WHERE id = $3 AND google_id IS NULL",
    )
    .bind(google_id)
    .bind(now)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_profile(
    pool: &PgPool,
    user_id: &str,
    changes: &ProfileChanges,
    now: DateTime<Utc>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET \
             display_name = COALESCE($1, display_name), \
             phone = COALESCE($2, phone), \
             address = COALESCE($3, address), \
             avatar_url = COALESCE($4, avatar_url), \
             updated_at = $5 \
         WHERE id = $6 \
         RETURNING {}",
        USER_COLUMNS
    ))
    .bind(&changes.display_name)
    .bind(&changes.phone)
    .bind(&changes.address)
    .bind(&changes.avatar_url)
    .bind(now)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Advances the token revocation watermark: bearer tokens issued before `now`
/// stop verifying for this user.
pub async fn set_tokens_valid_after(
    pool: &PgPool,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE users SET tokens_valid_after = $1, updated_at = $1 WHERE id = $2")
            .bind(now)
            .bind(user_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_users_with_email(pool: &PgPool, email: &str) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
