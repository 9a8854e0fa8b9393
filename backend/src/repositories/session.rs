use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::session::Session;

pub async fn create_session(
    pool: &PgPool,
    user_id: &str,
    ttl_hours: i64,
) -> Result<Session, sqlx::Error> {
    let session_id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let expires_at = now + Duration::hours(ttl_hours);

    sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO sessions (id, user_id, created_at, last_seen_at, expires_at)
        VALUES ($1, $2, $3, $3, $4)
        RETURNING id, user_id, created_at, last_seen_at, expires_at
        "#,
    )
    .bind(&session_id)
    .bind(user_id)
    .bind(now)
    .bind(expires_at)
    .fetch_one(pool)
    .await
}

/// Loads a session only while it is unexpired. An expired or absent row is
/// indistinguishable from "no session" to the caller.
pub async fn find_valid_session(
    pool: &PgPool,
    session_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        SELECT id, user_id, created_at, last_seen_at, expires_at
        FROM sessions
        WHERE id = $1 AND expires_at > $2
        "#,
    )
    .bind(session_id)
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Sliding TTL refresh: bumps `last_seen_at` and pushes `expires_at` out by
/// the full window.
pub async fn touch_session(
    pool: &PgPool,
    session_id: &str,
    now: DateTime<Utc>,
    ttl_hours: i64,
) -> Result<bool, sqlx::Error> {
    let expires_at = now + Duration::hours(ttl_hours);
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET last_seen_at = $1, expires_at = $2
        WHERE id = $3
        "#,
    )
    .bind(now)
    .bind(expires_at)
    .bind(session_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_session_by_id(pool: &PgPool, session_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_sessions_for_user(pool: &PgPool, user_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_sessions_for_user(pool: &PgPool, user_id: &str) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn cleanup_expired_sessions(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
