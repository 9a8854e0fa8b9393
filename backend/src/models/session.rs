//! Models for server-side persisted sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Database representation of a login session.
///
/// The id is an opaque UUIDv4; validity is decided purely by `expires_at`,
/// refreshed lazily on use (sliding TTL).
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
