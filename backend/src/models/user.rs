//! Models that represent user accounts and authentication payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Database representation of a user account.
///
/// Every user carries at least one authentication method: a password hash,
/// an external identity (`google_id`), or both. The two constructors are the
/// only places a user is built from scratch and each sets one of them.
pub struct User {
    /// Unique identifier for the user.
    pub id: String,
    /// Unique, format-validated email address used for login and linking.
    pub email: String,
    /// Argon2 hash of the user's password. Absent for OAuth-only accounts.
    pub password_hash: Option<String>,
    /// External identity reference assigned by the OAuth provider.
    pub google_id: Option<String>,
    /// Human-readable display name.
    pub display_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Relative URL of the uploaded avatar image.
    pub avatar_url: Option<String>,
    /// Bearer tokens issued before this instant are rejected. Advanced on
    /// logout; deliberately left untouched by password changes.
    pub tokens_valid_after: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Constructs a user registered with local credentials.
    pub fn new_local(email: String, password_hash: String, display_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash: Some(password_hash),
            google_id: None,
            display_name,
            phone: None,
            address: None,
            avatar_url: None,
            tokens_valid_after: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Constructs a user created on first external-identity login.
    pub fn new_external(email: String, google_id: String, display_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash: None,
            google_id: Some(google_id),
            display_name,
            phone: None,
            address: None,
            avatar_url: None,
            tokens_valid_after: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

#[derive(Debug, Deserialize, Validate)]
/// Payload for creating a new account with local credentials.
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1))]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
/// Credentials submitted by a user attempting to authenticate.
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
/// Payload submitted when a user requests to change their password.
pub struct ChangePasswordRequest {
    /// Existing password that will be verified before applying the change.
    pub old_password: String,
    /// Replacement password that will be stored if verification succeeds.
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
/// Public-facing representation of a user. Never carries credential secrets.
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub avatar_url: Option<String>,
    pub has_password: bool,
    pub google_linked: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let has_password = user.has_password();
        UserResponse {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            phone: user.phone,
            address: user.address,
            avatar_url: user.avatar_url,
            has_password,
            google_linked: user.google_id.is_some(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
/// Body returned by register/login on success.
pub struct AuthSuccessResponse {
    pub message: String,
    pub user: UserResponse,
}
