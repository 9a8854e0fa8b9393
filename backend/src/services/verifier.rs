//! Credential-verification strategies.
//!
//! Each login channel is a [`CredentialVerifier`] turning raw credentials
//! into a stored user or an auth error. The flow controller picks a strategy
//! explicitly per endpoint; there is no registry.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::user::User,
    repositories::user as user_repo,
    services::oauth::GoogleProfile,
    utils::password::verify_password,
};

#[async_trait]
pub trait CredentialVerifier {
    type Credentials: Send;

    async fn verify(
        &self,
        pool: &PgPool,
        credentials: Self::Credentials,
    ) -> Result<User, AppError>;
}

#[derive(Debug)]
pub struct LocalCredentials {
    pub email: String,
    pub password: String,
}

/// Email + password against the credential store.
pub struct LocalVerifier;

#[async_trait]
impl CredentialVerifier for LocalVerifier {
    type Credentials = LocalCredentials;

    async fn verify(
        &self,
        pool: &PgPool,
        credentials: LocalCredentials,
    ) -> Result<User, AppError> {
        let user = user_repo::find_user_by_email(pool, &credentials.email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        // OAuth-only accounts carry no hash and can never pass this channel.
        let Some(hash) = user.password_hash.as_deref() else {
            return Err(AppError::InvalidCredentials);
        };

        let matches = verify_password(&credentials.password, hash)?;
        if !matches {
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }
}

/// Verified external profile from the OAuth provider: find-or-create a local
/// user by email and link the external id when it is not linked yet.
pub struct GoogleVerifier;

#[async_trait]
impl CredentialVerifier for GoogleVerifier {
    type Credentials = GoogleProfile;

    async fn verify(&self, pool: &PgPool, profile: GoogleProfile) -> Result<User, AppError> {
        if let Some(mut user) = user_repo::find_user_by_email(pool, &profile.email).await? {
            if user.google_id.is_none() {
                user_repo::link_google_id(pool, &user.id, &profile.id, Utc::now()).await?;
                user.google_id = Some(profile.id);
            }
            return Ok(user);
        }

        let display_name = profile.name.unwrap_or_else(|| profile.email.clone());
        let user = User::new_external(profile.email, profile.id, display_name);
        user_repo::insert_user(pool, &user).await?;
        tracing::info!(user_id = %user.id, "Created account from external identity");
        Ok(user)
    }
}
