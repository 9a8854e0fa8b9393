//! Auth flow controller: register, login, external-identity login, logout,
//! profile, and password change.
//!
//! Every successful authentication funnels through [`establish_identity`],
//! which creates a server-side session and issues a bearer token, and hands
//! both back as HttpOnly cookies. Logout is the inverse: it destroys the
//! session and advances the token revocation watermark before any cookie is
//! cleared.

use std::time::Duration as StdDuration;

use axum::{
    extract::{Extension, Multipart, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        auth::AuthUser,
        session::Session,
        user::{
            AuthSuccessResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, User,
            UserResponse,
        },
    },
    repositories::{
        session as session_repo,
        user::{self as user_repo, ProfileChanges},
    },
    services::{
        oauth::{generate_state_nonce, GoogleOAuthClient},
        verifier::{CredentialVerifier, GoogleVerifier, LocalCredentials, LocalVerifier},
    },
    utils::{
        cookies::{
            build_auth_cookie, build_clear_cookie, encode_session_cookie, extract_cookie_value,
            CookieOptions, AUTH_COOKIE_PATH, OAUTH_STATE_COOKIE_NAME, SESSION_COOKIE_NAME,
            TOKEN_COOKIE_NAME,
        },
        jwt::create_token,
        password::{hash_password, verify_password},
    },
};

pub async fn register(
    State((pool, config)): State<(PgPool, Config)>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    payload.validate()?;

    if user_repo::find_user_by_email(&pool, &payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::DuplicateEmail);
    }

    let password_hash = hash_password(&payload.password).map_err(AppError::Internal)?;
    let user = User::new_local(payload.email, password_hash, payload.display_name);

    user_repo::insert_user(&pool, &user)
        .await
        .map_err(map_unique_violation)?;

    // Same "establish identity" step as login: the new user is signed in
    // immediately.
    let (session, token) = establish_identity(&pool, &config, &user).await?;

    tracing::info!(user_id = %user.id, "Registered new user");
    Ok((
        StatusCode::CREATED,
        identity_cookies(&config, &session, &token),
        Json(AuthSuccessResponse {
            message: "Registered successfully".to_string(),
            user: user.into(),
        }),
    )
        .into_response())
}

pub async fn login(
    State((pool, config)): State<(PgPool, Config)>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let user = LocalVerifier
        .verify(
            &pool,
            LocalCredentials {
                email: payload.email,
                password: payload.password,
            },
        )
        .await?;

    let (session, token) = establish_identity(&pool, &config, &user).await?;

    Ok((
        StatusCode::OK,
        identity_cookies(&config, &session, &token),
        Json(AuthSuccessResponse {
            message: "Login successful".to_string(),
            user: user.into(),
        }),
    )
        .into_response())
}

/// Starts the provider handshake: issues a state nonce (kept in a short-lived
/// HttpOnly cookie) and redirects the browser to the consent screen.
pub async fn google_login(
    State((_pool, config)): State<(PgPool, Config)>,
) -> Result<Response, AppError> {
    let client = GoogleOAuthClient::from_config(&config);
    let state = generate_state_nonce();
    let url = client.authorize_url(&state)?;

    let state_cookie = build_auth_cookie(
        OAUTH_STATE_COOKIE_NAME,
        &state,
        StdDuration::from_secs(600),
        AUTH_COOKIE_PATH,
        cookie_options(&config),
    );

    Ok((
        AppendHeaders([(header::SET_COOKIE, state_cookie)]),
        Redirect::temporary(&url),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Completes the provider handshake and redirects the browser to the fixed
/// post-login destination. Provider rejections bounce back to the login page
/// instead of rendering an API error in the browser.
pub async fn google_callback(
    State((pool, config)): State<(PgPool, Config)>,
    headers: HeaderMap,
    Query(query): Query<GoogleCallbackQuery>,
) -> Result<Response, AppError> {
    match complete_google_login(&pool, &config, &headers, query).await {
        Ok((user, session, token)) => {
            tracing::info!(user_id = %user.id, "External-identity login completed");
            Ok((
                identity_and_clear_state_cookies(&config, &session, &token),
                Redirect::to(&config.post_login_redirect),
            )
                .into_response())
        }
        Err(AppError::ExternalAuthFailed(detail)) => {
            tracing::warn!("External-identity login failed: {}", detail);
            Ok(Redirect::to(&config.login_redirect).into_response())
        }
        Err(e) => Err(e),
    }
}

async fn complete_google_login(
    pool: &PgPool,
    config: &Config,
    headers: &HeaderMap,
    query: GoogleCallbackQuery,
) -> Result<(User, Session, String), AppError> {
    if let Some(error) = query.error {
        return Err(AppError::ExternalAuthFailed(format!(
            "provider returned error: {}",
            error
        )));
    }

    let expected_state = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| extract_cookie_value(raw, OAUTH_STATE_COOKIE_NAME))
        .ok_or_else(|| AppError::ExternalAuthFailed("missing state cookie".to_string()))?;
    let state = query
        .state
        .ok_or_else(|| AppError::ExternalAuthFailed("missing state parameter".to_string()))?;
    if state != expected_state {
        return Err(AppError::ExternalAuthFailed("state mismatch".to_string()));
    }

    let code = query
        .code
        .ok_or_else(|| AppError::ExternalAuthFailed("missing authorization code".to_string()))?;

    let client = GoogleOAuthClient::from_config(config);
    let profile = client.fetch_profile(&code).await?;

    let user = GoogleVerifier.verify(pool, profile).await?;
    let (session, token) = establish_identity(pool, config, &user).await?;
    Ok((user, session, token))
}

pub async fn check(Extension(_identity): Extension<AuthUser>) -> Json<Value> {
    Json(json!({ "message": "Authenticated" }))
}

pub async fn get_user(Extension(identity): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse::from(identity.user))
}

pub async fn update_profile(
    State((pool, config)): State<(PgPool, Config)>,
    Extension(identity): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<UserResponse>, AppError> {
    let mut changes = ProfileChanges::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("display_name") => {
                changes.display_name = Some(read_text_field(field).await?);
            }
            Some("phone") => {
                changes.phone = Some(read_text_field(field).await?);
            }
            Some("address") => {
                changes.address = Some(read_text_field(field).await?);
            }
            Some("avatar") => {
                changes.avatar_url = Some(save_avatar(&config, field).await?);
            }
            _ => {}
        }
    }

    let updated = user_repo::update_profile(&pool, &identity.user.id, &changes, Utc::now())
        .await?
        .ok_or(AppError::NotAuthenticated)?;

    Ok(Json(updated.into()))
}

pub async fn change_password(
    State((pool, _config)): State<(PgPool, Config)>,
    Extension(identity): Extension<AuthUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    if payload.new_password.len() < 8 {
        return Err(AppError::BadRequest(
            "New password must be at least 8 characters".to_string(),
        ));
    }
    if payload.new_password == payload.old_password {
        return Err(AppError::BadRequest(
            "New password must differ from old password".to_string(),
        ));
    }

    let Some(hash) = identity.user.password_hash.as_deref() else {
        return Err(AppError::BadRequest(
            "Account has no password set".to_string(),
        ));
    };
    let matches = verify_password(&payload.old_password, hash).map_err(AppError::Internal)?;
    if !matches {
        return Err(AppError::WrongPassword);
    }

    let new_hash = hash_password(&payload.new_password).map_err(AppError::Internal)?;
    user_repo::update_password_hash(&pool, &identity.user.id, &new_hash, Utc::now()).await?;

    // Existing sessions and tokens stay valid across a password change.
    tracing::info!(user_id = %identity.user.id, "Password updated");
    Ok(Json(json!({ "message": "Password updated successfully" })))
}

pub async fn logout(
    State((pool, config)): State<(PgPool, Config)>,
    Extension(identity): Extension<AuthUser>,
) -> Result<Response, AppError> {
    // Destroy the server-side session first; a failed destroy is an error,
    // not a silent cookie wipe.
    if let Some(session_id) = identity.session_id() {
        let destroyed = session_repo::delete_session_by_id(&pool, session_id).await?;
        if !destroyed {
            tracing::debug!(session_id = %session_id, "Session was already gone at logout");
        }
    }

    // Revoke outstanding bearer tokens. Other devices stay signed in through
    // their own sessions, which the resolver checks before tokens.
    user_repo::set_tokens_valid_after(&pool, &identity.user.id, Utc::now()).await?;

    Ok((
        clear_identity_cookies(&config),
        Json(json!({ "message": "Logged out successfully" })),
    )
        .into_response())
}

/// Creates the session and issues the bearer token for a verified user.
pub async fn establish_identity(
    pool: &PgPool,
    config: &Config,
    user: &User,
) -> Result<(Session, String), AppError> {
    let session = session_repo::create_session(pool, &user.id, config.session_ttl_hours).await?;
    let token = create_token(
        user.id.clone(),
        user.email.clone(),
        &config.jwt_secret,
        config.token_expiration_hours,
    )
    .map_err(AppError::Internal)?;
    Ok((session, token))
}

fn cookie_options(config: &Config) -> CookieOptions {
    CookieOptions {
        secure: config.cookie_secure,
        same_site: config.cookie_same_site,
    }
}

fn identity_cookies(
    config: &Config,
    session: &Session,
    token: &str,
) -> AppendHeaders<[(header::HeaderName, String); 2]> {
    let options = cookie_options(config);
    let session_cookie = build_auth_cookie(
        SESSION_COOKIE_NAME,
        &encode_session_cookie(&session.id, &config.session_secret),
        StdDuration::from_secs(config.session_ttl_hours.unsigned_abs() * 3600),
        AUTH_COOKIE_PATH,
        options,
    );
    let token_cookie = build_auth_cookie(
        TOKEN_COOKIE_NAME,
        token,
        StdDuration::from_secs(config.token_expiration_hours * 3600),
        AUTH_COOKIE_PATH,
        options,
    );
    AppendHeaders([
        (header::SET_COOKIE, session_cookie),
        (header::SET_COOKIE, token_cookie),
    ])
}

fn identity_and_clear_state_cookies(
    config: &Config,
    session: &Session,
    token: &str,
) -> AppendHeaders<[(header::HeaderName, String); 3]> {
    let options = cookie_options(config);
    let AppendHeaders([session_cookie, token_cookie]) = identity_cookies(config, session, token);
    let state_clear = build_clear_cookie(OAUTH_STATE_COOKIE_NAME, AUTH_COOKIE_PATH, options);
    AppendHeaders([
        session_cookie,
        token_cookie,
        (header::SET_COOKIE, state_clear),
    ])
}

fn clear_identity_cookies(config: &Config) -> AppendHeaders<[(header::HeaderName, String); 2]> {
    let options = cookie_options(config);
    AppendHeaders([
        (
            header::SET_COOKIE,
            build_clear_cookie(SESSION_COOKIE_NAME, AUTH_COOKIE_PATH, options),
        ),
        (
            header::SET_COOKIE,
            build_clear_cookie(TOKEN_COOKIE_NAME, AUTH_COOKIE_PATH, options),
        ),
    ])
}

fn map_unique_violation(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation) {
            return AppError::DuplicateEmail;
        }
    }
    err.into()
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid field value: {}", e)))
}

async fn save_avatar(
    config: &Config,
    field: axum::extract::multipart::Field<'_>,
) -> Result<String, AppError> {
    let content_type = field.content_type().unwrap_or_default().to_string();
    let extension = match content_type.as_str() {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        other => {
            return Err(AppError::BadRequest(format!(
                "Unsupported avatar content type: {}",
                other
            )))
        }
    };

    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid avatar upload: {}", e)))?;

    let filename = format!("{}.{}", Uuid::new_v4(), extension);
    let dir = std::path::Path::new(&config.upload_dir);
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create upload dir: {}", e)))?;
    tokio::fs::write(dir.join(&filename), &bytes)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to store avatar: {}", e)))?;

    Ok(format!("/uploads/{}", filename))
}
