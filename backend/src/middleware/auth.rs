//! Per-request identity resolution.
//!
//! The resolver tries the two verification channels in a fixed order:
//! session first, bearer token second. A destroyed session therefore cannot
//! be silently resurrected by a token issued at the same login, and the
//! token path additionally honors the user's revocation watermark.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    models::auth::{AuthChannel, AuthUser},
    repositories::{session as session_repo, user as user_repo},
    utils::{
        cookies::{decode_session_cookie, extract_cookie_value, SESSION_COOKIE_NAME, TOKEN_COOKIE_NAME},
        jwt::verify_token,
    },
};

pub async fn auth(
    State((pool, config)): State<(PgPool, Config)>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (auth_header, cookie_header) = extract_auth_headers(request.headers());
    let identity = resolve_identity(
        &pool,
        &config,
        auth_header.as_deref(),
        cookie_header.as_deref(),
    )
    .await?;
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Resolves the authenticated identity for one request, or rejects it.
///
/// Either channel ends with a re-fetch of the full user document so every
/// downstream handler sees the same identity shape.
pub async fn resolve_identity(
    pool: &PgPool,
    config: &Config,
    auth_header: Option<&str>,
    cookie_header: Option<&str>,
) -> Result<AuthUser, AppError> {
    // 1. Session check: a valid session wins outright.
    if let Some(identity) = resolve_session(pool, config, cookie_header).await? {
        return Ok(identity);
    }

    // 2. Token check: bearer header, falling back to the token cookie.
    let token = auth_header
        .and_then(parse_bearer_token)
        .map(str::to_string)
        .or_else(|| cookie_header.and_then(|raw| extract_cookie_value(raw, TOKEN_COOKIE_NAME)));

    let Some(token) = token else {
        // 3. No credentials at all.
        return Err(AppError::NotAuthenticated);
    };

    resolve_token(pool, config, &token).await
}

async fn resolve_session(
    pool: &PgPool,
    config: &Config,
    cookie_header: Option<&str>,
) -> Result<Option<AuthUser>, AppError> {
    let Some(raw) = cookie_header else {
        return Ok(None);
    };
    let Some(cookie_value) = extract_cookie_value(raw, SESSION_COOKIE_NAME) else {
        return Ok(None);
    };
    // A bad signature is treated like an absent session so the request can
    // still authenticate via a bearer token.
    let Some(session_id) = decode_session_cookie(&cookie_value, &config.session_secret) else {
        return Ok(None);
    };

    let now = Utc::now();
    let Some(session) = session_repo::find_valid_session(pool, &session_id, now).await? else {
        return Ok(None);
    };

    session_repo::touch_session(pool, &session.id, now, config.session_ttl_hours).await?;

    let Some(user) = user_repo::find_user_by_id(pool, &session.user_id).await? else {
        // Session outlived its user record; not resolvable to an identity.
        return Ok(None);
    };

    Ok(Some(AuthUser {
        user,
        channel: AuthChannel::Session {
            session_id: session.id,
        },
    }))
}

async fn resolve_token(pool: &PgPool, config: &Config, token: &str) -> Result<AuthUser, AppError> {
    let claims = verify_token(token, &config.jwt_secret).map_err(|_| AppError::TokenInvalid)?;

    let user = user_repo::find_user_by_id(pool, &claims.sub)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    // Revocation watermark: logout advances it, invalidating every token
    // issued earlier even though the token itself is still well-formed.
    // `iat` has second granularity, so the comparison is inclusive: a token
    // minted in the same second as the logout is revoked too. A login right
    // after stays authenticated through its fresh session regardless.
    if let Some(valid_after) = user.tokens_valid_after {
        if claims.iat <= valid_after.timestamp() {
            return Err(AppError::TokenInvalid);
        }
    }

    Ok(AuthUser {
        user,
        channel: AuthChannel::Token,
    })
}

pub fn parse_bearer_token(header: &str) -> Option<&str> {
    if let Some(rest) = header.strip_prefix("Bearer ") {
        return Some(rest);
    }
    if let Some(rest) = header.strip_prefix("bearer ") {
        return Some(rest);
    }
    if let Some(space_idx) = header.find(' ') {
        let (scheme, rest) = header.split_at(space_idx);
        if scheme.eq_ignore_ascii_case("bearer") {
            return Some(rest.trim_start());
        }
    }
    None
}

fn extract_auth_headers(headers: &axum::http::HeaderMap) -> (Option<String>, Option<String>) {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned());
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned());
    (auth_header, cookie_header)
}
