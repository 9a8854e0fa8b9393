use serde::{Deserialize, Serialize};
use std::env;

use crate::utils::cookies::SameSite;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    /// Secret used to sign bearer tokens (HS256).
    pub jwt_secret: String,
    /// Separate secret used to sign the session cookie value.
    pub session_secret: String,
    pub token_expiration_hours: u64,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    pub cors_allow_origin: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_url: String,
    /// Browser destination after a completed external-identity login.
    pub post_login_redirect: String,
    /// Browser destination when the external provider rejects the handshake.
    pub login_redirect: String,
    pub upload_dir: String,
    pub production_mode: bool,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost:5432/budgetbook".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let session_secret = env::var("SESSION_SECRET")
            .unwrap_or_else(|_| "your-session-secret-change-this-in-production".to_string());

        let token_expiration_hours = env::var("TOKEN_EXPIRATION_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);

        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);

        let production_mode = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        // The frontend is hosted on a different origin in production, so the
        // auth cookies must cross site boundaries there.
        let cookie_secure = production_mode;
        let cookie_same_site = if production_mode {
            SameSite::None
        } else {
            SameSite::Lax
        };

        let cors_allow_origin =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let google_client_id = env::var("GOOGLE_CLIENT_ID").unwrap_or_default();
        let google_client_secret = env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default();
        let google_redirect_url = env::var("GOOGLE_REDIRECT_URL")
            .unwrap_or_else(|_| "http://localhost:3001/auth/google/callback".to_string());

        let post_login_redirect = env::var("POST_LOGIN_REDIRECT")
            .unwrap_or_else(|_| format!("{}/home", cors_allow_origin));
        let login_redirect =
            env::var("LOGIN_REDIRECT").unwrap_or_else(|_| format!("{}/login", cors_allow_origin));

        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());

        Ok(Config {
            database_url,
            jwt_secret,
            session_secret,
            token_expiration_hours,
            session_ttl_hours,
            cookie_secure,
            cookie_same_site,
            cors_allow_origin,
            google_client_id,
            google_client_secret,
            google_redirect_url,
            post_login_redirect,
            login_redirect,
            upload_dir,
            production_mode,
        })
    }
}
