use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub secure: bool,
    pub same_site: SameSite,
}

pub const SESSION_COOKIE_NAME: &str = "sid";
pub const TOKEN_COOKIE_NAME: &str = "token";
pub const OAUTH_STATE_COOKIE_NAME: &str = "oauth_state";
pub const AUTH_COOKIE_PATH: &str = "/";

pub fn build_auth_cookie(
    name: &str,
    value: &str,
    max_age: Duration,
    path: &str,
    options: CookieOptions,
) -> String {
    let mut cookie = format!(
        "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite={}",
        name,
        value,
        path,
        max_age.as_secs(),
        same_site_value(options.same_site)
    );
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn build_clear_cookie(name: &str, path: &str, options: CookieOptions) -> String {
    let mut cookie = format!(
        "{}=; Path={}; Max-Age=0; HttpOnly; SameSite={}",
        name,
        path,
        same_site_value(options.same_site)
    );
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn extract_cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();
        if key == name {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Produces the `sid` cookie value: the opaque session id followed by a keyed
/// SHA-256 digest, so a tampered or fabricated id is rejected before the
/// store is consulted.
pub fn encode_session_cookie(session_id: &str, secret: &str) -> String {
    format!("{}.{}", session_id, session_signature(session_id, secret))
}

/// Splits and verifies a `sid` cookie value. Returns the session id only when
/// the signature checks out.
pub fn decode_session_cookie(value: &str, secret: &str) -> Option<String> {
    let (session_id, signature) = value.rsplit_once('.')?;
    let expected = session_signature(session_id, secret);
    if constant_time_eq(signature.as_bytes(), expected.as_bytes()) {
        Some(session_id.to_string())
    } else {
        None
    }
}

fn session_signature(session_id: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hasher.update(b".");
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn same_site_value(same_site: SameSite) -> &'static str {
    match same_site {
        SameSite::Lax => "Lax",
        SameSite::Strict => "Strict",
        SameSite::None => "None",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_auth_cookie_includes_security_attributes() {
        let opts = CookieOptions {
            secure: true,
            same_site: SameSite::Lax,
        };
        let cookie = build_auth_cookie("token", "abc", Duration::from_secs(86400), "/", opts);
        assert!(cookie.contains("token=abc"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn build_clear_cookie_sets_max_age_zero() {
        let opts = CookieOptions {
            secure: false,
            same_site: SameSite::Strict,
        };
        let cookie = build_clear_cookie("sid", "/", opts);
        assert!(cookie.contains("sid="));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn extract_cookie_value_finds_matching_name() {
        let header = "a=1; sid=session-value; b=2";
        assert_eq!(
            extract_cookie_value(header, "sid").as_deref(),
            Some("session-value")
        );
        assert!(extract_cookie_value(header, "missing").is_none());
    }

    #[test]
    fn session_cookie_roundtrip() {
        let encoded = encode_session_cookie("session-123", "secret");
        assert_eq!(
            decode_session_cookie(&encoded, "secret").as_deref(),
            Some("session-123")
        );
    }

    #[test]
    fn session_cookie_rejects_tampering() {
        let encoded = encode_session_cookie("session-123", "secret");
        let tampered = encoded.replace("session-123", "session-456");
        assert!(decode_session_cookie(&tampered, "secret").is_none());
        // Signature from another secret is also rejected.
        assert!(decode_session_cookie(&encoded, "other-secret").is_none());
        // Values without a signature segment never parse.
        assert!(decode_session_cookie("session-123", "secret").is_none());
    }
}
