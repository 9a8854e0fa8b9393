//! The resolved identity attached to authenticated requests.

use crate::models::user::User;

/// Which verification channel authenticated the request.
#[derive(Debug, Clone)]
pub enum AuthChannel {
    /// Server-side session referenced by the signed `sid` cookie.
    Session { session_id: String },
    /// Stateless bearer token (Authorization header or `token` cookie).
    Token,
}

/// Identity produced by the resolver and consumed by every protected handler.
///
/// The user document is always re-fetched from the store after verification,
/// regardless of channel, so downstream code sees one canonical shape and
/// never branches on how the request authenticated.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub channel: AuthChannel,
}

impl AuthUser {
    /// Returns the session id when the request authenticated via the session
    /// channel.
    pub fn session_id(&self) -> Option<&str> {
        match &self.channel {
            AuthChannel::Session { session_id } => Some(session_id),
            AuthChannel::Token => None,
        }
    }
}
