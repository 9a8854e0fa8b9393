//! Request correlation ids.
//!
//! Auth events (logins, logouts, token revocations) are worth tracing across
//! the frontend and the logs, so every request gets an id: the client's
//! `x-request-id` when it sends a sane one, a fresh UUID otherwise. The id is
//! attached to the request's tracing span and echoed on the response.

use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

// Anything longer than a UUID with generous slack is treated as garbage
// rather than propagated into logs.
const MAX_INBOUND_ID_LEN: usize = 128;

/// Correlation id for the current request, available to handlers as an
/// extension.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = inbound_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(id.clone()));

    let span = tracing::info_span!("request", request_id = %id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    response
}

fn inbound_id(request: &Request) -> Option<String> {
    let value = request
        .headers()
        .get(REQUEST_ID_HEADER)?
        .to_str()
        .ok()?
        .trim();
    if value.is_empty() || value.len() > MAX_INBOUND_ID_LEN {
        return None;
    }
    Some(value.to_string())
}
