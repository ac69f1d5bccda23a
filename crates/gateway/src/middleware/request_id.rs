//! Request correlation IDs.
//!
//! A caller may send its own `x-request-id`; anything longer than
//! [`MAX_REQUEST_ID_LEN`] or outside printable ASCII is replaced with a fresh
//! UUID v4 so it cannot smuggle newlines into logs. The ID lands in the
//! `http_request` span, the Sentry scope and the response headers.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied ID that is kept.
pub const MAX_REQUEST_ID_LEN: usize = 64;

fn accepted(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN && id.bytes().all(|b| b.is_ascii_graphic())
}

pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = match request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
    {
        Some(id) if accepted(id) => id.to_string(),
        _ => Uuid::new_v4().to_string(),
    };

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| scope.set_tag("request_id", &request_id));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_ids() {
        assert!(accepted("abc-123"));
        assert!(accepted(&"a".repeat(MAX_REQUEST_ID_LEN)));
    }

    #[test]
    fn test_rejects_suspicious_ids() {
        assert!(!accepted(""));
        assert!(!accepted("two words"));
        assert!(!accepted(&"a".repeat(MAX_REQUEST_ID_LEN + 1)));
    }
}
