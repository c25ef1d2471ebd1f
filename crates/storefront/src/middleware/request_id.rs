//! Request ID middleware for request tracing and correlation.
//!
//! Reuses an upstream `x-request-id` (Fly.io proxy, Cloudflare) when it looks
//! sane, otherwise generates a UUID v4. The ID is recorded on the current
//! span, tagged on the Sentry scope and echoed in the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream request ID accepted as-is.
const MAX_REQUEST_ID_LENGTH: usize = 128;

fn upstream_request_id(request: &Request) -> Option<String> {
    let value = request.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let valid = !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LENGTH
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    valid.then(|| value.to_string())
}

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = upstream_request_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", &request_id);
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(id: &str) -> Request {
        Request::builder()
            .header(REQUEST_ID_HEADER, id)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_upstream_request_id_accepted() {
        assert_eq!(
            upstream_request_id(&request_with("01HZX-abc_1.2")).as_deref(),
            Some("01HZX-abc_1.2")
        );
    }

    #[test]
    fn test_upstream_request_id_rejected() {
        assert!(upstream_request_id(&request_with("has space")).is_none());
        assert!(upstream_request_id(&request_with(&"a".repeat(200))).is_none());
        let bare = Request::builder().body(Body::empty()).unwrap();
        assert!(upstream_request_id(&bare).is_none());
    }
}
