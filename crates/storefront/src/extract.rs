//! Request extractors whose rejections are `AppError`s.
//!
//! Axum's own `Json`, `Query` and `Path` reject malformed input with plain
//! text and mixed status codes. These wrappers answer `400` with the usual
//! JSON error body instead.

use axum::{
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AppError;

/// JSON request body. Also usable as a response.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Query string parameters.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

/// Path parameters.
#[derive(Debug, Clone, Copy, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Line {
        quantity: u32,
    }

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn error_body(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_json_type_mismatch_is_400_json() {
        let err = Json::<Line>::from_request(post(r#"{"quantity":-1}"#), &())
            .await
            .unwrap_err();
        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("quantity"));
    }

    #[tokio::test]
    async fn test_json_missing_field_and_syntax_are_400() {
        let err = Json::<Line>::from_request(post("{}"), &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = Json::<Line>::from_request(post("{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_json_without_content_type_is_400() {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(r#"{"quantity":1}"#))
            .unwrap();
        let err = Json::<Line>::from_request(request, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_rejection_is_400_json() {
        let request = Request::builder()
            .uri("/?quantity=lots")
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let err = Query::<Line>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_json_accepts_valid_body() {
        let Json(line) = Json::<Line>::from_request(post(r#"{"quantity":2}"#), &())
            .await
            .unwrap();
        assert_eq!(line.quantity, 2);
    }
}
