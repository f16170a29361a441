use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::config::Environment;
use crate::error::{AppError, ErrorDetail};

/// Keeps every error response in the JSON envelope.
///
/// Bare 405s produced by the router get the envelope body (their `Allow`
/// header is kept). In development mode, 500s carrying an `ErrorDetail`
/// get the raw failure text added as `error`.
pub async fn error_envelope(
    State(environment): State<Environment>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;

    if response.status() == StatusCode::METHOD_NOT_ALLOWED
        && !response.headers().contains_key(header::CONTENT_TYPE)
    {
        let (mut parts, _) = response.into_parts();
        let (envelope, body) = AppError::MethodNotAllowed.into_response().into_parts();
        parts.headers.remove(header::CONTENT_LENGTH);
        if let Some(ct) = envelope.headers.get(header::CONTENT_TYPE) {
            parts.headers.insert(header::CONTENT_TYPE, ct.clone());
        }
        return Response::from_parts(parts, body);
    }

    if !environment.is_development() {
        return response;
    }

    let Some(detail) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    let body = json!({
        "success": false,
        "message": detail.message,
        "error": detail.detail,
    });
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Response::from_parts(parts, Body::from(body.to_string()))
}
