use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// Any origin may call the API; each route group lists the verbs it serves.
pub fn allow(methods: &[Method]) -> CorsLayer {
    let mut allowed = methods.to_vec();
    allowed.push(Method::OPTIONS);

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(allowed)
        .allow_headers([header::CONTENT_TYPE])
}
