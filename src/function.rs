//! Serverless entry point: one API-gateway style event in, one response out.
//!
//! Events are dispatched through the same router the server uses, so the
//! function and the server can't drift apart.

use std::collections::{BTreeMap, HashMap};

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde::{Deserialize, Serialize};
use tower::ServiceExt;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionEvent {
    pub http_method: String,
    pub path: String,
    #[serde(default)]
    pub query_string_parameters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl FunctionResponse {
    /// An enveloped error for events that never reached the router.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        let body = serde_json::json!({ "success": false, "message": message.into() });
        Self {
            status_code: status.as_u16(),
            headers: BTreeMap::from([(
                header::CONTENT_TYPE.as_str().to_string(),
                "application/json".to_string(),
            )]),
            body: body.to_string(),
        }
    }
}

impl FunctionEvent {
    fn into_request(self) -> Result<Request<Body>, String> {
        let method = Method::from_bytes(self.http_method.to_ascii_uppercase().as_bytes())
            .map_err(|e| format!("Invalid httpMethod: {e}"))?;

        let mut uri = if self.path.starts_with('/') {
            self.path
        } else {
            format!("/{}", self.path)
        };
        if let Some(params) = self.query_string_parameters.filter(|p| !p.is_empty()) {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter())
                .finish();
            uri.push('?');
            uri.push_str(&query);
        }

        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in self.headers.unwrap_or_default() {
            builder = builder.header(name, value);
        }

        builder
            .body(Body::from(self.body.unwrap_or_default()))
            .map_err(|e| format!("Invalid request: {e}"))
    }
}

async fn into_function_response(response: Response) -> Result<FunctionResponse, String> {
    let (parts, body) = response.into_parts();

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|e| format!("Failed to read response body: {e}"))?;

    Ok(FunctionResponse {
        status_code: parts.status.as_u16(),
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

/// Run one event through the router. Events that can't be turned into a
/// request are answered with a 400 envelope.
pub async fn invoke(app: Router, event: FunctionEvent) -> FunctionResponse {
    let request = match event.into_request() {
        Ok(request) => request,
        Err(message) => {
            tracing::warn!("Rejected function event: {message}");
            return FunctionResponse::error(StatusCode::BAD_REQUEST, message);
        }
    };
    let response = app.oneshot(request).await.unwrap_or_else(|e| match e {});
    match into_function_response(response).await {
        Ok(response) => response,
        Err(message) => {
            tracing::error!("{message}");
            FunctionResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};

    use super::*;
    use crate::config::{Config, Environment, Storage};
    use crate::store::MemoryStore;

    fn app() -> Router {
        let config = Config {
            storage: Storage::Memory,
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            environment: Environment::Production,
            base_path: "/api".to_string(),
            max_body_size: 1_048_576,
            log_level: "warn".to_string(),
        };
        crate::build_app(Arc::new(MemoryStore::new()), config)
    }

    fn event(method: &str, path: &str, body: Option<Value>) -> FunctionEvent {
        FunctionEvent {
            http_method: method.to_string(),
            path: path.to_string(),
            query_string_parameters: None,
            headers: Some(HashMap::from([(
                "content-type".to_string(),
                "application/json".to_string(),
            )])),
            body: body.map(|b| b.to_string()),
        }
    }

    #[tokio::test]
    async fn create_then_list_through_events() {
        let app = app();

        let created = invoke(
            app.clone(),
            event("post", "/api/forms", Some(json!({ "name": "Jo", "userType": "student" }))),
        )
        .await;
        assert_eq!(created.status_code, 201);

        let mut list = event("GET", "/api/forms", None);
        list.query_string_parameters = Some(BTreeMap::from([
            ("userType".to_string(), "student".to_string()),
            ("limit".to_string(), "10".to_string()),
        ]));
        let listed = invoke(app, list).await;
        assert_eq!(listed.status_code, 200);
        assert_eq!(listed.headers["content-type"], "application/json");

        let body: Value = serde_json::from_str(&listed.body).unwrap();
        assert_eq!(body["data"][0]["name"], "Jo");
        assert_eq!(body["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn unknown_paths_are_404() {
        let response = invoke(app(), event("GET", "forms", None)).await;
        assert_eq!(response.status_code, 404);
    }

    #[tokio::test]
    async fn bad_method_is_a_400_envelope() {
        let response = invoke(app(), event("NOT A METHOD", "/api/forms", None)).await;
        assert_eq!(response.status_code, 400);
        assert_eq!(response.headers["content-type"], "application/json");
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid httpMethod"));
    }

    #[tokio::test]
    async fn bad_header_is_a_400_envelope() {
        let mut bad = event("GET", "/api/health", None);
        bad.headers = Some(HashMap::from([("bad header".to_string(), "x".to_string())]));
        let response = invoke(app(), bad).await;
        assert_eq!(response.status_code, 400);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["success"], false);
    }
}
