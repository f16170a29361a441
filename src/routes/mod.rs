pub mod analytics;
pub mod forms;
pub mod health;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;

use crate::error::AppError;
use crate::middleware::cors;
use crate::state::SharedState;

pub fn form_routes() -> Router<SharedState> {
    Router::new()
        .route("/forms", get(forms::list).post(forms::create))
        .route("/forms/csv", post(forms::import_csv))
        .route("/forms/search/{query}", get(forms::search))
        .route(
            "/forms/{id}",
            get(forms::get).put(forms::update).delete(forms::delete),
        )
        .layer(cors::allow(&[Method::GET, Method::POST, Method::PUT, Method::DELETE]))
}

pub fn analytics_routes() -> Router<SharedState> {
    Router::new()
        .route("/analytics", get(analytics::summary))
        .layer(cors::allow(&[Method::GET]))
}

pub fn health_routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health::health))
        .layer(cors::allow(&[Method::GET]))
}

pub async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
