pub mod config;
pub mod db;
pub mod error;
pub mod function;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod submission;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{Config, Storage};
use crate::db::Database;
use crate::middleware::error_envelope::error_envelope;
use crate::state::{AppState, SharedState};
use crate::store::{MemoryStore, PgStore, SharedStore};

/// Open the configured store. Postgres connects lazily on first use.
pub fn build_store(config: &Config) -> SharedStore {
    match &config.storage {
        Storage::Postgres {
            url,
            max_connections,
        } => Arc::new(PgStore::new(Database::new(url.clone(), *max_connections))),
        Storage::Memory => {
            tracing::warn!("Using in-memory storage; submissions are lost on exit");
            Arc::new(MemoryStore::new())
        }
    }
}

/// The full HTTP surface. Both the server and the function entry point
/// dispatch through this router.
pub fn build_app(store: SharedStore, config: Config) -> Router {
    let environment = config.environment;
    let max_body_size = config.max_body_size;
    let base_path = config.base_path.clone();

    let state: SharedState = Arc::new(AppState { store, config });

    let api = Router::new()
        .merge(routes::health_routes())
        .merge(routes::form_routes())
        .merge(routes::analytics_routes());

    let app = if base_path.is_empty() {
        api
    } else {
        Router::new().nest(&base_path, api)
    };

    app.fallback(routes::not_found)
        .layer(axum::middleware::from_fn_with_state(environment, error_envelope))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
