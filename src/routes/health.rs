use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::SharedState;

/// Liveness plus a storage probe. Always 200 while the process is serving.
pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    let database = match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!("Health check could not reach storage: {e}");
            "disconnected"
        }
    };

    Json(json!({
        "success": true,
        "message": "Server is running",
        "data": {
            "status": "ok",
            "database": database,
            "storage": state.store.backend(),
            "environment": state.config.environment.as_str(),
            "timestamp": chrono::Utc::now(),
        },
    }))
}
