use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::{RecentSubmission, Source};
use crate::state::SharedState;

const RECENT_LIMIT: i64 = 5;

pub async fn summary(State(state): State<SharedState>) -> Result<Json<Value>, AppError> {
    let store = &state.store;

    let form = store.count_by_source(Source::Form).await?;
    let csv = store.count_by_source(Source::Csv).await?;
    let by_user_type = store.count_by_user_type().await?;
    let recent: Vec<RecentSubmission> = store
        .recent(RECENT_LIMIT)
        .await?
        .into_iter()
        .map(RecentSubmission::from)
        .collect();

    // Every submission has exactly one source, so the total is their sum.
    Ok(Json(json!({
        "success": true,
        "data": {
            "totalSubmissions": form + csv,
            "submissionsBySource": { "form": form, "csv": csv },
            "submissionsByUserType": by_user_type,
            "recentSubmissions": recent,
        },
    })))
}
