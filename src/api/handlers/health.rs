use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.lock().await;
    let dir_ok = store
        .path()
        .parent()
        .map(|p| p.as_os_str().is_empty() || p.is_dir())
        .unwrap_or(true);

    if dir_ok {
        (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "positions": store.len() })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "store": "directory missing" })),
        )
    }
}
