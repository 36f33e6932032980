use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::errors::AppError;
use crate::services::report::build_full_report;
use crate::AppState;

/// POST /api/control/check: Run a threshold pass now.
pub async fn check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    if !state.alerts_enabled.load(Ordering::Relaxed) {
        return Ok((StatusCode::OK, Json(json!({ "status": "alerts_disabled" }))));
    }

    let summary = state.monitor.run_pass().await?;
    Ok((StatusCode::OK, Json(json!({ "status": "ok", "summary": summary }))))
}

/// POST /api/control/report: Send the full tactical report to the notifier.
pub async fn report(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let positions = state.store.lock().await.positions().to_vec();
    let text = build_full_report(&positions, state.quotes.as_ref(), state.monitor.strategy()).await;

    state
        .sink
        .send(&text)
        .await
        .map_err(|e| AppError::BadGateway(e.to_string()))?;

    tracing::info!(positions = positions.len(), "Full report sent via control API");
    Ok(Json(json!({ "status": "sent", "positions": positions.len() })))
}

/// POST /api/control/alerts/enable
pub async fn enable_alerts(State(state): State<AppState>) -> impl IntoResponse {
    state.alerts_enabled.store(true, Ordering::Relaxed);
    tracing::info!("Threshold alerts ENABLED via control API");
    (StatusCode::OK, Json(json!({ "alerts_enabled": true })))
}

/// POST /api/control/alerts/disable
pub async fn disable_alerts(State(state): State<AppState>) -> impl IntoResponse {
    state.alerts_enabled.store(false, Ordering::Relaxed);
    tracing::warn!("Threshold alerts DISABLED via control API");
    (StatusCode::OK, Json(json!({ "alerts_enabled": false })))
}

/// GET /api/control/status: Current system status.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let positions = state.store.lock().await.len();

    Json(json!({
        "alerts_enabled": state.alerts_enabled.load(Ordering::Relaxed),
        "positions": positions,
        "strategy": state.monitor.strategy().to_string(),
        "latch_policy": state.config.latch_policy,
        "telegram": state.config.telegram_credentials().is_some(),
        "monitor_interval_secs": state.config.monitor_interval_secs,
    }))
}
