use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::api::ws_types::{RemovedPosition, WsMessage};
use crate::engine::ThresholdLevels;
use crate::errors::AppError;
use crate::models::Position;
use crate::AppState;

/// A position as shown on the dashboard, with live quote data when available.
#[derive(Debug, Serialize)]
pub struct PositionView {
    #[serde(flatten)]
    pub position: Position,
    pub current_price: Option<Decimal>,
    pub profit_pct: Option<Decimal>,
    pub levels: Option<ThresholdLevels>,
}

#[derive(Debug, Deserialize)]
pub struct NewPosition {
    pub name: String,
    pub ticker: String,
    pub purchase_price: Decimal,
}

/// GET /api/positions
pub async fn list(State(state): State<AppState>) -> Json<ApiResponse<Vec<PositionView>>> {
    let positions = state.store.lock().await.positions().to_vec();
    let strategy = state.monitor.strategy();

    let mut views = Vec::with_capacity(positions.len());
    for position in positions {
        let (current_price, levels) = match state.quotes.snapshot(&position.ticker).await {
            Ok(snap) => (
                Some(snap.last_close),
                strategy.levels_for(position.purchase_price, &snap.bars),
            ),
            Err(e) => {
                tracing::debug!(error = %e, ticker = %position.ticker, "Dashboard quote unavailable");
                (None, strategy.levels_for(position.purchase_price, &[]))
            }
        };
        let profit_pct = current_price
            .and_then(|p| position.percent_change(p))
            .map(|pct| pct.round_dp(2).normalize());

        views.push(PositionView {
            position,
            current_price,
            profit_pct,
            levels,
        });
    }

    Json(ApiResponse::ok(views))
}

/// POST /api/positions: insert, replacing any position with the same ticker.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<NewPosition>,
) -> Result<(StatusCode, Json<ApiResponse<Position>>), AppError> {
    let position = Position::new(body.name, &body.ticker, body.purchase_price)?;

    state
        .store
        .lock()
        .await
        .upsert_by_ticker(position.clone())?;

    tracing::info!(
        ticker = %position.ticker,
        price = %position.purchase_price,
        "Position added via API"
    );
    let _ = state.ws_tx.send(WsMessage::PositionUpdate(position.clone()));

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(position))))
}

/// DELETE /api/positions/:ticker
pub async fn remove(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<ApiResponse<Position>>, AppError> {
    let ticker = ticker.to_uppercase();
    let removed = state.store.lock().await.remove(&ticker)?;

    let Some(position) = removed else {
        return Err(AppError::NotFound(format!("{ticker} is not tracked")));
    };

    tracing::info!(ticker = %ticker, "Position removed via API");
    let _ = state
        .ws_tx
        .send(WsMessage::PositionRemoved(RemovedPosition { ticker }));

    Ok(Json(ApiResponse::ok(position)))
}
