use serde::Serialize;

use crate::models::{AlertRecord, Position};

/// Messages broadcast to all connected WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "alert_fired")]
    AlertFired(AlertRecord),

    #[serde(rename = "position_update")]
    PositionUpdate(Position),

    #[serde(rename = "position_removed")]
    PositionRemoved(RemovedPosition),
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovedPosition {
    pub ticker: String,
}
