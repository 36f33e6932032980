use serde::Deserialize;

/// `GET /v8/finance/chart/{ticker}` response body.
#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteSeries>,
}

/// Parallel arrays; any element may be null on non-trading days.
#[derive(Debug, Default, Deserialize)]
pub struct QuoteSeries {
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}
