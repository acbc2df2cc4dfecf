//! Taker buy/sell and account long/short ratios from Binance futures

use serde_json::Value;
use tracing::warn;

use super::{num, Endpoints, HttpFetcher};
use crate::types::{AlertError, FlowSnapshot, Result};

fn latest_ratio(rows: &[Value], field: &str) -> Result<f64> {
    rows.last()
        .and_then(|row| num(&row[field]))
        .ok_or_else(|| AlertError::InvalidResponse(format!("binance: missing {}", field)))
}

pub async fn try_flows(http: &HttpFetcher, endpoints: &Endpoints) -> Result<FlowSnapshot> {
    let query = [("symbol", "BTCUSDT"), ("period", "5m"), ("limit", "2")];
    let taker: Vec<Value> = http
        .get_json(
            "binance",
            &format!("{}/futures/data/takerlongshortRatio", endpoints.binance_futures),
            &query,
        )
        .await?;
    let positions: Vec<Value> = http
        .get_json(
            "binance",
            &format!("{}/futures/data/globalLongShortAccountRatio", endpoints.binance_futures),
            &query,
        )
        .await?;

    Ok(FlowSnapshot::from_ratios(
        latest_ratio(&taker, "buySellRatio")?,
        latest_ratio(&positions, "longShortRatio")?,
        "binance",
    ))
}

pub async fn fetch_flows(http: &HttpFetcher, endpoints: &Endpoints) -> FlowSnapshot {
    try_flows(http, endpoints).await.unwrap_or_else(|e| {
        warn!("Flow fetch failed: {}", e);
        FlowSnapshot::unavailable("none")
    })
}
