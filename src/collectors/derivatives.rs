//! Perpetual futures context: funding, open-interest change, basis

use serde_json::Value;
use tracing::warn;

use super::{num, Endpoints, HttpFetcher};
use crate::types::{AlertError, DerivativesSnapshot, Result};

const SYMBOL: &str = "BTCUSDT";

fn pct_change(old: f64, new: f64) -> f64 {
    if old == 0.0 {
        0.0
    } else {
        (new - old) / old.abs() * 100.0
    }
}

fn basis_pct(mark: f64, index: f64) -> f64 {
    if index == 0.0 {
        0.0
    } else {
        (mark - index) / index * 100.0
    }
}

pub async fn try_binance(http: &HttpFetcher, endpoints: &Endpoints) -> Result<DerivativesSnapshot> {
    let premium: Value = http
        .get_json(
            "binance",
            &format!("{}/fapi/v1/premiumIndex", endpoints.binance_futures),
            &[("symbol", SYMBOL)],
        )
        .await?;
    let oi_rows: Vec<Value> = http
        .get_json(
            "binance",
            &format!("{}/futures/data/openInterestHist", endpoints.binance_futures),
            &[("symbol", SYMBOL), ("period", "5m"), ("limit", "2")],
        )
        .await?;

    if oi_rows.len() < 2 {
        return Err(AlertError::InvalidResponse(
            "binance: fewer than two open-interest rows".to_string(),
        ));
    }
    let old_oi = num(&oi_rows[0]["sumOpenInterest"]).unwrap_or(0.0);
    let new_oi = num(&oi_rows[1]["sumOpenInterest"]).unwrap_or(0.0);

    let mark = num(&premium["markPrice"]).unwrap_or(0.0);
    let index = num(&premium["indexPrice"]).unwrap_or(0.0);

    Ok(DerivativesSnapshot {
        funding_rate: num(&premium["lastFundingRate"]).unwrap_or(0.0),
        oi_change_pct: pct_change(old_oi, new_oi),
        basis_pct: basis_pct(mark, index),
        source: "binance".to_string(),
        healthy: true,
    })
}

pub async fn try_bybit(http: &HttpFetcher, endpoints: &Endpoints) -> Result<DerivativesSnapshot> {
    let tickers: Value = http
        .get_json(
            "bybit",
            &format!("{}/v5/market/tickers", endpoints.bybit),
            &[("category", "linear"), ("symbol", SYMBOL)],
        )
        .await?;
    let row = tickers["result"]["list"]
        .get(0)
        .ok_or_else(|| AlertError::InvalidResponse("bybit: empty ticker list".to_string()))?;
    let funding_rate = num(&row["fundingRate"]).unwrap_or(0.0);
    let basis = basis_pct(
        num(&row["markPrice"]).unwrap_or(0.0),
        num(&row["indexPrice"]).unwrap_or(0.0),
    );

    let oi: Value = http
        .get_json(
            "bybit",
            &format!("{}/v5/market/open-interest", endpoints.bybit),
            &[
                ("category", "linear"),
                ("symbol", SYMBOL),
                ("intervalTime", "5min"),
                ("limit", "2"),
            ],
        )
        .await?;
    // Newest row first
    let rows = oi["result"]["list"].as_array().cloned().unwrap_or_default();
    let oi_change_pct = match (rows.last(), rows.first()) {
        (Some(old), Some(new)) if rows.len() >= 2 => pct_change(
            num(&old["openInterest"]).unwrap_or(0.0),
            num(&new["openInterest"]).unwrap_or(0.0),
        ),
        _ => 0.0,
    };

    Ok(DerivativesSnapshot {
        funding_rate,
        oi_change_pct,
        basis_pct: basis,
        source: "bybit".to_string(),
        healthy: true,
    })
}

/// Binance first, Bybit second
pub async fn fetch_derivatives(http: &HttpFetcher, endpoints: &Endpoints) -> DerivativesSnapshot {
    match try_binance(http, endpoints).await {
        Ok(snapshot) => return snapshot,
        Err(e) => warn!("Binance derivatives fetch failed: {}", e),
    }
    match try_bybit(http, endpoints).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Bybit derivatives fetch failed: {}", e);
            DerivativesSnapshot::unavailable("none")
        }
    }
}
