//! Top-of-book depth: Kraken first, Bybit linear perp second

use serde_json::Value;
use tracing::warn;

use super::{num, Endpoints, HttpFetcher};
use crate::types::{AlertError, OrderBookSnapshot, Result};

const DEPTH: &str = "25";

/// `[[price, qty, ...], ...]` rows to (price, qty)
fn levels(rows: &Value) -> Vec<(f64, f64)> {
    rows.as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| Some((num(&row[0])?, num(&row[1])?)))
                .collect()
        })
        .unwrap_or_default()
}

fn book(symbol: &str, now: i64, source: &str, bids: Vec<(f64, f64)>, asks: Vec<(f64, f64)>) -> Result<OrderBookSnapshot> {
    if bids.is_empty() || asks.is_empty() {
        return Err(AlertError::InvalidResponse(format!("{}: one-sided book", source)));
    }
    Ok(OrderBookSnapshot {
        symbol: symbol.to_string(),
        timestamp: now,
        bids,
        asks,
        source: source.to_string(),
        healthy: true,
        message: None,
    })
}

pub async fn try_kraken_book(http: &HttpFetcher, endpoints: &Endpoints, now: i64) -> Result<OrderBookSnapshot> {
    let payload: Value = http
        .get_json(
            "kraken",
            &format!("{}/0/public/Depth", endpoints.kraken),
            &[("pair", "XXBTZUSD"), ("count", DEPTH)],
        )
        .await?;
    if let Some(errors) = payload["error"].as_array().filter(|e| !e.is_empty()) {
        return Err(AlertError::InvalidResponse(format!("kraken: {:?}", errors)));
    }
    let side = &payload["result"]["XXBTZUSD"];
    book("BTC", now, "kraken", levels(&side["bids"]), levels(&side["asks"]))
}

pub async fn try_bybit_book(http: &HttpFetcher, endpoints: &Endpoints, now: i64) -> Result<OrderBookSnapshot> {
    let payload: Value = http
        .get_json(
            "bybit",
            &format!("{}/v5/market/orderbook", endpoints.bybit),
            &[("category", "linear"), ("symbol", "BTCUSDT"), ("limit", DEPTH)],
        )
        .await?;
    let result = &payload["result"];
    book("BTC", now, "bybit", levels(&result["b"]), levels(&result["a"]))
}

pub async fn fetch_order_book(http: &HttpFetcher, endpoints: &Endpoints, now: i64) -> OrderBookSnapshot {
    match try_kraken_book(http, endpoints, now).await {
        Ok(snapshot) => return snapshot,
        Err(e) => warn!("Kraken depth fetch failed: {}", e),
    }
    match try_bybit_book(http, endpoints, now).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Bybit depth fetch failed: {}", e);
            OrderBookSnapshot::unavailable("BTC", now, &e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_levels_parse_string_rows() {
        let rows = json!([["60000.1", "1.5", 1700000000], ["59999.9", "0.2", 1700000001]]);
        assert_eq!(levels(&rows), vec![(60000.1, 1.5), (59999.9, 0.2)]);
        assert!(levels(&json!(null)).is_empty());
    }

    #[test]
    fn test_one_sided_book_rejected() {
        assert!(book("BTC", 0, "kraken", vec![(1.0, 1.0)], vec![]).is_err());
    }
}
